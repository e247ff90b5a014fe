// ChatSift - core/extract.rs
//
// Text extraction: flattens an entry's fragments into the single string the
// text rules evaluate. Link destinations are included so the link rule sees
// where a link really points, not only its visible label.

use crate::core::model::{EntryContent, Fragment};

/// Build the normalised text of an entry.
///
/// Text fragments come first, then link destinations, each group in document
/// order. Every component is trimmed, empty components are dropped, and the
/// rest are joined by single spaces. Emotes never contribute.
pub fn extract_text(content: &EntryContent) -> String {
    let texts = content.fragments.iter().filter_map(|f| match f {
        Fragment::Text { text } => Some(text.as_str()),
        _ => None,
    });
    let links = content.fragments.iter().filter_map(|f| match f {
        Fragment::Link { href, .. } => Some(href.as_str()),
        _ => None,
    });

    texts
        .chain(links)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Fragment {
        Fragment::Text {
            text: s.to_string(),
        }
    }

    fn link(label: &str, href: &str) -> Fragment {
        Fragment::Link {
            text: label.to_string(),
            href: href.to_string(),
        }
    }

    #[test]
    fn test_no_fragments_yields_empty() {
        assert_eq!(extract_text(&EntryContent::default()), "");
    }

    #[test]
    fn test_texts_then_links_in_document_order() {
        let content = EntryContent {
            author: None,
            fragments: vec![
                text("  look "),
                link("click me", " https://free.xyz/a "),
                text("here"),
                Fragment::Emote {
                    name: "Kappa".to_string(),
                },
                link("", "http://b.gg"),
            ],
        };
        assert_eq!(
            extract_text(&content),
            "look here https://free.xyz/a http://b.gg"
        );
    }

    #[test]
    fn test_blank_components_do_not_double_spaces() {
        let content = EntryContent {
            author: None,
            fragments: vec![text("a"), text("   "), text("b")],
        };
        assert_eq!(extract_text(&content), "a b");
    }

    #[test]
    fn test_link_label_is_not_extracted() {
        let content = EntryContent {
            author: None,
            fragments: vec![link("totally safe", "https://spam.tk")],
        };
        assert_eq!(extract_text(&content), "https://spam.tk");
    }
}
