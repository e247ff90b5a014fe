// ChatSift - app/entry_state.rs
//
// Applies classification outcomes to entry visibility.
//
// The view of an entry is a pure function of its latest classification:
//   suppressed -> filtered marker set, hidden, no reviewed accent
//   passed     -> no filtered marker, shown, reviewed accent
// so applying the same outcome twice is a no-op and re-classifying a hidden
// entry as passed restores it completely.

use crate::core::classifier::classify;
use crate::core::model::{ChatEntry, Classification, EntryView, Evidence};
use crate::core::settings::FilterConfig;
use crate::util::constants::{FILTER_LOG_PREFIX, MAX_RECORD_TEXT_CHARS};
use crate::util::logging::FILTERED_TARGET;

/// Counts returned by the bulk operations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplySummary {
    /// Entries classified.
    pub evaluated: usize,
    /// Entries now hidden.
    pub suppressed: usize,
    /// Entries whose view actually changed.
    pub changed: usize,
}

/// View an entry must have after `result` is applied.
pub fn view_for(result: &Classification) -> EntryView {
    if result.is_suppressed() {
        EntryView {
            filtered: true,
            hidden: true,
            reviewed: false,
        }
    } else {
        EntryView {
            filtered: false,
            hidden: false,
            reviewed: true,
        }
    }
}

/// Apply one classification to one entry. Returns true when the view changed.
///
/// Every suppression emits a record naming the rule, the author and the
/// evidence, whether or not the entry was already hidden.
pub fn apply(entry: &mut ChatEntry, result: &Classification) -> bool {
    if let Classification::Suppressed { rule, evidence } = result {
        let author = entry.author_or_unknown();
        match evidence {
            Evidence::EmoteCount(count) => tracing::info!(
                target: FILTERED_TARGET,
                rule = rule.id(),
                author,
                "{FILTER_LOG_PREFIX}: Filtered [{rule}] (count={count}) from @{author}"
            ),
            Evidence::Text(text) => tracing::info!(
                target: FILTERED_TARGET,
                rule = rule.id(),
                author,
                "{FILTER_LOG_PREFIX}: Filtered [{rule}] from @{author}: {}",
                preview(text)
            ),
        }
    } else {
        tracing::trace!(entry = %entry.id, "Entry passed");
    }

    let next = view_for(result);
    if entry.view == next {
        return false;
    }
    entry.view = next;
    true
}

/// Classify and apply every entry, in order.
pub fn apply_all<'a, I>(entries: I, config: &FilterConfig) -> ApplySummary
where
    I: IntoIterator<Item = &'a mut ChatEntry>,
{
    let mut summary = ApplySummary::default();
    for entry in entries {
        let result = classify(&entry.content, config);
        summary.evaluated += 1;
        if result.is_suppressed() {
            summary.suppressed += 1;
        }
        if apply(entry, &result) {
            summary.changed += 1;
        }
    }
    tracing::debug!(
        evaluated = summary.evaluated,
        suppressed = summary.suppressed,
        changed = summary.changed,
        "Re-evaluated chat log"
    );
    summary
}

/// Remove every trace of filtering. Entries the filter never touched are left
/// exactly as they are. Returns the number of entries restored.
pub fn reveal_all<'a, I>(entries: I) -> usize
where
    I: IntoIterator<Item = &'a mut ChatEntry>,
{
    let mut restored = 0;
    for entry in entries {
        if entry.view.is_marked() {
            entry.view = EntryView::default();
            restored += 1;
        }
    }
    tracing::debug!(restored, "Revealed filtered entries");
    restored
}

fn preview(text: &str) -> String {
    if text.chars().count() <= MAX_RECORD_TEXT_CHARS {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(MAX_RECORD_TEXT_CHARS).collect();
    cut.push('…');
    cut
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::{EntryContent, EntryId};
    use crate::core::rules::RuleKind;
    use chrono::Utc;

    fn entry(text: &str) -> ChatEntry {
        ChatEntry {
            id: EntryId(1),
            received_at: Utc::now(),
            content: EntryContent::text("viewer", text),
            view: EntryView::default(),
        }
    }

    fn suppressed() -> Classification {
        Classification::Suppressed {
            rule: RuleKind::Caps,
            evidence: Evidence::Text("LOUD NOISES".to_string()),
        }
    }

    #[test]
    fn test_apply_suppressed_is_idempotent() {
        let mut once = entry("x");
        let mut twice = entry("x");
        assert!(apply(&mut once, &suppressed()));
        assert!(apply(&mut twice, &suppressed()));
        assert!(!apply(&mut twice, &suppressed()));
        assert_eq!(once.view, twice.view);
        assert!(once.view.filtered && once.view.hidden && !once.view.reviewed);
    }

    #[test]
    fn test_apply_passed_twice_does_not_toggle() {
        let mut e = entry("x");
        assert!(apply(&mut e, &Classification::Passed));
        let after_first = e.view;
        assert!(!apply(&mut e, &Classification::Passed));
        assert_eq!(e.view, after_first);
        assert!(e.view.reviewed && !e.view.hidden && !e.view.filtered);
    }

    #[test]
    fn test_passed_fully_restores_hidden_entry() {
        let mut e = entry("x");
        apply(&mut e, &suppressed());
        apply(&mut e, &Classification::Passed);
        assert_eq!(e.view, view_for(&Classification::Passed));
    }

    #[test]
    fn test_reveal_all_round_trip() {
        let mut entries = vec![entry("a"), entry("b"), entry("c")];
        apply(&mut entries[0], &suppressed());
        apply(&mut entries[1], &Classification::Passed);
        apply(&mut entries[1], &suppressed());
        apply(&mut entries[1], &Classification::Passed);

        let restored = reveal_all(entries.iter_mut());
        assert_eq!(restored, 2, "untouched entry must not be counted");
        for e in &entries {
            assert_eq!(e.view, EntryView::default());
        }
    }

    #[test]
    fn test_apply_all_summary() {
        let mut entries = vec![entry("hello"), entry("WHY ARE WE YELLING"), entry("ok")];
        let summary = apply_all(entries.iter_mut(), &FilterConfig::default());
        assert_eq!(
            summary,
            ApplySummary {
                evaluated: 3,
                suppressed: 1,
                changed: 3,
            }
        );
        assert!(entries[1].view.hidden);
        let again = apply_all(entries.iter_mut(), &FilterConfig::default());
        assert_eq!(again.changed, 0);
    }

    #[test]
    fn test_preview_truncates_on_char_boundary() {
        let long = "é".repeat(MAX_RECORD_TEXT_CHARS + 10);
        let p = preview(&long);
        assert_eq!(p.chars().count(), MAX_RECORD_TEXT_CHARS + 1);
        assert!(p.ends_with('…'));
    }
}
