// ChatSift - core/classifier.rs
//
// Decides whether one entry is shown or suppressed, and by which rule.
//
// Order of evaluation:
//   1. Emote rule (if active), on the emote count alone. A match returns
//      immediately without extracting text.
//   2. Text extraction. Empty text passes.
//   3. Active text rules in fixed precedence order: caps, repeat, links,
//      keyword. The first match is reported.
//
// Pure function of (entry content, config). No state survives between calls.

use crate::core::extract::extract_text;
use crate::core::model::{Classification, EntryContent, Evidence};
use crate::core::rules::{self, RuleKind};
use crate::core::settings::FilterConfig;

/// Classify one entry against a configuration snapshot.
pub fn classify(content: &EntryContent, config: &FilterConfig) -> Classification {
    if config.is_active(RuleKind::Emote) {
        let count = content.emote_count();
        if rules::emote_matches(count, config.settings().max_emotes) {
            return Classification::Suppressed {
                rule: RuleKind::Emote,
                evidence: Evidence::EmoteCount(count),
            };
        }
    }

    let text = extract_text(content);
    if text.is_empty() {
        return Classification::Passed;
    }

    RuleKind::TEXT_PRECEDENCE
        .into_iter()
        .filter(|rule| config.is_active(*rule))
        .find(|rule| rule.test(&text, config))
        .map_or(Classification::Passed, |rule| Classification::Suppressed {
            rule,
            evidence: Evidence::Text(text),
        })
}
