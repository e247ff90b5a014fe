// ChatSift - core/rules.rs
//
// The fixed rule catalog. Each rule is a pure predicate over the extracted
// message text and the current filter configuration, except the emote rule,
// which looks at the entry's emote count instead of its text.
//
// The catalog is a closed enum so precedence order and evaluation stay in
// sync at compile time. Core layer: pure logic, no I/O.

use crate::core::settings::FilterConfig;
use crate::util::constants::{CAPS_MIN_COUNT, MAX_PATTERN_LENGTH, PATTERN_SIZE_LIMIT};
use crate::util::error::SettingsError;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Every rule ChatSift knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleKind {
    /// Too many capital letters (and optionally digits).
    Caps,
    /// One character repeated too many times in a row.
    Repeat,
    /// Something that looks like a link to a spam domain.
    Links,
    /// A configured keyword as a whole word.
    Keyword,
    /// Too many emotes.
    #[serde(rename = "emote")]
    Emote,
}

impl RuleKind {
    /// Full catalog in display order.
    pub const ALL: [RuleKind; 5] = [
        RuleKind::Caps,
        RuleKind::Repeat,
        RuleKind::Links,
        RuleKind::Emote,
        RuleKind::Keyword,
    ];

    /// Order in which text rules are tried. The first match is reported.
    pub const TEXT_PRECEDENCE: [RuleKind; 4] = [
        RuleKind::Caps,
        RuleKind::Repeat,
        RuleKind::Links,
        RuleKind::Keyword,
    ];

    /// Stable identifier used by the settings store.
    pub fn id(self) -> &'static str {
        match self {
            RuleKind::Caps => "caps",
            RuleKind::Repeat => "repeat",
            RuleKind::Links => "links",
            RuleKind::Keyword => "keyword",
            RuleKind::Emote => "emote",
        }
    }

    /// Resolve a settings-store identifier. Unknown ids yield `None`.
    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.id() == id)
    }

    /// Human-readable label for display and suppression records.
    pub fn name(self) -> &'static str {
        match self {
            RuleKind::Caps => "Excessive Caps",
            RuleKind::Repeat => "Repeated Characters",
            RuleKind::Links => "Link Spam",
            RuleKind::Keyword => "Keyword",
            RuleKind::Emote => "Emote Count",
        }
    }

    /// Evaluate this rule's text predicate.
    ///
    /// Empty text never matches. The emote rule has no text predicate and
    /// always returns false here; see [`emote_matches`].
    pub fn test(self, text: &str, config: &FilterConfig) -> bool {
        if text.is_empty() {
            return false;
        }
        let settings = config.settings();
        match self {
            RuleKind::Caps => caps_matches(
                text,
                settings.caps_ratio,
                settings.caps_include_numbers,
            ),
            RuleKind::Repeat => repeat_matches(text, settings.repeat_count),
            RuleKind::Links => config.link_regex().is_some_and(|re| re.is_match(text)),
            RuleKind::Keyword => config.keyword_regex().is_some_and(|re| re.is_match(text)),
            RuleKind::Emote => false,
        }
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Predicates
// =============================================================================

/// Count of emphasis characters: ASCII uppercase, plus ASCII digits when
/// `include_numbers` is set.
pub fn emphasis_count(text: &str, include_numbers: bool) -> usize {
    text.chars()
        .filter(|c| c.is_ascii_uppercase() || (include_numbers && c.is_ascii_digit()))
        .count()
}

/// Caps rule: more than `CAPS_MIN_COUNT` emphasis characters AND an emphasis
/// share of the whole text above `ratio`.
pub fn caps_matches(text: &str, ratio: f64, include_numbers: bool) -> bool {
    let caps = emphasis_count(text, include_numbers);
    if caps <= CAPS_MIN_COUNT {
        return false;
    }
    let total = text.chars().count();
    (caps as f64 / total as f64) > ratio
}

/// Length of the longest run of one repeated character. Line breaks never
/// form a run.
pub fn longest_run(text: &str) -> usize {
    let mut longest = 0;
    let mut current = 0;
    let mut prev: Option<char> = None;
    for c in text.chars() {
        if c == '\n' || c == '\r' {
            current = 0;
            prev = None;
            continue;
        }
        if prev == Some(c) {
            current += 1;
        } else {
            current = 1;
            prev = Some(c);
        }
        longest = longest.max(current);
    }
    longest
}

/// Repeat rule: some run is strictly longer than `threshold`.
pub fn repeat_matches(text: &str, threshold: usize) -> bool {
    longest_run(text) > threshold
}

/// Emote rule: more emotes than `max`.
pub fn emote_matches(count: usize, max: usize) -> bool {
    count > max
}

// =============================================================================
// Pattern compilation
// =============================================================================

/// Compile the link rule from a `|`-separated suffix list.
///
/// Returns `Ok(None)` for an empty or whitespace-only list: the rule then
/// never matches.
pub fn compile_link_pattern(suffixes: &str) -> Result<Option<Regex>, SettingsError> {
    let suffixes = suffixes.trim();
    if suffixes.is_empty() {
        return Ok(None);
    }
    check_length("linkPattern", suffixes)?;
    let source = format!(r"\b(?:https?://)?\S+\.(?:{suffixes})(?:\b|/|\s|$)");
    build("linkPattern", suffixes, &source).map(Some)
}

/// Compile the keyword rule from a `|`-separated alternative list.
///
/// Returns `Ok(None)` for an empty or whitespace-only list: the rule then
/// never matches.
pub fn compile_keyword_pattern(keywords: &str) -> Result<Option<Regex>, SettingsError> {
    let keywords = keywords.trim();
    if keywords.is_empty() {
        return Ok(None);
    }
    check_length("keywordPattern", keywords)?;
    let source = format!(r"\b(?:{keywords})\b");
    build("keywordPattern", keywords, &source).map(Some)
}

fn check_length(key: &str, pattern: &str) -> Result<(), SettingsError> {
    let length = pattern.chars().count();
    if length > MAX_PATTERN_LENGTH {
        return Err(SettingsError::PatternTooLong {
            key: key.to_string(),
            length,
            max_length: MAX_PATTERN_LENGTH,
        });
    }
    Ok(())
}

/// The `regex` engine matches in linear time, so a hostile alternation can
/// cost memory at compile time but never unbounded matching time. The size
/// limit caps the former.
fn build(key: &str, pattern: &str, source: &str) -> Result<Regex, SettingsError> {
    RegexBuilder::new(source)
        .case_insensitive(true)
        .size_limit(PATTERN_SIZE_LIMIT)
        .build()
        .map_err(|e| SettingsError::InvalidPattern {
            key: key.to_string(),
            pattern: pattern.to_string(),
            source: e,
        })
}
