// ChatSift - core/model.rs
//
// Core data model types. Pure data definitions with no I/O.
//
// These types are the shared vocabulary across all layers.

use crate::core::rules::RuleKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Entry identity
// =============================================================================

/// Monotonically increasing identifier of an entry within one chat log.
///
/// Ids are never reused, so an id that no longer resolves means the entry
/// was evicted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct EntryId(pub u64);

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// =============================================================================
// Entry content (what the stream delivers)
// =============================================================================

/// One sub-element of a chat message.
///
/// Unknown fragment kinds in the wire format are rejected by serde at the
/// line level; the line is then skipped as malformed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Fragment {
    /// Plain message text.
    Text { text: String },

    /// A hyperlink. `href` is the destination; `text` is what the viewer sees.
    Link {
        #[serde(default)]
        text: String,
        href: String,
    },

    /// An inline pictogram. Counted by the emote rule, never part of the text.
    Emote {
        #[serde(default)]
        name: String,
    },
}

/// The raw, externally-owned content of one chat message.
///
/// Every field is optional on the wire: a record with no author and no
/// fragments is a valid (empty) message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntryContent {
    /// Author login, if the message carries one.
    pub author: Option<String>,

    /// Message body in document order.
    pub fragments: Vec<Fragment>,
}

impl EntryContent {
    /// Convenience constructor for a plain-text message.
    pub fn text(author: &str, text: &str) -> Self {
        Self {
            author: Some(author.to_string()),
            fragments: vec![Fragment::Text {
                text: text.to_string(),
            }],
        }
    }

    /// Number of emote fragments.
    pub fn emote_count(&self) -> usize {
        self.fragments
            .iter()
            .filter(|f| matches!(f, Fragment::Emote { .. }))
            .count()
    }
}

// =============================================================================
// Visibility state (what the core annotates)
// =============================================================================

/// Display state of an entry as annotated by the filter.
///
/// The default value is the untouched state: no marker, shown, no accent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EntryView {
    /// Removable "filtered" marker identifying entries hidden by ChatSift.
    pub filtered: bool,

    /// Excluded from layout.
    pub hidden: bool,

    /// "Reviewed" accent shown on entries that were evaluated and passed.
    pub reviewed: bool,
}

impl EntryView {
    /// True when the filter has left any trace on this entry.
    pub fn is_marked(&self) -> bool {
        self.filtered || self.hidden || self.reviewed
    }
}

/// One chat log entry: externally-owned content plus the filter's annotation.
#[derive(Debug, Clone)]
pub struct ChatEntry {
    pub id: EntryId,

    /// Time the entry was appended to the chat log.
    pub received_at: DateTime<Utc>,

    pub content: EntryContent,

    pub view: EntryView,
}

impl ChatEntry {
    /// Author identifier or the `unknown` sentinel.
    pub fn author_or_unknown(&self) -> &str {
        self.content
            .author
            .as_deref()
            .filter(|a| !a.trim().is_empty())
            .unwrap_or(crate::util::constants::UNKNOWN_AUTHOR)
    }
}

// =============================================================================
// Classification
// =============================================================================

/// Why an entry was suppressed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Evidence {
    /// The emote rule fired with this many emotes.
    EmoteCount(usize),

    /// A text rule fired against this extracted text.
    Text(String),
}

/// Outcome of classifying one entry.
///
/// Either nothing matched, or exactly one rule (the first in precedence
/// order) matched. Never both, never several.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Classification {
    Passed,
    Suppressed { rule: RuleKind, evidence: Evidence },
}

impl Classification {
    pub fn is_suppressed(&self) -> bool {
        matches!(self, Self::Suppressed { .. })
    }

    /// The rule that matched, if any.
    pub fn matched_rule(&self) -> Option<RuleKind> {
        match self {
            Self::Passed => None,
            Self::Suppressed { rule, .. } => Some(*rule),
        }
    }
}
