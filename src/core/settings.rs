// ChatSift - core/settings.rs
//
// Filter configuration: which rules are enabled and the parameters that tune
// them. Values arrive from the settings store as loosely-typed JSON and are
// merged field-by-field into the last-known-good state. A malformed value is
// reported and ignored; it never replaces a good value and never aborts the
// rest of the merge.
//
// `FilterConfig` is the immutable, pre-compiled snapshot that the classifier
// reads. Writers build a new snapshot and swap it in whole.

use crate::core::rules::{self, RuleKind};
use crate::util::constants;
use crate::util::error::SettingsError;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;

/// Settings-store key holding the global on/off switch.
pub const KEY_FILTERING_ENABLED: &str = "filteringEnabled";

/// Settings-store key holding the per-rule enable flags.
pub const KEY_ACTIVE_RULES: &str = "activeRules";

/// Settings-store key holding the rule parameters.
pub const KEY_SETTINGS: &str = "settings";

// =============================================================================
// ActiveRules
// =============================================================================

/// Per-rule enable flags. Field names match the rule ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ActiveRules {
    pub caps: bool,
    pub repeat: bool,
    pub links: bool,
    pub emote: bool,
    pub keyword: bool,
}

impl Default for ActiveRules {
    fn default() -> Self {
        Self {
            caps: true,
            repeat: true,
            links: true,
            emote: false,
            keyword: false,
        }
    }
}

impl ActiveRules {
    /// Every flag off.
    pub fn none() -> Self {
        Self {
            caps: false,
            repeat: false,
            links: false,
            emote: false,
            keyword: false,
        }
    }

    pub fn is_enabled(&self, rule: RuleKind) -> bool {
        match rule {
            RuleKind::Caps => self.caps,
            RuleKind::Repeat => self.repeat,
            RuleKind::Links => self.links,
            RuleKind::Emote => self.emote,
            RuleKind::Keyword => self.keyword,
        }
    }

    pub fn set(&mut self, rule: RuleKind, enabled: bool) {
        let flag = match rule {
            RuleKind::Caps => &mut self.caps,
            RuleKind::Repeat => &mut self.repeat,
            RuleKind::Links => &mut self.links,
            RuleKind::Emote => &mut self.emote,
            RuleKind::Keyword => &mut self.keyword,
        };
        *flag = enabled;
    }

    /// Builder-style variant of [`set`](Self::set).
    pub fn with(mut self, rule: RuleKind, enabled: bool) -> Self {
        self.set(rule, enabled);
        self
    }

    /// Merge a partial `{id: bool}` object. Unknown ids are ignored; ids not
    /// present keep their current value.
    pub fn merge(&mut self, value: &Value) -> Vec<SettingsError> {
        let Some(map) = value.as_object() else {
            return vec![SettingsError::NotAnObject {
                key: KEY_ACTIVE_RULES.to_string(),
            }];
        };
        let mut errors = Vec::new();
        for (id, flag) in map {
            let Some(rule) = RuleKind::from_id(id) else {
                tracing::debug!(rule = %id, "Ignoring unknown rule id");
                continue;
            };
            match flag.as_bool() {
                Some(enabled) => self.set(rule, enabled),
                None => errors.push(SettingsError::NotABoolean {
                    key: format!("{KEY_ACTIVE_RULES}.{id}"),
                    value: flag.to_string(),
                }),
            }
        }
        errors
    }
}

// =============================================================================
// Settings
// =============================================================================

/// Rule parameters. Serialised names match the settings-store keys.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Emphasis share above which the caps rule fires (0.0 - 1.0).
    pub caps_ratio: f64,
    /// Count digits as emphasis characters.
    pub caps_include_numbers: bool,
    /// Runs strictly longer than this fire the repeat rule.
    pub repeat_count: usize,
    /// `|`-separated domain suffixes for the link rule.
    pub link_pattern: String,
    /// Emote count above which the emote rule fires.
    pub max_emotes: usize,
    /// `|`-separated whole-word alternatives for the keyword rule.
    pub keyword_pattern: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            caps_ratio: constants::DEFAULT_CAPS_RATIO,
            caps_include_numbers: constants::DEFAULT_CAPS_INCLUDE_NUMBERS,
            repeat_count: constants::DEFAULT_REPEAT_COUNT,
            link_pattern: constants::DEFAULT_LINK_PATTERN.to_string(),
            max_emotes: constants::DEFAULT_MAX_EMOTES,
            keyword_pattern: constants::DEFAULT_KEYWORD_PATTERN.to_string(),
        }
    }
}

impl Settings {
    /// Merge a partial settings object, validating each field.
    ///
    /// Valid fields are applied; invalid ones keep their current value and
    /// are returned as errors. Unknown fields are ignored.
    pub fn merge(&mut self, value: &Value) -> Vec<SettingsError> {
        let Some(map) = value.as_object() else {
            return vec![SettingsError::NotAnObject {
                key: KEY_SETTINGS.to_string(),
            }];
        };
        let mut errors = Vec::new();
        for (key, v) in map {
            let result = match key.as_str() {
                "capsRatio" => parse_ratio(key, v).map(|r| self.caps_ratio = r),
                "capsIncludeNumbers" => parse_bool(key, v).map(|b| self.caps_include_numbers = b),
                "repeatCount" => parse_count(
                    key,
                    v,
                    constants::MIN_REPEAT_COUNT,
                    constants::MAX_REPEAT_COUNT,
                )
                .map(|n| self.repeat_count = n),
                "maxEmotes" => parse_count(key, v, 0, constants::MAX_MAX_EMOTES)
                    .map(|n| self.max_emotes = n),
                "linkPattern" => parse_string(key, v).and_then(|p| {
                    rules::compile_link_pattern(&p)?;
                    self.link_pattern = p;
                    Ok(())
                }),
                "keywordPattern" => parse_string(key, v).and_then(|p| {
                    rules::compile_keyword_pattern(&p)?;
                    self.keyword_pattern = p;
                    Ok(())
                }),
                other => {
                    tracing::debug!(key = other, "Ignoring unknown setting");
                    Ok(())
                }
            };
            if let Err(e) = result {
                errors.push(e);
            }
        }
        errors
    }
}

/// Parse the global on/off switch.
pub fn parse_enabled(value: &Value) -> Result<bool, SettingsError> {
    parse_bool(KEY_FILTERING_ENABLED, value)
}

fn parse_bool(key: &str, v: &Value) -> Result<bool, SettingsError> {
    v.as_bool().ok_or_else(|| SettingsError::NotABoolean {
        key: key.to_string(),
        value: v.to_string(),
    })
}

fn parse_string(key: &str, v: &Value) -> Result<String, SettingsError> {
    v.as_str()
        .map(str::to_string)
        .ok_or_else(|| SettingsError::NotAString {
            key: key.to_string(),
            value: v.to_string(),
        })
}

/// Numbers may arrive as JSON numbers or as numeric strings (form inputs).
fn parse_number(key: &str, v: &Value) -> Result<f64, SettingsError> {
    let n = match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    n.filter(|n| n.is_finite())
        .ok_or_else(|| SettingsError::NotANumber {
            key: key.to_string(),
            value: v.to_string(),
        })
}

fn parse_ratio(key: &str, v: &Value) -> Result<f64, SettingsError> {
    let ratio = parse_number(key, v)?;
    if !(0.0..=1.0).contains(&ratio) {
        return Err(SettingsError::OutOfRange {
            key: key.to_string(),
            value: ratio.to_string(),
            expected: "0.0-1.0".to_string(),
        });
    }
    Ok(ratio)
}

fn parse_count(key: &str, v: &Value, min: usize, max: usize) -> Result<usize, SettingsError> {
    let n = parse_number(key, v)?;
    if n.fract() != 0.0 || n < min as f64 || n > max as f64 {
        return Err(SettingsError::OutOfRange {
            key: key.to_string(),
            value: n.to_string(),
            expected: format!("whole number {min}-{max}"),
        });
    }
    Ok(n as usize)
}

// =============================================================================
// FilterConfig (compiled snapshot)
// =============================================================================

/// Immutable snapshot of everything the classifier reads.
///
/// Patterns are compiled once per snapshot. A pattern that fails to compile
/// leaves its rule without a regex, so the rule never matches.
#[derive(Debug, Clone)]
pub struct FilterConfig {
    active: ActiveRules,
    settings: Settings,
    link_regex: Option<Regex>,
    keyword_regex: Option<Regex>,
}

impl FilterConfig {
    pub fn compile(active: ActiveRules, settings: Settings) -> Self {
        let link_regex = rules::compile_link_pattern(&settings.link_pattern).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Link rule disabled: pattern does not compile");
            None
        });
        let keyword_regex =
            rules::compile_keyword_pattern(&settings.keyword_pattern).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Keyword rule disabled: pattern does not compile");
                None
            });
        Self {
            active,
            settings,
            link_regex,
            keyword_regex,
        }
    }

    pub fn active(&self) -> &ActiveRules {
        &self.active
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn is_active(&self, rule: RuleKind) -> bool {
        self.active.is_enabled(rule)
    }

    pub fn link_regex(&self) -> Option<&Regex> {
        self.link_regex.as_ref()
    }

    pub fn keyword_regex(&self) -> Option<&Regex> {
        self.keyword_regex.as_ref()
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self::compile(ActiveRules::default(), Settings::default())
    }
}
