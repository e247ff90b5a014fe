// ChatSift - app/controller.rs
//
// Process-wide filter controller: owns the configuration snapshot, the
// enabled flag and the stream watcher, and drives the Disabled/Enabled state
// machine.
//
//   Disabled -> Enabled : re-evaluate every existing entry, then start the
//                         watcher.
//   Enabled  -> Disabled: stop the watcher, then reveal every entry.
//   config change       : always updates the held snapshot; re-evaluates
//                         existing entries only while Enabled.
//
// All methods run to completion on the caller's thread. The snapshot is an
// `Arc<FilterConfig>` replaced as a whole, never edited in place, so a
// classification always sees one consistent configuration.

use crate::app::entry_state::{self, ApplySummary};
use crate::app::store::{StorageChanges, StoredState};
use crate::app::watcher::StreamWatcher;
use crate::core::chat_log::ChatLog;
use crate::core::classifier::classify;
use crate::core::model::{Classification, EntryId};
use crate::core::settings::{
    self, ActiveRules, FilterConfig, Settings, KEY_ACTIVE_RULES, KEY_FILTERING_ENABLED,
    KEY_SETTINGS,
};
use crate::util::constants::DEFAULT_FILTERING_ENABLED;
use crate::util::error::{SettingsError, SourceError};
use serde_json::Value;
use std::sync::Arc;

/// Owner of all mutable filter state.
#[derive(Debug)]
pub struct FilterController {
    enabled: bool,
    config: Arc<FilterConfig>,
    watcher: StreamWatcher,
}

impl FilterController {
    /// Controller with built-in defaults. Nothing is attached until
    /// [`start_or_stop`](Self::start_or_stop) runs.
    pub fn new() -> Self {
        Self {
            enabled: DEFAULT_FILTERING_ENABLED,
            config: Arc::new(FilterConfig::default()),
            watcher: StreamWatcher::new(),
        }
    }

    /// Build a controller from the settings store's startup snapshot.
    ///
    /// Missing keys keep their defaults; malformed values are returned as
    /// errors and replaced by defaults.
    pub fn from_stored(stored: &StoredState) -> (Self, Vec<SettingsError>) {
        let mut controller = Self::new();
        let mut errors = Vec::new();

        if let Some(v) = stored.get(KEY_FILTERING_ENABLED) {
            match settings::parse_enabled(v) {
                Ok(enabled) => controller.enabled = enabled,
                Err(e) => errors.push(e),
            }
        }
        let (config, config_errors) = controller.merged_config(
            stored.get(KEY_ACTIVE_RULES),
            stored.get(KEY_SETTINGS),
        );
        errors.extend(config_errors);
        controller.config = Arc::new(config);

        (controller, errors)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_watching(&self) -> bool {
        self.watcher.is_active()
    }

    /// Current configuration snapshot.
    pub fn config(&self) -> Arc<FilterConfig> {
        Arc::clone(&self.config)
    }

    /// Bring the log in line with the enabled flag: apply-then-watch when
    /// enabled, stop-then-reveal when disabled.
    pub fn start_or_stop(&mut self, mut log: Option<&mut ChatLog>) {
        if self.enabled {
            if let Err(e) = self.reevaluate(log.as_deref_mut()) {
                tracing::debug!(error = %e, "Filter start deferred");
            }
            self.watcher.start(log);
        } else {
            self.watcher.stop();
            if let Err(e) = self.reveal(log) {
                tracing::debug!(error = %e, "Reveal skipped");
            }
        }
    }

    /// Switch filtering on or off and run the matching transition.
    pub fn set_enabled(&mut self, enabled: bool, log: Option<&mut ChatLog>) {
        if enabled != self.enabled {
            tracing::info!(enabled, "Filtering toggled");
        }
        self.enabled = enabled;
        self.start_or_stop(log);
    }

    /// Handle a change notification from the settings store.
    ///
    /// Rule flags and settings are merged into the held snapshot first; then
    /// either the enabled transition runs (if the switch changed) or, while
    /// enabled, a single re-evaluation pass. A removed key resets its section
    /// to the built-in defaults.
    pub fn on_storage_changed(
        &mut self,
        changes: &StorageChanges,
        log: Option<&mut ChatLog>,
    ) -> Vec<SettingsError> {
        let mut errors = Vec::new();

        let rules_change = changes.get(KEY_ACTIVE_RULES);
        let settings_change = changes.get(KEY_SETTINGS);
        let config_changed = rules_change.is_some() || settings_change.is_some();
        if config_changed {
            let rules_removed = rules_change.is_some_and(|c| c.new_value.is_none());
            let settings_removed = settings_change.is_some_and(|c| c.new_value.is_none());
            if rules_removed || settings_removed {
                self.reset_sections(rules_removed, settings_removed);
            }
            let (config, config_errors) = self.merged_config(
                rules_change.and_then(|c| c.new_value.as_ref()),
                settings_change.and_then(|c| c.new_value.as_ref()),
            );
            errors.extend(config_errors);
            self.config = Arc::new(config);
            tracing::info!("Filter configuration updated");
        }

        if let Some(change) = changes.get(KEY_FILTERING_ENABLED) {
            let enabled = match &change.new_value {
                None => DEFAULT_FILTERING_ENABLED,
                Some(v) => settings::parse_enabled(v).unwrap_or_else(|e| {
                    errors.push(e);
                    self.enabled
                }),
            };
            // The transition re-evaluates with the snapshot merged above.
            self.set_enabled(enabled, log);
        } else if config_changed {
            self.after_config_change(log);
        }

        Self::report(errors)
    }

    /// Classify every entry appended since the last call, in arrival order.
    ///
    /// Entries evicted before they could be processed are skipped.
    pub fn pump(&mut self, log: Option<&mut ChatLog>) -> Vec<(EntryId, Classification)> {
        let Some(log) = log else {
            return Vec::new();
        };
        let config = Arc::clone(&self.config);
        let mut processed = Vec::new();
        for id in self.watcher.appended() {
            let Some(entry) = log.get_mut(id) else {
                tracing::trace!(entry = %id, "Entry evicted before classification");
                continue;
            };
            let result = classify(&entry.content, &config);
            entry_state::apply(entry, &result);
            processed.push((id, result));
        }
        processed
    }

    /// Re-classify every entry currently in the log.
    pub fn reevaluate(&self, log: Option<&mut ChatLog>) -> Result<ApplySummary, SourceError> {
        let log = log.ok_or(SourceError::Unavailable {
            operation: "apply_all",
        })?;
        Ok(entry_state::apply_all(log.entries_mut(), &self.config))
    }

    /// Clear all filtering from the log.
    pub fn reveal(&self, log: Option<&mut ChatLog>) -> Result<usize, SourceError> {
        let log = log.ok_or(SourceError::Unavailable {
            operation: "reveal_all",
        })?;
        Ok(entry_state::reveal_all(log.entries_mut()))
    }

    fn after_config_change(&mut self, log: Option<&mut ChatLog>) {
        if !self.enabled {
            tracing::debug!("Filtering disabled; configuration held for next enable");
            return;
        }
        if let Err(e) = self.reevaluate(log) {
            tracing::debug!(error = %e, "Re-evaluation skipped");
        }
    }

    /// Reset the named sections of the held snapshot to built-in defaults.
    fn reset_sections(&mut self, rules: bool, settings: bool) {
        let active = if rules {
            ActiveRules::default()
        } else {
            *self.config.active()
        };
        let current = if settings {
            Settings::default()
        } else {
            self.config.settings().clone()
        };
        self.config = Arc::new(FilterConfig::compile(active, current));
    }

    /// Merge partial rule flags and settings onto copies of the current
    /// snapshot and compile the result.
    fn merged_config(
        &self,
        rules: Option<&Value>,
        settings: Option<&Value>,
    ) -> (FilterConfig, Vec<SettingsError>) {
        let mut errors = Vec::new();
        let mut active = *self.config.active();
        let mut current = self.config.settings().clone();
        if let Some(v) = rules {
            errors.extend(active.merge(v));
        }
        if let Some(v) = settings {
            errors.extend(current.merge(v));
        }
        (FilterConfig::compile(active, current), errors)
    }

    fn report(errors: Vec<SettingsError>) -> Vec<SettingsError> {
        for e in &errors {
            tracing::warn!(error = %e, "Ignoring malformed setting");
        }
        errors
    }
}

impl Default for FilterController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::store::StorageChange;
    use crate::core::model::EntryContent;
    use crate::core::rules::RuleKind;
    use serde_json::json;

    fn msg(text: &str) -> EntryContent {
        EntryContent::text("viewer", text)
    }

    fn hidden_ids(log: &ChatLog) -> Vec<EntryId> {
        log.entries().filter(|e| e.view.hidden).map(|e| e.id).collect()
    }

    fn change(key: &str, value: Value) -> StorageChanges {
        let mut changes = StorageChanges::new();
        changes.insert(key.to_string(), StorageChange::set(value));
        changes
    }

    #[test]
    fn test_enable_hides_existing_spam_and_starts_watching() {
        let mut log = ChatLog::new(10);
        log.append(vec![
            msg("hello friends"),
            msg("BUY NOW EVERYONE"),
            msg("soooooo good"),
        ]);

        let mut controller = FilterController::new();
        controller.start_or_stop(Some(&mut log));

        assert!(controller.is_watching());
        assert_eq!(hidden_ids(&log), vec![EntryId(2), EntryId(3)]);
        let first = log.get(EntryId(1)).unwrap();
        assert!(first.view.reviewed);
    }

    #[test]
    fn test_disable_reveals_everything_and_stops_watching() {
        let mut log = ChatLog::new(10);
        log.append(vec![msg("hello"), msg("LOUD NOISES HERE")]);
        let mut controller = FilterController::new();
        controller.start_or_stop(Some(&mut log));
        assert_eq!(hidden_ids(&log).len(), 1);

        controller.set_enabled(false, Some(&mut log));
        assert!(!controller.is_watching());
        assert!(log.entries().all(|e| !e.view.is_marked()));

        // Nothing appended while disabled is classified.
        log.append(vec![msg("MORE LOUD NOISES")]);
        assert!(controller.pump(Some(&mut log)).is_empty());
        assert!(hidden_ids(&log).is_empty());
    }

    #[test]
    fn test_toggle_round_trip_restores_same_hidden_set() {
        let mut log = ChatLog::new(10);
        log.append(vec![
            msg("ok"),
            msg("WHAT IS THIS"),
            msg("visit spam.xyz"),
            msg("fine"),
        ]);
        let mut controller = FilterController::new();
        controller.start_or_stop(Some(&mut log));
        let before = hidden_ids(&log);

        controller.set_enabled(false, Some(&mut log));
        controller.set_enabled(true, Some(&mut log));
        assert_eq!(hidden_ids(&log), before);
    }

    #[test]
    fn test_pump_processes_appended_entries_in_order() {
        let mut log = ChatLog::new(10);
        let mut controller = FilterController::new();
        controller.start_or_stop(Some(&mut log));

        log.append(vec![msg("first"), msg("SECOND IS LOUD")]);
        log.append(vec![msg("third")]);
        let processed = controller.pump(Some(&mut log));

        let ids: Vec<_> = processed.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![EntryId(1), EntryId(2), EntryId(3)]);
        assert_eq!(processed[1].1.matched_rule(), Some(RuleKind::Caps));
        assert!(log.get(EntryId(2)).unwrap().view.hidden);
    }

    #[test]
    fn test_pump_skips_entries_evicted_before_processing() {
        let mut log = ChatLog::new(2);
        let mut controller = FilterController::new();
        controller.start_or_stop(Some(&mut log));

        log.append(vec![msg("a"), msg("b"), msg("c")]);
        let ids: Vec<_> = controller
            .pump(Some(&mut log))
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        assert_eq!(ids, vec![EntryId(2), EntryId(3)]);
    }

    #[test]
    fn test_absent_log_is_a_no_op() {
        let mut controller = FilterController::new();
        controller.start_or_stop(None);
        assert!(!controller.is_watching());
        assert!(matches!(controller.reevaluate(None), Err(SourceError::Unavailable { .. })));
        assert!(controller.pump(None).is_empty());
        controller.set_enabled(false, None);
        assert!(!controller.is_enabled());
    }

    #[test]
    fn test_config_change_while_disabled_is_held_until_enable() {
        let mut log = ChatLog::new(10);
        log.append(vec![msg("buy gold at shop")]);
        let mut controller = FilterController::new();
        controller.set_enabled(false, Some(&mut log));

        let errors = controller.on_storage_changed(
            &change(KEY_ACTIVE_RULES, json!({ "keyword": true })),
            Some(&mut log),
        );
        assert!(errors.is_empty());
        let errors = controller.on_storage_changed(
            &change(KEY_SETTINGS, json!({ "keywordPattern": "gold" })),
            Some(&mut log),
        );
        assert!(errors.is_empty());
        assert!(hidden_ids(&log).is_empty());
        assert!(controller.config().is_active(RuleKind::Keyword));

        controller.set_enabled(true, Some(&mut log));
        assert_eq!(hidden_ids(&log), vec![EntryId(1)]);
    }

    #[test]
    fn test_partial_settings_delta_keeps_other_fields() {
        let mut controller = FilterController::new();
        let errors =
            controller.on_storage_changed(&change(KEY_SETTINGS, json!({ "repeatCount": 9 })), None);
        assert!(errors.is_empty());
        let config = controller.config();
        assert_eq!(config.settings().repeat_count, 9);
        assert_eq!(config.settings().caps_ratio, Settings::default().caps_ratio);
        assert_eq!(*config.active(), ActiveRules::default());
    }

    #[test]
    fn test_invalid_value_keeps_last_known_good() {
        let mut controller = FilterController::new();
        controller.on_storage_changed(&change(KEY_SETTINGS, json!({ "capsRatio": 0.8 })), None);
        let errors = controller.on_storage_changed(
            &change(KEY_SETTINGS, json!({ "capsRatio": "loud", "maxEmotes": 3 })),
            None,
        );
        assert_eq!(errors.len(), 1);
        let config = controller.config();
        assert_eq!(config.settings().caps_ratio, 0.8);
        assert_eq!(config.settings().max_emotes, 3);
    }

    #[test]
    fn test_config_change_while_enabled_reevaluates() {
        let mut log = ChatLog::new(10);
        log.append(vec![msg("SHOUTING ALL DAY")]);
        let mut controller = FilterController::new();
        controller.start_or_stop(Some(&mut log));
        assert_eq!(hidden_ids(&log).len(), 1);

        controller.on_storage_changed(
            &change(KEY_ACTIVE_RULES, json!({ "caps": false })),
            Some(&mut log),
        );
        assert!(hidden_ids(&log).is_empty());
        assert!(log.get(EntryId(1)).unwrap().view.reviewed);
    }

    #[test]
    fn test_removed_key_resets_section_to_defaults() {
        let mut controller = FilterController::new();
        controller.on_storage_changed(&change(KEY_ACTIVE_RULES, json!({ "caps": false })), None);
        assert!(!controller.config().is_active(RuleKind::Caps));

        let mut changes = StorageChanges::new();
        changes.insert(
            KEY_ACTIVE_RULES.to_string(),
            StorageChange {
                new_value: None,
                old_value: Some(json!({ "caps": false })),
            },
        );
        controller.on_storage_changed(&changes, None);
        assert!(controller.config().is_active(RuleKind::Caps));
    }

    #[test]
    fn test_combined_change_applies_config_before_enabling() {
        let mut log = ChatLog::new(10);
        log.append(vec![msg("nice emote party")]);
        let mut controller = FilterController::new();
        controller.set_enabled(false, Some(&mut log));

        let mut changes = change(KEY_FILTERING_ENABLED, json!(true));
        changes.insert(
            KEY_ACTIVE_RULES.to_string(),
            StorageChange::set(json!({ "keyword": true })),
        );
        changes.insert(
            KEY_SETTINGS.to_string(),
            StorageChange::set(json!({ "keywordPattern": "party" })),
        );
        controller.on_storage_changed(&changes, Some(&mut log));

        assert!(controller.is_enabled());
        assert!(controller.is_watching());
        assert_eq!(hidden_ids(&log), vec![EntryId(1)]);
    }

    #[test]
    fn test_from_stored_reads_switch_and_reports_bad_values() {
        let mut stored = StoredState::new();
        stored.insert(KEY_FILTERING_ENABLED.to_string(), json!(false));
        stored.insert(KEY_ACTIVE_RULES.to_string(), json!({ "emote": true, "caps": "yes" }));
        stored.insert(KEY_SETTINGS.to_string(), json!({ "maxEmotes": 2 }));

        let (controller, errors) = FilterController::from_stored(&stored);
        assert!(!controller.is_enabled());
        assert_eq!(errors.len(), 1);
        let config = controller.config();
        assert!(config.is_active(RuleKind::Emote));
        assert!(config.is_active(RuleKind::Caps));
        assert_eq!(config.settings().max_emotes, 2);
    }
}
