// ChatSift - tests/e2e_filtering.rs
//
// End-to-end tests for the filtering pipeline.
//
// These tests exercise real files on disk: the JSON-lines decoder, the chat
// log container, the controller state machine, the live chat tail and the
// settings store watcher. No mocks, no stubs.

use chatsift::app::controller::FilterController;
use chatsift::app::store::{SettingsFile, SettingsWatcher, StoredState};
use chatsift::app::tail::{decode_chat_lines, decode_numbered_lines, ChatTail, TailProgress};
use chatsift::core::chat_log::ChatLog;
use chatsift::core::model::{Classification, EntryId, Evidence};
use chatsift::core::rules::RuleKind;
use serde_json::json;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

// =============================================================================
// Helpers
// =============================================================================

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// Load the sample chat into a fresh log.
fn sample_log() -> ChatLog {
    let text = fs::read_to_string(fixture("chat_sample.jsonl")).expect("fixture readable");
    let (entries, errors) = decode_chat_lines(&text, 1);
    assert_eq!(entries.len(), 7, "sample should decode 7 records");
    assert_eq!(errors.len(), 1, "sample has exactly one malformed line");
    let mut log = ChatLog::new(100);
    log.append(entries);
    log
}

fn hidden_authors(log: &ChatLog) -> Vec<String> {
    log.entries()
        .filter(|e| e.view.hidden)
        .map(|e| e.author_or_unknown().to_string())
        .collect()
}

fn stored(value: serde_json::Value) -> StoredState {
    value.as_object().cloned().expect("object literal")
}

// =============================================================================
// Batch filtering
// =============================================================================

#[test]
fn e2e_default_rules_hide_caps_repeat_and_links() {
    let mut log = sample_log();
    let (mut controller, errors) = FilterController::from_stored(&StoredState::new());
    assert!(errors.is_empty());

    controller.start_or_stop(Some(&mut log));

    assert_eq!(hidden_authors(&log), vec!["bob", "carol", "dave"]);
    // Everything else was looked at and carries the reviewed accent.
    assert!(log
        .entries()
        .filter(|e| !e.view.hidden)
        .all(|e| e.view.reviewed && !e.view.filtered));
}

#[test]
fn e2e_emote_rule_short_circuits_text_rules() {
    let mut log = sample_log();
    let (mut controller, errors) = FilterController::from_stored(&stored(json!({
        "activeRules": { "emote": true },
        "settings": { "maxEmotes": 5 }
    })));
    assert!(errors.is_empty());
    controller.start_or_stop(Some(&mut log));
    assert_eq!(hidden_authors(&log), vec!["bob", "carol", "dave", "erin"]);

    log.append(vec![serde_json::from_value(json!({
        "author": "gina",
        "fragments": [
            { "type": "text", "text": "WOW LOOK AT THIS" },
            { "type": "emote", "name": "a" }, { "type": "emote", "name": "b" },
            { "type": "emote", "name": "c" }, { "type": "emote", "name": "d" },
            { "type": "emote", "name": "e" }, { "type": "emote", "name": "f" }
        ]
    }))
    .expect("valid record")]);
    let processed = controller.pump(Some(&mut log));
    assert_eq!(processed.len(), 1);
    assert_eq!(
        processed[0].1,
        Classification::Suppressed {
            rule: RuleKind::Emote,
            evidence: Evidence::EmoteCount(6),
        }
    );
}

#[test]
fn e2e_caps_takes_precedence_over_links() {
    let mut log = ChatLog::new(10);
    let (mut controller, _) = FilterController::from_stored(&StoredState::new());
    controller.start_or_stop(Some(&mut log));

    let (entries, _) = decode_chat_lines(
        r#"{"author":"spam","fragments":[{"type":"text","text":"VISIT NOW AT SPAM.XYZ"}]}"#,
        1,
    );
    log.append(entries);
    let processed = controller.pump(Some(&mut log));
    assert_eq!(processed[0].1.matched_rule(), Some(RuleKind::Caps));
}

#[test]
fn e2e_disable_then_enable_restores_hidden_set() {
    let mut log = sample_log();
    let (mut controller, _) = FilterController::from_stored(&StoredState::new());
    controller.start_or_stop(Some(&mut log));
    let before = hidden_authors(&log);

    controller.set_enabled(false, Some(&mut log));
    assert!(hidden_authors(&log).is_empty());
    assert!(log.entries().all(|e| !e.view.is_marked()));

    controller.set_enabled(true, Some(&mut log));
    assert_eq!(hidden_authors(&log), before);
}

#[test]
fn e2e_decoded_entries_keep_file_line_numbers() {
    let text = fs::read_to_string(fixture("chat_sample.jsonl")).expect("fixture readable");
    let (numbered, errors) = decode_numbered_lines(&text, 1);
    let lines: Vec<u64> = numbered.iter().map(|(n, _)| *n).collect();
    // Line 6 is blank and line 7 is not a record.
    assert_eq!(lines, vec![1, 2, 3, 4, 5, 8, 9]);
    assert_eq!(errors.len(), 1);
    let (line, gg) = &numbered[5];
    assert_eq!(*line, 8);
    assert!(gg.author.is_none());
}

// =============================================================================
// Live tail + settings store
// =============================================================================

#[test]
fn e2e_live_tail_feeds_controller_in_arrival_order() {
    let dir = TempDir::new().unwrap();
    let chat_path = dir.path().join("chat.jsonl");
    fs::write(&chat_path, "").unwrap();

    let mut log = ChatLog::new(50);
    let (mut controller, _) = FilterController::from_stored(&StoredState::new());
    controller.start_or_stop(Some(&mut log));

    let mut tail = ChatTail::new();
    tail.start_tail(chat_path.clone(), false, 50);
    std::thread::sleep(Duration::from_millis(100));

    let mut f = fs::OpenOptions::new().append(true).open(&chat_path).unwrap();
    writeln!(
        f,
        r#"{{"author":"a","fragments":[{{"type":"text","text":"hello"}}]}}"#
    )
    .unwrap();
    writeln!(
        f,
        r#"{{"author":"b","fragments":[{{"type":"text","text":"STOP SHOUTING PLS"}}]}}"#
    )
    .unwrap();
    writeln!(
        f,
        r#"{{"author":"c","fragments":[{{"type":"text","text":"bye"}}]}}"#
    )
    .unwrap();
    f.flush().unwrap();

    let mut processed = Vec::new();
    for _ in 0..100 {
        for msg in tail.poll_progress(100) {
            if let TailProgress::NewEntries { entries } = msg {
                log.append(entries);
                processed.extend(controller.pump(Some(&mut log)));
            }
        }
        if processed.len() >= 3 {
            break;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    tail.stop_tail();

    let ids: Vec<EntryId> = processed.iter().map(|(id, _)| *id).collect();
    assert_eq!(ids, vec![EntryId(1), EntryId(2), EntryId(3)]);
    assert_eq!(hidden_authors(&log), vec!["b"]);
}

#[test]
fn e2e_settings_file_change_reconfigures_live_log() {
    let dir = TempDir::new().unwrap();
    let store = SettingsFile::new(dir.path().join("settings.json"));
    store.set(stored(json!({ "filteringEnabled": true }))).unwrap();
    let baseline = store.get().unwrap();

    let mut log = sample_log();
    let (mut controller, _) = FilterController::from_stored(&baseline);
    controller.start_or_stop(Some(&mut log));
    assert_eq!(hidden_authors(&log).len(), 3);

    let mut watcher = SettingsWatcher::new();
    watcher.start_watch(store.clone(), baseline, 100);
    std::thread::sleep(Duration::from_millis(150));
    store.set(stored(json!({ "filteringEnabled": false }))).unwrap();

    let mut applied = false;
    for _ in 0..100 {
        for changes in watcher.poll_changes() {
            controller.on_storage_changed(&changes, Some(&mut log));
            applied = true;
        }
        if applied {
            break;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    watcher.stop_watch();

    assert!(applied, "settings change was never delivered");
    assert!(!controller.is_enabled());
    assert!(hidden_authors(&log).is_empty());
}
