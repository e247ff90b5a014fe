// ChatSift - app/store.rs
//
// Settings store: a small JSON document holding `filteringEnabled`,
// `activeRules` and `settings`, read once at startup and then watched for
// changes. Changes are reported as key-level deltas `{key: {newValue,
// oldValue}}` which the controller merges field-by-field.
//
// Architecture:
//   - `SettingsFile` does the one-shot `get` / `set` on disk. Writes are
//     atomic (write temp -> rename) so a watcher never reads half a file.
//   - `SettingsWatcher` lives on the main thread; `run_settings_watcher`
//     runs on a background thread re-reading the file and diffing it
//     against the last snapshot.
//   - An `Arc<AtomicBool>` cancel flag stops the poller.
//   - Deltas are sent as `StorageChanges` over an mpsc channel and drained
//     by the main loop, one change set at a time.
//
// An unreadable or unparseable file is a non-fatal warning: the last good
// state is kept and no delta is emitted.

use crate::core::settings::{KEY_ACTIVE_RULES, KEY_FILTERING_ENABLED, KEY_SETTINGS};
use crate::util::constants::{MAX_SETTINGS_FILE_SIZE, SETTINGS_CANCEL_CHECK_INTERVAL_MS};
use crate::util::error::SettingsError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::time::Duration;

/// Keys the filter reads from the store. Anything else is ignored.
pub const STORE_KEYS: [&str; 3] = [KEY_FILTERING_ENABLED, KEY_ACTIVE_RULES, KEY_SETTINGS];

/// Partial snapshot of the store: only keys that are present.
pub type StoredState = Map<String, Value>;

/// Change to one store key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageChange {
    /// Value after the change. `None` when the key was removed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_value: Option<Value>,

    /// Value before the change. `None` when the key was added.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_value: Option<Value>,
}

impl StorageChange {
    pub fn set(value: Value) -> Self {
        Self {
            new_value: Some(value),
            old_value: None,
        }
    }
}

/// One change notification: every key that changed together.
pub type StorageChanges = BTreeMap<String, StorageChange>;

/// Compute the key-level delta between two snapshots.
pub fn diff(old: &StoredState, new: &StoredState) -> StorageChanges {
    STORE_KEYS
        .iter()
        .filter_map(|key| {
            let before = old.get(*key);
            let after = new.get(*key);
            (before != after).then(|| {
                (
                    (*key).to_string(),
                    StorageChange {
                        new_value: after.cloned(),
                        old_value: before.cloned(),
                    },
                )
            })
        })
        .collect()
}

// =============================================================================
// SettingsFile
// =============================================================================

/// JSON settings document on disk.
#[derive(Debug, Clone)]
pub struct SettingsFile {
    path: PathBuf,
}

impl SettingsFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the current snapshot. A missing file is an empty snapshot
    /// (first run); keys outside [`STORE_KEYS`] are dropped.
    pub fn get(&self) -> Result<StoredState, SettingsError> {
        let size = match std::fs::metadata(&self.path) {
            Ok(m) => m.len(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "No settings file; using defaults");
                return Ok(StoredState::new());
            }
            Err(e) => {
                return Err(SettingsError::Io {
                    path: self.path.clone(),
                    source: e,
                })
            }
        };
        if size > MAX_SETTINGS_FILE_SIZE {
            return Err(SettingsError::FileTooLarge {
                path: self.path.clone(),
                size,
                max_size: MAX_SETTINGS_FILE_SIZE,
            });
        }

        let content = std::fs::read_to_string(&self.path).map_err(|e| SettingsError::Io {
            path: self.path.clone(),
            source: e,
        })?;
        let mut map: StoredState =
            serde_json::from_str(&content).map_err(|e| SettingsError::Json {
                path: self.path.clone(),
                source: e,
            })?;
        map.retain(|k, _| STORE_KEYS.contains(&k.as_str()));
        Ok(map)
    }

    /// Merge `values` into the stored document (top-level keys replaced) and
    /// write it atomically.
    pub fn set(&self, values: StoredState) -> Result<(), SettingsError> {
        let mut current = match self.get() {
            Ok(map) => map,
            Err(e) => {
                tracing::warn!(error = %e, "Overwriting unreadable settings file");
                StoredState::new()
            }
        };
        current.extend(values);

        let io_err = |source| SettingsError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(&Value::Object(current)).map_err(|e| {
            SettingsError::Json {
                path: self.path.clone(),
                source: e,
            }
        })?;

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json.as_bytes()).map_err(io_err)?;
        std::fs::rename(&tmp, &self.path).map_err(|e| {
            let _ = std::fs::remove_file(&tmp);
            io_err(e)
        })?;

        tracing::debug!(path = %self.path.display(), "Settings saved");
        Ok(())
    }
}

// =============================================================================
// SettingsWatcher
// =============================================================================

/// Polls a settings file on a background thread and reports deltas.
pub struct SettingsWatcher {
    progress_rx: Option<mpsc::Receiver<StorageChanges>>,
    cancel_flag: Option<Arc<AtomicBool>>,
}

impl SettingsWatcher {
    pub fn new() -> Self {
        Self {
            progress_rx: None,
            cancel_flag: None,
        }
    }

    /// Start watching `file`. `baseline` is the snapshot already handed to
    /// the controller; only differences from it are reported.
    ///
    /// A running watcher is stopped first.
    pub fn start_watch(
        &mut self,
        file: SettingsFile,
        baseline: StoredState,
        poll_interval_ms: u64,
    ) {
        self.stop_watch();

        let (tx, rx) = mpsc::channel();
        let cancel = Arc::new(AtomicBool::new(false));
        self.progress_rx = Some(rx);
        self.cancel_flag = Some(Arc::clone(&cancel));

        tracing::info!(path = %file.path().display(), "Settings watcher started");
        std::thread::spawn(move || {
            run_settings_watcher(file, baseline, poll_interval_ms, tx, cancel);
        });
    }

    pub fn stop_watch(&mut self) {
        if let Some(flag) = self.cancel_flag.take() {
            flag.store(true, Ordering::Relaxed);
        }
        self.progress_rx = None;
    }

    pub fn is_active(&self) -> bool {
        self.cancel_flag.is_some()
    }

    /// Drain pending change sets without blocking, oldest first.
    pub fn poll_changes(&mut self) -> Vec<StorageChanges> {
        let Some(rx) = &self.progress_rx else {
            return Vec::new();
        };
        let mut changes = Vec::new();
        loop {
            match rx.try_recv() {
                Ok(c) => changes.push(c),
                Err(mpsc::TryRecvError::Empty) => break,
                Err(mpsc::TryRecvError::Disconnected) => {
                    self.progress_rx = None;
                    self.cancel_flag = None;
                    break;
                }
            }
        }
        changes
    }
}

impl Default for SettingsWatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SettingsWatcher {
    fn drop(&mut self) {
        self.stop_watch();
    }
}

fn run_settings_watcher(
    file: SettingsFile,
    mut last: StoredState,
    poll_interval_ms: u64,
    tx: mpsc::Sender<StorageChanges>,
    cancel: Arc<AtomicBool>,
) {
    let slices = (poll_interval_ms / SETTINGS_CANCEL_CHECK_INTERVAL_MS).max(1);
    // Warn once per run of failed reads, not on every tick.
    let mut failing = false;

    loop {
        for _ in 0..slices {
            std::thread::sleep(Duration::from_millis(SETTINGS_CANCEL_CHECK_INTERVAL_MS));
            if cancel.load(Ordering::Relaxed) {
                tracing::debug!("Settings watcher: cancel flag set, exiting");
                return;
            }
        }

        // The file is re-read every tick: two same-size writes inside one
        // mtime tick leave the metadata unchanged.
        let current = match file.get() {
            Ok(map) => {
                failing = false;
                map
            }
            Err(e) => {
                if !failing {
                    tracing::warn!(
                        error = %e,
                        "Settings file unreadable; keeping previous settings"
                    );
                }
                failing = true;
                continue;
            }
        };

        let changes = diff(&last, &current);
        if changes.is_empty() {
            continue;
        }
        last = current;
        tracing::debug!(keys = ?changes.keys().collect::<Vec<_>>(), "Settings changed");
        if tx.send(changes).is_err() {
            return;
        }
    }
}
