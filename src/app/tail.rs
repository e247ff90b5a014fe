// ChatSift - app/tail.rs
//
// Chat file tail: follows an append-only JSON-lines chat file and streams
// each newly written message to the main loop, where it is appended to the
// chat log.
//
// Architecture:
//   - `ChatTail` lives on the main thread; `run_tail_watcher` runs on a
//     background thread polling the file for new content on a fixed interval.
//   - An `Arc<AtomicBool>` cancel flag allows the main loop to stop the tail.
//   - Decoded messages are sent as `TailProgress::NewEntries` over an mpsc
//     channel, one batch per read, in file order.
//
// Failure handling:
//   - Stat/read errors are non-fatal: logged, reported as `FileError`, and
//     retried on the next tick.
//   - A truncated/rotated file (size < last offset) resets the offset to 0.
//   - A malformed line is skipped with a warning; the rest of the batch is
//     still delivered.
//   - MAX_TAIL_READ_BYTES_PER_TICK caps the bytes consumed per tick.

use crate::core::model::EntryContent;
use crate::util::constants::{
    MAX_TAIL_PARTIAL_BYTES, MAX_TAIL_READ_BYTES_PER_TICK, TAIL_CANCEL_CHECK_INTERVAL_MS,
};
use crate::util::error::EntryError;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::time::Duration;

// =============================================================================
// Line decoding
// =============================================================================

/// Decode JSON-lines chat records, keeping the 1-based file line number of
/// each decoded entry.
///
/// Blank lines are skipped silently. Lines that are not valid records are
/// returned as errors alongside the successfully decoded entries.
/// `first_line_number` is the line number of the first line in `text`.
pub fn decode_numbered_lines(
    text: &str,
    first_line_number: u64,
) -> (Vec<(u64, EntryContent)>, Vec<EntryError>) {
    let mut entries = Vec::new();
    let mut errors = Vec::new();
    for (offset, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let line_number = first_line_number + offset as u64;
        match serde_json::from_str::<EntryContent>(line) {
            Ok(content) => entries.push((line_number, content)),
            Err(source) => errors.push(EntryError::Decode {
                line_number,
                source,
            }),
        }
    }
    (entries, errors)
}

/// [`decode_numbered_lines`] without the line numbers.
pub fn decode_chat_lines(
    text: &str,
    first_line_number: u64,
) -> (Vec<EntryContent>, Vec<EntryError>) {
    let (numbered, errors) = decode_numbered_lines(text, first_line_number);
    (numbered.into_iter().map(|(_, content)| content).collect(), errors)
}

// =============================================================================
// Public types
// =============================================================================

/// Messages sent from the tail thread to the main loop.
#[derive(Debug)]
pub enum TailProgress {
    /// The tail thread is running.
    Started { path: PathBuf },
    /// Newly appended messages, in file order.
    NewEntries { entries: Vec<EntryContent> },
    /// A recoverable file error; the tail keeps polling.
    FileError { path: PathBuf, message: String },
    /// The tail thread has exited after a stop request.
    Stopped,
}

/// Manages a live tail of one chat file on a background thread.
pub struct ChatTail {
    progress_rx: Option<mpsc::Receiver<TailProgress>>,
    cancel_flag: Option<Arc<AtomicBool>>,
}

impl ChatTail {
    pub fn new() -> Self {
        Self {
            progress_rx: None,
            cancel_flag: None,
        }
    }

    /// Start tailing `path`.
    ///
    /// With `from_start` the existing content is delivered first; otherwise
    /// only content written after this call is. A running tail is stopped
    /// first.
    pub fn start_tail(&mut self, path: PathBuf, from_start: bool, poll_interval_ms: u64) {
        self.stop_tail();

        let (tx, rx) = mpsc::channel();
        let cancel = Arc::new(AtomicBool::new(false));

        self.progress_rx = Some(rx);
        self.cancel_flag = Some(Arc::clone(&cancel));

        tracing::info!(file = %path.display(), from_start, "Live tail started");
        std::thread::spawn(move || {
            run_tail_watcher(path, from_start, poll_interval_ms, tx, cancel);
        });
    }

    /// Request the background tail thread to stop.
    pub fn stop_tail(&mut self) {
        if let Some(flag) = &self.cancel_flag {
            flag.store(true, Ordering::SeqCst);
        }
        self.cancel_flag = None;
        self.progress_rx = None;
    }

    pub fn is_active(&self) -> bool {
        self.cancel_flag.is_some()
    }

    /// Drain at most `max` pending messages without blocking. Anything beyond
    /// the budget stays queued for the next call.
    pub fn poll_progress(&mut self, max: usize) -> Vec<TailProgress> {
        let Some(rx) = &self.progress_rx else {
            return Vec::new();
        };
        let mut messages = Vec::new();
        while messages.len() < max {
            match rx.try_recv() {
                Ok(msg) => messages.push(msg),
                Err(mpsc::TryRecvError::Empty) => break,
                Err(mpsc::TryRecvError::Disconnected) => {
                    self.progress_rx = None;
                    self.cancel_flag = None;
                    break;
                }
            }
        }
        messages
    }
}

impl Default for ChatTail {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ChatTail {
    fn drop(&mut self) {
        self.stop_tail();
    }
}

// =============================================================================
// Background tail watcher
// =============================================================================

struct FileState {
    /// Byte position of the last byte examined.
    offset: u64,
    /// Bytes after the last newline of the previous read: an in-progress
    /// line, possibly ending inside a multi-byte character.
    partial: Vec<u8>,
    /// 1-based line number of the first line in `partial`.
    next_line: u64,
}

fn run_tail_watcher(
    path: PathBuf,
    from_start: bool,
    poll_interval_ms: u64,
    tx: mpsc::Sender<TailProgress>,
    cancel: Arc<AtomicBool>,
) {
    macro_rules! send {
        ($msg:expr) => {
            if tx.send($msg).is_err() {
                // Main loop gone: exit silently.
                return;
            }
        };
    }

    let offset = if from_start {
        0
    } else {
        std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0)
    };
    tracing::debug!(file = %path.display(), offset, "Tail: seeding initial offset");
    let mut state = FileState {
        offset,
        partial: Vec::new(),
        next_line: 1,
    };

    send!(TailProgress::Started { path: path.clone() });

    let slices = (poll_interval_ms / TAIL_CANCEL_CHECK_INTERVAL_MS).max(1);
    let mut first_tick = true;

    loop {
        // The first read happens immediately so `from_start` content shows up
        // without waiting a full interval.
        if !first_tick {
            for _ in 0..slices {
                std::thread::sleep(Duration::from_millis(TAIL_CANCEL_CHECK_INTERVAL_MS));
                if cancel.load(Ordering::SeqCst) {
                    send!(TailProgress::Stopped);
                    return;
                }
            }
        }
        first_tick = false;
        if cancel.load(Ordering::SeqCst) {
            send!(TailProgress::Stopped);
            return;
        }

        let current_size = match std::fs::metadata(&path) {
            Ok(m) => m.len(),
            Err(e) => {
                tracing::warn!(file = %path.display(), error = %e, "Tail: stat error");
                send!(TailProgress::FileError {
                    path: path.clone(),
                    message: format!("Cannot stat: {e}"),
                });
                continue;
            }
        };

        if current_size < state.offset {
            tracing::info!(
                file = %path.display(),
                old_offset = state.offset,
                new_size = current_size,
                "Tail: file truncated or rotated, resetting offset to 0"
            );
            state.offset = 0;
            state.partial.clear();
            state.next_line = 1;
        }

        if current_size == state.offset {
            continue;
        }

        let bytes_available = usize::try_from(current_size - state.offset).unwrap_or(usize::MAX);
        let read_limit = bytes_available.min(MAX_TAIL_READ_BYTES_PER_TICK);
        let new_bytes = match read_bytes_at(&path, state.offset, read_limit) {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!(file = %path.display(), error = %e, "Tail: read error");
                send!(TailProgress::FileError {
                    path: path.clone(),
                    message: format!("Read error: {e}"),
                });
                continue;
            }
        };
        if new_bytes.is_empty() {
            continue;
        }
        state.offset += new_bytes.len() as u64;
        state.partial.extend_from_slice(&new_bytes);

        // A newline byte never occurs inside a multi-byte sequence, so every
        // complete line decodes on its own.
        let complete = match state.partial.iter().rposition(|&b| b == b'\n') {
            Some(nl) => {
                let rest = state.partial.split_off(nl + 1);
                std::mem::replace(&mut state.partial, rest)
            }
            None => {
                if state.partial.len() > MAX_TAIL_PARTIAL_BYTES {
                    tracing::warn!(
                        file = %path.display(),
                        bytes = state.partial.len(),
                        "Tail: discarding oversized unterminated line"
                    );
                    state.partial.clear();
                }
                continue;
            }
        };

        let complete = String::from_utf8_lossy(&complete);
        let line_count = complete.lines().count() as u64;
        let (entries, errors) = decode_chat_lines(&complete, state.next_line);
        state.next_line += line_count;
        for e in &errors {
            tracing::warn!(file = %path.display(), error = %e, "Tail: skipping malformed entry");
        }
        if entries.is_empty() {
            continue;
        }
        tracing::debug!(file = %path.display(), count = entries.len(), "Tail: new entries");
        send!(TailProgress::NewEntries { entries });
    }
}

/// Read up to `limit` bytes from `path` starting at `offset`.
fn read_bytes_at(path: &Path, offset: u64, limit: usize) -> std::io::Result<Vec<u8>> {
    let mut file = std::fs::File::open(path)?;
    file.seek(SeekFrom::Start(offset))?;
    let mut buf = Vec::with_capacity(limit);
    file.take(limit as u64).read_to_end(&mut buf)?;
    Ok(buf)
}
