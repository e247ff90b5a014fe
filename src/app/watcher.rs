// ChatSift - app/watcher.rs
//
// Stream watcher: subscribes to the chat log and yields the ids of entries
// appended as direct children after attachment, one at a time, in delivery
// order. Removals and in-entry modifications are ignored.
//
// Architecture:
//   - `start` subscribes through `ChatLog::observe` and keeps the receiver.
//     Any previous subscription is dropped first, so a restart never
//     delivers an entry twice.
//   - `appended` is a lazy, non-blocking iterator over pending ids. It ends
//     when nothing is queued and can be called again on the next tick.
//   - `stop` drops the receiver; the log prunes the dead sender on its next
//     notification.

use crate::core::chat_log::{ChatLog, LogMutation};
use crate::core::model::EntryId;
use std::collections::VecDeque;
use std::sync::mpsc;

/// Watches one chat log for appended entries.
#[derive(Debug, Default)]
pub struct StreamWatcher {
    subscription: Option<mpsc::Receiver<LogMutation>>,
    /// Ids received from the current subscription but not yet handed out.
    pending: VecDeque<EntryId>,
}

impl StreamWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach to `log`, replacing any existing attachment.
    ///
    /// An absent log leaves the watcher detached and returns false; the caller
    /// retries on the next lifecycle transition.
    pub fn start(&mut self, log: Option<&mut ChatLog>) -> bool {
        self.stop();
        let Some(log) = log else {
            tracing::debug!("Stream watcher not started: chat log not present");
            return false;
        };
        self.subscription = Some(log.observe());
        tracing::info!("Stream watcher attached");
        true
    }

    /// Detach. Nothing appended afterwards is delivered, and anything still
    /// queued from the old attachment is discarded.
    pub fn stop(&mut self) {
        if self.subscription.take().is_some() {
            tracing::info!("Stream watcher detached");
        }
        self.pending.clear();
    }

    pub fn is_active(&self) -> bool {
        self.subscription.is_some()
    }

    /// Drain appended ids lazily without blocking.
    pub fn appended(&mut self) -> Appended<'_> {
        Appended { watcher: self }
    }

    fn next_id(&mut self) -> Option<EntryId> {
        loop {
            if let Some(id) = self.pending.pop_front() {
                return Some(id);
            }
            let rx = self.subscription.as_ref()?;
            match rx.try_recv() {
                Ok(LogMutation::ChildrenAdded(ids)) => self.pending.extend(ids),
                Ok(LogMutation::ChildrenRemoved(_) | LogMutation::EntryModified(_)) => {}
                Err(mpsc::TryRecvError::Empty) => return None,
                Err(mpsc::TryRecvError::Disconnected) => {
                    tracing::debug!("Chat log dropped; stream watcher detaching");
                    self.subscription = None;
                    return None;
                }
            }
        }
    }
}

/// Iterator returned by [`StreamWatcher::appended`].
pub struct Appended<'a> {
    watcher: &'a mut StreamWatcher,
}

impl Iterator for Appended<'_> {
    type Item = EntryId;

    fn next(&mut self) -> Option<EntryId> {
        self.watcher.next_id()
    }
}
