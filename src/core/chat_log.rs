// ChatSift - core/chat_log.rs
//
// The live chat container: an ordered, bounded list of entries whose direct
// children are appended by the stream and evicted from the front once the
// capacity is exceeded.
//
// Observers subscribe with `observe()` and receive `LogMutation` records over
// an mpsc channel, in the order the mutations happened. Dropping the
// receiver is the only way to unsubscribe; dead senders are pruned on the
// next notification.

use crate::core::model::{ChatEntry, EntryContent, EntryId, EntryView};
use chrono::Utc;
use std::collections::VecDeque;
use std::sync::mpsc;

/// One change to the chat log, as seen by observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogMutation {
    /// New direct children, in append order.
    ChildrenAdded(Vec<EntryId>),
    /// Direct children evicted from the front of the log.
    ChildrenRemoved(Vec<EntryId>),
    /// Content inside an existing entry changed.
    EntryModified(EntryId),
}

/// Bounded chat log container.
#[derive(Debug)]
pub struct ChatLog {
    entries: VecDeque<ChatEntry>,
    capacity: usize,
    next_id: u64,
    observers: Vec<mpsc::Sender<LogMutation>>,
}

impl ChatLog {
    /// Create an empty log holding at most `capacity` entries (minimum 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity: capacity.max(1),
            next_id: 1,
            observers: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append a batch of entries as new direct children.
    ///
    /// Observers receive one `ChildrenAdded` for the whole batch, followed by
    /// a `ChildrenRemoved` if the batch pushed older entries out.
    pub fn append(&mut self, batch: Vec<EntryContent>) -> Vec<EntryId> {
        if batch.is_empty() {
            return Vec::new();
        }
        let now = Utc::now();
        let mut added = Vec::with_capacity(batch.len());
        for content in batch {
            let id = EntryId(self.next_id);
            self.next_id += 1;
            self.entries.push_back(ChatEntry {
                id,
                received_at: now,
                content,
                view: EntryView::default(),
            });
            added.push(id);
        }
        self.notify(LogMutation::ChildrenAdded(added.clone()));

        let overflow = self.entries.len().saturating_sub(self.capacity);
        if overflow > 0 {
            let removed: Vec<EntryId> = self.entries.drain(..overflow).map(|e| e.id).collect();
            tracing::trace!(count = removed.len(), "Chat log evicted old entries");
            self.notify(LogMutation::ChildrenRemoved(removed));
        }
        added
    }

    /// Replace the content of an existing entry (e.g. a moderator edit).
    ///
    /// Returns false when the entry is no longer in the log.
    pub fn edit(&mut self, id: EntryId, content: EntryContent) -> bool {
        let Some(entry) = self.get_mut(id) else {
            return false;
        };
        entry.content = content;
        self.notify(LogMutation::EntryModified(id));
        true
    }

    /// Look up an entry by id. `None` once the entry has been evicted.
    pub fn get(&self, id: EntryId) -> Option<&ChatEntry> {
        let idx = self.index_of(id)?;
        self.entries.get(idx)
    }

    pub fn get_mut(&mut self, id: EntryId) -> Option<&mut ChatEntry> {
        let idx = self.index_of(id)?;
        self.entries.get_mut(idx)
    }

    /// Current direct children in document order.
    pub fn entries(&self) -> impl Iterator<Item = &ChatEntry> {
        self.entries.iter()
    }

    pub fn entries_mut(&mut self) -> impl Iterator<Item = &mut ChatEntry> {
        self.entries.iter_mut()
    }

    /// Subscribe to future mutations. Nothing that happened before this call
    /// is delivered.
    pub fn observe(&mut self) -> mpsc::Receiver<LogMutation> {
        let (tx, rx) = mpsc::channel();
        self.observers.push(tx);
        rx
    }

    /// Number of live subscriptions.
    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    fn notify(&mut self, mutation: LogMutation) {
        self.observers.retain(|tx| tx.send(mutation.clone()).is_ok());
    }

    /// Ids are contiguous and ascending, so the position is an offset from
    /// the front.
    fn index_of(&self, id: EntryId) -> Option<usize> {
        let front = self.entries.front()?.id.0;
        let idx = id.0.checked_sub(front)?;
        let idx = usize::try_from(idx).ok()?;
        (idx < self.entries.len()).then_some(idx)
    }
}

impl Default for ChatLog {
    fn default() -> Self {
        Self::new(crate::util::constants::DEFAULT_CHAT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(text: &str) -> EntryContent {
        EntryContent::text("viewer", text)
    }

    #[test]
    fn test_append_assigns_ascending_ids() {
        let mut log = ChatLog::new(10);
        let ids = log.append(vec![msg("a"), msg("b")]);
        assert_eq!(ids, vec![EntryId(1), EntryId(2)]);
        let ids = log.append(vec![msg("c")]);
        assert_eq!(ids, vec![EntryId(3)]);
        assert_eq!(log.len(), 3);
    }

    #[test]
    fn test_eviction_keeps_capacity_and_lookup() {
        let mut log = ChatLog::new(2);
        log.append(vec![msg("a"), msg("b"), msg("c")]);
        assert_eq!(log.len(), 2);
        assert!(log.get(EntryId(1)).is_none());
        assert_eq!(
            log.get(EntryId(3)).map(|e| e.id),
            Some(EntryId(3)),
            "lookup must account for the evicted front"
        );
        assert!(log.get(EntryId(4)).is_none());
    }

    #[test]
    fn test_observer_sees_only_later_mutations() {
        let mut log = ChatLog::new(2);
        log.append(vec![msg("before")]);
        let rx = log.observe();
        log.append(vec![msg("x"), msg("y")]);
        log.edit(EntryId(2), msg("edited"));

        let got: Vec<LogMutation> = rx.try_iter().collect();
        assert_eq!(
            got,
            vec![
                LogMutation::ChildrenAdded(vec![EntryId(2), EntryId(3)]),
                LogMutation::ChildrenRemoved(vec![EntryId(1)]),
                LogMutation::EntryModified(EntryId(2)),
            ]
        );
    }

    #[test]
    fn test_dropped_observer_is_pruned() {
        let mut log = ChatLog::new(5);
        let rx = log.observe();
        assert_eq!(log.observer_count(), 1);
        drop(rx);
        log.append(vec![msg("a")]);
        assert_eq!(log.observer_count(), 0);
    }

    #[test]
    fn test_edit_missing_entry() {
        let mut log = ChatLog::new(5);
        assert!(!log.edit(EntryId(99), msg("nope")));
    }
}
