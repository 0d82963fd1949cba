//! Pending request table.
//!
//! Maps each outstanding correlation identifier to the one-shot slot its
//! caller is waiting on. An entry is completed exactly once: either a reply
//! is delivered into it, or the waiter removes it after its deadline.
//! Whichever gets to the map first wins; the other sees nothing.

use std::collections::HashMap;

use tokio::sync::oneshot;

use crate::bridge::envelope::{ReplyEnvelope, ResponseId};

/// Receiving end of a pending entry.
pub type ReplySlot = oneshot::Receiver<ReplyEnvelope>;

#[derive(Debug, Default)]
pub struct PendingTable {
    entries: HashMap<ResponseId, oneshot::Sender<ReplyEnvelope>>,
}

impl PendingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new entry under an identifier not currently outstanding.
    pub fn create(&mut self) -> (ResponseId, ReplySlot) {
        let mut id = ResponseId::generate();
        while self.entries.contains_key(&id) {
            id = ResponseId::generate();
        }

        let (tx, rx) = oneshot::channel();
        self.entries.insert(id.clone(), tx);
        (id, rx)
    }

    /// Hand `reply` to the entry for `id` and remove it.
    ///
    /// Returns false, with no effect, when no such entry exists (late or
    /// spurious reply). A waiter that has already gone away still counts as
    /// delivered: the entry existed and is now consumed.
    pub fn deliver(&mut self, id: &ResponseId, reply: ReplyEnvelope) -> bool {
        match self.entries.remove(id) {
            Some(tx) => {
                let _ = tx.send(reply);
                true
            }
            None => false,
        }
    }

    /// Drop an entry without delivering. Returns whether it was present.
    pub fn remove(&mut self, id: &ResponseId) -> bool {
        self.entries.remove(id).is_some()
    }

    pub fn contains(&self, id: &ResponseId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry; their waiters observe a closed slot.
    pub fn clear(&mut self) -> usize {
        let n = self.entries.len();
        self.entries.clear();
        n
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply_for(id: &ResponseId) -> ReplyEnvelope {
        let raw = format!(r#"{{"ResponseID":"{}","ok":true}}"#, id);
        ReplyEnvelope::parse(raw.as_bytes()).unwrap()
    }

    #[test]
    fn create_issues_distinct_ids() {
        let mut table = PendingTable::new();
        let (a, _ra) = table.create();
        let (b, _rb) = table.create();
        assert_ne!(a, b);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn deliver_hands_reply_to_slot_once() {
        let mut table = PendingTable::new();
        let (id, mut slot) = table.create();

        assert!(table.deliver(&id, reply_for(&id)));
        assert!(!table.contains(&id));
        assert_eq!(slot.try_recv().unwrap().response_id(), &id);

        // Late duplicate is a no-op.
        assert!(!table.deliver(&id, reply_for(&id)));
    }

    #[test]
    fn remove_then_deliver_is_noop() {
        let mut table = PendingTable::new();
        let (id, mut slot) = table.create();

        assert!(table.remove(&id));
        assert!(!table.remove(&id));
        assert!(!table.deliver(&id, reply_for(&id)));
        assert!(slot.try_recv().is_err());
    }

    #[test]
    fn unknown_id_leaves_other_entries_alone() {
        let mut table = PendingTable::new();
        let (id, mut slot) = table.create();

        let stranger = ResponseId::from("never-issued");
        assert!(!table.deliver(&stranger, reply_for(&stranger)));
        assert!(table.contains(&id));
        assert!(slot.try_recv().is_err());
    }

    #[test]
    fn deliver_counts_even_if_waiter_left() {
        let mut table = PendingTable::new();
        let (id, slot) = table.create();
        drop(slot);

        assert!(table.deliver(&id, reply_for(&id)));
        assert!(table.is_empty());
    }
}
