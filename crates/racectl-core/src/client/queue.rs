//! Local mutation queue
//!
//! An ordered, persisted log of pending operations. The queue never
//! reorders or deduplicates entries; duplicates are harmless because the
//! reconciliation service applies every operation idempotently by natural
//! key.

use std::sync::Arc;

use crate::error::Result;
use crate::models::QueueItem;
use crate::storage::KvStore;

const QUEUE_KEY: &str = "sync_queue";

/// Durable FIFO of pending mutations over a `KvStore`
pub struct SyncQueue<S> {
    store: Arc<S>,
}

impl<S> Clone for SyncQueue<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: KvStore> SyncQueue<S> {
    /// Create a queue over the given store
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Append an item, preserving insertion order
    pub fn enqueue(&self, item: QueueItem) -> Result<()> {
        let mut items = self.peek_all()?;
        items.push(item);
        self.write(&items)
    }

    /// The current sequence, without mutating it
    pub fn peek_all(&self) -> Result<Vec<QueueItem>> {
        match self.store.get(QUEUE_KEY)? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    /// Atomically substitute the sequence; used after a drain pass to keep
    /// only the items that must be retried
    pub fn replace_with(&self, remaining: &[QueueItem]) -> Result<()> {
        self.write(remaining)
    }

    /// Number of pending items
    pub fn pending_count(&self) -> Result<usize> {
        Ok(self.peek_all()?.len())
    }

    fn write(&self, items: &[QueueItem]) -> Result<()> {
        let raw = serde_json::to_string(items)?;
        self.store.set(QUEUE_KEY, &raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AddRunnerRequest, AuthoritativeId, Operation};
    use crate::storage::MemoryKvStore;
    use pretty_assertions::assert_eq;

    fn item(bib: i64) -> QueueItem {
        QueueItem::new(Operation::AddRunner(AddRunnerRequest {
            race_id: AuthoritativeId(1),
            bib_number: bib,
            name: None,
        }))
    }

    #[test]
    fn test_enqueue_preserves_order() {
        let queue = SyncQueue::new(Arc::new(MemoryKvStore::new()));
        assert_eq!(queue.pending_count().unwrap(), 0);

        queue.enqueue(item(1)).unwrap();
        queue.enqueue(item(2)).unwrap();
        queue.enqueue(item(3)).unwrap();

        let bibs: Vec<i64> = queue
            .peek_all()
            .unwrap()
            .iter()
            .map(|entry| match &entry.op {
                Operation::AddRunner(req) => req.bib_number,
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(bibs, vec![1, 2, 3]);
    }

    #[test]
    fn test_peek_does_not_mutate() {
        let queue = SyncQueue::new(Arc::new(MemoryKvStore::new()));
        queue.enqueue(item(1)).unwrap();

        queue.peek_all().unwrap();
        queue.peek_all().unwrap();
        assert_eq!(queue.pending_count().unwrap(), 1);
    }

    #[test]
    fn test_replace_with_substitutes_sequence() {
        let queue = SyncQueue::new(Arc::new(MemoryKvStore::new()));
        queue.enqueue(item(1)).unwrap();
        queue.enqueue(item(2)).unwrap();

        let snapshot = queue.peek_all().unwrap();
        queue.replace_with(&snapshot[1..]).unwrap();

        let remaining = queue.peek_all().unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0], snapshot[1]);
    }

    #[test]
    fn test_queue_survives_store_handoff() {
        // Same backing store, new queue instance: the restart case
        let store = Arc::new(MemoryKvStore::new());
        SyncQueue::new(Arc::clone(&store)).enqueue(item(9)).unwrap();

        let reopened = SyncQueue::new(store);
        assert_eq!(reopened.pending_count().unwrap(), 1);
    }
}
