//! Name-scoped locks for check-then-create sequences.
//!
//! The table starts empty. An entry exists only while some caller holds or
//! waits on that name; the last guard to drop removes it, so the table stays
//! bounded by the number of names in flight rather than every name ever seen.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use amsnet_core::EntityKind;

type LockKey = (EntityKind, String);
type LockTable = DashMap<LockKey, Arc<Mutex<()>>>;

/// Process-wide table of per-name locks. Clones share the table.
#[derive(Clone, Default)]
pub struct NameLocks {
    table: Arc<LockTable>,
}

impl NameLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `name` within its namespace.
    pub async fn acquire(&self, kind: EntityKind, name: &str) -> NameGuard {
        let mut guard = NameGuard {
            table: self.table.clone(),
            key: (kind, name.to_string()),
            held: None,
        };
        let lock = self.table.entry(guard.key.clone()).or_default().value().clone();
        guard.held = Some(lock.lock_owned().await);
        tracing::trace!(%kind, name, "Name lock acquired");
        guard
    }

    /// Number of names currently locked or awaited.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

/// Exclusive hold on one name. Released on drop, on every exit path.
pub struct NameGuard {
    table: Arc<LockTable>,
    key: LockKey,
    held: Option<OwnedMutexGuard<()>>,
}

impl Drop for NameGuard {
    fn drop(&mut self) {
        drop(self.held.take());
        // Only the table's own reference left: nobody holds or waits on this name.
        self.table
            .remove_if(&self.key, |_, lock| Arc::strong_count(lock) == 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn table_is_empty_after_release() {
        let locks = NameLocks::new();
        assert!(locks.is_empty());

        let guard = locks.acquire(EntityKind::Node, "a").await;
        assert_eq!(locks.len(), 1);
        drop(guard);
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn namespaces_do_not_contend() {
        let locks = NameLocks::new();
        let _node = locks.acquire(EntityKind::Node, "x").await;
        let rel = tokio::time::timeout(
            Duration::from_millis(100),
            locks.acquire(EntityKind::Relationship, "x"),
        )
        .await;
        assert!(rel.is_ok());
        assert_eq!(locks.len(), 2);
    }

    #[tokio::test]
    async fn same_name_is_exclusive() {
        let locks = NameLocks::new();
        let inside = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let locks = locks.clone();
            let inside = inside.clone();
            let max_seen = max_seen.clone();
            handles.push(tokio::spawn(async move {
                let _guard = locks.acquire(EntityKind::Node, "shared").await;
                let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                tokio::task::yield_now().await;
                inside.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn guard_released_on_error_path() {
        async fn failing(locks: &NameLocks) -> Result<(), &'static str> {
            let _guard = locks.acquire(EntityKind::Node, "a").await;
            Err("boom")
        }

        let locks = NameLocks::new();
        assert!(failing(&locks).await.is_err());
        assert!(locks.is_empty());

        let again = tokio::time::timeout(
            Duration::from_millis(100),
            locks.acquire(EntityKind::Node, "a"),
        )
        .await;
        assert!(again.is_ok());
    }
}
