use dashmap::DashMap;
use meshflow_core::model::{NodeId, WorkspaceId};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

type LockKey = (WorkspaceId, NodeId);

/// Per-node exclusive section for node and auto-link writes.
///
/// Two writers of the same node must not interleave their read-modify-write
/// cycles, or one silently reverts the other.
#[derive(Clone, Default)]
pub struct NodeLocks {
    locks: Arc<DashMap<LockKey, Arc<Mutex<()>>>>,
}

/// Releases the section on drop; the table entry goes with it once nobody
/// else holds or waits on it.
pub struct NodeLockGuard {
    guard: Option<OwnedMutexGuard<()>>,
    locks: Arc<DashMap<LockKey, Arc<Mutex<()>>>>,
    key: LockKey,
}

impl Drop for NodeLockGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Waiters clone the Arc under the shard lock, so a count of one means idle.
        self.locks
            .remove_if(&self.key, |_, lock| Arc::strong_count(lock) == 1);
    }
}

impl NodeLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, workspace_id: WorkspaceId, node_id: NodeId) -> NodeLockGuard {
        let key = (workspace_id, node_id);
        let lock = self
            .locks
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        NodeLockGuard {
            guard: Some(lock.lock_owned().await),
            locks: self.locks.clone(),
            key,
        }
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
