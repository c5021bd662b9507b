//! Per-blob exclusive sections.
//!
//! Appends and deletes of the same blob run one at a time so the byte write
//! and the size increment that follows it are observed as a single step.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type BlobKey = (String, String);
type LockTable = Arc<Mutex<HashMap<BlobKey, Entry>>>;

/// A blob's mutex plus the number of guards, held or still waiting, that use it.
#[derive(Debug, Default)]
struct Entry {
    mutex: Arc<AsyncMutex<()>>,
    users: usize,
}

#[derive(Debug, Default, Clone)]
pub(crate) struct BlobLocks {
    table: LockTable,
}

/// Held for the duration of a blob mutation. Dropping it releases the blob
/// and forgets the lock entry once nobody else is holding or waiting on it.
pub(crate) struct BlobLockGuard {
    guard: Option<OwnedMutexGuard<()>>,
    key: BlobKey,
    table: LockTable,
}

impl BlobLocks {
    pub async fn lock(&self, bucket_id: &str, blob_id: &str) -> BlobLockGuard {
        let key = (bucket_id.to_string(), blob_id.to_string());
        let mutex = {
            let mut table = self.table.lock();
            let entry = table.entry(key.clone()).or_default();
            entry.users += 1;
            entry.mutex.clone()
        };

        // Registered before waiting, so a waiter dropped mid-wait still
        // gives its slot back.
        let mut guard = BlobLockGuard {
            guard: None,
            key,
            table: self.table.clone(),
        };
        guard.guard = Some(mutex.lock_owned().await);
        guard
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.table.lock().len()
    }
}

impl Drop for BlobLockGuard {
    fn drop(&mut self) {
        let mut table = self.table.lock();
        self.guard.take();

        let unused = match table.get_mut(&self.key) {
            Some(entry) => {
                entry.users = entry.users.saturating_sub(1);
                entry.users == 0
            }
            None => false,
        };
        if unused {
            table.remove(&self.key);
        }
    }
}
