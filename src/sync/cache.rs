// src/sync/cache.rs

use chrono::{DateTime, Utc};
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, PoisonError, RwLock,
};

use crate::model::Snapshot;

struct Slot {
    snapshot: Arc<Snapshot>,
    seq: u64,
    updated_at: Option<DateTime<Utc>>,
}

/// The latest applied snapshot, shared between the coordinator and readers.
///
/// Replacement swaps a single `Arc` under the write lock, so a reader holds
/// either the old or the new snapshot, never a mix. Each refresh reserves a
/// sequence number before fetching; a completion older than the one already
/// applied is refused.
pub struct SnapshotCache {
    slot: RwLock<Slot>,
    next_seq: AtomicU64,
}

impl Default for SnapshotCache {
    fn default() -> Self {
        Self {
            slot: RwLock::new(Slot {
                snapshot: Arc::new(Snapshot::default()),
                seq: 0,
                updated_at: None,
            }),
            next_seq: AtomicU64::new(1),
        }
    }
}

impl SnapshotCache {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn current(&self) -> Arc<Snapshot> {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .snapshot
            .clone()
    }

    pub fn headers(&self) -> Vec<String> {
        self.current().headers.clone()
    }

    /// When the cache was last replaced; `None` before the first success.
    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .updated_at
    }

    /// Sequence number of the snapshot currently held (0 = never filled).
    pub fn applied_seq(&self) -> u64 {
        self.slot.read().unwrap_or_else(PoisonError::into_inner).seq
    }

    /// Reserve the sequence number for a refresh that is about to start.
    pub fn begin(&self) -> u64 {
        self.next_seq.fetch_add(1, Ordering::SeqCst)
    }

    /// Install `snapshot` if `seq` is newer than what is held.
    /// Returns the installed snapshot, or `None` if `seq` was stale.
    pub fn apply(&self, seq: u64, snapshot: Snapshot) -> Option<Arc<Snapshot>> {
        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        if seq <= slot.seq {
            return None;
        }
        let snapshot = Arc::new(snapshot);
        slot.snapshot = snapshot.clone();
        slot.seq = seq;
        slot.updated_at = Some(Utc::now());
        Some(snapshot)
    }
}
