//! Reference-counted searcher snapshots
//!
//! The engine publishes one current [`Snapshot`] at a time. Reads take a
//! [`SnapshotLease`], which pins the snapshot until dropped, so a query that
//! started before a commit keeps reading the view it started with. A snapshot
//! replaced by a newer one is retired; its segment files are released when the
//! last lease on it is dropped.

use parking_lot::Mutex;
use std::ops::Deref;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tantivy::{Opstamp, Searcher, SegmentId};
use tracing::debug;

/// Identity of a searcher's content: its segments and their delete generations
type Fingerprint = Vec<(SegmentId, Option<Opstamp>)>;

fn fingerprint(searcher: &Searcher) -> Fingerprint {
    searcher
        .segment_readers()
        .iter()
        .map(|reader| (reader.segment_id(), reader.delete_opstamp()))
        .collect()
}

/// Immutable point-in-time view of the index
pub struct Snapshot {
    searcher: Searcher,
    generation: u64,
    fingerprint: Fingerprint,
    leases: AtomicUsize,
    retired: AtomicBool,
}

impl Snapshot {
    fn new(searcher: Searcher, generation: u64) -> Self {
        let fingerprint = fingerprint(&searcher);
        Self {
            searcher,
            generation,
            fingerprint,
            leases: AtomicUsize::new(0),
            retired: AtomicBool::new(false),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Leases currently held on this snapshot
    pub fn leases(&self) -> usize {
        self.leases.load(Ordering::Acquire)
    }

    pub fn is_retired(&self) -> bool {
        self.retired.load(Ordering::Acquire)
    }

    fn retire(&self) {
        self.retired.store(true, Ordering::Release);
    }
}

impl Drop for Snapshot {
    fn drop(&mut self) {
        if self.is_retired() {
            debug!(generation = self.generation, "Released retired snapshot");
        }
    }
}

/// Pinned snapshot; releases its reference when dropped
pub struct SnapshotLease {
    snapshot: Arc<Snapshot>,
}

impl SnapshotLease {
    pub fn generation(&self) -> u64 {
        self.snapshot.generation
    }

    pub fn searcher(&self) -> &Searcher {
        &self.snapshot.searcher
    }
}

impl Deref for SnapshotLease {
    type Target = Searcher;

    fn deref(&self) -> &Searcher {
        &self.snapshot.searcher
    }
}

impl Drop for SnapshotLease {
    fn drop(&mut self) {
        self.snapshot.leases.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Holder of the current snapshot
///
/// Acquire and swap lock only the snapshot reference, never the writer.
pub struct SnapshotSlot {
    current: Mutex<Arc<Snapshot>>,
}

impl SnapshotSlot {
    pub fn new(searcher: Searcher) -> Self {
        Self {
            current: Mutex::new(Arc::new(Snapshot::new(searcher, 0))),
        }
    }

    /// Pin the current snapshot
    pub fn acquire(&self) -> SnapshotLease {
        let current = self.current.lock();
        current.leases.fetch_add(1, Ordering::AcqRel);
        SnapshotLease {
            snapshot: Arc::clone(&current),
        }
    }

    /// Install `searcher` as the current snapshot if its content differs
    ///
    /// Returns whether a swap happened. The replaced snapshot is retired but
    /// stays readable through existing leases.
    pub fn publish(&self, searcher: Searcher) -> bool {
        let mut current = self.current.lock();
        let candidate = fingerprint(&searcher);
        if current.fingerprint == candidate {
            return false;
        }

        let next = Arc::new(Snapshot::new(searcher, current.generation + 1));
        let previous = std::mem::replace(&mut *current, next);
        drop(current);

        previous.retire();
        true
    }

    pub fn generation(&self) -> u64 {
        self.current.lock().generation
    }

    /// Leases held on the current snapshot
    pub fn outstanding_leases(&self) -> usize {
        self.current.lock().leases()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tantivy::schema::{Schema, STRING};
    use tantivy::{doc, Index, IndexReader, IndexWriter, ReloadPolicy};

    fn setup() -> (Index, IndexWriter, IndexReader, tantivy::schema::Field) {
        let mut builder = Schema::builder();
        let key = builder.add_text_field("key", STRING);
        let index = Index::create_in_ram(builder.build());
        let writer = index.writer_with_num_threads(1, 15_000_000).unwrap();
        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()
            .unwrap();
        (index, writer, reader, key)
    }

    #[test]
    fn test_lease_counting() {
        let (_index, _writer, reader, _key) = setup();
        let slot = SnapshotSlot::new(reader.searcher());

        let first = slot.acquire();
        let second = slot.acquire();
        assert_eq!(slot.outstanding_leases(), 2);
        drop(first);
        assert_eq!(slot.outstanding_leases(), 1);
        drop(second);
        assert_eq!(slot.outstanding_leases(), 0);
    }

    #[test]
    fn test_unchanged_searcher_is_not_published() {
        let (_index, mut writer, reader, _key) = setup();
        let slot = SnapshotSlot::new(reader.searcher());

        writer.commit().unwrap();
        reader.reload().unwrap();
        assert!(!slot.publish(reader.searcher()));
        assert_eq!(slot.generation(), 0);
    }

    #[test]
    fn test_old_lease_survives_swap() {
        let (_index, mut writer, reader, key) = setup();
        let slot = SnapshotSlot::new(reader.searcher());
        let old = slot.acquire();

        writer.add_document(doc!(key => "a")).unwrap();
        writer.commit().unwrap();
        reader.reload().unwrap();
        assert!(slot.publish(reader.searcher()));

        assert_eq!(slot.generation(), 1);
        assert_eq!(old.generation(), 0);
        assert!(old.snapshot.is_retired());
        assert_eq!(old.num_docs(), 0);

        let new = slot.acquire();
        assert_eq!(new.num_docs(), 1);
        assert_eq!(old.snapshot.leases(), 1);
    }

    #[test]
    fn test_retired_snapshot_freed_with_last_lease() {
        let (_index, mut writer, reader, key) = setup();
        let slot = SnapshotSlot::new(reader.searcher());
        let first = slot.acquire();
        let second = slot.acquire();
        let retired = Arc::downgrade(&first.snapshot);

        writer.add_document(doc!(key => "a")).unwrap();
        writer.commit().unwrap();
        reader.reload().unwrap();
        assert!(slot.publish(reader.searcher()));

        drop(first);
        assert!(retired.upgrade().is_some());
        drop(second);
        assert!(retired.upgrade().is_none());
    }
}
