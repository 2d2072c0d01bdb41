//! Index queue rows and the relational collaborator that serves them

use crate::error::Result;
use crate::models::EventSummary;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Table holding open and recently closed event summaries
pub const TABLE_EVENT_SUMMARY: &str = "event_summary";

/// Table holding archived event summaries
pub const TABLE_EVENT_ARCHIVE: &str = "event_archive";

/// Name of the pending-change queue for an event table
pub fn queue_table_name(table_name: &str) -> String {
    format!("{}_index_queue", table_name)
}

/// A pending-change marker for one event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntry {
    /// Monotonic sequence id
    pub id: i64,

    /// Event the change refers to
    pub uuid: Uuid,

    /// When the change was enqueued
    pub update_time: DateTime<Utc>,

    /// Last-seen time of the event, recorded for partitioned (archive) tables
    pub last_seen: Option<DateTime<Utc>>,
}

/// Queue entry left-joined against the event table
#[derive(Debug, Clone, PartialEq)]
pub struct QueueRow {
    pub entry: QueueEntry,

    /// `None` when the event no longer exists
    pub summary: Option<EventSummary>,
}

/// Relational system of record as seen by the drain pipeline
#[async_trait]
pub trait IndexQueueStore: Send + Sync {
    /// Event table the queue belongs to
    fn table_name(&self) -> &str;

    /// Whether the event table is partitioned by last-seen time
    fn is_archive(&self) -> bool;

    /// Up to `limit` queue rows ordered by id, optionally only those enqueued
    /// at or before `max_update_time`
    async fn fetch_queue(
        &self,
        limit: usize,
        max_update_time: Option<DateTime<Utc>>,
    ) -> Result<Vec<QueueRow>>;

    /// Number of pending queue rows
    async fn queue_length(&self) -> Result<u64>;

    /// Delete queue rows by id; unknown ids are ignored
    async fn delete_queue_entries(&self, ids: &[i64]) -> Result<usize>;
}

/// In-memory event table plus its index queue (for embedding and testing)
///
/// Every mutation of the table enqueues a change the way database triggers do
/// for the real tables.
#[derive(Clone)]
pub struct InMemoryEventStore {
    table_name: String,
    archive: bool,
    events: Arc<DashMap<Uuid, EventSummary>>,
    queue: Arc<Mutex<BTreeMap<i64, QueueEntry>>>,
    next_id: Arc<AtomicI64>,
}

impl InMemoryEventStore {
    pub fn new(table_name: impl Into<String>, archive: bool) -> Self {
        Self {
            table_name: table_name.into(),
            archive,
            events: Arc::new(DashMap::new()),
            queue: Arc::new(Mutex::new(BTreeMap::new())),
            next_id: Arc::new(AtomicI64::new(1)),
        }
    }

    /// Store backed by the event summary table
    pub fn summary() -> Self {
        Self::new(TABLE_EVENT_SUMMARY, false)
    }

    /// Store backed by the partitioned event archive table
    pub fn archive() -> Self {
        Self::new(TABLE_EVENT_ARCHIVE, true)
    }

    /// Insert or replace a summary and enqueue the change
    pub fn upsert(&self, summary: EventSummary) -> i64 {
        let uuid = summary.uuid;
        let update_time = summary.update_time;
        let last_seen = self.archive.then_some(summary.last_seen_time);
        self.events.insert(uuid, summary);
        self.enqueue(uuid, update_time, last_seen)
    }

    /// Remove a summary and enqueue the change
    pub fn remove(&self, uuid: &Uuid) -> Option<i64> {
        let (uuid, summary) = self.events.remove(uuid)?;
        let last_seen = self.archive.then_some(summary.last_seen_time);
        Some(self.enqueue(uuid, Utc::now(), last_seen))
    }

    /// Append a raw queue entry, returning its id
    pub fn enqueue(
        &self,
        uuid: Uuid,
        update_time: DateTime<Utc>,
        last_seen: Option<DateTime<Utc>>,
    ) -> i64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.queue.lock().insert(
            id,
            QueueEntry {
                id,
                uuid,
                update_time,
                last_seen,
            },
        );
        tracing::debug!(table = %self.table_name, id, uuid = %uuid, "Enqueued index change");
        id
    }

    pub fn get(&self, uuid: &Uuid) -> Option<EventSummary> {
        self.events.get(uuid).map(|entry| entry.clone())
    }

    /// Snapshot of the pending queue ids
    pub fn queued_ids(&self) -> Vec<i64> {
        self.queue.lock().keys().copied().collect()
    }

    /// Join rule: uuid match, plus last-seen match on partitioned tables
    fn join(&self, entry: &QueueEntry) -> Option<EventSummary> {
        let summary = self.events.get(&entry.uuid)?;
        if self.archive && entry.last_seen != Some(summary.last_seen_time) {
            return None;
        }
        Some(summary.clone())
    }
}

#[async_trait]
impl IndexQueueStore for InMemoryEventStore {
    fn table_name(&self) -> &str {
        &self.table_name
    }

    fn is_archive(&self) -> bool {
        self.archive
    }

    async fn fetch_queue(
        &self,
        limit: usize,
        max_update_time: Option<DateTime<Utc>>,
    ) -> Result<Vec<QueueRow>> {
        let queue = self.queue.lock();
        let rows = queue
            .values()
            .filter(|entry| max_update_time.map_or(true, |max| entry.update_time <= max))
            .take(limit)
            .map(|entry| QueueRow {
                entry: entry.clone(),
                summary: self.join(entry),
            })
            .collect();
        Ok(rows)
    }

    async fn queue_length(&self) -> Result<u64> {
        Ok(self.queue.lock().len() as u64)
    }

    async fn delete_queue_entries(&self, ids: &[i64]) -> Result<usize> {
        if ids.is_empty() {
            return Ok(0);
        }

        let ids: HashSet<i64> = ids.iter().copied().collect();
        let mut queue = self.queue.lock();
        let before = queue.len();
        queue.retain(|id, _| !ids.contains(id));
        Ok(before - queue.len())
    }
}
