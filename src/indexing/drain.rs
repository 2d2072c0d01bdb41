//! Draining the index queue into a handler

use crate::error::{AppError, Result};
use crate::indexing::handler::EventIndexHandler;
use crate::indexing::observer::{QueueSizeEvent, QueueSizeObserver};
use crate::indexing::queue::IndexQueueStore;
use crate::models::EventSummary;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

const NO_VALUE: i64 = i64::MIN;

/// Reads pending-change rows for one event table and feeds them to a handler
///
/// `drain` never deletes queue rows. Callers delete the returned ids with
/// [`IndexQueueDrain::delete_queue_entries`] once the batch has been applied, so
/// a failed drain is retried by draining again.
pub struct IndexQueueDrain {
    store: Arc<dyn IndexQueueStore>,
    observers: Vec<Arc<dyn QueueSizeObserver>>,
    /// Highest enqueue time read so far, epoch millis
    last_index_time: AtomicI64,
    last_queue_size: AtomicI64,
}

impl IndexQueueDrain {
    pub fn new(store: Arc<dyn IndexQueueStore>) -> Self {
        Self {
            store,
            observers: Vec::new(),
            last_index_time: AtomicI64::new(NO_VALUE),
            last_queue_size: AtomicI64::new(NO_VALUE),
        }
    }

    /// Notify `observer` after every drain
    pub fn with_observer(mut self, observer: Arc<dyn QueueSizeObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn table_name(&self) -> &str {
        self.store.table_name()
    }

    pub fn is_archive(&self) -> bool {
        self.store.is_archive()
    }

    /// Apply up to `limit` queue rows to `handler`, returning the ids read
    ///
    /// Rows referring to a uuid already seen in this batch are read but not
    /// applied again; the first row for a uuid decides whether it is changed
    /// or deleted.
    pub async fn drain<H>(
        &self,
        handler: &mut H,
        limit: usize,
        max_update_time: Option<DateTime<Utc>>,
    ) -> Result<Vec<i64>>
    where
        H: EventIndexHandler + ?Sized,
    {
        let rows = self.store.fetch_queue(limit, max_update_time).await?;

        let mut seen: HashSet<Uuid> = HashSet::with_capacity(rows.len());
        let mut changed: Vec<EventSummary> = Vec::new();
        let mut deleted: Vec<Uuid> = Vec::new();
        let mut ids = Vec::with_capacity(rows.len());

        for row in rows {
            ids.push(row.entry.id);
            self.last_index_time
                .fetch_max(row.entry.update_time.timestamp_millis(), Ordering::AcqRel);

            if !seen.insert(row.entry.uuid) {
                continue;
            }
            match row.summary {
                Some(summary) => changed.push(summary),
                None => deleted.push(row.entry.uuid),
            }
        }

        if !changed.is_empty() {
            handler
                .prepare_to_handle(&changed)
                .await
                .map_err(|e| processing_error("prepare batch", e))?;
        }
        for summary in &changed {
            handler
                .handle(summary)
                .await
                .map_err(|e| processing_error("handle event", e))?;
        }
        for uuid in &deleted {
            handler
                .handle_deleted(*uuid)
                .await
                .map_err(|e| processing_error("handle deleted event", e))?;
        }
        if !ids.is_empty() {
            handler
                .handle_complete()
                .await
                .map_err(|e| AppError::IndexingFatal(format!("Failed to complete batch: {}", e)))?;
        }

        let queue_size = self.store.queue_length().await?;
        self.last_queue_size
            .store(i64::try_from(queue_size).unwrap_or(i64::MAX), Ordering::Release);
        self.publish(QueueSizeEvent {
            table_name: self.store.table_name().to_string(),
            queue_size,
            limit,
        });

        debug!(
            table = %self.store.table_name(),
            rows = ids.len(),
            changed = changed.len(),
            deleted = deleted.len(),
            queue_size,
            "Drained index queue"
        );
        Ok(ids)
    }

    fn publish(&self, event: QueueSizeEvent) {
        for observer in &self.observers {
            observer.on_queue_size(&event);
        }
    }

    /// Pending rows, read independently of any drain
    pub async fn queue_length(&self) -> Result<u64> {
        self.store.queue_length().await
    }

    /// Delete consumed rows; safe to repeat
    pub async fn delete_queue_entries(&self, ids: &[i64]) -> Result<usize> {
        self.store.delete_queue_entries(ids).await
    }

    /// Highest enqueue time seen by any drain; never moves backwards
    pub fn last_index_time(&self) -> Option<DateTime<Utc>> {
        match self.last_index_time.load(Ordering::Acquire) {
            NO_VALUE => None,
            millis => DateTime::from_timestamp_millis(millis),
        }
    }

    /// Queue depth computed by the last drain
    pub fn last_queue_size(&self) -> Option<u64> {
        match self.last_queue_size.load(Ordering::Acquire) {
            NO_VALUE => None,
            size => u64::try_from(size).ok(),
        }
    }
}

fn processing_error(step: &str, err: AppError) -> AppError {
    AppError::Processing(format!("Failed to {}: {}", step, err))
}
