//! Periodic driver that keeps an index in step with its queue

use crate::error::Result;
use crate::indexing::drain::IndexQueueDrain;
use crate::indexing::handler::IndexingHandler;
use crate::metrics::IndexerMetrics;
use crate::search::EventIndex;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};
use validator::Validate;

/// Indexer configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct IndexerConfig {
    /// Run the periodic indexer
    pub enabled: bool,

    /// Queue rows per drain
    #[validate(range(min = 1, max = 100000))]
    pub batch_limit: usize,

    /// Delay between indexing cycles
    #[validate(range(min = 1))]
    pub poll_interval_ms: u64,

    /// Archive tables only: leave rows enqueued within this window for a later cycle
    pub archive_update_lag_ms: Option<u64>,

    /// Summary queue depth that engages ingest throttling (0 = twice the batch limit)
    pub throttle_threshold: u64,

    /// Pause applied to ingestion while throttled
    pub throttle_delay_ms: u64,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            batch_limit: 1000,
            poll_interval_ms: 1000,
            archive_update_lag_ms: None,
            throttle_threshold: 100_000,
            throttle_delay_ms: 100,
        }
    }
}

/// Drains the queue into the index on a fixed interval
pub struct EventIndexer {
    drain: IndexQueueDrain,
    index: Arc<EventIndex>,
    config: IndexerConfig,
    metrics: Option<IndexerMetrics>,
}

impl EventIndexer {
    pub fn new(drain: IndexQueueDrain, index: Arc<EventIndex>, config: IndexerConfig) -> Self {
        Self {
            drain,
            index,
            config,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: IndexerMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn drain(&self) -> &IndexQueueDrain {
        &self.drain
    }

    pub fn index(&self) -> &Arc<EventIndex> {
        &self.index
    }

    /// Run one cycle: drain a batch, apply it, then delete the consumed rows
    ///
    /// Returns the number of queue rows consumed.
    pub async fn index_once(&self) -> Result<usize> {
        let started = Instant::now();
        let mut handler = IndexingHandler::new(Arc::clone(&self.index));

        let ids = self
            .drain
            .drain(&mut handler, self.config.batch_limit, self.max_update_time())
            .await?;
        self.drain.delete_queue_entries(&ids).await?;

        if let Some(ref metrics) = self.metrics {
            metrics.record_cycle(
                self.drain.table_name(),
                ids.len(),
                handler.indexed_total(),
                handler.deleted_total(),
                started.elapsed().as_secs_f64(),
            );
        }
        Ok(ids.len())
    }

    /// Repeat cycles until one consumes less than a full batch
    pub async fn index_fully(&self) -> Result<usize> {
        let mut total = 0;
        loop {
            let consumed = self.index_once().await?;
            total += consumed;
            if consumed < self.config.batch_limit {
                return Ok(total);
            }
        }
    }

    /// Upper bound on enqueue time for this cycle
    fn max_update_time(&self) -> Option<DateTime<Utc>> {
        if !self.drain.is_archive() {
            return None;
        }
        let lag = self.config.archive_update_lag_ms?;
        let lag = chrono::Duration::try_milliseconds(i64::try_from(lag).unwrap_or(i64::MAX))
            .unwrap_or(chrono::Duration::MAX);
        // A lag reaching past the earliest representable time admits nothing
        Some(
            Utc::now()
                .checked_sub_signed(lag)
                .unwrap_or(DateTime::<Utc>::MIN_UTC),
        )
    }

    /// Run cycles in the background until `shutdown` turns true or its sender drops
    ///
    /// A failed cycle is logged and retried on the next tick.
    pub fn spawn(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let table = self.drain.table_name().to_string();
            info!(
                table = %table,
                poll_interval_ms = self.config.poll_interval_ms,
                batch_limit = self.config.batch_limit,
                "Starting event indexer"
            );

            let mut ticker = tokio::time::interval(Duration::from_millis(self.config.poll_interval_ms));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = self.index_fully().await {
                            error!(table = %table, error = %e, code = e.error_code(), "Indexing cycle failed");
                            if let Some(ref metrics) = self.metrics {
                                metrics.record_failure(&table);
                            }
                        }
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }

            info!(table = %table, "Stopped event indexer");
        })
    }
}
