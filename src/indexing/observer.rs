//! Queue-size notifications published after every drain

use crate::indexing::queue::TABLE_EVENT_SUMMARY;
use crate::metrics::IndexerMetrics;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{info, warn};

/// Queue depth observed after a drain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueSizeEvent {
    /// Event table the queue belongs to
    pub table_name: String,

    /// Pending queue rows
    pub queue_size: u64,

    /// Batch limit the drain used
    pub limit: usize,
}

/// Receives a [`QueueSizeEvent`] after every successful drain
pub trait QueueSizeObserver: Send + Sync {
    fn on_queue_size(&self, event: &QueueSizeEvent);
}

impl<F> QueueSizeObserver for F
where
    F: Fn(&QueueSizeEvent) + Send + Sync,
{
    fn on_queue_size(&self, event: &QueueSizeEvent) {
        self(event)
    }
}

/// Exports queue depth and batch limit as Prometheus gauges
#[derive(Clone)]
pub struct PrometheusQueueObserver {
    metrics: IndexerMetrics,
}

impl PrometheusQueueObserver {
    pub fn new(metrics: IndexerMetrics) -> Self {
        Self { metrics }
    }
}

impl QueueSizeObserver for PrometheusQueueObserver {
    fn on_queue_size(&self, event: &QueueSizeEvent) {
        self.metrics
            .record_queue_size(&event.table_name, event.queue_size, event.limit);
    }
}

/// Back-pressure switch for event ingestion
///
/// Engages while the summary index queue is deeper than the threshold so the
/// ingest consumer can slow down until indexing catches up. Only queues of the
/// summary table count; archive backlogs never throttle ingestion.
pub struct IngestThrottle {
    /// Queue depth above which ingestion is throttled; 0 derives it from the batch limit
    threshold: u64,
    delay: Duration,
    engaged: AtomicBool,
}

impl IngestThrottle {
    pub fn new(threshold: u64, delay: Duration) -> Self {
        Self {
            threshold,
            delay,
            engaged: AtomicBool::new(false),
        }
    }

    /// Effective threshold for a drain that used `limit`
    pub fn threshold_for(&self, limit: usize) -> u64 {
        if self.threshold == 0 {
            (limit.max(100) as u64) * 2
        } else {
            self.threshold
        }
    }

    pub fn is_engaged(&self) -> bool {
        self.engaged.load(Ordering::Acquire)
    }

    /// Pause the ingest consumer should take before its next message
    pub fn delay(&self) -> Option<Duration> {
        self.is_engaged().then_some(self.delay)
    }
}

impl QueueSizeObserver for IngestThrottle {
    fn on_queue_size(&self, event: &QueueSizeEvent) {
        if !event.table_name.starts_with(TABLE_EVENT_SUMMARY) {
            return;
        }

        let threshold = self.threshold_for(event.limit);
        let lagging = event.queue_size > threshold;
        if self.engaged.swap(lagging, Ordering::AcqRel) != lagging {
            if lagging {
                warn!(
                    queue_size = event.queue_size,
                    threshold, "Enabling ingest throttling"
                );
            } else {
                info!(
                    queue_size = event.queue_size,
                    threshold, "Disabling ingest throttling"
                );
            }
        }
    }
}
