//! Prometheus metrics for the index queue pipeline
//!
//! Metrics are registered into a caller-supplied [`Registry`], never the
//! process-global default.
//!
//! # Example
//! ```no_run
//! use event_indexer::metrics::{self, IndexerMetrics};
//! use prometheus::Registry;
//!
//! let registry = Registry::new();
//! let metrics = IndexerMetrics::new(&registry).unwrap();
//! metrics.record_queue_size("event_summary", 42, 1000);
//! println!("{}", metrics::gather(&registry));
//! ```

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGaugeVec, Opts, Registry, TextEncoder,
};

const NAMESPACE: &str = "event_indexer";

/// Pipeline metrics, labelled by event table
#[derive(Clone)]
pub struct IndexerMetrics {
    /// Pending queue rows after the last drain
    pub queue_size: IntGaugeVec,

    /// Batch limit used by the last drain
    pub batch_limit: IntGaugeVec,

    /// Queue rows read by drains
    pub rows_drained_total: IntCounterVec,

    /// Summaries staged into the index
    pub events_indexed_total: IntCounterVec,

    /// Summaries removed from the index
    pub events_deleted_total: IntCounterVec,

    /// Failed indexing cycles
    pub cycle_failures_total: IntCounterVec,

    /// Drain cycle duration in seconds
    ///
    /// Buckets: 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0
    pub drain_duration_seconds: HistogramVec,
}

impl IndexerMetrics {
    /// Create the metrics and register them into `registry`
    pub fn new(registry: &Registry) -> Result<Self, prometheus::Error> {
        let metrics = Self {
            queue_size: IntGaugeVec::new(
                Opts::new("index_queue_size", "Pending rows in the index queue")
                    .namespace(NAMESPACE),
                &["table"],
            )?,
            batch_limit: IntGaugeVec::new(
                Opts::new("index_batch_limit", "Batch limit of the last drain")
                    .namespace(NAMESPACE),
                &["table"],
            )?,
            rows_drained_total: IntCounterVec::new(
                Opts::new("rows_drained_total", "Queue rows read by drains").namespace(NAMESPACE),
                &["table"],
            )?,
            events_indexed_total: IntCounterVec::new(
                Opts::new("events_indexed_total", "Event summaries staged into the index")
                    .namespace(NAMESPACE),
                &["table"],
            )?,
            events_deleted_total: IntCounterVec::new(
                Opts::new("events_deleted_total", "Event summaries removed from the index")
                    .namespace(NAMESPACE),
                &["table"],
            )?,
            cycle_failures_total: IntCounterVec::new(
                Opts::new("cycle_failures_total", "Indexing cycles that failed")
                    .namespace(NAMESPACE),
                &["table"],
            )?,
            drain_duration_seconds: HistogramVec::new(
                HistogramOpts::new("drain_duration_seconds", "Drain cycle duration in seconds")
                    .namespace(NAMESPACE)
                    .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0]),
                &["table"],
            )?,
        };

        registry.register(Box::new(metrics.queue_size.clone()))?;
        registry.register(Box::new(metrics.batch_limit.clone()))?;
        registry.register(Box::new(metrics.rows_drained_total.clone()))?;
        registry.register(Box::new(metrics.events_indexed_total.clone()))?;
        registry.register(Box::new(metrics.events_deleted_total.clone()))?;
        registry.register(Box::new(metrics.cycle_failures_total.clone()))?;
        registry.register(Box::new(metrics.drain_duration_seconds.clone()))?;

        Ok(metrics)
    }

    pub fn record_queue_size(&self, table: &str, queue_size: u64, limit: usize) {
        self.queue_size
            .with_label_values(&[table])
            .set(i64::try_from(queue_size).unwrap_or(i64::MAX));
        self.batch_limit
            .with_label_values(&[table])
            .set(i64::try_from(limit).unwrap_or(i64::MAX));
    }

    pub fn record_cycle(&self, table: &str, rows: usize, indexed: usize, deleted: usize, seconds: f64) {
        self.rows_drained_total
            .with_label_values(&[table])
            .inc_by(rows as u64);
        self.events_indexed_total
            .with_label_values(&[table])
            .inc_by(indexed as u64);
        self.events_deleted_total
            .with_label_values(&[table])
            .inc_by(deleted as u64);
        self.drain_duration_seconds
            .with_label_values(&[table])
            .observe(seconds);
    }

    pub fn record_failure(&self, table: &str) {
        self.cycle_failures_total.with_label_values(&[table]).inc();
    }
}

/// Render the registry in the Prometheus text exposition format
pub fn gather(registry: &Registry) -> String {
    let encoder = TextEncoder::new();
    let metric_families = registry.gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::from("# Error encoding metrics\n");
    }

    String::from_utf8(buffer).unwrap_or_else(|e| {
        tracing::error!("Failed to convert metrics to string: {}", e);
        String::from("# Error converting metrics\n")
    })
}
