//! Event indexing core
//!
//! Keeps a Tantivy search index synchronized with a relational table of event
//! summaries and serves filtered, sorted, paginated queries and per-tag severity
//! aggregations against that index.
//!
//! - **`search`**: the index engine, field schema, identifier tokenizer, query
//!   builder and snapshot lifecycle.
//! - **`indexing`**: the queue-drain pipeline that turns pending-change rows into
//!   index updates, plus the periodic indexer that drives it.
//! - **`settings`**: partition-derived purge bounds and event settings validation.
//! - **`metrics`**: Prometheus metrics for the pipeline.

pub mod config;
pub mod error;
pub mod indexing;
pub mod metrics;
pub mod models;
pub mod search;
pub mod settings;

pub use error::{AppError, Result};
