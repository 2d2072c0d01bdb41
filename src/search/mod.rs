//! Event search index powered by Tantivy
//!
//! This module keeps a searchable copy of the event summary table and answers
//! the queries the event console needs:
//!
//! - **Structured filters**: exact terms, term sets, globs, time ranges and
//!   enumerated status/severity sets, combined with AND
//! - **Identifier search**: element identifiers are indexed as 3-grams so a plain
//!   fragment such as `rout` finds `core-router-01`
//! - **Sorting & paging**: multi-key sort over fast fields with offset paging
//! - **Aggregations**: per-tag severity histograms and worst severity
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                 EventIndex                       │
//! ├─────────────────────────────────────────────────┤
//! │  - stage() / commit()   - list()                │
//! │  - delete*() / purge()  - find_by_uuid()        │
//! │  - clear() / optimize() - count_severities()    │
//! └─────────────────────────────────────────────────┘
//!          │                          │
//!          ▼                          ▼
//! ┌──────────────────┐   ┌──────────────────────────┐
//! │  Single writer   │   │  SnapshotSlot            │
//! │  (mutex guarded) │   │  - acquire() -> lease    │
//! │                  │   │  - publish() on commit   │
//! └──────────────────┘   └──────────────────────────┘
//!          │                          │
//!          ▼                          ▼
//! ┌─────────────────────────────────────────────────┐
//! │              Tantivy Index                       │
//! ├─────────────────────────────────────────────────┤
//! │  - Identifier n-grams, summary text             │
//! │  - Fast fields (codes, times, sort keys)        │
//! │  - Doc store (full event JSON)                  │
//! └─────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use event_indexer::models::{EventSeverity, EventSummary};
//! use event_indexer::search::{EventFilter, EventIndex, EventSummaryRequest, SearchConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let index = EventIndex::open("event_summary", &SearchConfig::default())?;
//!     index.index(&EventSummary::new(
//!         "core-router-01",
//!         "/Status/Ping",
//!         "ping loss",
//!         EventSeverity::Error,
//!     ))?;
//!
//!     let request = EventSummaryRequest::new()
//!         .with_filter(EventFilter {
//!             element_identifier: Some("rout".to_string()),
//!             ..Default::default()
//!         })
//!         .with_limit(20);
//!
//!     let page = index.list(&request)?;
//!     println!("Found {} events", page.total);
//!
//!     Ok(())
//! }
//! ```

mod collectors;
mod config;
mod document;
mod error;
pub mod fields;
mod index;
mod query;
mod snapshot;
pub mod tokenizer;

pub use collectors::{SeverityCounts, SortKey, SortValue, WorstSeverity};
pub use config::{SearchConfig, SearchConfigBuilder, MIN_HEAP_PER_THREAD};
pub use document::{to_event_summary, EventDocument};
pub use error::{SearchError, SearchResult};
pub use index::{EventIndex, IndexStats};
pub use query::{
    EventFilter, EventSort, EventSortField, EventSummaryRequest, EventSummaryResult,
    FilterClause, FilterOperator, QueryBuilder, SortDirection, TimestampRange, WildcardTarget,
};
pub use snapshot::{Snapshot, SnapshotLease, SnapshotSlot};
