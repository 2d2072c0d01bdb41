//! Queue-drain pipeline between the event tables and the search index
//!
//! Writers to an event table also append a row to that table's index queue.
//! The pipeline reads queue rows in id order, joins them against the table,
//! coalesces repeated uuids within a batch and hands the result to an
//! [`EventIndexHandler`]:
//!
//! ```text
//!  event_summary_index_queue ──fetch──▶ IndexQueueDrain ──▶ EventIndexHandler
//!            ▲                               │                    │
//!            └──── delete consumed ids ◀─────┤                    ▼
//!                                            │               EventIndex
//!                                            ▼
//!                                   QueueSizeObserver(s)
//! ```
//!
//! [`EventIndexer`] runs that loop on a timer. Queue rows are deleted only after
//! a batch has been applied, so delivery into the handler is at-least-once.

mod drain;
mod handler;
mod indexer;
mod observer;
mod queue;

pub use drain::IndexQueueDrain;
pub use handler::{EventIndexHandler, IndexingHandler};
pub use indexer::{EventIndexer, IndexerConfig};
pub use observer::{IngestThrottle, PrometheusQueueObserver, QueueSizeEvent, QueueSizeObserver};
pub use queue::{
    queue_table_name, IndexQueueStore, InMemoryEventStore, QueueEntry, QueueRow,
    TABLE_EVENT_ARCHIVE, TABLE_EVENT_SUMMARY,
};
