//! Callbacks that apply a drained batch

use crate::error::Result;
use crate::models::EventSummary;
use crate::search::EventIndex;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Receiver of one drained batch
///
/// Per batch the pipeline calls, in order: `prepare_to_handle` once with all
/// changed summaries (skipped when there are none), `handle` for each changed
/// summary in queue order, `handle_deleted` for each deleted uuid in queue
/// order, and `handle_complete` once if any queue row was read at all.
#[async_trait]
pub trait EventIndexHandler: Send {
    /// Batch-level setup before any `handle` call
    async fn prepare_to_handle(&mut self, _events: &[EventSummary]) -> Result<()> {
        Ok(())
    }

    async fn handle(&mut self, event: &EventSummary) -> Result<()>;

    async fn handle_deleted(&mut self, uuid: Uuid) -> Result<()>;

    /// End of batch; makes the applied changes durable
    async fn handle_complete(&mut self) -> Result<()>;
}

/// Handler that mirrors a batch into an [`EventIndex`]
///
/// Changed summaries are staged as they arrive; deletions are collected and
/// applied together on completion, which commits with consolidation. A batch
/// without deletions commits normally.
pub struct IndexingHandler {
    index: Arc<EventIndex>,
    staged: usize,
    deleted: Vec<Uuid>,
    indexed_total: usize,
    deleted_total: usize,
}

impl IndexingHandler {
    pub fn new(index: Arc<EventIndex>) -> Self {
        Self {
            index,
            staged: 0,
            deleted: Vec::new(),
            indexed_total: 0,
            deleted_total: 0,
        }
    }

    /// Summaries staged in the current batch
    pub fn staged(&self) -> usize {
        self.staged
    }

    /// Uuids collected for deletion in the current batch
    pub fn pending_deletes(&self) -> &[Uuid] {
        &self.deleted
    }

    /// Summaries indexed by completed batches
    pub fn indexed_total(&self) -> usize {
        self.indexed_total
    }

    /// Uuids deleted by completed batches
    pub fn deleted_total(&self) -> usize {
        self.deleted_total
    }
}

#[async_trait]
impl EventIndexHandler for IndexingHandler {
    async fn prepare_to_handle(&mut self, events: &[EventSummary]) -> Result<()> {
        debug!(index = %self.index.name(), count = events.len(), "Preparing batch");
        Ok(())
    }

    async fn handle(&mut self, event: &EventSummary) -> Result<()> {
        self.index.stage(event)?;
        self.staged += 1;
        Ok(())
    }

    async fn handle_deleted(&mut self, uuid: Uuid) -> Result<()> {
        self.deleted.push(uuid);
        Ok(())
    }

    async fn handle_complete(&mut self) -> Result<()> {
        if self.deleted.is_empty() {
            self.index.commit(false)?;
        } else {
            self.index.delete_many(&self.deleted)?;
        }

        debug!(
            index = %self.index.name(),
            staged = self.staged,
            deleted = self.deleted.len(),
            "Completed batch"
        );

        // Batch state is per drain; a reused handler starts clean
        self.indexed_total += std::mem::take(&mut self.staged);
        self.deleted_total += std::mem::take(&mut self.deleted).len();
        Ok(())
    }
}
