//! Event search index engine

use crate::models::{EventSeverity, EventStatus, EventSummary};
use crate::search::collectors::{sorted_top_docs, SeverityCounts, WorstSeverity};
use crate::search::config::SearchConfig;
use crate::search::document::{to_event_summary, uuid_term, EventDocument};
use crate::search::error::{SearchError, SearchResult};
use crate::search::fields::{self, build_event_schema, EventFields};
use crate::search::query::{
    EventFilter, EventSummaryRequest, EventSummaryResult, FilterClause, FilterOperator,
    QueryBuilder,
};
use crate::search::snapshot::{SnapshotLease, SnapshotSlot};
use crate::search::tokenizer::register_tokenizers;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::Bound;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use tantivy::collector::{Count, TopDocs};
use tantivy::merge_policy::NoMergePolicy;
use tantivy::query::{Query, RangeQuery, TermQuery};
use tantivy::schema::IndexRecordOption;
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument};
use tracing::{debug, info};
use uuid::Uuid;
use validator::Validate;

/// Index statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStats {
    /// Index name
    pub name: String,

    /// Live documents in the current snapshot
    pub total_documents: u64,

    /// Number of segments
    pub num_segments: usize,

    /// Generation of the current snapshot
    pub snapshot_generation: u64,

    /// Leases held on the current snapshot
    pub outstanding_leases: usize,

    /// Changes staged since the last consolidation
    pub events_since_optimize: usize,

    /// Last commit timestamp
    pub last_commit: Option<DateTime<Utc>>,
}

/// Search index over event summaries
///
/// One writer, many readers. Writes (`stage`, `commit`, deletes, `purge`,
/// `clear`) are expected to come from a single task; reads may run from any
/// number of threads and always go through a snapshot lease.
pub struct EventIndex {
    /// Name used in logs and metrics
    name: String,

    /// The Tantivy index
    index: Index,

    fields: EventFields,

    /// Index writer
    writer: Mutex<IndexWriter>,

    /// Manually reloaded reader feeding the snapshot slot
    reader: IndexReader,

    snapshots: SnapshotSlot,

    query_builder: QueryBuilder,

    /// Best-effort counter, lost on restart
    events_since_optimize: AtomicUsize,

    last_commit: Mutex<Option<DateTime<Utc>>>,

    /// Configuration
    config: SearchConfig,
}

impl EventIndex {
    /// Open the on-disk index at `config.index_path`, creating it if absent
    pub fn open(name: impl Into<String>, config: &SearchConfig) -> SearchResult<Self> {
        validate_config(config)?;

        // Create index directory if it doesn't exist
        std::fs::create_dir_all(&config.index_path).map_err(|e| {
            SearchError::IndexInitFailed(format!("Failed to create index directory: {}", e))
        })?;

        let index = if Self::index_exists(&config.index_path) {
            Index::open_in_dir(&config.index_path).map_err(|e| {
                SearchError::IndexInitFailed(format!("Failed to open existing index: {}", e))
            })?
        } else {
            Index::create_in_dir(&config.index_path, build_event_schema()).map_err(|e| {
                SearchError::IndexInitFailed(format!("Failed to create new index: {}", e))
            })?
        };

        Self::with_index(name.into(), index, config)
    }

    /// Create a transient index held in memory
    pub fn create_in_ram(name: impl Into<String>, config: &SearchConfig) -> SearchResult<Self> {
        validate_config(config)?;
        let index = Index::create_in_ram(build_event_schema());
        Self::with_index(name.into(), index, config)
    }

    fn with_index(name: String, index: Index, config: &SearchConfig) -> SearchResult<Self> {
        register_tokenizers(&index);

        let fields = EventFields::from_schema(&index.schema()).map_err(|e| {
            SearchError::IndexInitFailed(format!("Index schema is not an event schema: {}", e))
        })?;

        let writer: IndexWriter = index
            .writer_with_num_threads(config.effective_threads(), config.writer_heap_size)
            .map_err(|e| SearchError::IndexInitFailed(format!("Failed to create writer: {}", e)))?;
        // Segments are consolidated only through `optimize`
        writer.set_merge_policy(Box::new(NoMergePolicy));

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()
            .map_err(|e| SearchError::IndexInitFailed(format!("Failed to create reader: {}", e)))?;

        let snapshots = SnapshotSlot::new(reader.searcher());
        let query_builder = QueryBuilder::new(&index);

        info!(
            index = %name,
            threads = config.effective_threads(),
            "Opened event index"
        );

        Ok(Self {
            name,
            index,
            fields,
            writer: Mutex::new(writer),
            reader,
            snapshots,
            query_builder,
            events_since_optimize: AtomicUsize::new(0),
            last_commit: Mutex::new(None),
            config: config.clone(),
        })
    }

    /// Check if an index exists at the given path
    fn index_exists(path: &Path) -> bool {
        path.join("meta.json").exists()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Underlying tantivy index
    pub fn tantivy_index(&self) -> &Index {
        &self.index
    }

    pub fn query_builder(&self) -> &QueryBuilder {
        &self.query_builder
    }

    /// Pin the current snapshot for a read
    pub fn snapshot(&self) -> SnapshotLease {
        self.snapshots.acquire()
    }

    /// Upsert one summary by uuid; invisible to readers until the next commit
    pub fn stage(&self, summary: &EventSummary) -> SearchResult<()> {
        let document = EventDocument::new(summary);
        let tantivy_doc = document.to_tantivy_doc(&self.fields)?;

        let writer = self.writer.lock();
        writer.delete_term(document.key(&self.fields));
        writer.add_document(tantivy_doc).map_err(|e| {
            SearchError::IndexingFailed(format!("Failed to add document {}: {}", summary.uuid, e))
        })?;
        drop(writer);

        self.events_since_optimize.fetch_add(1, Ordering::Relaxed);
        debug!(index = %self.name, uuid = %summary.uuid, "Staged event");
        Ok(())
    }

    /// Flush staged changes and publish a new snapshot
    ///
    /// Consolidates segments when forced or once the pending-change counter
    /// reaches the configured threshold.
    pub fn commit(&self, force_optimize: bool) -> SearchResult<()> {
        let mut writer = self.writer.lock();
        writer
            .commit()
            .map_err(|e| SearchError::IndexingFailed(format!("Failed to commit: {}", e)))?;

        let pending = self.events_since_optimize.load(Ordering::Relaxed);
        if force_optimize || pending >= self.config.optimize_threshold {
            self.consolidate(&mut writer)?;
            self.events_since_optimize.store(0, Ordering::Relaxed);
            info!(index = %self.name, pending, forced = force_optimize, "Optimized index");
        }
        drop(writer);

        *self.last_commit.lock() = Some(Utc::now());
        self.refresh()
    }

    /// Merge all searchable segments into one
    fn consolidate(&self, writer: &mut IndexWriter) -> SearchResult<()> {
        let metas = self.index.searchable_segment_metas()?;
        if metas.len() < 2 && !metas.iter().any(|meta| meta.has_deletes()) {
            return Ok(());
        }

        let segment_ids: Vec<_> = metas.iter().map(|meta| meta.id()).collect();
        writer
            .merge(&segment_ids)
            .wait()
            .map_err(|e| SearchError::IndexingFailed(format!("Failed to merge segments: {}", e)))?;
        Ok(())
    }

    /// Reload the reader and swap in the new snapshot if it changed
    fn refresh(&self) -> SearchResult<()> {
        self.reader
            .reload()
            .map_err(|e| SearchError::SearchFailed(format!("Failed to reload reader: {}", e)))?;

        if self.snapshots.publish(self.reader.searcher()) {
            debug!(
                index = %self.name,
                generation = self.snapshots.generation(),
                "Published snapshot"
            );
        }
        Ok(())
    }

    /// Stage and commit one summary
    pub fn index(&self, summary: &EventSummary) -> SearchResult<()> {
        self.stage(summary)?;
        self.commit(false)
    }

    /// Stage and commit a batch of summaries
    pub fn index_many(&self, summaries: &[EventSummary]) -> SearchResult<usize> {
        for summary in summaries {
            self.stage(summary)?;
        }
        self.commit(false)?;
        Ok(summaries.len())
    }

    /// Delete one document by uuid
    pub fn delete(&self, uuid: &Uuid) -> SearchResult<()> {
        self.writer.lock().delete_term(uuid_term(&self.fields, uuid));
        debug!(index = %self.name, uuid = %uuid, "Deleted event");
        self.commit(false)
    }

    /// Delete documents by uuid, then consolidate
    pub fn delete_many(&self, uuids: &[Uuid]) -> SearchResult<usize> {
        if uuids.is_empty() {
            return Ok(0);
        }

        {
            let writer = self.writer.lock();
            for uuid in uuids {
                writer.delete_term(uuid_term(&self.fields, uuid));
            }
        }

        info!(index = %self.name, count = uuids.len(), "Deleted events");
        self.commit(true)?;
        Ok(uuids.len())
    }

    /// Delete every document matching the filter, then consolidate
    pub fn delete_by_filter(&self, filter: &EventFilter) -> SearchResult<()> {
        let query = self.query_builder.build(Some(filter))?;
        self.delete_query(query)?;
        info!(index = %self.name, "Deleted events by filter");
        self.commit(true)
    }

    /// Delete documents last seen at or before `now - older_than`
    pub fn purge(&self, older_than: chrono::Duration) -> SearchResult<()> {
        if older_than < chrono::Duration::zero() {
            return Err(SearchError::InvalidArgument(format!(
                "purge duration must not be negative: {}",
                older_than
            )));
        }

        let Some(cutoff) = Utc::now().checked_sub_signed(older_than) else {
            debug!(index = %self.name, older_than = %older_than, "Purge cutoff predates every event");
            return Ok(());
        };
        let query = RangeQuery::new_i64_bounds(
            fields::LAST_SEEN_TIME.to_string(),
            Bound::Unbounded,
            Bound::Included(cutoff.timestamp_millis()),
        );
        self.delete_query(Box::new(query))?;

        info!(index = %self.name, cutoff = %cutoff, "Purged events");
        self.commit(true)
    }

    /// Remove every document, then consolidate
    pub fn clear(&self) -> SearchResult<()> {
        self.writer
            .lock()
            .delete_all_documents()
            .map_err(|e| SearchError::DeletionFailed(format!("Failed to clear index: {}", e)))?;
        info!(index = %self.name, "Cleared index");
        self.commit(true)
    }

    /// Commit and consolidate
    pub fn optimize(&self) -> SearchResult<()> {
        self.commit(true)
    }

    fn delete_query(&self, query: Box<dyn Query>) -> SearchResult<()> {
        self.writer
            .lock()
            .delete_query(query)
            .map_err(|e| SearchError::DeletionFailed(format!("Failed to delete: {}", e)))?;
        Ok(())
    }

    /// One page of events matching the request
    pub fn list(&self, request: &EventSummaryRequest) -> SearchResult<EventSummaryResult> {
        let limit = request.effective_limit(self.config.max_results);
        let offset = request.effective_offset();
        let window = limit.saturating_add(offset);
        let query = self.query_builder.build(request.filter.as_ref())?;

        // Never collect more hits than the snapshot holds
        let snapshot = self.snapshots.acquire();
        let collect = window.min(snapshot.num_docs() as usize).max(1);
        let collector = (sorted_top_docs(&request.effective_sort(), collect), Count);
        let (top_docs, total) = snapshot
            .search(query.as_ref(), &collector)
            .map_err(|e| SearchError::SearchFailed(format!("Failed to list events: {}", e)))?;

        let mut events = Vec::with_capacity(top_docs.len().saturating_sub(offset));
        for (_key, address) in top_docs.into_iter().skip(offset) {
            let doc: TantivyDocument = snapshot.doc(address)?;
            events.push(to_event_summary(&doc, &self.fields)?);
        }
        drop(snapshot);

        let next_offset = (total > window).then_some(window.saturating_add(1));
        info!(
            index = %self.name,
            total,
            returned = events.len(),
            limit,
            offset,
            "Listed events"
        );

        Ok(EventSummaryResult {
            events,
            total,
            limit,
            next_offset,
        })
    }

    /// Exact lookup by uuid
    pub fn find_by_uuid(&self, uuid: &Uuid) -> SearchResult<Option<EventSummary>> {
        let query = TermQuery::new(uuid_term(&self.fields, uuid), IndexRecordOption::Basic);

        let snapshot = self.snapshots.acquire();
        let top_docs = snapshot
            .search(&query, &TopDocs::with_limit(1))
            .map_err(|e| SearchError::SearchFailed(format!("Failed to find {}: {}", uuid, e)))?;

        match top_docs.first() {
            Some((_score, address)) => {
                let doc: TantivyDocument = snapshot.doc(*address)?;
                Ok(Some(to_event_summary(&doc, &self.fields)?))
            }
            None => Ok(None),
        }
    }

    /// Severity histogram of open events per tag; tags without matches are omitted
    pub fn count_severities(
        &self,
        tags: &[String],
    ) -> SearchResult<BTreeMap<String, BTreeMap<EventSeverity, u64>>> {
        let snapshot = self.snapshots.acquire();
        let mut result = BTreeMap::new();

        for tag in tags {
            let query = self.open_events_tagged(tag)?;
            let counts = snapshot
                .search(query.as_ref(), &SeverityCounts)
                .map_err(|e| SearchError::SearchFailed(format!("Failed to count {}: {}", tag, e)))?;
            if !counts.is_empty() {
                result.insert(tag.clone(), counts);
            }
        }

        Ok(result)
    }

    /// Highest severity of open events per tag; tags without matches are omitted
    pub fn find_worst_severity(
        &self,
        tags: &[String],
    ) -> SearchResult<BTreeMap<String, EventSeverity>> {
        let snapshot = self.snapshots.acquire();
        let mut result = BTreeMap::new();

        for tag in tags {
            let query = self.open_events_tagged(tag)?;
            let worst = snapshot
                .search(query.as_ref(), &WorstSeverity)
                .map_err(|e| SearchError::SearchFailed(format!("Failed to rank {}: {}", tag, e)))?;
            if let Some(severity) = worst {
                result.insert(tag.clone(), severity);
            }
        }

        Ok(result)
    }

    fn open_events_tagged(&self, tag: &str) -> SearchResult<Box<dyn Query>> {
        self.query_builder.build_clauses(&[
            FilterClause::ExactSet {
                field: fields::TAGS.to_string(),
                values: vec![tag.to_string()],
                op: FilterOperator::Or,
            },
            FilterClause::EnumSet {
                field: fields::STATUS.to_string(),
                codes: EventStatus::OPEN.iter().map(EventStatus::code).collect(),
            },
        ])
    }

    /// Get index statistics
    pub fn stats(&self) -> IndexStats {
        let snapshot = self.snapshots.acquire();
        let total_documents = snapshot.num_docs();
        let num_segments = snapshot.segment_readers().len();
        let snapshot_generation = snapshot.generation();
        drop(snapshot);

        IndexStats {
            name: self.name.clone(),
            total_documents,
            num_segments,
            snapshot_generation,
            outstanding_leases: self.snapshots.outstanding_leases(),
            events_since_optimize: self.events_since_optimize.load(Ordering::Relaxed),
            last_commit: *self.last_commit.lock(),
        }
    }
}

fn validate_config(config: &SearchConfig) -> SearchResult<()> {
    config
        .validate()
        .map_err(|e| SearchError::InvalidConfiguration(e.to_string()))
}
