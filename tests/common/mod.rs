//! Shared fixtures for the integration tests

#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use event_indexer::models::{EventSeverity, EventStatus, EventSummary};
use event_indexer::search::{EventIndex, SearchConfig, SearchConfigBuilder};
use std::sync::Arc;
use tempfile::TempDir;

/// Fixed reference time so sort and range assertions are deterministic
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
}

pub fn at(seconds: i64) -> DateTime<Utc> {
    base_time() + Duration::seconds(seconds)
}

/// Small config that keeps tantivy within its per-thread heap floor
pub fn test_config(temp_dir: &TempDir) -> SearchConfig {
    SearchConfigBuilder::new()
        .index_path(temp_dir.path().to_path_buf())
        .writer_heap_size(15_000_000)
        .indexing_threads(1)
        .build()
}

/// On-disk index in a fresh temp directory; keep the `TempDir` alive with it
pub fn create_test_index() -> (TempDir, Arc<EventIndex>) {
    let temp_dir = TempDir::new().unwrap();
    let index = EventIndex::open("event_summary", &test_config(&temp_dir)).unwrap();
    (temp_dir, Arc::new(index))
}

/// Builder-style helper for test events
pub struct EventBuilder {
    event: EventSummary,
}

impl EventBuilder {
    pub fn new(element: &str, event_class: &str, summary: &str) -> Self {
        let mut event = EventSummary::new(element, event_class, summary, EventSeverity::Warning);
        event.first_seen_time = base_time();
        event.last_seen_time = base_time();
        event.status_change_time = base_time();
        event.update_time = base_time();
        Self { event }
    }

    pub fn severity(mut self, severity: EventSeverity) -> Self {
        self.event.severity = severity;
        self
    }

    pub fn status(mut self, status: EventStatus) -> Self {
        self.event.status = status;
        self
    }

    pub fn last_seen(mut self, time: DateTime<Utc>) -> Self {
        self.event.last_seen_time = time;
        self
    }

    pub fn count(mut self, count: u32) -> Self {
        self.event.count = count;
        self
    }

    pub fn sub_element(mut self, sub: &str) -> Self {
        self.event.element_sub_identifier = sub.to_string();
        self
    }

    pub fn tags(mut self, tags: &[&str]) -> Self {
        self.event.tags = tags.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn build(self) -> EventSummary {
        self.event
    }
}

pub fn event(element: &str) -> EventSummary {
    EventBuilder::new(element, "/Status", "status changed").build()
}
