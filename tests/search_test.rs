//! Integration tests for the event index

mod common;

use chrono::Duration;
use common::*;
use event_indexer::models::{EventSeverity, EventStatus};
use event_indexer::search::*;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

fn list(index: &EventIndex, request: EventSummaryRequest) -> EventSummaryResult {
    index.list(&request).unwrap()
}

fn elements(result: &EventSummaryResult) -> Vec<String> {
    result
        .events
        .iter()
        .map(|e| e.element_identifier.clone())
        .collect()
}

fn filtered(filter: EventFilter) -> EventSummaryRequest {
    EventSummaryRequest::new().with_filter(filter)
}

#[test]
fn test_empty_index() {
    let (_dir, index) = create_test_index();

    let result = list(&index, EventSummaryRequest::new());
    assert!(result.events.is_empty());
    assert_eq!(result.total, 0);
    assert_eq!(result.next_offset, None);
    assert_eq!(index.stats().total_documents, 0);
}

#[test]
fn test_last_staged_document_wins() {
    let (_dir, index) = create_test_index();

    let mut event = event("web-01");
    index.stage(&event).unwrap();
    event.summary = "second version".to_string();
    event.count = 2;
    index.stage(&event).unwrap();
    index.commit(false).unwrap();

    assert_eq!(index.stats().total_documents, 1);
    let found = index.find_by_uuid(&event.uuid).unwrap().unwrap();
    assert_eq!(found.summary, "second version");
    assert_eq!(found.count, 2);
}

#[test]
fn test_list_pages_by_last_seen() {
    let (_dir, index) = create_test_index();
    index
        .index_many(&[
            EventBuilder::new("ten", "/Status", "a").last_seen(at(10)).build(),
            EventBuilder::new("twenty", "/Status", "b").last_seen(at(20)).build(),
            EventBuilder::new("thirty", "/Status", "c").last_seen(at(30)).build(),
        ])
        .unwrap();

    let first = list(&index, EventSummaryRequest::new().with_limit(2));
    assert_eq!(elements(&first), vec!["thirty", "twenty"]);
    assert_eq!(first.total, 3);
    assert_eq!(first.limit, 2);
    assert_eq!(first.next_offset, Some(3));

    let second = list(&index, EventSummaryRequest::new().with_limit(2).with_offset(2));
    assert_eq!(elements(&second), vec!["ten"]);
    assert_eq!(second.next_offset, None);
}

#[test]
fn test_offset_past_end_returns_empty_page() {
    let (_dir, index) = create_test_index();
    index.index(&event("only")).unwrap();

    let result = list(&index, EventSummaryRequest::new().with_limit(10).with_offset(1 << 40));
    assert!(result.events.is_empty());
    assert_eq!(result.total, 1);
    assert_eq!(result.next_offset, None);
}

#[test]
fn test_out_of_range_limit_uses_maximum() {
    let (_dir, index) = create_test_index();
    let events: Vec<_> = (0..5).map(|i| event(&format!("host-{}", i))).collect();
    index.index_many(&events).unwrap();

    for limit in [0, -3, 1_000_000] {
        let result = list(&index, EventSummaryRequest::new().with_limit(limit));
        assert_eq!(result.limit, SearchConfig::default().max_results);
        assert_eq!(result.events.len(), 5);
    }

    let result = list(&index, EventSummaryRequest::new().with_offset(-4));
    assert_eq!(result.events.len(), 5);
}

#[test]
fn test_sort_directions() {
    let (_dir, index) = create_test_index();
    index
        .index_many(&[
            EventBuilder::new("bravo", "/Status", "x").count(5).build(),
            EventBuilder::new("alpha", "/Status", "x").count(1).build(),
            EventBuilder::new("charlie", "/Status", "x").count(3).build(),
        ])
        .unwrap();

    let ascending = list(
        &index,
        EventSummaryRequest::new().with_sort(EventSort::ascending(EventSortField::ElementIdentifier)),
    );
    assert_eq!(elements(&ascending), vec!["alpha", "bravo", "charlie"]);

    let by_count = list(
        &index,
        EventSummaryRequest::new().with_sort(EventSort::descending(EventSortField::Count)),
    );
    assert_eq!(elements(&by_count), vec!["bravo", "charlie", "alpha"]);
}

#[test]
fn test_sort_across_segments() {
    let (_dir, index) = create_test_index();
    index.index(&EventBuilder::new("mike", "/Status", "x").build()).unwrap();
    index.index(&EventBuilder::new("alpha", "/Status", "x").build()).unwrap();
    index.index(&EventBuilder::new("zulu", "/Status", "x").build()).unwrap();
    assert!(index.stats().num_segments >= 2);

    let result = list(
        &index,
        EventSummaryRequest::new().with_sort(EventSort::ascending(EventSortField::ElementIdentifier)),
    );
    assert_eq!(elements(&result), vec!["alpha", "mike", "zulu"]);
}

#[test]
fn test_identifier_substring_search() {
    let (_dir, index) = create_test_index();
    index
        .index_many(&[event("core-router-01"), event("edge-switch-02"), event("db")])
        .unwrap();

    let by_gram = list(
        &index,
        filtered(EventFilter {
            element_identifier: Some("ROUT".to_string()),
            ..Default::default()
        }),
    );
    assert_eq!(elements(&by_gram), vec!["core-router-01"]);

    // shorter than one gram, so it falls back to a contains match
    let short = list(
        &index,
        filtered(EventFilter {
            element_identifier: Some("db".to_string()),
            ..Default::default()
        }),
    );
    assert_eq!(elements(&short), vec!["db"]);

    let glob = list(
        &index,
        filtered(EventFilter {
            element_identifier: Some("edge-*".to_string()),
            ..Default::default()
        }),
    );
    assert_eq!(elements(&glob), vec!["edge-switch-02"]);
}

#[test]
fn test_summary_search() {
    let (_dir, index) = create_test_index();
    index
        .index_many(&[
            EventBuilder::new("a", "/Status", "Disk full on /var").build(),
            EventBuilder::new("b", "/Status", "Fan failure").build(),
        ])
        .unwrap();

    let result = list(
        &index,
        filtered(EventFilter {
            summary: Some("disk".to_string()),
            ..Default::default()
        }),
    );
    assert_eq!(elements(&result), vec!["a"]);

    let result = list(
        &index,
        filtered(EventFilter {
            summary: Some("fan fail*".to_string()),
            ..Default::default()
        }),
    );
    assert_eq!(elements(&result), vec!["b"]);
}

#[test]
fn test_event_class_paths() {
    let (_dir, index) = create_test_index();
    index
        .index_many(&[
            EventBuilder::new("ping", "/Status/Ping", "x").build(),
            EventBuilder::new("status", "/Status", "x").build(),
            EventBuilder::new("perf", "/Perf/CPU", "x").build(),
        ])
        .unwrap();

    let class = |pattern: &str| {
        let mut found = elements(&list(
            &index,
            filtered(EventFilter {
                event_class: Some(pattern.to_string()),
                ..Default::default()
            }),
        ));
        found.sort();
        found
    };

    assert_eq!(class("/Status"), vec!["status"]);
    assert_eq!(class("/status/"), vec!["ping", "status"]);
    assert_eq!(class("/Status/P*"), vec!["ping"]);
    assert_eq!(class("/perf/"), vec!["perf"]);
}

#[test]
fn test_filter_by_status_severity_and_time() {
    let (_dir, index) = create_test_index();
    index
        .index_many(&[
            EventBuilder::new("new-error", "/Status", "x")
                .severity(EventSeverity::Error)
                .last_seen(at(100))
                .build(),
            EventBuilder::new("closed-error", "/Status", "x")
                .severity(EventSeverity::Error)
                .status(EventStatus::Closed)
                .last_seen(at(200))
                .build(),
            EventBuilder::new("new-info", "/Status", "x")
                .severity(EventSeverity::Info)
                .last_seen(at(300))
                .build(),
        ])
        .unwrap();

    let result = list(
        &index,
        filtered(EventFilter {
            statuses: vec![EventStatus::New],
            severities: vec![EventSeverity::Error, EventSeverity::Critical],
            ..Default::default()
        }),
    );
    assert_eq!(elements(&result), vec!["new-error"]);

    let result = list(
        &index,
        filtered(EventFilter {
            last_seen: Some(TimestampRange::since(at(200))),
            ..Default::default()
        }),
    );
    assert_eq!(elements(&result), vec!["new-info", "closed-error"]);
}

#[test]
fn test_tags_any_and_all() {
    let (_dir, index) = create_test_index();
    index
        .index_many(&[
            EventBuilder::new("both", "/Status", "x").tags(&["t1", "t2"]).build(),
            EventBuilder::new("one", "/Status", "x").tags(&["t1"]).build(),
            EventBuilder::new("none", "/Status", "x").build(),
        ])
        .unwrap();

    let any = list(
        &index,
        filtered(EventFilter {
            tags: vec!["t1".to_string(), "t2".to_string()],
            ..Default::default()
        }),
    );
    assert_eq!(any.total, 2);

    let all = list(
        &index,
        filtered(EventFilter {
            tags: vec!["t1".to_string(), "t2".to_string()],
            tags_op: FilterOperator::And,
            ..Default::default()
        }),
    );
    assert_eq!(elements(&all), vec!["both"]);
}

#[test]
fn test_unknown_field_is_rejected() {
    let (_dir, index) = create_test_index();
    let query = index.query_builder().build_clauses(&[FilterClause::Exact {
        field: "no_such_field".to_string(),
        value: "x".to_string(),
    }]);
    assert!(matches!(query, Err(SearchError::InvalidArgument(_))));
}

#[test]
fn test_delete_many_and_by_filter() {
    let (_dir, index) = create_test_index();
    let a = event("a");
    let b = event("b");
    let c = EventBuilder::new("c", "/Perf", "x").build();
    index.index_many(&[a.clone(), b.clone(), c]).unwrap();

    assert_eq!(index.delete_many(&[]).unwrap(), 0);
    assert_eq!(index.delete_many(&[a.uuid, Uuid::new_v4()]).unwrap(), 2);
    assert!(index.find_by_uuid(&a.uuid).unwrap().is_none());
    assert!(index.find_by_uuid(&b.uuid).unwrap().is_some());

    index
        .delete_by_filter(&EventFilter {
            event_class: Some("/perf".to_string()),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(index.stats().total_documents, 1);
}

#[test]
fn test_purge() {
    let (_dir, index) = create_test_index();
    let recent = EventBuilder::new("recent", "/Status", "x")
        .last_seen(chrono::Utc::now() - Duration::hours(1))
        .build();
    let old = EventBuilder::new("old", "/Status", "x")
        .last_seen(chrono::Utc::now() - Duration::days(10))
        .build();
    index.index_many(&[recent, old]).unwrap();

    assert!(matches!(
        index.purge(Duration::milliseconds(-1)),
        Err(SearchError::InvalidArgument(_))
    ));
    assert_eq!(index.stats().total_documents, 2);

    index.purge(Duration::days(1)).unwrap();
    assert_eq!(elements(&list(&index, EventSummaryRequest::new())), vec!["recent"]);

    index.purge(Duration::zero()).unwrap();
    assert_eq!(index.stats().total_documents, 0);
}

#[test]
fn test_purge_beyond_time_range_keeps_events() {
    let (_dir, index) = create_test_index();
    index.index(&event("host")).unwrap();

    index.purge(Duration::days(100_000_000)).unwrap();
    assert_eq!(index.stats().total_documents, 1);
}

#[test]
fn test_single_delete_does_not_consolidate() {
    let (_dir, index) = create_test_index();
    let a = event("a");
    let b = event("b");
    index.index_many(&[a.clone(), event("a2")]).unwrap();
    index.index_many(&[b.clone(), event("b2")]).unwrap();
    assert_eq!(index.stats().num_segments, 2);
    assert_eq!(index.stats().events_since_optimize, 4);

    index.delete(&a.uuid).unwrap();
    let stats = index.stats();
    assert_eq!(stats.total_documents, 3);
    assert_eq!(stats.num_segments, 2);
    assert_eq!(stats.events_since_optimize, 4);

    index.delete_many(&[b.uuid]).unwrap();
    let stats = index.stats();
    assert_eq!(stats.total_documents, 2);
    assert_eq!(stats.num_segments, 1);
    assert_eq!(stats.events_since_optimize, 0);
}

#[test]
fn test_clear_and_optimize() {
    let (_dir, index) = create_test_index();
    for i in 0..3 {
        index.index(&event(&format!("host-{}", i))).unwrap();
    }
    index.optimize().unwrap();
    assert_eq!(index.stats().num_segments, 1);
    assert_eq!(index.stats().events_since_optimize, 0);

    index.clear().unwrap();
    assert_eq!(index.stats().total_documents, 0);
}

#[test]
fn test_severity_aggregations_count_open_events_only() {
    let (_dir, index) = create_test_index();
    index
        .index_many(&[
            EventBuilder::new("a", "/Status", "x")
                .severity(EventSeverity::Warning)
                .tags(&["svc"])
                .build(),
            EventBuilder::new("b", "/Status", "x")
                .severity(EventSeverity::Warning)
                .status(EventStatus::Acknowledged)
                .tags(&["svc"])
                .build(),
            EventBuilder::new("c", "/Status", "x")
                .severity(EventSeverity::Critical)
                .status(EventStatus::Closed)
                .tags(&["svc", "closed-only"])
                .build(),
            EventBuilder::new("d", "/Status", "x")
                .severity(EventSeverity::Error)
                .tags(&["svc"])
                .build(),
        ])
        .unwrap();

    let tags = vec!["svc".to_string(), "closed-only".to_string(), "unknown".to_string()];

    let counts = index.count_severities(&tags).unwrap();
    let expected: BTreeMap<_, _> = [(EventSeverity::Warning, 2), (EventSeverity::Error, 1)]
        .into_iter()
        .collect();
    assert_eq!(counts.len(), 1);
    assert_eq!(counts["svc"], expected);

    let worst = index.find_worst_severity(&tags).unwrap();
    assert_eq!(worst.len(), 1);
    assert_eq!(worst["svc"], EventSeverity::Error);
}

#[test]
fn test_lease_outlives_later_commits() {
    let (_dir, index) = create_test_index();
    index.index(&event("first")).unwrap();

    let lease = index.snapshot();
    let generation = lease.generation();
    index.index(&event("second")).unwrap();

    assert_eq!(lease.num_docs(), 1);
    assert!(index.stats().snapshot_generation > generation);
    assert_eq!(index.stats().outstanding_leases, 0);
    drop(lease);

    assert_eq!(index.snapshot().num_docs(), 2);
}

#[test]
fn test_reads_run_alongside_writes() {
    let (_dir, index) = create_test_index();
    let done = AtomicBool::new(false);

    std::thread::scope(|scope| {
        let readers: Vec<_> = (0..4)
            .map(|_| {
                scope.spawn(|| {
                    let mut last_total = 0;
                    while !done.load(Ordering::Acquire) {
                        let result = index.list(&EventSummaryRequest::new().with_limit(10)).unwrap();
                        assert!(result.total >= last_total);
                        last_total = result.total;
                    }
                })
            })
            .collect();

        for i in 0..40 {
            index.index(&event(&format!("host-{}", i))).unwrap();
            if i % 10 == 9 {
                index.optimize().unwrap();
            }
        }
        done.store(true, Ordering::Release);

        for reader in readers {
            reader.join().unwrap();
        }
    });

    let stats = index.stats();
    assert_eq!(stats.total_documents, 40);
    assert_eq!(stats.outstanding_leases, 0);
}

#[test]
fn test_reopen_after_restart() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let config = test_config(&temp_dir);
    let event = event("persisted");
    {
        let index = EventIndex::open("event_summary", &config).unwrap();
        index.index(&event).unwrap();
    }

    let index = EventIndex::open("event_summary", &config).unwrap();
    assert_eq!(index.find_by_uuid(&event.uuid).unwrap(), Some(event));
}
