//! Criterion benchmarks for the event index
//!
//! These benchmarks measure:
//! - Identifier n-gram tokenization
//! - Batch staging and commit
//! - Sorted, filtered listing
//! - Per-tag severity aggregation

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use event_indexer::models::{EventSeverity, EventSummary};
use event_indexer::search::tokenizer::identifier_analyzer;
use event_indexer::search::{
    EventFilter, EventIndex, EventSort, EventSortField, EventSummaryRequest, SearchConfig,
};
use tantivy::tokenizer::TokenStream;

const SEVERITIES: [EventSeverity; 4] = [
    EventSeverity::Info,
    EventSeverity::Warning,
    EventSeverity::Error,
    EventSeverity::Critical,
];

fn events(count: usize) -> Vec<EventSummary> {
    (0..count)
        .map(|i| {
            let mut event = EventSummary::new(
                format!("rack-{}-host-{:05}", i % 40, i),
                if i % 3 == 0 { "/Status/Ping" } else { "/Perf/CPU" },
                format!("threshold of {} exceeded on interface eth{}", i % 97, i % 4),
                SEVERITIES[i % SEVERITIES.len()],
            );
            event.count = (i % 50) as u32 + 1;
            event.tags = vec![format!("service-{}", i % 10)];
            event
        })
        .collect()
}

fn populated_index(count: usize) -> EventIndex {
    let index = EventIndex::create_in_ram("bench", &SearchConfig::default()).unwrap();
    index.index_many(&events(count)).unwrap();
    index.optimize().unwrap();
    index
}

/// Benchmark identifier analysis
fn bench_tokenizer(c: &mut Criterion) {
    let mut analyzer = identifier_analyzer();
    let text = "core-router-01.dc2.example.net GigabitEthernet0/0/12";

    c.bench_function("identifier_ngrams", |b| {
        b.iter(|| {
            let mut stream = analyzer.token_stream(black_box(text));
            let mut tokens = 0;
            while stream.advance() {
                tokens += 1;
            }
            tokens
        });
    });
}

/// Benchmark staging plus a single commit
fn bench_index_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("index_batch");

    for size in [100usize, 1000] {
        let batch = events(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &batch, |b, batch| {
            let index = EventIndex::create_in_ram("bench", &SearchConfig::default()).unwrap();
            b.iter(|| index.index_many(black_box(batch)).unwrap());
        });
    }

    group.finish();
}

/// Benchmark listing with filters and sorts
fn bench_list(c: &mut Criterion) {
    let index = populated_index(10_000);
    let mut group = c.benchmark_group("list");

    group.bench_function("default_sort", |b| {
        let request = EventSummaryRequest::new().with_limit(50);
        b.iter(|| index.list(black_box(&request)).unwrap());
    });

    group.bench_function("identifier_substring", |b| {
        let request = EventSummaryRequest::new()
            .with_filter(EventFilter {
                element_identifier: Some("host-001".to_string()),
                ..Default::default()
            })
            .with_sort(EventSort::ascending(EventSortField::ElementIdentifier));
        b.iter(|| index.list(black_box(&request)).unwrap());
    });

    group.bench_function("deep_page", |b| {
        let request = EventSummaryRequest::new()
            .with_sort(EventSort::descending(EventSortField::Count))
            .with_limit(100)
            .with_offset(5_000);
        b.iter(|| index.list(black_box(&request)).unwrap());
    });

    group.finish();
}

/// Benchmark severity roll-ups
fn bench_severities(c: &mut Criterion) {
    let index = populated_index(10_000);
    let tags: Vec<String> = (0..10).map(|i| format!("service-{}", i)).collect();

    c.bench_function("count_severities", |b| {
        b.iter(|| index.count_severities(black_box(&tags)).unwrap());
    });

    c.bench_function("find_worst_severity", |b| {
        b.iter(|| index.find_worst_severity(black_box(&tags)).unwrap());
    });
}

criterion_group!(
    benches,
    bench_tokenizer,
    bench_index_batch,
    bench_list,
    bench_severities
);
criterion_main!(benches);
