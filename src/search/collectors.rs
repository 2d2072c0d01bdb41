//! Collectors for sorted listing and severity aggregation

use crate::models::EventSeverity;
use crate::search::fields;
use crate::search::query::{EventSort, SortColumn, SortDirection};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tantivy::collector::{Collector, SegmentCollector, TopDocs};
use tantivy::columnar::{Column, StrColumn};
use tantivy::{DocAddress, DocId, Score, SegmentOrdinal, SegmentReader};
use tracing::warn;

/// Value of one sort column for one document; missing values order lowest
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum SortValue {
    Missing,
    Int(i64),
    Text(String),
}

/// Composite sort key; greater keys come first in results
#[derive(Debug, Clone, PartialEq)]
pub struct SortKey(Vec<(SortDirection, SortValue)>);

impl SortKey {
    pub fn values(&self) -> impl Iterator<Item = &SortValue> {
        self.0.iter().map(|(_, value)| value)
    }
}

impl PartialOrd for SortKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        for ((direction, left), (_, right)) in self.0.iter().zip(&other.0) {
            let ordering = match direction {
                SortDirection::Descending => left.cmp(right),
                SortDirection::Ascending => right.cmp(left),
            };
            if ordering != Ordering::Equal {
                return Some(ordering);
            }
        }
        Some(Ordering::Equal)
    }
}

enum ColumnReader {
    Int(Option<Column<i64>>),
    Text(Option<StrColumn>),
}

impl ColumnReader {
    fn open(segment: &SegmentReader, column: SortColumn) -> Self {
        let fast_fields = segment.fast_fields();
        match column {
            SortColumn::Int(name) => ColumnReader::Int(
                fast_fields
                    .i64(name)
                    .map_err(|e| warn!(field = name, error = %e, "Unreadable sort column"))
                    .ok(),
            ),
            SortColumn::Text(name) => ColumnReader::Text(
                fast_fields
                    .str(name)
                    .map_err(|e| warn!(field = name, error = %e, "Unreadable sort column"))
                    .ok()
                    .flatten(),
            ),
        }
    }

    fn value(&self, doc: DocId) -> SortValue {
        match self {
            ColumnReader::Int(Some(column)) => {
                column.first(doc).map_or(SortValue::Missing, SortValue::Int)
            }
            ColumnReader::Text(Some(column)) => {
                let Some(ord) = column.term_ords(doc).next() else {
                    return SortValue::Missing;
                };
                let mut text = String::new();
                match column.ord_to_str(ord, &mut text) {
                    Ok(true) => SortValue::Text(text),
                    _ => SortValue::Missing,
                }
            }
            _ => SortValue::Missing,
        }
    }
}

/// Top `limit` documents ordered by `sort` (lexicographic over the keys)
pub fn sorted_top_docs(
    sort: &[EventSort],
    limit: usize,
) -> impl Collector<Fruit = Vec<(SortKey, DocAddress)>> {
    let sort: Vec<EventSort> = sort.to_vec();
    TopDocs::with_limit(limit.max(1)).custom_score(move |segment: &SegmentReader| {
        let readers: Vec<(SortDirection, ColumnReader)> = sort
            .iter()
            .map(|key| (key.direction, ColumnReader::open(segment, key.field.column())))
            .collect();

        move |doc: DocId| {
            SortKey(
                readers
                    .iter()
                    .map(|(direction, reader)| (*direction, reader.value(doc)))
                    .collect(),
            )
        }
    })
}

fn open_severity_column(segment: &SegmentReader) -> tantivy::Result<Column<i64>> {
    segment.fast_fields().i64(fields::SEVERITY)
}

/// Histogram of severities over the matching documents
#[derive(Debug, Default, Clone, Copy)]
pub struct SeverityCounts;

pub struct SeverityCountsSegment {
    column: Column<i64>,
    counts: BTreeMap<i64, u64>,
}

impl Collector for SeverityCounts {
    type Fruit = BTreeMap<EventSeverity, u64>;
    type Child = SeverityCountsSegment;

    fn for_segment(
        &self,
        _segment_local_id: SegmentOrdinal,
        segment: &SegmentReader,
    ) -> tantivy::Result<SeverityCountsSegment> {
        Ok(SeverityCountsSegment {
            column: open_severity_column(segment)?,
            counts: BTreeMap::new(),
        })
    }

    fn requires_scoring(&self) -> bool {
        false
    }

    fn merge_fruits(
        &self,
        segment_fruits: Vec<BTreeMap<i64, u64>>,
    ) -> tantivy::Result<BTreeMap<EventSeverity, u64>> {
        let mut merged = BTreeMap::new();
        for (code, count) in segment_fruits.into_iter().flatten() {
            match EventSeverity::from_code(code) {
                Some(severity) => *merged.entry(severity).or_insert(0) += count,
                None => warn!(code, "Ignoring unknown severity code"),
            }
        }
        Ok(merged)
    }
}

impl SegmentCollector for SeverityCountsSegment {
    type Fruit = BTreeMap<i64, u64>;

    fn collect(&mut self, doc: DocId, _score: Score) {
        if let Some(code) = self.column.first(doc) {
            *self.counts.entry(code).or_insert(0) += 1;
        }
    }

    fn harvest(self) -> BTreeMap<i64, u64> {
        self.counts
    }
}

/// Highest severity among the matching documents
#[derive(Debug, Default, Clone, Copy)]
pub struct WorstSeverity;

pub struct WorstSeveritySegment {
    column: Column<i64>,
    worst: Option<i64>,
}

impl Collector for WorstSeverity {
    type Fruit = Option<EventSeverity>;
    type Child = WorstSeveritySegment;

    fn for_segment(
        &self,
        _segment_local_id: SegmentOrdinal,
        segment: &SegmentReader,
    ) -> tantivy::Result<WorstSeveritySegment> {
        Ok(WorstSeveritySegment {
            column: open_severity_column(segment)?,
            worst: None,
        })
    }

    fn requires_scoring(&self) -> bool {
        false
    }

    fn merge_fruits(
        &self,
        segment_fruits: Vec<Option<i64>>,
    ) -> tantivy::Result<Option<EventSeverity>> {
        Ok(segment_fruits
            .into_iter()
            .flatten()
            .filter_map(EventSeverity::from_code)
            .max())
    }
}

impl SegmentCollector for WorstSeveritySegment {
    type Fruit = Option<i64>;

    fn collect(&mut self, doc: DocId, _score: Score) {
        if let Some(code) = self.column.first(doc) {
            self.worst = Some(self.worst.map_or(code, |worst| worst.max(code)));
        }
    }

    fn harvest(self) -> Option<i64> {
        self.worst
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(entries: Vec<(SortDirection, SortValue)>) -> SortKey {
        SortKey(entries)
    }

    #[test]
    fn test_descending_prefers_larger_values() {
        let a = key(vec![(SortDirection::Descending, SortValue::Int(30))]);
        let b = key(vec![(SortDirection::Descending, SortValue::Int(20))]);
        assert!(a > b);
    }

    #[test]
    fn test_ascending_prefers_smaller_values() {
        let a = key(vec![(SortDirection::Ascending, SortValue::Text("alpha".into()))]);
        let b = key(vec![(SortDirection::Ascending, SortValue::Text("beta".into()))]);
        assert!(a > b);
    }

    #[test]
    fn test_missing_orders_lowest() {
        let missing = key(vec![(SortDirection::Descending, SortValue::Missing)]);
        let present = key(vec![(SortDirection::Descending, SortValue::Int(i64::MIN))]);
        assert!(present > missing);

        let missing = key(vec![(SortDirection::Ascending, SortValue::Missing)]);
        let present = key(vec![(SortDirection::Ascending, SortValue::Int(i64::MIN))]);
        assert!(missing > present);
    }

    #[test]
    fn test_secondary_key_breaks_ties() {
        let a = key(vec![
            (SortDirection::Descending, SortValue::Int(5)),
            (SortDirection::Ascending, SortValue::Int(1)),
        ]);
        let b = key(vec![
            (SortDirection::Descending, SortValue::Int(5)),
            (SortDirection::Ascending, SortValue::Int(2)),
        ]);
        assert!(a > b);
        assert_eq!(a.partial_cmp(&a), Some(Ordering::Equal));
    }
}
