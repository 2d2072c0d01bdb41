//! Event filters and their translation into Tantivy queries

use crate::models::{EventSeverity, EventStatus};
use crate::search::error::{SearchError, SearchResult};
use crate::search::fields;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::ops::Bound;
use tantivy::query::{
    AllQuery, BooleanQuery, Occur, PhraseQuery, Query, RangeQuery, RegexQuery, TermQuery,
};
use tantivy::schema::{Field, FieldType, IndexRecordOption, Schema};
use tantivy::tokenizer::TokenStream;
use tantivy::{Index, Term};
use uuid::Uuid;

/// How the values of a multi-valued clause combine
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FilterOperator {
    And,
    #[default]
    Or,
}

/// Inclusive time interval; either end may be open
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimestampRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl TimestampRange {
    pub fn new(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        Self { start, end }
    }

    pub fn since(start: DateTime<Utc>) -> Self {
        Self::new(Some(start), None)
    }

    pub fn until(end: DateTime<Utc>) -> Self {
        Self::new(None, Some(end))
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Sortable event field
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventSortField {
    Count,
    ElementIdentifier,
    ElementSubIdentifier,
    EventClass,
    EventSummary,
    FirstSeen,
    LastSeen,
    Severity,
    Status,
    StatusChange,
    UpdateTime,
}

/// Kind of fast column backing a sort field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortColumn {
    Int(&'static str),
    Text(&'static str),
}

impl EventSortField {
    /// Fast column the field sorts on
    pub fn column(&self) -> SortColumn {
        match self {
            EventSortField::Count => SortColumn::Int(fields::COUNT),
            EventSortField::ElementIdentifier => {
                SortColumn::Text(fields::ELEMENT_IDENTIFIER_NOT_ANALYZED)
            }
            EventSortField::ElementSubIdentifier => {
                SortColumn::Text(fields::ELEMENT_SUB_IDENTIFIER_NOT_ANALYZED)
            }
            EventSortField::EventClass => SortColumn::Text(fields::EVENT_CLASS),
            EventSortField::EventSummary => SortColumn::Text(fields::SUMMARY_NOT_ANALYZED),
            EventSortField::FirstSeen => SortColumn::Int(fields::FIRST_SEEN_TIME),
            EventSortField::LastSeen => SortColumn::Int(fields::LAST_SEEN_TIME),
            EventSortField::Severity => SortColumn::Int(fields::SEVERITY),
            EventSortField::Status => SortColumn::Int(fields::STATUS),
            EventSortField::StatusChange => SortColumn::Int(fields::STATUS_CHANGE_TIME),
            EventSortField::UpdateTime => SortColumn::Int(fields::UPDATE_TIME),
        }
    }
}

/// One sort key
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventSort {
    pub field: EventSortField,
    pub direction: SortDirection,
}

impl EventSort {
    pub fn new(field: EventSortField, direction: SortDirection) -> Self {
        Self { field, direction }
    }

    pub fn ascending(field: EventSortField) -> Self {
        Self::new(field, SortDirection::Ascending)
    }

    pub fn descending(field: EventSortField) -> Self {
        Self::new(field, SortDirection::Descending)
    }
}

impl Default for EventSort {
    fn default() -> Self {
        Self::descending(EventSortField::LastSeen)
    }
}

/// Structured event filter
///
/// Every populated field narrows the result (AND across fields). Multi-valued
/// fields match any of their values unless stated otherwise.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EventFilter {
    pub uuids: Vec<Uuid>,
    pub count: Option<u32>,

    /// Glob or "contains" match on the element identifier
    pub element_identifier: Option<String>,
    pub element_sub_identifier: Option<String>,
    pub summary: Option<String>,

    pub first_seen: Option<TimestampRange>,
    pub last_seen: Option<TimestampRange>,
    pub status_change: Option<TimestampRange>,
    pub update_time: Option<TimestampRange>,

    pub statuses: Vec<EventStatus>,
    pub severities: Vec<EventSeverity>,

    /// Class path: `/a/b` matches exactly, `/a/b/` and `/a/b*` match the subtree
    pub event_class: Option<String>,

    pub tags: Vec<String>,
    pub tags_op: FilterOperator,

    pub acknowledged_by_user_name: Option<String>,
    pub agents: Vec<String>,
    pub monitors: Vec<String>,
}

impl EventFilter {
    /// Flatten into clauses, one per populated field
    pub fn clauses(&self) -> Vec<FilterClause> {
        let mut clauses = Vec::new();

        if !self.uuids.is_empty() {
            clauses.push(FilterClause::ExactSet {
                field: fields::UUID.to_string(),
                values: self.uuids.iter().map(Uuid::to_string).collect(),
                op: FilterOperator::Or,
            });
        }

        if let Some(count) = self.count {
            clauses.push(FilterClause::Exact {
                field: fields::COUNT.to_string(),
                value: count.to_string(),
            });
        }

        let wildcards = [
            (&self.element_identifier, WildcardTarget::ELEMENT_IDENTIFIER),
            (&self.element_sub_identifier, WildcardTarget::ELEMENT_SUB_IDENTIFIER),
            (&self.summary, WildcardTarget::SUMMARY),
        ];
        for (pattern, target) in wildcards {
            if let Some(pattern) = pattern {
                clauses.push(FilterClause::Wildcard {
                    target,
                    pattern: pattern.clone(),
                });
            }
        }

        let ranges = [
            (fields::FIRST_SEEN_TIME, &self.first_seen),
            (fields::LAST_SEEN_TIME, &self.last_seen),
            (fields::STATUS_CHANGE_TIME, &self.status_change),
            (fields::UPDATE_TIME, &self.update_time),
        ];
        for (field, range) in ranges {
            if let Some(range) = range {
                clauses.push(FilterClause::Range {
                    field: field.to_string(),
                    min: range.start.map(|t| t.timestamp_millis()),
                    max: range.end.map(|t| t.timestamp_millis()),
                });
            }
        }

        if !self.statuses.is_empty() {
            clauses.push(FilterClause::EnumSet {
                field: fields::STATUS.to_string(),
                codes: self.statuses.iter().map(EventStatus::code).collect(),
            });
        }

        if !self.severities.is_empty() {
            clauses.push(FilterClause::EnumSet {
                field: fields::SEVERITY.to_string(),
                codes: self.severities.iter().map(EventSeverity::code).collect(),
            });
        }

        if let Some(ref event_class) = self.event_class {
            clauses.push(FilterClause::PathWildcard {
                field: fields::EVENT_CLASS.to_string(),
                pattern: event_class.clone(),
            });
        }

        if !self.tags.is_empty() {
            clauses.push(FilterClause::ExactSet {
                field: fields::TAGS.to_string(),
                values: self.tags.clone(),
                op: self.tags_op,
            });
        }

        if let Some(ref user_name) = self.acknowledged_by_user_name {
            clauses.push(FilterClause::Exact {
                field: fields::ACKNOWLEDGED_BY_USER_NAME.to_string(),
                value: user_name.clone(),
            });
        }

        for (field, values) in [(fields::AGENT, &self.agents), (fields::MONITOR, &self.monitors)] {
            if !values.is_empty() {
                clauses.push(FilterClause::ExactSet {
                    field: field.to_string(),
                    values: values.clone(),
                    op: FilterOperator::Or,
                });
            }
        }

        clauses
    }
}

/// Keyword field plus the analyzed twin used for glob-free patterns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WildcardTarget {
    pub keyword: &'static str,
    pub analyzed: Option<&'static str>,
}

impl WildcardTarget {
    pub const ELEMENT_IDENTIFIER: WildcardTarget = WildcardTarget {
        keyword: fields::ELEMENT_IDENTIFIER_NOT_ANALYZED,
        analyzed: Some(fields::ELEMENT_IDENTIFIER),
    };

    pub const ELEMENT_SUB_IDENTIFIER: WildcardTarget = WildcardTarget {
        keyword: fields::ELEMENT_SUB_IDENTIFIER_NOT_ANALYZED,
        analyzed: Some(fields::ELEMENT_SUB_IDENTIFIER),
    };

    pub const SUMMARY: WildcardTarget = WildcardTarget {
        keyword: fields::SUMMARY_NOT_ANALYZED,
        analyzed: Some(fields::SUMMARY),
    };

    pub fn keyword(field: &'static str) -> Self {
        Self {
            keyword: field,
            analyzed: None,
        }
    }
}

/// A single filter clause
#[derive(Debug, Clone, PartialEq)]
pub enum FilterClause {
    /// Field equals a literal
    Exact { field: String, value: String },

    /// Field equals any (`Or`) or all (`And`) of the literals
    ExactSet {
        field: String,
        values: Vec<String>,
        op: FilterOperator,
    },

    /// Case-insensitive glob or substring match
    Wildcard {
        target: WildcardTarget,
        pattern: String,
    },

    /// Hierarchical path match on a `/`-terminated keyword field
    PathWildcard { field: String, pattern: String },

    /// Inclusive integer interval
    Range {
        field: String,
        min: Option<i64>,
        max: Option<i64>,
    },

    /// Integer code in set
    EnumSet { field: String, codes: Vec<i64> },
}

/// Translates filter clauses into Tantivy queries
#[derive(Clone)]
pub struct QueryBuilder {
    index: Index,
    schema: Schema,
}

impl QueryBuilder {
    /// Create a new query builder
    pub fn new(index: &Index) -> Self {
        Self {
            index: index.clone(),
            schema: index.schema(),
        }
    }

    /// Build the query for an optional filter; no filter matches everything
    pub fn build(&self, filter: Option<&EventFilter>) -> SearchResult<Box<dyn Query>> {
        match filter {
            Some(filter) => self.build_clauses(&filter.clauses()),
            None => Ok(Box::new(AllQuery)),
        }
    }

    /// Conjunction of the given clauses
    pub fn build_clauses(&self, clauses: &[FilterClause]) -> SearchResult<Box<dyn Query>> {
        let mut subqueries: Vec<(Occur, Box<dyn Query>)> = Vec::new();
        for clause in clauses {
            if let Some(query) = self.translate(clause)? {
                subqueries.push((Occur::Must, query));
            }
        }

        match subqueries.len() {
            0 => Ok(Box::new(AllQuery)),
            1 => Ok(subqueries.remove(0).1),
            _ => Ok(Box::new(BooleanQuery::new(subqueries))),
        }
    }

    /// Query for one clause, `None` when the clause constrains nothing
    pub fn translate(&self, clause: &FilterClause) -> SearchResult<Option<Box<dyn Query>>> {
        match clause {
            FilterClause::Exact { field, value } => {
                let term = self.exact_term(field, value)?;
                Ok(Some(term_query(term)))
            }
            FilterClause::ExactSet { field, values, op } => self.exact_set(field, values, *op),
            FilterClause::Wildcard { target, pattern } => self.wildcard(target, pattern),
            FilterClause::PathWildcard { field, pattern } => self.path_wildcard(field, pattern),
            FilterClause::Range { field, min, max } => self.range(field, *min, *max),
            FilterClause::EnumSet { field, codes } => self.enum_set(field, codes),
        }
    }

    fn field(&self, name: &str) -> SearchResult<Field> {
        self.schema
            .get_field(name)
            .map_err(|_| SearchError::InvalidArgument(format!("unknown field: {}", name)))
    }

    fn exact_term(&self, name: &str, value: &str) -> SearchResult<Term> {
        let field = self.field(name)?;
        let entry = self.schema.get_field_entry(field);
        if !entry.is_indexed() {
            return Err(SearchError::InvalidArgument(format!(
                "field is not searchable: {}",
                name
            )));
        }

        match entry.field_type() {
            FieldType::I64(_) => {
                let number = value.parse::<i64>().map_err(|_| {
                    SearchError::InvalidArgument(format!(
                        "expected an integer for {}, got {:?}",
                        name, value
                    ))
                })?;
                Ok(Term::from_field_i64(field, number))
            }
            FieldType::Str(_) => Ok(Term::from_field_text(field, value)),
            other => Err(SearchError::QueryBuildFailed(format!(
                "unsupported field type {:?} for {}",
                other.value_type(),
                name
            ))),
        }
    }

    fn exact_set(
        &self,
        name: &str,
        values: &[String],
        op: FilterOperator,
    ) -> SearchResult<Option<Box<dyn Query>>> {
        let occur = match op {
            FilterOperator::And => Occur::Must,
            FilterOperator::Or => Occur::Should,
        };

        let mut subqueries = Vec::with_capacity(values.len());
        for value in values {
            subqueries.push((occur, term_query(self.exact_term(name, value)?)));
        }
        Ok(combine(subqueries))
    }

    fn wildcard(
        &self,
        target: &WildcardTarget,
        pattern: &str,
    ) -> SearchResult<Option<Box<dyn Query>>> {
        let pattern = pattern.trim().to_lowercase();
        if pattern.is_empty() {
            return Ok(None);
        }

        let keyword = self.field(target.keyword)?;
        if has_glob(&pattern) {
            return regex_query(keyword, &glob_to_regex(&pattern)).map(Some);
        }

        let Some(analyzed) = target.analyzed else {
            return Ok(Some(term_query(Term::from_field_text(keyword, &pattern))));
        };

        let analyzed = self.field(analyzed)?;
        let mut terms = self.analyze(analyzed, &pattern)?;
        match terms.len() {
            0 => {
                let contains = format!(".*{}.*", regex::escape(&pattern));
                regex_query(keyword, &contains).map(Some)
            }
            1 => Ok(terms.pop().map(|(_, term)| term_query(term))),
            _ => Ok(Some(Box::new(PhraseQuery::new_with_offset(terms)))),
        }
    }

    fn path_wildcard(&self, name: &str, pattern: &str) -> SearchResult<Option<Box<dyn Query>>> {
        let pattern = pattern.trim().to_lowercase();
        if pattern.is_empty() {
            return Ok(None);
        }

        let field = self.field(name)?;
        let pattern = rewrite_path_pattern(&pattern);
        if has_glob(&pattern) {
            regex_query(field, &glob_to_regex(&pattern)).map(Some)
        } else {
            Ok(Some(term_query(Term::from_field_text(field, &pattern))))
        }
    }

    fn range(
        &self,
        name: &str,
        min: Option<i64>,
        max: Option<i64>,
    ) -> SearchResult<Option<Box<dyn Query>>> {
        self.field(name)?;
        if min.is_none() && max.is_none() {
            return Ok(None);
        }

        let lower = min.map_or(Bound::Unbounded, Bound::Included);
        let upper = max.map_or(Bound::Unbounded, Bound::Included);
        Ok(Some(Box::new(RangeQuery::new_i64_bounds(
            name.to_string(),
            lower,
            upper,
        ))))
    }

    fn enum_set(&self, name: &str, codes: &[i64]) -> SearchResult<Option<Box<dyn Query>>> {
        let field = self.field(name)?;
        let subqueries = codes
            .iter()
            .map(|code| (Occur::Should, term_query(Term::from_field_i64(field, *code))))
            .collect();
        Ok(combine(subqueries))
    }

    /// Run text through the field's analyzer, keeping token positions
    fn analyze(&self, field: Field, text: &str) -> SearchResult<Vec<(usize, Term)>> {
        let mut analyzer = self.index.tokenizer_for_field(field)?;
        let mut stream = analyzer.token_stream(text);
        let mut terms = Vec::new();
        while stream.advance() {
            let token = stream.token();
            terms.push((token.position, Term::from_field_text(field, &token.text)));
        }
        Ok(terms)
    }
}

fn term_query(term: Term) -> Box<dyn Query> {
    Box::new(TermQuery::new(term, IndexRecordOption::Basic))
}

fn regex_query(field: Field, pattern: &str) -> SearchResult<Box<dyn Query>> {
    let query = RegexQuery::from_pattern(pattern, field)
        .map_err(|e| SearchError::QueryBuildFailed(format!("bad pattern {:?}: {}", pattern, e)))?;
    Ok(Box::new(query))
}

fn combine(mut subqueries: Vec<(Occur, Box<dyn Query>)>) -> Option<Box<dyn Query>> {
    match subqueries.len() {
        0 => None,
        1 => Some(subqueries.remove(0).1),
        _ => Some(Box::new(BooleanQuery::new(subqueries))),
    }
}

fn has_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?'])
}

/// `a/b` -> `a/b/`, `a/b/` -> `a/b/*`, `a/b*` unchanged
pub fn rewrite_path_pattern(pattern: &str) -> String {
    if pattern.ends_with('*') {
        pattern.to_string()
    } else if pattern.ends_with('/') {
        format!("{}*", pattern)
    } else {
        format!("{}/", pattern)
    }
}

/// Anchored regex equivalent of a `*`/`?` glob
pub fn glob_to_regex(glob: &str) -> String {
    let mut out = String::with_capacity(glob.len() + 8);
    let mut literal = String::new();

    for ch in glob.chars() {
        match ch {
            '*' | '?' => {
                out.push_str(&regex::escape(&literal));
                literal.clear();
                out.push_str(if ch == '*' { ".*" } else { "." });
            }
            _ => literal.push(ch),
        }
    }
    out.push_str(&regex::escape(&literal));
    out
}

/// Paged listing request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EventSummaryRequest {
    pub filter: Option<EventFilter>,
    pub sort: Vec<EventSort>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl EventSummaryRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter(mut self, filter: EventFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_sort(mut self, sort: EventSort) -> Self {
        self.sort.push(sort);
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_offset(mut self, offset: i64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Page size; anything outside `[1, max]` falls back to `max`
    pub fn effective_limit(&self, max: usize) -> usize {
        match self.limit {
            Some(limit) if limit >= 1 && limit as u64 <= max as u64 => limit as usize,
            _ => max,
        }
    }

    pub fn effective_offset(&self) -> usize {
        self.offset.map_or(0, |offset| offset.max(0) as usize)
    }

    pub fn effective_sort(&self) -> Vec<EventSort> {
        if self.sort.is_empty() {
            vec![EventSort::default()]
        } else {
            self.sort.clone()
        }
    }
}

/// One page of events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventSummaryResult {
    pub events: Vec<crate::models::EventSummary>,
    pub total: usize,
    pub limit: usize,
    /// Present only when more matches exist past this page
    pub next_offset: Option<usize>,
}
