//! Field names and schema of the event index

use crate::search::tokenizer::IDENTIFIER_TOKENIZER;
use tantivy::schema::{
    Field, IndexRecordOption, Schema, TextFieldIndexing, TextOptions, FAST, INDEXED, STORED,
    STRING, TEXT,
};

pub const UUID: &str = "uuid";
pub const STATUS: &str = "status";
pub const SEVERITY: &str = "severity";
pub const COUNT: &str = "count";
pub const FIRST_SEEN_TIME: &str = "first_seen_time";
pub const LAST_SEEN_TIME: &str = "last_seen_time";
pub const STATUS_CHANGE_TIME: &str = "status_change_time";
pub const UPDATE_TIME: &str = "update_time";
pub const ELEMENT_IDENTIFIER: &str = "element_identifier";
pub const ELEMENT_IDENTIFIER_NOT_ANALYZED: &str = "element_identifier_not_analyzed";
pub const ELEMENT_SUB_IDENTIFIER: &str = "element_sub_identifier";
pub const ELEMENT_SUB_IDENTIFIER_NOT_ANALYZED: &str = "element_sub_identifier_not_analyzed";
pub const SUMMARY: &str = "summary";
pub const SUMMARY_NOT_ANALYZED: &str = "summary_not_analyzed";
pub const EVENT_CLASS: &str = "event_class";
pub const TAGS: &str = "tag";
pub const ACKNOWLEDGED_BY_USER_NAME: &str = "acknowledged_by_user_name";
pub const AGENT: &str = "agent";
pub const MONITOR: &str = "monitor";
pub const EVENT_JSON: &str = "event_json";

/// Integer-valued fields (indexed and fast)
pub const I64_FIELDS: [&str; 7] = [
    STATUS,
    SEVERITY,
    COUNT,
    FIRST_SEEN_TIME,
    LAST_SEEN_TIME,
    STATUS_CHANGE_TIME,
    UPDATE_TIME,
];

/// Raw keyword fields accepted by exact-term clauses
pub const KEYWORD_FIELDS: [&str; 9] = [
    UUID,
    TAGS,
    ACKNOWLEDGED_BY_USER_NAME,
    AGENT,
    MONITOR,
    EVENT_CLASS,
    ELEMENT_IDENTIFIER_NOT_ANALYZED,
    ELEMENT_SUB_IDENTIFIER_NOT_ANALYZED,
    SUMMARY_NOT_ANALYZED,
];

/// Resolved field handles for the event schema
#[derive(Debug, Clone, Copy)]
pub struct EventFields {
    pub uuid: Field,
    pub status: Field,
    pub severity: Field,
    pub count: Field,
    pub first_seen_time: Field,
    pub last_seen_time: Field,
    pub status_change_time: Field,
    pub update_time: Field,
    pub element_identifier: Field,
    pub element_identifier_not_analyzed: Field,
    pub element_sub_identifier: Field,
    pub element_sub_identifier_not_analyzed: Field,
    pub summary: Field,
    pub summary_not_analyzed: Field,
    pub event_class: Field,
    pub tags: Field,
    pub acknowledged_by_user_name: Field,
    pub agent: Field,
    pub monitor: Field,
    pub event_json: Field,
}

impl EventFields {
    /// Resolve every field of the event schema
    pub fn from_schema(schema: &Schema) -> tantivy::Result<Self> {
        Ok(Self {
            uuid: schema.get_field(UUID)?,
            status: schema.get_field(STATUS)?,
            severity: schema.get_field(SEVERITY)?,
            count: schema.get_field(COUNT)?,
            first_seen_time: schema.get_field(FIRST_SEEN_TIME)?,
            last_seen_time: schema.get_field(LAST_SEEN_TIME)?,
            status_change_time: schema.get_field(STATUS_CHANGE_TIME)?,
            update_time: schema.get_field(UPDATE_TIME)?,
            element_identifier: schema.get_field(ELEMENT_IDENTIFIER)?,
            element_identifier_not_analyzed: schema.get_field(ELEMENT_IDENTIFIER_NOT_ANALYZED)?,
            element_sub_identifier: schema.get_field(ELEMENT_SUB_IDENTIFIER)?,
            element_sub_identifier_not_analyzed: schema
                .get_field(ELEMENT_SUB_IDENTIFIER_NOT_ANALYZED)?,
            summary: schema.get_field(SUMMARY)?,
            summary_not_analyzed: schema.get_field(SUMMARY_NOT_ANALYZED)?,
            event_class: schema.get_field(EVENT_CLASS)?,
            tags: schema.get_field(TAGS)?,
            acknowledged_by_user_name: schema.get_field(ACKNOWLEDGED_BY_USER_NAME)?,
            agent: schema.get_field(AGENT)?,
            monitor: schema.get_field(MONITOR)?,
            event_json: schema.get_field(EVENT_JSON)?,
        })
    }
}

/// Build the search schema for event summaries
pub fn build_event_schema() -> Schema {
    let mut schema_builder = Schema::builder();

    // Document key
    schema_builder.add_text_field(UUID, STRING | STORED);

    // Integer codes, counts and millisecond timestamps
    schema_builder.add_i64_field(STATUS, INDEXED | STORED | FAST);
    schema_builder.add_i64_field(SEVERITY, INDEXED | STORED | FAST);
    schema_builder.add_i64_field(COUNT, INDEXED | FAST);
    schema_builder.add_i64_field(FIRST_SEEN_TIME, INDEXED | FAST);
    schema_builder.add_i64_field(LAST_SEEN_TIME, INDEXED | FAST);
    schema_builder.add_i64_field(STATUS_CHANGE_TIME, INDEXED | FAST);
    schema_builder.add_i64_field(UPDATE_TIME, INDEXED | FAST);

    // Identifiers: n-gram analyzed for "contains" search, raw for sort and globs
    let identifier_options = TextOptions::default().set_indexing_options(
        TextFieldIndexing::default()
            .set_tokenizer(IDENTIFIER_TOKENIZER)
            .set_index_option(IndexRecordOption::WithFreqsAndPositions),
    );
    schema_builder.add_text_field(ELEMENT_IDENTIFIER, identifier_options.clone());
    schema_builder.add_text_field(ELEMENT_IDENTIFIER_NOT_ANALYZED, STRING | FAST);
    schema_builder.add_text_field(ELEMENT_SUB_IDENTIFIER, identifier_options);
    schema_builder.add_text_field(ELEMENT_SUB_IDENTIFIER_NOT_ANALYZED, STRING | FAST);

    // Summary: word analyzed, raw for sort and globs
    schema_builder.add_text_field(SUMMARY, TEXT);
    schema_builder.add_text_field(SUMMARY_NOT_ANALYZED, STRING | FAST);

    // Event class path, always terminated by '/'
    schema_builder.add_text_field(EVENT_CLASS, STRING | FAST);

    // Multi-valued tags
    schema_builder.add_text_field(TAGS, STRING);

    schema_builder.add_text_field(ACKNOWLEDGED_BY_USER_NAME, STRING);
    schema_builder.add_text_field(AGENT, STRING);
    schema_builder.add_text_field(MONITOR, STRING);

    // Full summary for retrieval
    schema_builder.add_text_field(EVENT_JSON, STORED);

    schema_builder.build()
}

/// Normalized form of an event class as indexed: lower-cased, trailing '/'
pub fn normalize_event_class(event_class: &str) -> String {
    let mut normalized = event_class.to_lowercase();
    if !normalized.ends_with('/') {
        normalized.push('/');
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_building() {
        let schema = build_event_schema();
        let fields = EventFields::from_schema(&schema).unwrap();
        assert_eq!(schema.get_field(UUID).unwrap(), fields.uuid);
        for name in I64_FIELDS.iter().chain(KEYWORD_FIELDS.iter()) {
            assert!(schema.get_field(name).is_ok(), "missing field {}", name);
        }
    }

    #[test]
    fn test_normalize_event_class() {
        assert_eq!(normalize_event_class("/Status/Ping"), "/status/ping/");
        assert_eq!(normalize_event_class("/Status/"), "/status/");
        assert_eq!(normalize_event_class(""), "/");
    }
}
