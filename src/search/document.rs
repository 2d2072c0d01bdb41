//! Mapping between event summaries and index documents

use crate::models::EventSummary;
use crate::search::error::{SearchError, SearchResult};
use crate::search::fields::{normalize_event_class, EventFields};
use tantivy::schema::Value;
use tantivy::{TantivyDocument, Term};
use uuid::Uuid;

/// Index document derived from an [`EventSummary`]
///
/// Replaced wholesale on every update; the full summary is kept as JSON so that
/// reads return exactly what was staged.
pub struct EventDocument<'a> {
    summary: &'a EventSummary,
}

impl<'a> EventDocument<'a> {
    pub fn new(summary: &'a EventSummary) -> Self {
        Self { summary }
    }

    /// Key term used for replace and delete
    pub fn key(&self, fields: &EventFields) -> Term {
        uuid_term(fields, &self.summary.uuid)
    }

    /// Convert to Tantivy document
    pub fn to_tantivy_doc(&self, fields: &EventFields) -> SearchResult<TantivyDocument> {
        let summary = self.summary;
        let mut doc = TantivyDocument::new();

        doc.add_text(fields.uuid, summary.uuid.to_string());

        doc.add_i64(fields.status, summary.status.code());
        doc.add_i64(fields.severity, summary.severity.code());
        doc.add_i64(fields.count, i64::from(summary.count));
        doc.add_i64(fields.first_seen_time, summary.first_seen_time.timestamp_millis());
        doc.add_i64(fields.last_seen_time, summary.last_seen_time.timestamp_millis());
        doc.add_i64(
            fields.status_change_time,
            summary.status_change_time.timestamp_millis(),
        );
        doc.add_i64(fields.update_time, summary.update_time.timestamp_millis());

        doc.add_text(fields.element_identifier, &summary.element_identifier);
        doc.add_text(
            fields.element_identifier_not_analyzed,
            summary.element_identifier.to_lowercase(),
        );

        if !summary.element_sub_identifier.is_empty() {
            doc.add_text(fields.element_sub_identifier, &summary.element_sub_identifier);
            doc.add_text(
                fields.element_sub_identifier_not_analyzed,
                summary.element_sub_identifier.to_lowercase(),
            );
        }

        doc.add_text(fields.summary, &summary.summary);
        doc.add_text(fields.summary_not_analyzed, summary.summary.to_lowercase());

        doc.add_text(fields.event_class, normalize_event_class(&summary.event_class));

        for tag in &summary.tags {
            doc.add_text(fields.tags, tag);
        }

        if let Some(ref user_name) = summary.acknowledged_by_user_name {
            doc.add_text(fields.acknowledged_by_user_name, user_name);
        }
        if let Some(ref agent) = summary.agent {
            doc.add_text(fields.agent, agent);
        }
        if let Some(ref monitor) = summary.monitor {
            doc.add_text(fields.monitor, monitor);
        }

        doc.add_text(fields.event_json, serde_json::to_string(summary)?);

        Ok(doc)
    }
}

/// Key term for a document uuid
pub fn uuid_term(fields: &EventFields, uuid: &Uuid) -> Term {
    Term::from_field_text(fields.uuid, &uuid.to_string())
}

/// Rebuild the event summary stored with a document
pub fn to_event_summary(doc: &TantivyDocument, fields: &EventFields) -> SearchResult<EventSummary> {
    let json = doc
        .get_first(fields.event_json)
        .and_then(|v| v.as_str())
        .ok_or_else(|| SearchError::Serialization("document has no stored event".to_string()))?;

    Ok(serde_json::from_str(json)?)
}
