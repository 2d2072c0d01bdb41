use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};
use uuid::Uuid;

/// Summary of a de-duplicated monitoring event, as held by the system of record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventSummary {
    /// Unique identifier
    pub uuid: Uuid,

    /// Current status
    pub status: EventStatus,

    /// Severity of the latest occurrence
    pub severity: EventSeverity,

    /// First time this event was seen
    pub first_seen_time: DateTime<Utc>,

    /// Last time this event was seen
    pub last_seen_time: DateTime<Utc>,

    /// Last time the status changed
    pub status_change_time: DateTime<Utc>,

    /// Last time the summary row was updated
    pub update_time: DateTime<Utc>,

    /// Number of occurrences
    pub count: u32,

    /// User who acknowledged the event
    pub acknowledged_by_user_uuid: Option<Uuid>,

    /// Name of the user who acknowledged the event
    pub acknowledged_by_user_name: Option<String>,

    /// Event that cleared this one
    pub cleared_by_event_uuid: Option<Uuid>,

    /// Free-text summary
    pub summary: String,

    /// Infrastructure element the event was raised against
    pub element_identifier: String,

    /// Sub-element (component, interface, ...) identifier
    #[serde(default)]
    pub element_sub_identifier: String,

    /// Slash-delimited event class, e.g. `/Status/Ping`
    pub event_class: String,

    /// Collection agent
    #[serde(default)]
    pub agent: Option<String>,

    /// Collector / monitor name
    #[serde(default)]
    pub monitor: Option<String>,

    /// Tag UUIDs attached to the event
    #[serde(default)]
    pub tags: Vec<String>,

    /// Operator notes
    #[serde(default)]
    pub notes: Vec<EventNote>,
}

impl EventSummary {
    /// Create a new summary in the `New` state seen once, now
    pub fn new(
        element_identifier: impl Into<String>,
        event_class: impl Into<String>,
        summary: impl Into<String>,
        severity: EventSeverity,
    ) -> Self {
        let now = Utc::now();

        Self {
            uuid: Uuid::new_v4(),
            status: EventStatus::New,
            severity,
            first_seen_time: now,
            last_seen_time: now,
            status_change_time: now,
            update_time: now,
            count: 1,
            acknowledged_by_user_uuid: None,
            acknowledged_by_user_name: None,
            cleared_by_event_uuid: None,
            summary: summary.into(),
            element_identifier: element_identifier.into(),
            element_sub_identifier: String::new(),
            event_class: event_class.into(),
            agent: None,
            monitor: None,
            tags: Vec::new(),
            notes: Vec::new(),
        }
    }

    /// Whether the event is still active for severity roll-ups
    pub fn is_open(&self) -> bool {
        self.status.is_open()
    }
}

/// Note attached to an event by an operator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventNote {
    pub uuid: Uuid,
    pub user_uuid: Option<Uuid>,
    pub user_name: Option<String>,
    pub created_time: DateTime<Utc>,
    pub message: String,
}

/// Event severity, ordered from least to most severe
#[derive(
    Debug,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    EnumString,
    EnumIter,
    Display,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum EventSeverity {
    Clear,
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl EventSeverity {
    /// Integer code stored in the index
    pub fn code(&self) -> i64 {
        match self {
            EventSeverity::Clear => 0,
            EventSeverity::Debug => 1,
            EventSeverity::Info => 2,
            EventSeverity::Warning => 3,
            EventSeverity::Error => 4,
            EventSeverity::Critical => 5,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(EventSeverity::Clear),
            1 => Some(EventSeverity::Debug),
            2 => Some(EventSeverity::Info),
            3 => Some(EventSeverity::Warning),
            4 => Some(EventSeverity::Error),
            5 => Some(EventSeverity::Critical),
            _ => None,
        }
    }
}

/// Event status
#[derive(
    Debug,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    Hash,
    EnumString,
    EnumIter,
    Display,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum EventStatus {
    New,
    Acknowledged,
    Suppressed,
    Closed,
    Cleared,
    Dropped,
    Aged,
}

impl EventStatus {
    /// Statuses counted by severity aggregations
    pub const OPEN: [EventStatus; 2] = [EventStatus::New, EventStatus::Acknowledged];

    /// Integer code stored in the index
    pub fn code(&self) -> i64 {
        match self {
            EventStatus::New => 0,
            EventStatus::Acknowledged => 1,
            EventStatus::Suppressed => 2,
            EventStatus::Closed => 3,
            EventStatus::Cleared => 4,
            EventStatus::Dropped => 5,
            EventStatus::Aged => 6,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(EventStatus::New),
            1 => Some(EventStatus::Acknowledged),
            2 => Some(EventStatus::Suppressed),
            3 => Some(EventStatus::Closed),
            4 => Some(EventStatus::Cleared),
            5 => Some(EventStatus::Dropped),
            6 => Some(EventStatus::Aged),
            _ => None,
        }
    }

    /// Check if the event is still active
    pub fn is_open(&self) -> bool {
        matches!(self, EventStatus::New | EventStatus::Acknowledged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn test_severity_codes_round_trip_and_order() {
        for severity in EventSeverity::iter() {
            assert_eq!(EventSeverity::from_code(severity.code()), Some(severity));
        }
        assert!(EventSeverity::Critical > EventSeverity::Error);
        assert!(EventSeverity::Clear < EventSeverity::Debug);
        assert_eq!(EventSeverity::from_code(42), None);
    }

    #[test]
    fn test_status_open_subset() {
        let open: Vec<_> = EventStatus::iter().filter(|s| s.is_open()).collect();
        assert_eq!(open, EventStatus::OPEN.to_vec());
    }

    #[test]
    fn test_parse_case_insensitive() {
        assert_eq!(EventSeverity::from_str("critical").unwrap(), EventSeverity::Critical);
        assert_eq!(EventStatus::from_str("ACKNOWLEDGED").unwrap(), EventStatus::Acknowledged);
        assert_eq!(EventSeverity::Warning.to_string(), "WARNING");
    }

    #[test]
    fn test_new_summary_defaults() {
        let summary = EventSummary::new("router1", "/Status/Ping", "ping loss", EventSeverity::Error);
        assert_eq!(summary.status, EventStatus::New);
        assert_eq!(summary.count, 1);
        assert!(summary.is_open());
        assert_eq!(summary.first_seen_time, summary.last_seen_time);
    }
}
