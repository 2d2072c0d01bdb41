//! Runtime event settings, their validation and their name/value records

use crate::error::{AppError, Result};
use crate::models::EventSeverity;
use crate::settings::partition::PartitionConfig;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, warn};

/// Shortest purge interval accepted, in days
pub const MIN_PURGE_INTERVAL_DAYS: i64 = 1;

/// Default upper bound for the archive interval, in days
pub const DEFAULT_MAX_ARCHIVE_INTERVAL_DAYS: i64 = 30;

/// Operator-tunable event settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventSettings {
    /// Age open events not seen for this long (0 disables aging)
    pub event_age_interval_minutes: i64,

    /// Events at or above this severity are never aged
    #[serde(with = "severity_code")]
    pub event_age_disable_severity: EventSeverity,

    pub event_age_severity_inclusive: bool,

    /// Purge archived events older than this
    pub event_archive_purge_interval_days: i64,

    /// Purge event occurrences older than this
    pub event_occurrence_purge_interval_days: i64,

    /// Move closed events to the archive after this long
    pub event_archive_interval_days: i64,

    /// Summaries longer than this are truncated
    pub event_max_summary_length: i64,

    /// Summary index queue poll interval
    pub index_summary_interval_milliseconds: i64,

    /// Archive index queue poll interval
    pub index_archive_interval_milliseconds: i64,

    /// Queue rows per index drain
    pub index_limit: i64,
}

impl Default for EventSettings {
    fn default() -> Self {
        Self {
            event_age_interval_minutes: 240,
            event_age_disable_severity: EventSeverity::Error,
            event_age_severity_inclusive: false,
            event_archive_purge_interval_days: 90,
            event_occurrence_purge_interval_days: 30,
            event_archive_interval_days: 3,
            event_max_summary_length: 255,
            index_summary_interval_milliseconds: 1000,
            index_archive_interval_milliseconds: 30000,
            index_limit: 1000,
        }
    }
}

/// Severities are stored by integer code
mod severity_code {
    use crate::models::EventSeverity;
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(severity: &EventSeverity, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(severity.code())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<EventSeverity, D::Error> {
        let code = i64::deserialize(deserializer)?;
        EventSeverity::from_code(code)
            .ok_or_else(|| D::Error::custom(format!("unknown severity code {}", code)))
    }
}

/// Range checks for settings writes, with bounds derived from partitioning
#[derive(Debug, Clone)]
pub struct SettingsValidator {
    max_archive_purge_days: i64,
    max_occurrence_purge_days: i64,
    max_archive_interval_days: i64,
}

impl SettingsValidator {
    pub fn new(partitions: &PartitionConfig) -> Self {
        let max_archive_purge_days = partitions.event_archive.max_purge_days();
        let max_occurrence_purge_days = partitions.event_occurrence.max_purge_days();
        info!(
            max_archive_purge_days,
            max_occurrence_purge_days, "Derived purge interval bounds"
        );

        Self {
            max_archive_purge_days,
            max_occurrence_purge_days,
            max_archive_interval_days: DEFAULT_MAX_ARCHIVE_INTERVAL_DAYS,
        }
    }

    pub fn with_max_archive_interval_days(mut self, days: i64) -> Self {
        self.max_archive_interval_days = days;
        self
    }

    pub fn max_archive_purge_days(&self) -> i64 {
        self.max_archive_purge_days
    }

    pub fn max_occurrence_purge_days(&self) -> i64 {
        self.max_occurrence_purge_days
    }

    pub fn validate(&self, settings: &EventSettings) -> Result<()> {
        if settings.event_age_interval_minutes < 0 {
            return Err(AppError::Validation(
                "event age interval must not be negative".to_string(),
            ));
        }

        check_range(
            "event archive purge interval",
            settings.event_archive_purge_interval_days,
            self.max_archive_purge_days,
        )?;
        check_range(
            "event occurrence purge interval",
            settings.event_occurrence_purge_interval_days,
            self.max_occurrence_purge_days,
        )?;
        check_range(
            "event archive interval",
            settings.event_archive_interval_days,
            self.max_archive_interval_days,
        )
    }
}

fn check_range(name: &str, days: i64, max: i64) -> Result<()> {
    if (MIN_PURGE_INTERVAL_DAYS..=max).contains(&days) {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "{} must be between {} and {} days, got {}",
            name, MIN_PURGE_INTERVAL_DAYS, max, days
        )))
    }
}

/// One stored setting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingRecord {
    pub name: String,
    pub value: String,
}

impl SettingRecord {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

fn settings_map(settings: &EventSettings) -> Result<Map<String, Value>> {
    match serde_json::to_value(settings)? {
        Value::Object(map) => Ok(map),
        other => Err(AppError::Internal(format!(
            "settings serialized to a non-object: {}",
            other
        ))),
    }
}

/// Flatten settings into name/value records, one per populated field
pub fn encode_settings(settings: &EventSettings) -> Result<Vec<SettingRecord>> {
    let mut records = Vec::new();
    for (name, value) in settings_map(settings)? {
        let text = match value {
            Value::Null => continue,
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => n.to_string(),
            Value::String(s) => s,
            Value::Object(_) => value.to_string(),
            Value::Array(_) => {
                return Err(AppError::UnsupportedFieldType(format!(
                    "repeated setting {} is not supported",
                    name
                )))
            }
        };
        records.push(SettingRecord::new(name, text));
    }
    Ok(records)
}

/// Apply stored records onto the defaults; unknown names are skipped
pub fn decode_settings<'a, I>(records: I) -> Result<EventSettings>
where
    I: IntoIterator<Item = &'a SettingRecord>,
{
    let mut map = settings_map(&EventSettings::default())?;

    for record in records {
        let Some(current) = map.get(&record.name) else {
            warn!(name = %record.name, "Unrecognized setting");
            continue;
        };
        let value = parse_setting(&record.name, current, &record.value)?;
        map.insert(record.name.clone(), value);
    }

    Ok(serde_json::from_value(Value::Object(map))?)
}

/// Parse `text` as the same kind of value as `template`
fn parse_setting(name: &str, template: &Value, text: &str) -> Result<Value> {
    let malformed = |e: &dyn std::fmt::Display| {
        AppError::Serialization(format!("malformed value for {}: {}", name, e))
    };

    match template {
        Value::Bool(_) => text
            .trim()
            .parse::<bool>()
            .map(Value::Bool)
            .map_err(|e| malformed(&e)),
        Value::Number(_) => text
            .trim()
            .parse::<serde_json::Number>()
            .map(Value::Number)
            .map_err(|e| malformed(&e)),
        Value::String(_) => Ok(Value::String(text.to_string())),
        Value::Array(_) => Err(AppError::UnsupportedFieldType(format!(
            "repeated setting {} is not supported",
            name
        ))),
        Value::Object(_) | Value::Null => serde_json::from_str(text).map_err(|e| malformed(&e)),
    }
}
