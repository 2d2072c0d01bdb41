//! Partitioning of the time-partitioned event tables

use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Most partitions kept for one table
pub const MAX_PARTITIONS: i64 = 1000;

/// Table of individual event occurrences
pub const TABLE_EVENT_OCCURRENCE: &str = "event";

const MINUTES_PER_DAY: i64 = 24 * 60;

/// Unit of a partition's time span
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum PartitionUnit {
    Minutes,
    Hours,
    Days,
}

impl PartitionUnit {
    pub fn to_minutes(&self, amount: i64) -> i64 {
        match self {
            PartitionUnit::Minutes => amount,
            PartitionUnit::Hours => amount.saturating_mul(60),
            PartitionUnit::Days => amount.saturating_mul(MINUTES_PER_DAY),
        }
    }
}

/// How one table is partitioned
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionTableConfig {
    pub table_name: String,

    /// Span of one partition, in `partition_unit`
    pub partition_duration: i64,

    pub partition_unit: PartitionUnit,

    /// Partitions created for the past when the table is set up
    pub initial_past_partitions: i64,

    /// Partitions kept ahead of the current time
    pub future_partitions: i64,
}

impl PartitionTableConfig {
    pub fn new(
        table_name: impl Into<String>,
        partition_duration: i64,
        partition_unit: PartitionUnit,
        initial_past_partitions: i64,
        future_partitions: i64,
    ) -> Result<Self> {
        let config = Self {
            table_name: table_name.into(),
            partition_duration,
            partition_unit,
            initial_past_partitions,
            future_partitions,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.table_name.trim().is_empty() {
            return Err(AppError::InvalidArgument(
                "partition table name must not be empty".to_string(),
            ));
        }
        if self.partition_duration <= 0 {
            return Err(AppError::InvalidArgument(format!(
                "partition duration of {} must be positive",
                self.table_name
            )));
        }
        if self.initial_past_partitions < 0 || self.future_partitions < 0 {
            return Err(AppError::InvalidArgument(format!(
                "partition counts of {} must not be negative",
                self.table_name
            )));
        }
        if self.initial_past_partitions == 0 && self.future_partitions == 0 {
            return Err(AppError::InvalidArgument(format!(
                "{} needs at least one past or future partition",
                self.table_name
            )));
        }
        Ok(())
    }

    pub fn partition_minutes(&self) -> i64 {
        self.partition_unit.to_minutes(self.partition_duration)
    }

    /// Longest purge interval the partitions can hold, in whole days
    pub fn max_purge_days(&self) -> i64 {
        self.partition_minutes().saturating_mul(MAX_PARTITIONS) / MINUTES_PER_DAY
    }
}

/// Partitioning of the archive and occurrence tables
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionConfig {
    pub event_archive: PartitionTableConfig,
    pub event_occurrence: PartitionTableConfig,
}

impl PartitionConfig {
    pub fn validate(&self) -> Result<()> {
        self.event_archive.validate()?;
        self.event_occurrence.validate()
    }
}

impl Default for PartitionConfig {
    fn default() -> Self {
        Self {
            event_archive: PartitionTableConfig {
                table_name: crate::indexing::TABLE_EVENT_ARCHIVE.to_string(),
                partition_duration: 1,
                partition_unit: PartitionUnit::Days,
                initial_past_partitions: 1,
                future_partitions: 3,
            },
            event_occurrence: PartitionTableConfig {
                table_name: TABLE_EVENT_OCCURRENCE.to_string(),
                partition_duration: 1,
                partition_unit: PartitionUnit::Hours,
                initial_past_partitions: 1,
                future_partitions: 3,
            },
        }
    }
}
