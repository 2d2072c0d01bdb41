//! Event settings and the partition-derived bounds used to validate them
//!
//! Purge intervals can never exceed what the partitioned tables retain: the
//! maximum is `partition duration in minutes x 1000`, expressed in whole days.

mod event_settings;
mod partition;

pub use event_settings::{
    decode_settings, encode_settings, EventSettings, SettingRecord, SettingsValidator,
    DEFAULT_MAX_ARCHIVE_INTERVAL_DAYS, MIN_PURGE_INTERVAL_DAYS,
};
pub use partition::{
    PartitionConfig, PartitionTableConfig, PartitionUnit, MAX_PARTITIONS, TABLE_EVENT_OCCURRENCE,
};
