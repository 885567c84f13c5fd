//! Store configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Deserializer};

/// What a fetch does with rows that fail to map into the record type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingPolicy {
    /// Drop the row, log it, and deliver the rest.
    #[default]
    Lenient,
    /// Fail the whole fetch with `CabinetError::Mapping`.
    Strict,
}

/// How a delete propagates into cascade entities.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CascadeMode {
    /// Parent batch delete, then one batch delete per cascade entity. A failure
    /// stops the chain and earlier steps stay deleted.
    #[default]
    Sequential,
    /// Parent and dependent rows are removed by a single commit.
    Atomic,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CabinetConfig {
    /// Name of the backing store.
    pub store_name: String,
    /// Mirror the store to a remote sync service.
    pub replication: bool,
    /// Directory file-backed stores live in.
    pub data_dir: PathBuf,
    /// Upper bound for a single operation; `None` waits forever.
    #[serde(rename = "operation_timeout_ms", deserialize_with = "millis")]
    pub operation_timeout: Option<Duration>,
    pub mapping_policy: MappingPolicy,
    pub cascade_mode: CascadeMode,
}

impl Default for CabinetConfig {
    fn default() -> Self {
        Self {
            store_name: "Database".to_string(),
            replication: false,
            data_dir: PathBuf::from("."),
            operation_timeout: None,
            mapping_policy: MappingPolicy::default(),
            cascade_mode: CascadeMode::default(),
        }
    }
}

impl CabinetConfig {
    pub fn new(store_name: impl Into<String>) -> Self {
        Self {
            store_name: store_name.into(),
            ..Self::default()
        }
    }

    /// Parse a configuration document. Missing keys take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn with_replication(mut self, replication: bool) -> Self {
        self.replication = replication;
        self
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = Some(timeout);
        self
    }

    pub fn with_mapping_policy(mut self, policy: MappingPolicy) -> Self {
        self.mapping_policy = policy;
        self
    }

    pub fn with_cascade_mode(mut self, mode: CascadeMode) -> Self {
        self.cascade_mode = mode;
        self
    }
}

fn millis<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Duration>, D::Error> {
    Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
}
