//! Engine configuration.

use serde::{Deserialize, Serialize};

use crate::SchemaVersion;

/// Default number of undo entries kept by a store.
pub const DEFAULT_HISTORY_LIMIT: usize = 256;

/// Settings a [`crate::DocumentHandle`] is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    /// Maximum undo depth; 0 disables history.
    #[serde(default = "EngineConfig::default_history_limit")]
    pub history_limit: usize,
    /// Schema version this runtime writes and accepts.
    #[serde(default)]
    pub schema_version: SchemaVersion,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            history_limit: DEFAULT_HISTORY_LIMIT,
            schema_version: SchemaVersion::CURRENT,
        }
    }
}

impl EngineConfig {
    const fn default_history_limit() -> usize {
        DEFAULT_HISTORY_LIMIT
    }

    /// Override the history limit.
    #[must_use]
    pub const fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    /// Override the runtime schema version.
    #[must_use]
    pub const fn with_schema_version(mut self, version: SchemaVersion) -> Self {
        self.schema_version = version;
        self
    }
}
