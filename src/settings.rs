//! ## Pipeline Settings
//!
//! Engine-level options that are not part of a directive catalog: the default grouping
//! column for median imputation, the one-hot reference-category policy, and the switches
//! for deduplication and the final numeric-output check.

use datafusion::prelude::{SessionConfig, SessionContext};
use serde::{Deserialize, Serialize};

/// Grouping column used by group-median imputation when a directive does not name one.
pub const DEFAULT_GROUP_COLUMN: &str = "Neighborhood";

/// Label used by constant imputation for "feature not present".
pub const ABSENT_LABEL: &str = "NA";

/// Which category a one-hot expansion leaves out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReferencePolicy {
    /// Drop the first category in alphabetical order (k categories give k - 1 indicators).
    #[default]
    DropFirst,
    /// Keep one indicator per category.
    KeepAll,
}

/// Options for a [`crate::preparation::FeaturePipeline`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrepSettings {
    pub group_column: String,
    pub reference_policy: ReferencePolicy,
    pub deduplicate: bool,
    pub require_numeric_output: bool,
    /// Log every step at `INFO` instead of `DEBUG`.
    pub verbose: bool,
}

impl Default for PrepSettings {
    fn default() -> Self {
        Self {
            group_column: DEFAULT_GROUP_COLUMN.to_string(),
            reference_policy: ReferencePolicy::DropFirst,
            deduplicate: true,
            require_numeric_output: true,
            verbose: false,
        }
    }
}

impl PrepSettings {
    pub fn with_group_column(mut self, group_column: impl Into<String>) -> Self {
        self.group_column = group_column.into();
        self
    }

    pub fn with_reference_policy(mut self, policy: ReferencePolicy) -> Self {
        self.reference_policy = policy;
        self
    }

    pub fn with_deduplicate(mut self, deduplicate: bool) -> Self {
        self.deduplicate = deduplicate;
        self
    }

    pub fn with_numeric_output_check(mut self, required: bool) -> Self {
        self.require_numeric_output = required;
        self
    }
}

/// Creates the session every table snapshot is evaluated in.
///
/// A single target partition keeps row order stable from the raw table to the output.
pub fn session_context() -> SessionContext {
    SessionContext::new_with_config(SessionConfig::new().with_target_partitions(1))
}
