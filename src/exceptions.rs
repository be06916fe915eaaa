//! ## Errors and Warnings for Housing Prep
//!
//! This module defines the error type returned by every stage of the preparation pipeline.
//! It uses the `thiserror` crate to derive the `Error` trait. Variants fall into two families:
//!
//! - **Data-quality errors** describe problems with the table itself (a missing column, a
//!   partition with nothing to impute from, a label outside an ordinal scale, ...).
//!   Re-running the pipeline on the same input reproduces them, so they are fatal.
//! - **Configuration errors** describe a broken directive catalog (an ordinal scale with
//!   duplicated ranks, a column with two imputation directives, ...).
//!
//! Recoverable cross-column problems are not errors; they are reported as [`PrepWarning`]s.
//!
//! ### Example
//!
//! ```rust
//! use housing_prep::exceptions::{PrepError, PrepResult};
//!
//! fn encode_slope(label: &str) -> PrepResult<i64> {
//!     match label {
//!         "Gtl" => Ok(1),
//!         other => Err(PrepError::UnmappedCategory {
//!             column: "LandSlope".into(),
//!             label: other.into(),
//!         }),
//!     }
//! }
//!
//! assert!(encode_slope("Steep").unwrap_err().is_data_quality());
//! ```

use std::fmt;
use thiserror::Error;

/// Errors raised while validating a catalog or transforming a table.
#[derive(Debug, Error)]
pub enum PrepError {
    /// Wraps errors from DataFusion.
    #[error("DataFusion error: {0}")]
    DataFusionError(#[from] datafusion::error::DataFusionError),

    /// Wraps errors from Arrow.
    #[error("Arrow error: {0}")]
    ArrowError(#[from] arrow::error::ArrowError),

    /// Wraps errors from decoding or encoding a directive catalog.
    #[error("Catalog serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// One or more required columns are absent from the input table.
    #[error("Missing column(s): {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    /// A grouping partition contains missing values but no observed value to take a median from.
    #[error("Cannot impute '{column}': partition '{partition}' of '{group_column}' has no observed value")]
    EmptyPartition {
        column: String,
        group_column: String,
        partition: String,
    },

    /// A column has missing values and no observed value at all.
    #[error("Cannot impute '{column}': the column has no observed value")]
    NoObservedValues { column: String },

    /// An ordinal column holds a label outside its declared scale.
    #[error("Unmapped category '{label}' in ordinal column '{column}'")]
    UnmappedCategory { column: String, label: String },

    /// A column that must be complete at this point still has missing values.
    #[error("Column '{column}' still has {nulls} missing value(s)")]
    IncompleteColumn { column: String, nulls: usize },

    /// A numeric code column holds a value that is not a whole number.
    #[error("Column '{column}' holds non-integral code {value}")]
    NonIntegralCode { column: String, value: f64 },

    /// A cross-column rule cannot be enforced because its trigger column is incomplete.
    #[error("Cannot enforce '{target_column}' from '{trigger_column}': trigger column has missing values")]
    ConsistencyViolation {
        trigger_column: String,
        target_column: String,
    },

    /// Columns left non-numeric after every encoding stage ran.
    #[error("Non-numeric column(s) in output: {}", .0.join(", "))]
    NonNumericOutput(Vec<String>),

    /// A stage past deduplication changed the number of rows.
    #[error("Row count changed from {expected} to {actual}")]
    RowCountChanged { expected: usize, actual: usize },

    /// A column's storage type is not supported by the directive applied to it.
    #[error("Column '{column}' has unsupported type {data_type} for {directive}")]
    UnsupportedType {
        column: String,
        data_type: String,
        directive: String,
    },

    /// The directive catalog is inconsistent or incomplete.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Indicates that an invalid parameter was provided.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Indicates the transform method was called before calling fit for a stateful transformer.
    #[error("Transform called before fit for stateful transformer")]
    FitNotCalled,
}

impl PrepError {
    /// Returns true for errors caused by the contents of the table.
    pub fn is_data_quality(&self) -> bool {
        matches!(
            self,
            PrepError::MissingColumns(_)
                | PrepError::EmptyPartition { .. }
                | PrepError::NoObservedValues { .. }
                | PrepError::UnmappedCategory { .. }
                | PrepError::IncompleteColumn { .. }
                | PrepError::NonIntegralCode { .. }
                | PrepError::ConsistencyViolation { .. }
                | PrepError::NonNumericOutput(_)
                | PrepError::RowCountChanged { .. }
        )
    }

    /// Returns true for errors caused by the directive catalog or settings.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            PrepError::Configuration(_)
                | PrepError::InvalidParameter(_)
                | PrepError::UnsupportedType { .. }
                | PrepError::JsonError(_)
        )
    }
}

/// A convenient result type for Housing Prep operations.
pub type PrepResult<T> = std::result::Result<T, PrepError>;

/// Recoverable problems found while running the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum PrepWarning {
    /// A consistency rule found missing values in its trigger column and filled them
    /// with the trigger's own imputation value before enforcing the rule.
    ConsistencyRepair {
        trigger_column: String,
        target_column: String,
        filled_rows: usize,
        fill_label: String,
    },
}

impl fmt::Display for PrepWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrepWarning::ConsistencyRepair {
                trigger_column,
                target_column,
                filled_rows,
                fill_label,
            } => write!(
                f,
                "filled {} missing '{}' value(s) with '{}' before enforcing '{}'",
                filled_rows, trigger_column, fill_label, target_column
            ),
        }
    }
}
