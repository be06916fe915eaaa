//! ## Transformers for imputing missing values
//!
//! This module provides the imputers of the first pipeline stage:
//!
//! - **GroupMedianImputer**: Fills a numeric column with the median of the rows sharing a grouping value.
//! - **ConstantImputer**: Fills a column with a fixed sentinel (0 for absent measurements, `"NA"` for absent features).
//! - **ModeImputer**: Fills a column with its most frequent observed value.
//!
//! Every imputer returns a new table; columns it was not configured for pass through unchanged.
//! A column without missing values is left untouched, which makes every imputer idempotent.

use crate::catalog::Sentinel;
use crate::exceptions::{PrepError, PrepResult};
use crate::impl_transformer;
use crate::table::{
    column, column_state, column_type, is_float_type, is_integer_type, is_string_type,
    null_count, project_with, validate_columns, ColumnState,
};
use arrow::array::{Array, Int64Array};
use arrow::datatypes::DataType;
use datafusion::functions_aggregate::expr_fn::{count, median};
use datafusion::logical_expr::{cast, lit, not, Case as DFCase, Expr};
use datafusion::prelude::*;
use datafusion::scalar::ScalarValue;
use futures::future::try_join_all;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

/// Constructs an expression equivalent to SQL COALESCE(col, fallback).
/// This is implemented as a CASE expression: if `col` is not null then return it, otherwise return `fallback`.
fn coalesce_expr_for(name: &str, fallback: Expr) -> Expr {
    Expr::Case(DFCase {
        expr: None,
        when_then_expr: vec![(Box::new(not(column(name).is_null())), Box::new(column(name)))],
        else_expr: Some(Box::new(fallback)),
    })
}

/// The target columns still present in the table.
///
/// Columns already one-hot expanded have nothing left to impute and are skipped.
fn present_targets<'a, I>(df: &DataFrame, columns: I) -> PrepResult<Vec<String>>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut present = Vec::new();
    let mut missing = Vec::new();
    for name in columns {
        match column_state(df, name) {
            ColumnState::Present => present.push(name.clone()),
            ColumnState::Expanded => debug!(column = %name, "already expanded, nothing to impute"),
            ColumnState::Missing => missing.push(name.clone()),
        }
    }
    if missing.is_empty() {
        Ok(present)
    } else {
        Err(PrepError::MissingColumns(missing))
    }
}

/// Columns among `columns` that still contain missing values, with their null counts.
async fn incomplete_columns(
    df: &DataFrame,
    columns: &[String],
) -> PrepResult<Vec<(String, usize)>> {
    let counts = try_join_all(columns.iter().map(|name| null_count(df, name))).await?;
    Ok(columns
        .iter()
        .cloned()
        .zip(counts)
        .filter(|(_, nulls)| *nulls > 0)
        .collect())
}

/// A partition key: the grouping column's value rendered as text, `None` for a missing key.
type PartitionKey = Option<String>;

fn partition_label(key: &PartitionKey) -> String {
    key.clone().unwrap_or_else(|| "<null>".to_string())
}

/// Replaces missing values with the median of the row's partition.
///
/// Rows are partitioned by `group_by` (e.g. the neighborhood). A partition with missing values
/// but no observed value is a data-quality error naming the partition.
pub struct GroupMedianImputer {
    /// Target column -> grouping column.
    pub columns: BTreeMap<String, String>,
    /// Target column -> (partition -> median), only for columns that had missing values.
    pub medians: HashMap<String, Vec<(PartitionKey, f64)>>,
    fitted: bool,
}

impl GroupMedianImputer {
    pub fn new(columns: BTreeMap<String, String>) -> Self {
        Self {
            columns,
            medians: HashMap::new(),
            fitted: false,
        }
    }

    async fn partition_medians(
        df: &DataFrame,
        target: &str,
        group_by: &str,
    ) -> PrepResult<Vec<(PartitionKey, f64)>> {
        validate_columns(df, &[group_by.to_string()])?;
        let grouped = df.clone().aggregate(
            vec![cast(column(group_by), DataType::Utf8).alias("partition")],
            vec![median(cast(column(target), DataType::Float64)).alias("median")],
        )?;
        let batches = grouped.collect().await?;
        let mut medians = Vec::new();
        for batch in batches {
            for i in 0..batch.num_rows() {
                let key = match ScalarValue::try_from_array(batch.column(0), i)? {
                    ScalarValue::Utf8(key) => key,
                    other => Some(other.to_string()),
                };
                match ScalarValue::try_from_array(batch.column(1), i)? {
                    ScalarValue::Float64(Some(value)) => medians.push((key, value)),
                    _ => {
                        return Err(PrepError::EmptyPartition {
                            column: target.to_string(),
                            group_column: group_by.to_string(),
                            partition: partition_label(&key),
                        })
                    }
                }
            }
        }
        // Deterministic CASE order.
        medians.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(medians)
    }

    /// Computes the partition medians of every target column that has missing values.
    pub async fn fit(&mut self, df: &DataFrame) -> PrepResult<()> {
        let targets = present_targets(df, self.columns.keys())?;
        for name in &targets {
            let dt = column_type(df, name).unwrap_or(DataType::Null);
            if !(is_float_type(&dt) || is_integer_type(&dt)) {
                return Err(PrepError::UnsupportedType {
                    column: name.clone(),
                    data_type: dt.to_string(),
                    directive: "group-median-impute".to_string(),
                });
            }
        }

        self.medians.clear();
        for (name, nulls) in incomplete_columns(df, &targets).await? {
            let group_by = &self.columns[&name];
            let medians = Self::partition_medians(df, &name, group_by).await?;
            info!(
                column = %name,
                group_by = %group_by,
                missing = nulls,
                partitions = medians.len(),
                "imputing with partition medians"
            );
            self.medians.insert(name, medians);
        }
        self.fitted = true;
        Ok(())
    }

    /// Returns a new table where missing values of each target column take their partition median.
    pub fn transform(&self, df: DataFrame) -> PrepResult<DataFrame> {
        if !self.fitted {
            return Err(PrepError::FitNotCalled);
        }
        project_with(df, |name, _| {
            let medians = self.medians.get(name)?;
            let group_by = &self.columns[name];
            let when_then_expr = medians
                .iter()
                .map(|(key, value)| {
                    let in_partition = match key {
                        Some(key) => cast(column(group_by), DataType::Utf8).eq(lit(key.clone())),
                        None => column(group_by).is_null(),
                    };
                    (
                        Box::new(column(name).is_null().and(in_partition)),
                        Box::new(lit(*value)),
                    )
                })
                .collect();
            Some(Expr::Case(DFCase {
                expr: None,
                when_then_expr,
                else_expr: Some(Box::new(cast(column(name), DataType::Float64))),
            }))
        })
    }

    fn inherent_is_stateful(&self) -> bool {
        true
    }
}

/// Replaces missing values with a fixed sentinel.
pub struct ConstantImputer {
    pub values: BTreeMap<String, Sentinel>,
    /// Fill expressions resolved against the column types of the fitted table.
    fills: HashMap<String, Expr>,
    fitted: bool,
}

impl ConstantImputer {
    pub fn new(values: BTreeMap<String, Sentinel>) -> Self {
        Self {
            values,
            fills: HashMap::new(),
            fitted: false,
        }
    }

    /// Checks that each sentinel suits its column's type and resolves the fill expression
    /// of every column that has missing values.
    pub async fn fit(&mut self, df: &DataFrame) -> PrepResult<()> {
        let targets = present_targets(df, self.values.keys())?;
        self.fills.clear();
        for (name, nulls) in incomplete_columns(df, &targets).await? {
            let sentinel = &self.values[&name];
            let dt = column_type(df, &name).unwrap_or(DataType::Null);
            let fill = match sentinel {
                Sentinel::Number(n) if !n.is_finite() => {
                    return Err(PrepError::InvalidParameter(format!(
                        "Sentinel {} for column '{}' must be finite",
                        n, name
                    )))
                }
                Sentinel::Number(n) if is_integer_type(&dt) || is_float_type(&dt) => {
                    cast(lit(*n), dt.clone())
                }
                Sentinel::Label(label) if is_string_type(&dt) => {
                    cast(lit(label.clone()), dt.clone())
                }
                // An all-missing column carries no type information.
                Sentinel::Number(n) if dt == DataType::Null => lit(*n),
                Sentinel::Label(label) if dt == DataType::Null => lit(label.clone()),
                _ => {
                    return Err(PrepError::UnsupportedType {
                        column: name.clone(),
                        data_type: dt.to_string(),
                        directive: format!("constant-impute with {}", sentinel),
                    })
                }
            };
            debug!(column = %name, sentinel = %sentinel, missing = nulls, "constant fill resolved");
            self.fills.insert(name, fill);
        }
        self.fitted = true;
        Ok(())
    }

    /// Returns a new table where, for each target column, missing values are replaced with the sentinel.
    pub fn transform(&self, df: DataFrame) -> PrepResult<DataFrame> {
        if !self.fitted {
            return Err(PrepError::FitNotCalled);
        }
        project_with(df, |name, _| {
            self.fills
                .get(name)
                .map(|fill| coalesce_expr_for(name, fill.clone()))
        })
    }

    fn inherent_is_stateful(&self) -> bool {
        true
    }
}

/// Orders mode candidates: higher count first, then the smaller value.
fn mode_order(a: &(ScalarValue, i64), b: &(ScalarValue, i64)) -> Ordering {
    b.1.cmp(&a.1).then_with(|| {
        a.0.partial_cmp(&b.0)
            .unwrap_or_else(|| a.0.to_string().cmp(&b.0.to_string()))
    })
}

/// Replaces missing values with the most frequent observed value of the column.
///
/// Ties go to the smallest value (lexicographic for labels), so the result does not depend on
/// row order.
pub struct ModeImputer {
    pub columns: Vec<String>,
    pub modes: HashMap<String, ScalarValue>,
    fitted: bool,
}

impl ModeImputer {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            modes: HashMap::new(),
            fitted: false,
        }
    }

    async fn compute_mode(df: &DataFrame, name: &str) -> PrepResult<ScalarValue> {
        let grouped = df
            .clone()
            .filter(column(name).is_not_null())?
            .aggregate(vec![column(name)], vec![count(column(name)).alias("cnt")])?;
        let batches = grouped.collect().await?;
        let mut candidates: Vec<(ScalarValue, i64)> = Vec::new();
        for batch in batches {
            let counts = batch
                .column(1)
                .as_any()
                .downcast_ref::<Int64Array>()
                .ok_or_else(|| {
                    PrepError::DataFusionError(datafusion::error::DataFusionError::Plan(
                        "Expected Int64 array".into(),
                    ))
                })?;
            for i in 0..batch.num_rows() {
                if counts.is_null(i) {
                    continue;
                }
                let value = ScalarValue::try_from_array(batch.column(0), i)?;
                candidates.push((value, counts.value(i)));
            }
        }
        candidates.sort_by(mode_order);
        candidates
            .into_iter()
            .next()
            .map(|(value, _)| value)
            .ok_or_else(|| PrepError::NoObservedValues {
                column: name.to_string(),
            })
    }

    /// Computes the mode of every target column that has missing values, concurrently.
    pub async fn fit(&mut self, df: &DataFrame) -> PrepResult<()> {
        let targets = present_targets(df, &self.columns)?;
        let incomplete: Vec<String> = incomplete_columns(df, &targets)
            .await?
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        let modes =
            try_join_all(incomplete.iter().map(|name| Self::compute_mode(df, name))).await?;
        self.modes = incomplete.into_iter().zip(modes).collect();
        for (name, mode) in &self.modes {
            info!(column = %name, mode = %mode, "imputing with mode");
        }
        self.fitted = true;
        Ok(())
    }

    /// Returns a new table where, for each target column, missing values are replaced with its mode.
    pub fn transform(&self, df: DataFrame) -> PrepResult<DataFrame> {
        if !self.fitted {
            return Err(PrepError::FitNotCalled);
        }
        project_with(df, |name, _| {
            self.modes
                .get(name)
                .map(|mode| coalesce_expr_for(name, lit(mode.clone())))
        })
    }

    fn inherent_is_stateful(&self) -> bool {
        true
    }
}

impl_transformer!(GroupMedianImputer);
impl_transformer!(ConstantImputer);
impl_transformer!(ModeImputer);
