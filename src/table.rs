//! ## Table Helpers
//!
//! Shared helpers for working with record tables (DataFusion `DataFrame`s): column lookup,
//! type classification, null counting and materialization into a single in-memory batch.

use crate::exceptions::{PrepError, PrepResult};
use crate::settings::session_context;
use arrow::compute::concat_batches;
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use datafusion::logical_expr::{ident, Expr};
use datafusion::prelude::DataFrame;
use std::sync::Arc;

/// How a column named by a directive shows up in a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnState {
    Present,
    /// The column was removed by a one-hot expansion; its `<name>_*` indicators remain.
    Expanded,
    Missing,
}

/// Name of the indicator column for `label` of a one-hot expanded `column`.
pub fn indicator_name(column: &str, label: &str) -> String {
    format!("{}_{}", column, label)
}

/// Returns the data type of `name`, or `None` if the table has no such column.
pub fn column_type(df: &DataFrame, name: &str) -> Option<DataType> {
    df.schema()
        .field_with_unqualified_name(name)
        .ok()
        .map(|field| field.data_type().clone())
}

pub fn has_column(df: &DataFrame, name: &str) -> bool {
    column_type(df, name).is_some()
}

pub fn column_state(df: &DataFrame, name: &str) -> ColumnState {
    if has_column(df, name) {
        return ColumnState::Present;
    }
    let prefix = indicator_name(name, "");
    let expanded = df
        .schema()
        .fields()
        .iter()
        .any(|field| field.name().starts_with(&prefix));
    if expanded {
        ColumnState::Expanded
    } else {
        ColumnState::Missing
    }
}

/// Validates that every column in `columns` exists in the table.
pub fn validate_columns(df: &DataFrame, columns: &[String]) -> PrepResult<()> {
    let missing: Vec<String> = columns
        .iter()
        .filter(|name| !has_column(df, name))
        .cloned()
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(PrepError::MissingColumns(missing))
    }
}

/// Unqualified, unnormalized column reference.
///
/// Housing columns such as `1stFlrSF` or indicator names with spaces (`Exterior2nd_Wd Sdng`)
/// must not go through identifier parsing.
pub fn column(name: &str) -> Expr {
    ident(name)
}

/// Keeps every column of the table, replacing the ones for which `replace` returns an expression.
pub fn project_with<F>(df: DataFrame, replace: F) -> PrepResult<DataFrame>
where
    F: Fn(&str, &DataType) -> Option<Expr>,
{
    let exprs: Vec<Expr> = df
        .schema()
        .fields()
        .iter()
        .map(|field| {
            let name = field.name();
            match replace(name, field.data_type()) {
                Some(expr) => expr.alias(name),
                None => column(name),
            }
        })
        .collect();
    df.select(exprs).map_err(PrepError::from)
}

pub fn is_string_type(dt: &DataType) -> bool {
    matches!(dt, DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View)
}

pub fn is_integer_type(dt: &DataType) -> bool {
    matches!(
        dt,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
    )
}

pub fn is_float_type(dt: &DataType) -> bool {
    matches!(
        dt,
        DataType::Float16 | DataType::Float32 | DataType::Float64
    )
}

/// Integer, float or boolean: the types a model-ready table may hold.
pub fn is_numeric_type(dt: &DataType) -> bool {
    is_integer_type(dt) || is_float_type(dt) || matches!(dt, DataType::Boolean)
}

/// Counts the rows where `name` is null.
pub async fn null_count(df: &DataFrame, name: &str) -> PrepResult<usize> {
    df.clone()
        .filter(column(name).is_null())?
        .count()
        .await
        .map_err(PrepError::from)
}

/// Collects a table into one in-memory batch and returns a fresh table over it.
///
/// Returns the row count alongside the new table.
pub async fn materialize(df: DataFrame) -> PrepResult<(DataFrame, usize)> {
    let batch = collect_batch(df).await?;
    let rows = batch.num_rows();
    let table = session_context().read_batch(batch)?;
    Ok((table, rows))
}

/// Collects a table into a single record batch.
pub async fn collect_batch(df: DataFrame) -> PrepResult<RecordBatch> {
    let logical_schema = Arc::clone(df.schema().inner());
    let batches = df.collect().await?;
    let schema = batches
        .first()
        .map(|batch| batch.schema())
        .unwrap_or(logical_schema);
    concat_batches(&schema, &batches).map_err(PrepError::from)
}
