//! ## Raw-Table Cleaning
//!
//! Steps that run once on the raw table, before any column directive:
//!
//! - [`DropColumns`]: Removes identifier and unusable columns (absent ones are ignored).
//! - [`Deduplicator`]: Removes exact duplicate rows, keeping the first occurrence in row order.
//!
//! Deduplication is the only operation in the crate that changes the row count, so it is not a
//! [`crate::pipeline::Transformer`]: it materializes the table and reports how many rows it removed.

use crate::exceptions::{PrepError, PrepResult};
use crate::impl_transformer;
use crate::settings::session_context;
use crate::table::{collect_batch, column};
use arrow::array::BooleanArray;
use arrow::compute::filter_record_batch;
use arrow::row::{RowConverter, SortField};
use datafusion::dataframe::DataFrame;
use datafusion::logical_expr::Expr;
use std::collections::HashSet;
use tracing::{debug, info};

/// Removes the specified columns from the table.
pub struct DropColumns {
    pub columns: Vec<String>,
}

impl DropColumns {
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns }
    }

    pub async fn fit(&mut self, _df: &DataFrame) -> PrepResult<()> {
        Ok(())
    }

    pub fn transform(&self, df: DataFrame) -> PrepResult<DataFrame> {
        let mut dropped = Vec::new();
        let kept: Vec<Expr> = df
            .schema()
            .fields()
            .iter()
            .filter_map(|field| {
                if self.columns.contains(field.name()) {
                    dropped.push(field.name().clone());
                    None
                } else {
                    Some(column(field.name()))
                }
            })
            .collect();

        if kept.is_empty() {
            return Err(PrepError::InvalidParameter(
                "Dropping these columns would result in an empty table.".to_string(),
            ));
        }
        debug!(columns = ?dropped, "dropping columns");
        df.select(kept).map_err(PrepError::from)
    }

    fn inherent_is_stateful(&self) -> bool {
        false
    }
}

/// Result of a deduplication pass.
pub struct Deduplicated {
    pub table: DataFrame,
    pub input_rows: usize,
    pub removed_rows: usize,
}

impl Deduplicated {
    pub fn output_rows(&self) -> usize {
        self.input_rows - self.removed_rows
    }
}

/// Removes exact duplicate rows. Two missing cells in the same column compare equal.
#[derive(Debug, Default, Clone, Copy)]
pub struct Deduplicator;

impl Deduplicator {
    pub fn new() -> Self {
        Self
    }

    /// Materializes the table and keeps the first occurrence of every distinct row.
    pub async fn apply(&self, df: DataFrame) -> PrepResult<Deduplicated> {
        let batch = collect_batch(df).await?;
        let input_rows = batch.num_rows();

        let converter = RowConverter::new(
            batch
                .schema()
                .fields()
                .iter()
                .map(|field| SortField::new(field.data_type().clone()))
                .collect(),
        )?;
        let rows = converter.convert_columns(batch.columns())?;

        let mut seen = HashSet::with_capacity(input_rows);
        let keep: BooleanArray = rows
            .iter()
            .map(|row| Some(seen.insert(row)))
            .collect();
        let deduplicated = filter_record_batch(&batch, &keep)?;
        let removed_rows = input_rows - deduplicated.num_rows();

        info!(input_rows, removed_rows, "removed duplicate rows");
        Ok(Deduplicated {
            table: session_context().read_batch(deduplicated)?,
            input_rows,
            removed_rows,
        })
    }
}

impl_transformer!(DropColumns);
