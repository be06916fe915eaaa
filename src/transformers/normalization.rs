//! ## Category Normalization
//!
//! Lookup-table rewrites that bring categorical columns to their canonical label sets before
//! any encoding:
//!
//! - [`LabelNormalizer`]: Fixes known misspellings (`"Wd Shng"` -> `"WdShing"`).
//! - [`RareCategoryGrouper`]: Merges low-frequency labels into aggregate buckets (`"ConLI"` -> `"Con"`).
//!
//! Matching is exact; labels not in a table, and missing values, pass through unchanged.
//! Tables are per column and never interact, so the order of columns does not matter.

use crate::exceptions::{PrepError, PrepResult};
use crate::impl_transformer;
use crate::table::{column, column_state, column_type, is_string_type, project_with, ColumnState};
use arrow::datatypes::DataType;
use datafusion::dataframe::DataFrame;
use datafusion_expr::{lit, Case as DFCase, Expr};
use std::collections::BTreeMap;
use tracing::debug;

/// Helper to build a CASE WHEN expression given a lookup table.
/// For each pair, the expression generated is:
/// `WHEN <col> = lit(<from>) THEN lit(<to>)`, with the original column as the ELSE branch.
fn build_lookup_expr(col_name: &str, mapping: &BTreeMap<String, String>) -> Expr {
    let when_then_expr = mapping
        .iter()
        .filter(|(from, to)| from != to)
        .map(|(from, to)| {
            (
                Box::new(column(col_name).eq(lit(from.clone()))),
                Box::new(lit(to.clone())),
            )
        })
        .collect::<Vec<_>>();
    if when_then_expr.is_empty() {
        return column(col_name);
    }
    Expr::Case(DFCase {
        expr: None,
        when_then_expr,
        else_expr: Some(Box::new(column(col_name))),
    })
}

/// Checks the lookup columns of a table and returns the ones to rewrite.
///
/// Columns that were already one-hot expanded are skipped; anything else must be a present
/// string column.
fn lookup_targets(
    df: &DataFrame,
    tables: &BTreeMap<String, BTreeMap<String, String>>,
    directive: &str,
) -> PrepResult<Vec<String>> {
    let mut targets = Vec::new();
    for name in tables.keys() {
        match column_state(df, name) {
            ColumnState::Present => {}
            ColumnState::Expanded => {
                debug!(column = %name, "already expanded, skipping {}", directive);
                continue;
            }
            ColumnState::Missing => return Err(PrepError::MissingColumns(vec![name.clone()])),
        }
        let dt = column_type(df, name).unwrap_or(DataType::Null);
        if !(is_string_type(&dt) || dt == DataType::Null) {
            return Err(PrepError::UnsupportedType {
                column: name.clone(),
                data_type: dt.to_string(),
                directive: directive.to_string(),
            });
        }
        targets.push(name.clone());
    }
    Ok(targets)
}

fn apply_lookups(
    df: DataFrame,
    tables: &BTreeMap<String, BTreeMap<String, String>>,
    targets: &[String],
) -> PrepResult<DataFrame> {
    project_with(df, |name, dt| {
        if *dt == DataType::Null || !targets.iter().any(|t| t == name) {
            return None;
        }
        let mapping = tables.get(name)?;
        let expr = build_lookup_expr(name, mapping);
        // Keep the storage type (e.g. Utf8View) stable across the rewrite.
        Some(datafusion::logical_expr::cast(expr, dt.clone()))
    })
}

/// Rewrites misspelled labels to their canonical spelling.
pub struct LabelNormalizer {
    /// Column -> (misspelling -> canonical label).
    pub corrections: BTreeMap<String, BTreeMap<String, String>>,
    targets: Vec<String>,
    fitted: bool,
}

impl LabelNormalizer {
    pub fn new(corrections: BTreeMap<String, BTreeMap<String, String>>) -> Self {
        Self {
            corrections,
            targets: Vec::new(),
            fitted: false,
        }
    }

    pub async fn fit(&mut self, df: &DataFrame) -> PrepResult<()> {
        self.targets = lookup_targets(df, &self.corrections, "label-normalize")?;
        self.fitted = true;
        Ok(())
    }

    pub fn transform(&self, df: DataFrame) -> PrepResult<DataFrame> {
        if !self.fitted {
            return Err(PrepError::FitNotCalled);
        }
        apply_lookups(df, &self.corrections, &self.targets)
    }

    fn inherent_is_stateful(&self) -> bool {
        true
    }
}

/// Merges rare labels into aggregate buckets according to a fixed grouping table.
pub struct RareCategoryGrouper {
    /// Column -> (label -> bucket).
    pub groups: BTreeMap<String, BTreeMap<String, String>>,
    targets: Vec<String>,
    fitted: bool,
}

impl RareCategoryGrouper {
    pub fn new(groups: BTreeMap<String, BTreeMap<String, String>>) -> Self {
        Self {
            groups,
            targets: Vec::new(),
            fitted: false,
        }
    }

    pub async fn fit(&mut self, df: &DataFrame) -> PrepResult<()> {
        self.targets = lookup_targets(df, &self.groups, "rare-category-group")?;
        self.fitted = true;
        Ok(())
    }

    pub fn transform(&self, df: DataFrame) -> PrepResult<DataFrame> {
        if !self.fitted {
            return Err(PrepError::FitNotCalled);
        }
        apply_lookups(df, &self.groups, &self.targets)
    }

    fn inherent_is_stateful(&self) -> bool {
        true
    }
}

impl_transformer!(LabelNormalizer);
impl_transformer!(RareCategoryGrouper);
