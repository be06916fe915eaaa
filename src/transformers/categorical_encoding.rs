//! # Categorical Encoding Transformers
//!
//! The two encoding stages that turn canonical labels into numbers:
//!
//! - **OrdinalEncoder:** Replaces each label of an ordered scale with its rank. Every label must
//!   be on the column's scale; an unknown label is an error, never a silent default.
//! - **OneHotEncoder:** Expands each nominal column into 0/1 indicator columns, one per observed
//!   label except the reference label, and removes the original column.
//!
//! Both encoders learn from the table in `fit` (observed labels, validation) and only build
//! expressions in `transform`. Observed labels of all target columns are read in one pass and
//! checked per column in parallel.

use crate::catalog::OrdinalScale;
use crate::exceptions::{PrepError, PrepResult};
use crate::impl_transformer;
use crate::settings::ReferencePolicy;
use crate::table::{
    column, column_state, column_type, indicator_name, is_integer_type, is_string_type,
    ColumnState,
};
use arrow::array::{Array, StringArray};
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use datafusion_expr::{cast, lit, Case as DFCase, Expr};
use datafusion::prelude::*;
use datafusion::scalar::ScalarValue;
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::{debug, info};

/// Labels observed in one column.
#[derive(Debug, Default)]
struct ObservedLabels {
    labels: BTreeSet<String>,
    nulls: usize,
}

/// Reads the given columns as text in a single query.
async fn collect_as_labels(df: &DataFrame, columns: &[String]) -> PrepResult<Vec<RecordBatch>> {
    let exprs: Vec<Expr> = columns
        .iter()
        .map(|name| cast(column(name), DataType::Utf8).alias(name))
        .collect();
    df.clone()
        .select(exprs)?
        .collect()
        .await
        .map_err(PrepError::from)
}

fn observed_labels(
    batches: &[RecordBatch],
    index: usize,
    col_name: &str,
) -> PrepResult<ObservedLabels> {
    let mut observed = ObservedLabels::default();
    for batch in batches {
        let array = batch
            .column(index)
            .as_any()
            .downcast_ref::<StringArray>()
            .ok_or_else(|| {
                PrepError::DataFusionError(datafusion::error::DataFusionError::Plan(format!(
                    "Expected Utf8 array for column {}",
                    col_name
                )))
            })?;
        for i in 0..array.len() {
            if array.is_null(i) {
                observed.nulls += 1;
            } else if !observed.labels.contains(array.value(i)) {
                observed.labels.insert(array.value(i).to_string());
            }
        }
    }
    Ok(observed)
}

/// Observed labels of each column, computed in parallel over the collected batches.
async fn extract_observed_labels(
    df: &DataFrame,
    columns: &[String],
) -> PrepResult<Vec<ObservedLabels>> {
    if columns.is_empty() {
        return Ok(Vec::new());
    }
    let batches = collect_as_labels(df, columns).await?;
    columns
        .par_iter()
        .enumerate()
        .map(|(index, name)| observed_labels(&batches, index, name))
        .collect()
}

/// ------------------------- OrdinalEncoder -------------------------
///
/// OrdinalEncoder replaces each label with its rank on the column's scale.
/// Integer columns are taken as already encoded and pass through.
pub struct OrdinalEncoder {
    pub scales: BTreeMap<String, OrdinalScale>,
    /// Columns that still hold labels in the fitted table.
    encoded: Vec<String>,
    fitted: bool,
}

impl OrdinalEncoder {
    pub fn new(scales: BTreeMap<String, OrdinalScale>) -> Self {
        Self {
            scales,
            encoded: Vec::new(),
            fitted: false,
        }
    }

    /// Checks that every label of every ordinal column is on its scale.
    pub async fn fit(&mut self, df: &DataFrame) -> PrepResult<()> {
        let mut to_encode = Vec::new();
        let mut missing = Vec::new();
        for name in self.scales.keys() {
            let Some(dt) = column_type(df, name) else {
                missing.push(name.clone());
                continue;
            };
            if is_integer_type(&dt) {
                debug!(column = %name, "already ordinal-encoded");
            } else if is_string_type(&dt) || dt == DataType::Null {
                to_encode.push(name.clone());
            } else {
                return Err(PrepError::UnsupportedType {
                    column: name.clone(),
                    data_type: dt.to_string(),
                    directive: "ordinal-map".to_string(),
                });
            }
        }
        if !missing.is_empty() {
            return Err(PrepError::MissingColumns(missing));
        }

        let observed = extract_observed_labels(df, &to_encode).await?;
        for (name, observed) in to_encode.iter().zip(&observed) {
            if observed.nulls > 0 {
                return Err(PrepError::IncompleteColumn {
                    column: name.clone(),
                    nulls: observed.nulls,
                });
            }
            let scale = &self.scales[name];
            if let Some(label) = observed.labels.iter().find(|l| scale.rank(l).is_none()) {
                return Err(PrepError::UnmappedCategory {
                    column: name.clone(),
                    label: label.clone(),
                });
            }
        }
        info!(columns = to_encode.len(), "ordinal scales validated");
        self.encoded = to_encode;
        self.fitted = true;
        Ok(())
    }

    /// Replaces each ordinal column's labels with Int64 ranks.
    pub fn transform(&self, df: DataFrame) -> PrepResult<DataFrame> {
        if !self.fitted {
            return Err(PrepError::FitNotCalled);
        }
        crate::table::project_with(df, |name, _| {
            if !self.encoded.iter().any(|c| c == name) {
                return None;
            }
            let scale = self.scales.get(name)?;
            let when_then_expr = scale
                .ranks
                .iter()
                .map(|(label, rank)| {
                    (
                        Box::new(column(name).eq(lit(label.clone()))),
                        Box::new(lit(*rank)),
                    )
                })
                .collect();
            Some(Expr::Case(DFCase {
                expr: None,
                when_then_expr,
                // Unreachable for a fitted table: every label was checked against the scale.
                else_expr: Some(Box::new(lit(ScalarValue::Int64(None)))),
            }))
        })
    }

    fn inherent_is_stateful(&self) -> bool {
        true
    }
}

/// ------------------------- OneHotEncoder -------------------------
///
/// OneHotEncoder replaces each nominal column with Int32 indicator columns named
/// `<column>_<label>`. Labels are taken in alphabetical order; under
/// [`ReferencePolicy::DropFirst`] the first one is the reference category and gets no
/// indicator, so k observed labels give k - 1 columns.
pub struct OneHotEncoder {
    pub columns: Vec<String>,
    pub policy: ReferencePolicy,
    /// Mapping from column name to the labels that get an indicator column.
    pub categories: BTreeMap<String, Vec<String>>,
    fitted: bool,
}

impl OneHotEncoder {
    pub fn new(columns: Vec<String>, policy: ReferencePolicy) -> Self {
        Self {
            columns,
            policy,
            categories: BTreeMap::new(),
            fitted: false,
        }
    }

    /// Learn the labels of each target column.
    pub async fn fit(&mut self, df: &DataFrame) -> PrepResult<()> {
        let mut to_expand = Vec::new();
        let mut missing = Vec::new();
        for name in &self.columns {
            match column_state(df, name) {
                ColumnState::Present => to_expand.push(name.clone()),
                ColumnState::Expanded => debug!(column = %name, "already one-hot expanded"),
                ColumnState::Missing => missing.push(name.clone()),
            }
        }
        if !missing.is_empty() {
            return Err(PrepError::MissingColumns(missing));
        }

        let observed = extract_observed_labels(df, &to_expand).await?;
        let mut existing: HashSet<String> = df
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect();
        self.categories.clear();
        for (name, observed) in to_expand.into_iter().zip(observed) {
            if observed.nulls > 0 {
                return Err(PrepError::IncompleteColumn {
                    column: name,
                    nulls: observed.nulls,
                });
            }
            let mut labels: Vec<String> = observed.labels.into_iter().collect();
            if self.policy == ReferencePolicy::DropFirst && !labels.is_empty() {
                let reference = labels.remove(0);
                debug!(column = %name, reference = %reference, "reference category dropped");
            }
            for label in &labels {
                let indicator = indicator_name(&name, label);
                if !existing.insert(indicator.clone()) {
                    return Err(PrepError::InvalidParameter(format!(
                        "Indicator column '{}' for '{}' collides with an existing column",
                        indicator, name
                    )));
                }
            }
            self.categories.insert(name, labels);
        }
        info!(
            columns = self.categories.len(),
            indicators = self.categories.values().map(Vec::len).sum::<usize>(),
            "one-hot categories learned"
        );
        self.fitted = true;
        Ok(())
    }

    /// Replace each target column with its indicator columns, in place.
    pub fn transform(&self, df: DataFrame) -> PrepResult<DataFrame> {
        if !self.fitted {
            return Err(PrepError::FitNotCalled);
        }
        let mut exprs = vec![];
        for field in df.schema().fields() {
            let col_name = field.name();
            let Some(labels) = self.categories.get(col_name) else {
                exprs.push(column(col_name));
                continue;
            };
            let as_label = if is_string_type(field.data_type()) {
                column(col_name)
            } else {
                cast(column(col_name), DataType::Utf8)
            };
            for label in labels {
                let case_expr = Expr::Case(DFCase {
                    expr: None,
                    when_then_expr: vec![(
                        Box::new(as_label.clone().eq(lit(label.clone()))),
                        Box::new(lit(1_i32)),
                    )],
                    else_expr: Some(Box::new(lit(0_i32))),
                })
                .alias(indicator_name(col_name, label));
                exprs.push(case_expr);
            }
        }
        if exprs.is_empty() {
            return Err(PrepError::InvalidParameter(
                "One-hot expansion would result in an empty table.".to_string(),
            ));
        }
        df.select(exprs).map_err(PrepError::from)
    }

    fn inherent_is_stateful(&self) -> bool {
        true
    }
}

impl_transformer!(OrdinalEncoder);
impl_transformer!(OneHotEncoder);
