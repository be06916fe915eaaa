//! ## Type Correction
//!
//! [`TypeReclassifier`] stores numeric columns whose values are nominal codes (a dwelling
//! type code, a month, a year, a year that uses 0 for "not applicable") as labels, so that later
//! stages treat them as categories instead of magnitudes.
//!
//! The list of columns is explicit. Ordinal numerics such as quality ratings are never inferred
//! from the data and stay numeric.

use crate::exceptions::{PrepError, PrepResult};
use crate::impl_transformer;
use crate::table::{
    column, column_state, column_type, is_float_type, is_integer_type, is_string_type,
    project_with, ColumnState,
};
use arrow::array::{Array, Float64Array};
use arrow::datatypes::DataType;
use datafusion::dataframe::DataFrame;
use datafusion::logical_expr::{cast, Expr};
use std::collections::BTreeMap;
use tracing::debug;

/// How a column's codes become labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Conversion {
    /// Integer codes: `20` -> `"20"`.
    Integer,
    /// Whole-number floats: `2003.0` -> `"2003"`.
    WholeFloat,
}

/// Converts nominal numeric code columns to string columns.
pub struct TypeReclassifier {
    pub columns: Vec<String>,
    conversions: BTreeMap<String, Conversion>,
    fitted: bool,
}

impl TypeReclassifier {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            conversions: BTreeMap::new(),
            fitted: false,
        }
    }

    /// Returns the first non-integral value of a float column, if any.
    async fn first_fractional(df: &DataFrame, name: &str) -> PrepResult<Option<f64>> {
        let batches = df
            .clone()
            .select(vec![cast(column(name), DataType::Float64).alias(name)])?
            .collect()
            .await?;
        for batch in batches {
            let values = batch
                .column(0)
                .as_any()
                .downcast_ref::<Float64Array>()
                .ok_or_else(|| {
                    PrepError::DataFusionError(datafusion::error::DataFusionError::Plan(format!(
                        "Expected Float64 array for column {}",
                        name
                    )))
                })?;
            if let Some(value) = values
                .iter()
                .flatten()
                .find(|v| !v.is_finite() || v.fract() != 0.0)
            {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }

    pub async fn fit(&mut self, df: &DataFrame) -> PrepResult<()> {
        self.conversions.clear();
        for name in &self.columns {
            let dt = match column_state(df, name) {
                ColumnState::Present => column_type(df, name).unwrap_or(DataType::Null),
                ColumnState::Expanded => continue,
                ColumnState::Missing => {
                    return Err(PrepError::MissingColumns(vec![name.clone()]))
                }
            };
            if is_string_type(&dt) {
                debug!(column = %name, "already stored as labels");
                continue;
            }
            let conversion = if is_integer_type(&dt) {
                Conversion::Integer
            } else if is_float_type(&dt) {
                if let Some(value) = Self::first_fractional(df, name).await? {
                    return Err(PrepError::NonIntegralCode {
                        column: name.clone(),
                        value,
                    });
                }
                Conversion::WholeFloat
            } else {
                return Err(PrepError::UnsupportedType {
                    column: name.clone(),
                    data_type: dt.to_string(),
                    directive: "type-reclassify".to_string(),
                });
            };
            debug!(column = %name, from = %dt, "reclassifying codes as labels");
            self.conversions.insert(name.clone(), conversion);
        }
        self.fitted = true;
        Ok(())
    }

    pub fn transform(&self, df: DataFrame) -> PrepResult<DataFrame> {
        if !self.fitted {
            return Err(PrepError::FitNotCalled);
        }
        project_with(df, |name, _| {
            let conversion = self.conversions.get(name)?;
            let codes: Expr = match conversion {
                Conversion::Integer => column(name),
                Conversion::WholeFloat => cast(column(name), DataType::Int64),
            };
            Some(cast(codes, DataType::Utf8))
        })
    }

    fn inherent_is_stateful(&self) -> bool {
        true
    }
}

impl_transformer!(TypeReclassifier);
