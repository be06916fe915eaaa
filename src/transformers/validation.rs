//! ## Table Validation
//!
//! - [`SchemaValidator`]: Fails fast when a column the catalog needs is absent from the input.
//! - [`NumericOutputCheck`]: Fails when a column is still non-numeric after every encoding stage.
//!
//! Both leave the table unchanged.

use crate::exceptions::{PrepError, PrepResult};
use crate::impl_transformer;
use crate::table::{column_state, is_numeric_type, ColumnState};
use datafusion::dataframe::DataFrame;
use tracing::debug;

/// Checks that every required column is present.
///
/// A column listed in `expandable` also counts as present when it has already been one-hot
/// expanded into `<column>_*` indicators, so a pipeline can be re-run on its own output.
pub struct SchemaValidator {
    pub required: Vec<String>,
    pub expandable: Vec<String>,
}

impl SchemaValidator {
    pub fn new(required: Vec<String>, expandable: Vec<String>) -> Self {
        Self {
            required,
            expandable,
        }
    }

    pub async fn fit(&mut self, df: &DataFrame) -> PrepResult<()> {
        let missing: Vec<String> = self
            .required
            .iter()
            .filter(|name| match column_state(df, name) {
                ColumnState::Present => false,
                ColumnState::Expanded => !self.expandable.contains(name),
                ColumnState::Missing => true,
            })
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(PrepError::MissingColumns(missing));
        }
        debug!(columns = self.required.len(), "schema validated");
        Ok(())
    }

    pub fn transform(&self, df: DataFrame) -> PrepResult<DataFrame> {
        Ok(df)
    }

    fn inherent_is_stateful(&self) -> bool {
        false
    }
}

/// Checks that every column is integer, float or boolean.
#[derive(Debug, Default)]
pub struct NumericOutputCheck;

impl NumericOutputCheck {
    pub fn new() -> Self {
        Self
    }

    pub async fn fit(&mut self, df: &DataFrame) -> PrepResult<()> {
        let offending: Vec<String> = df
            .schema()
            .fields()
            .iter()
            .filter(|field| !is_numeric_type(field.data_type()))
            .map(|field| field.name().clone())
            .collect();
        if offending.is_empty() {
            Ok(())
        } else {
            Err(PrepError::NonNumericOutput(offending))
        }
    }

    pub fn transform(&self, df: DataFrame) -> PrepResult<DataFrame> {
        Ok(df)
    }

    fn inherent_is_stateful(&self) -> bool {
        false
    }
}

impl_transformer!(SchemaValidator);
impl_transformer!(NumericOutputCheck);
