//! ## Feature Preparation Engine
//!
//! [`FeaturePipeline`] applies a [`DirectiveCatalog`] to a raw table:
//!
//! 1. Raw-table preparation: schema check, dropped columns, one deduplication pass.
//! 2. The stage pipeline, in fixed order: imputation, consistency enforcement, normalization,
//!    type correction, ordinal encoding, one-hot encoding, and the numeric output check.
//!
//! Within a stage, directives are grouped by kind into one transformer each, so every column
//! gets at most one treatment per stage and the catalog order does not change the result.

use crate::catalog::{Directive, DirectiveCatalog, Stage};
use crate::catalog::housing::housing_catalog;
use crate::exceptions::{PrepError, PrepResult, PrepWarning};
use crate::pipeline::{Pipeline, PipelineStep};
use crate::settings::PrepSettings;
use crate::table::{column_state, materialize, ColumnState};
use crate::transformers::categorical_encoding::{OneHotEncoder, OrdinalEncoder};
use crate::transformers::cleaning::{DropColumns, Deduplicator};
use crate::transformers::consistency::ConsistencyEnforcer;
use crate::transformers::imputation::{ConstantImputer, GroupMedianImputer, ModeImputer};
use crate::transformers::normalization::{LabelNormalizer, RareCategoryGrouper};
use crate::transformers::type_correction::TypeReclassifier;
use crate::transformers::validation::{NumericOutputCheck, SchemaValidator};
use datafusion::dataframe::DataFrame;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;
use tracing::{debug, info};

/// What a run did to the table.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub input_rows: usize,
    pub duplicates_removed: usize,
    pub output_rows: usize,
    pub output_columns: Vec<String>,
    pub warnings: Vec<PrepWarning>,
}

/// A model-ready table and the report of the run that produced it.
pub struct PreparedTable {
    pub table: DataFrame,
    pub report: RunReport,
}

/// Applies a directive catalog to raw tables.
#[derive(Debug, Clone)]
pub struct FeaturePipeline {
    catalog: DirectiveCatalog,
    settings: PrepSettings,
}

impl FeaturePipeline {
    /// Creates a pipeline, rejecting catalogs with configuration errors.
    pub fn new(catalog: DirectiveCatalog, settings: PrepSettings) -> PrepResult<Self> {
        if settings.group_column.is_empty() {
            return Err(PrepError::Configuration(
                "the default grouping column must not be empty".to_string(),
            ));
        }
        catalog.validate(&settings.group_column)?;
        Ok(Self { catalog, settings })
    }

    /// The housing catalog with default settings.
    pub fn housing() -> PrepResult<Self> {
        Self::new(housing_catalog(), PrepSettings::default())
    }

    pub fn catalog(&self) -> &DirectiveCatalog {
        &self.catalog
    }

    pub fn settings(&self) -> &PrepSettings {
        &self.settings
    }

    fn schema_validator(&self, spent: &BTreeSet<String>) -> SchemaValidator {
        SchemaValidator::new(
            self.catalog
                .required_columns(&self.settings.group_column)
                .into_iter()
                .filter(|name| !spent.contains(name))
                .collect(),
            self.one_hot_targets(spent),
        )
    }

    fn one_hot_targets(&self, spent: &BTreeSet<String>) -> Vec<String> {
        self.catalog
            .one_hot_columns()
            .into_iter()
            .filter(|name| !spent.contains(*name))
            .map(str::to_string)
            .collect()
    }

    fn live_directives<'a>(
        &'a self,
        stage: Stage,
        spent: &'a BTreeSet<String>,
    ) -> impl Iterator<Item = &'a Directive> {
        self.catalog
            .directives_for(stage)
            .filter(move |d| !spent.contains(d.column()))
    }

    /// One-hot targets that are gone from `df` without leaving any `<col>_*` indicator.
    ///
    /// In a table produced by this pipeline, that is a column whose expansion yielded no
    /// indicator (a single observed label under [`ReferencePolicy::DropFirst`]). Every
    /// directive and rule on such a column is skipped.
    ///
    /// [`ReferencePolicy::DropFirst`]: crate::settings::ReferencePolicy::DropFirst
    fn spent_expansions(&self, df: &DataFrame) -> BTreeSet<String> {
        self.catalog
            .one_hot_columns()
            .into_iter()
            .filter(|name| column_state(df, name) == ColumnState::Missing)
            .inspect(|name| debug!(column = %name, "expanded without indicators, skipping"))
            .map(str::to_string)
            .collect()
    }

    fn imputation_steps(&self, steps: &mut Vec<PipelineStep>, spent: &BTreeSet<String>) {
        let mut group_medians = BTreeMap::new();
        let mut constants = BTreeMap::new();
        let mut modes = Vec::new();
        for directive in self.live_directives(Stage::Imputation, spent) {
            match directive {
                Directive::GroupMedianImpute { column, group_by } => {
                    let group = group_by
                        .clone()
                        .unwrap_or_else(|| self.settings.group_column.clone());
                    group_medians.insert(column.clone(), group);
                }
                Directive::ConstantImpute { column, value } => {
                    constants.insert(column.clone(), value.clone());
                }
                Directive::ModeImpute { column } => modes.push(column.clone()),
                _ => {}
            }
        }
        if !group_medians.is_empty() {
            steps.push((
                "group_median_impute".to_string(),
                Box::new(GroupMedianImputer::new(group_medians)),
            ));
        }
        if !constants.is_empty() {
            steps.push((
                "constant_impute".to_string(),
                Box::new(ConstantImputer::new(constants)),
            ));
        }
        if !modes.is_empty() {
            steps.push(("mode_impute".to_string(), Box::new(ModeImputer::new(modes))));
        }
    }

    fn normalization_steps(&self, steps: &mut Vec<PipelineStep>, spent: &BTreeSet<String>) {
        let mut corrections = BTreeMap::new();
        let mut groups = BTreeMap::new();
        for directive in self.live_directives(Stage::Normalization, spent) {
            match directive {
                Directive::LabelNormalize { column, mapping } => {
                    corrections.insert(column.clone(), mapping.clone());
                }
                Directive::RareCategoryGroup { column, mapping } => {
                    groups.insert(column.clone(), mapping.clone());
                }
                _ => {}
            }
        }
        if !corrections.is_empty() {
            steps.push((
                "label_normalize".to_string(),
                Box::new(LabelNormalizer::new(corrections)),
            ));
        }
        if !groups.is_empty() {
            steps.push((
                "rare_category_group".to_string(),
                Box::new(RareCategoryGrouper::new(groups)),
            ));
        }
    }

    /// Builds the stage pipeline for this catalog, in stage order.
    ///
    /// The first step is always the schema check; stages without directives add no step.
    pub fn build_stages(&self) -> Pipeline {
        self.stages_without(&BTreeSet::new())
    }

    fn stages_without(&self, spent: &BTreeSet<String>) -> Pipeline {
        let mut steps: Vec<PipelineStep> = vec![(
            "schema_check".to_string(),
            Box::new(self.schema_validator(spent)),
        )];
        for stage in Stage::ALL {
            match stage {
                Stage::Imputation => self.imputation_steps(&mut steps, spent),
                Stage::Consistency => {
                    let rules: Vec<_> = self
                        .catalog
                        .consistency_rules
                        .iter()
                        .filter(|rule| !spent.contains(&rule.trigger_column))
                        .cloned()
                        .collect();
                    if !rules.is_empty() {
                        steps.push((
                            "consistency".to_string(),
                            Box::new(ConsistencyEnforcer::new(rules)),
                        ));
                    }
                }
                Stage::Normalization => self.normalization_steps(&mut steps, spent),
                Stage::TypeCorrection => {
                    let columns: Vec<String> = self
                        .live_directives(stage, spent)
                        .map(|d| d.column().to_string())
                        .collect();
                    if !columns.is_empty() {
                        steps.push((
                            "type_reclassify".to_string(),
                            Box::new(TypeReclassifier::new(columns)),
                        ));
                    }
                }
                Stage::OrdinalEncoding => {
                    let scales: BTreeMap<_, _> = self
                        .live_directives(stage, spent)
                        .filter_map(|d| match d {
                            Directive::OrdinalMap { column, scale } => {
                                Some((column.clone(), scale.clone()))
                            }
                            _ => None,
                        })
                        .collect();
                    if !scales.is_empty() {
                        steps.push((
                            "ordinal_encode".to_string(),
                            Box::new(OrdinalEncoder::new(scales)),
                        ));
                    }
                }
                Stage::OneHotEncoding => {
                    let columns = self.one_hot_targets(spent);
                    if !columns.is_empty() {
                        steps.push((
                            "one_hot_encode".to_string(),
                            Box::new(OneHotEncoder::new(
                                columns,
                                self.settings.reference_policy,
                            )),
                        ));
                    }
                }
            }
        }
        if self.settings.require_numeric_output {
            steps.push((
                "numeric_output_check".to_string(),
                Box::new(NumericOutputCheck::new()),
            ));
        }
        Pipeline::new(steps, self.settings.verbose)
    }

    /// Runs the stages on a table without dropping columns or removing duplicates.
    ///
    /// Running `encode` on a table it produced returns the same table. A one-hot column that
    /// is absent and left no indicator counts as already expanded, so unlike [`Self::run`] this
    /// does not reject a table missing a nominal column.
    pub async fn encode(&self, df: DataFrame) -> PrepResult<DataFrame> {
        let spent = self.spent_expansions(&df);
        let mut stages = self.stages_without(&spent);
        stages.fit_transform(&df).await
    }

    /// Prepares a raw table: schema check, dropped columns, deduplication, then every stage.
    pub async fn run(&self, raw: DataFrame) -> PrepResult<PreparedTable> {
        let start = Instant::now();
        self.schema_validator(&BTreeSet::new()).fit(&raw).await?;

        let dropped = DropColumns::new(self.catalog.dropped_columns.clone()).transform(raw)?;
        let (table, input_rows, duplicates_removed) = if self.settings.deduplicate {
            let deduplicated = Deduplicator::new().apply(dropped).await?;
            (
                deduplicated.table,
                deduplicated.input_rows,
                deduplicated.removed_rows,
            )
        } else {
            let (table, rows) = materialize(dropped).await?;
            (table, rows, 0)
        };
        let expected_rows = input_rows - duplicates_removed;

        let mut stages = self.build_stages();
        debug!(steps = ?stages.step_names(), "stage pipeline built");
        let encoded = stages.fit_transform(&table).await?;
        let (table, output_rows) = materialize(encoded).await?;
        if output_rows != expected_rows {
            return Err(PrepError::RowCountChanged {
                expected: expected_rows,
                actual: output_rows,
            });
        }

        let output_columns: Vec<String> = table
            .schema()
            .fields()
            .iter()
            .map(|field| field.name().clone())
            .collect();
        let warnings = stages.warnings();
        info!(
            catalog = %self.catalog.name,
            input_rows,
            duplicates_removed,
            output_rows,
            output_columns = output_columns.len(),
            warnings = warnings.len(),
            elapsed = ?start.elapsed(),
            "table prepared"
        );
        Ok(PreparedTable {
            table,
            report: RunReport {
                input_rows,
                duplicates_removed,
                output_rows,
                output_columns,
                warnings,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ConsistencyRule, Sentinel};

    #[test]
    fn test_housing_stage_order() {
        let pipeline = FeaturePipeline::housing().unwrap().build_stages();
        assert_eq!(
            pipeline.step_names(),
            vec![
                "schema_check",
                "group_median_impute",
                "constant_impute",
                "mode_impute",
                "consistency",
                "label_normalize",
                "rare_category_group",
                "type_reclassify",
                "ordinal_encode",
                "one_hot_encode",
                "numeric_output_check",
            ]
        );
    }

    #[test]
    fn test_empty_stages_add_no_steps() {
        let catalog = DirectiveCatalog::new("tiny", "1").directive(Directive::ConstantImpute {
            column: "Fence".to_string(),
            value: Sentinel::label("NA"),
        });
        let settings = PrepSettings::default().with_numeric_output_check(false);
        let pipeline = FeaturePipeline::new(catalog, settings)
            .unwrap()
            .build_stages();
        assert_eq!(pipeline.step_names(), vec!["schema_check", "constant_impute"]);
    }

    #[test]
    fn test_spent_expansion_skips_its_directives() {
        let catalog = DirectiveCatalog::new("masonry", "1")
            .directive(Directive::ConstantImpute {
                column: "MasVnrType".to_string(),
                value: Sentinel::label("None"),
            })
            .directive(Directive::ConstantImpute {
                column: "MasVnrArea".to_string(),
                value: Sentinel::Number(0.0),
            })
            .consistency_rule(ConsistencyRule {
                trigger_column: "MasVnrType".to_string(),
                trigger_label: "None".to_string(),
                target_column: "MasVnrArea".to_string(),
                forced_value: 0.0,
                trigger_fill: None,
            })
            .directive(Directive::OneHotExpand {
                column: "MasVnrType".to_string(),
            });
        let pipeline = FeaturePipeline::new(catalog, PrepSettings::default()).unwrap();
        assert_eq!(
            pipeline.build_stages().step_names(),
            vec![
                "schema_check",
                "constant_impute",
                "consistency",
                "one_hot_encode",
                "numeric_output_check"
            ]
        );

        let spent = BTreeSet::from(["MasVnrType".to_string()]);
        let stages = pipeline.stages_without(&spent);
        assert_eq!(
            stages.step_names(),
            vec!["schema_check", "constant_impute", "numeric_output_check"]
        );
    }

    #[test]
    fn test_invalid_catalog_rejected() {
        let catalog = DirectiveCatalog::new("bad", "1")
            .drop_columns(["Fence"])
            .directive(Directive::ModeImpute {
                column: "Fence".to_string(),
            });
        let err = FeaturePipeline::new(catalog, PrepSettings::default()).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_empty_group_column_rejected() {
        let settings = PrepSettings::default().with_group_column("");
        assert!(FeaturePipeline::new(housing_catalog(), settings).is_err());
    }
}
