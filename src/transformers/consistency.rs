//! ## Consistency Enforcement
//!
//! Cross-column fix-ups that depend on the joint state of columns after imputation.
//! [`ConsistencyEnforcer`] applies [`ConsistencyRule`]s: when a row's trigger column holds the
//! rule's label (e.g. masonry veneer type `"None"`), the target column (veneer area) is forced
//! to the rule's value, whatever its own imputation produced.
//!
//! A trigger column that still has missing values is repaired with the rule's `trigger_fill`
//! (the trigger's own imputation value) and reported as a [`PrepWarning`]; without a fill the
//! rule cannot be enforced and fitting fails.

use crate::catalog::ConsistencyRule;
use crate::exceptions::{PrepError, PrepResult, PrepWarning};
use crate::impl_transformer;
use crate::table::{
    column, column_state, column_type, is_float_type, is_integer_type, null_count, project_with,
    ColumnState,
};
use arrow::datatypes::DataType;
use datafusion::dataframe::DataFrame;
use datafusion_expr::{cast, lit, Case as DFCase, Expr};
use datafusion_functions::core::coalesce;
use tracing::{debug, warn};

/// A rule resolved against the fitted table.
struct ResolvedRule {
    rule: ConsistencyRule,
    target_type: DataType,
    repair_trigger: bool,
}

/// Enforces cross-column invariants.
pub struct ConsistencyEnforcer {
    pub rules: Vec<ConsistencyRule>,
    resolved: Vec<ResolvedRule>,
    warnings: Vec<PrepWarning>,
    fitted: bool,
}

impl ConsistencyEnforcer {
    pub fn new(rules: Vec<ConsistencyRule>) -> Self {
        Self {
            rules,
            resolved: Vec::new(),
            warnings: Vec::new(),
            fitted: false,
        }
    }

    pub async fn fit(&mut self, df: &DataFrame) -> PrepResult<()> {
        self.resolved.clear();
        self.warnings.clear();
        for rule in &self.rules {
            match column_state(df, &rule.trigger_column) {
                ColumnState::Present => {}
                ColumnState::Expanded => {
                    // Enforced before the trigger was encoded.
                    debug!(trigger = %rule.trigger_column, "trigger already expanded, skipping rule");
                    continue;
                }
                ColumnState::Missing => {
                    return Err(PrepError::MissingColumns(vec![rule.trigger_column.clone()]))
                }
            }
            let target_type = column_type(df, &rule.target_column)
                .ok_or_else(|| PrepError::MissingColumns(vec![rule.target_column.clone()]))?;
            if !(is_integer_type(&target_type) || is_float_type(&target_type)) {
                return Err(PrepError::UnsupportedType {
                    column: rule.target_column.clone(),
                    data_type: target_type.to_string(),
                    directive: "consistency rule".to_string(),
                });
            }

            let missing_triggers = null_count(df, &rule.trigger_column).await?;
            let repair_trigger = missing_triggers > 0;
            if repair_trigger {
                let fill_label =
                    rule.trigger_fill
                        .clone()
                        .ok_or_else(|| PrepError::ConsistencyViolation {
                            trigger_column: rule.trigger_column.clone(),
                            target_column: rule.target_column.clone(),
                        })?;
                let warning = PrepWarning::ConsistencyRepair {
                    trigger_column: rule.trigger_column.clone(),
                    target_column: rule.target_column.clone(),
                    filled_rows: missing_triggers,
                    fill_label,
                };
                warn!("{}", warning);
                self.warnings.push(warning);
            }
            self.resolved.push(ResolvedRule {
                rule: rule.clone(),
                target_type,
                repair_trigger,
            });
        }
        self.fitted = true;
        Ok(())
    }

    pub fn transform(&self, df: DataFrame) -> PrepResult<DataFrame> {
        if !self.fitted {
            return Err(PrepError::FitNotCalled);
        }
        let mut current = df;
        for resolved in &self.resolved {
            let rule = &resolved.rule;
            let trigger = match (&rule.trigger_fill, resolved.repair_trigger) {
                (Some(fill), true) => {
                    coalesce().call(vec![column(&rule.trigger_column), lit(fill.clone())])
                }
                _ => column(&rule.trigger_column),
            };
            let enforced = Expr::Case(DFCase {
                expr: None,
                when_then_expr: vec![(
                    Box::new(trigger.clone().eq(lit(rule.trigger_label.clone()))),
                    Box::new(cast(lit(rule.forced_value), resolved.target_type.clone())),
                )],
                else_expr: Some(Box::new(column(&rule.target_column))),
            });
            current = project_with(current, |name, _| {
                if name == rule.target_column {
                    Some(enforced.clone())
                } else if name == rule.trigger_column && resolved.repair_trigger {
                    Some(trigger.clone())
                } else {
                    None
                }
            })?;
        }
        Ok(current)
    }

    pub fn warnings(&self) -> Vec<PrepWarning> {
        self.warnings.clone()
    }

    fn inherent_is_stateful(&self) -> bool {
        true
    }
}

impl_transformer!(ConsistencyEnforcer, warnings);
