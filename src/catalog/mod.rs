//! # Directive Catalog
//!
//! A catalog is the single, ordered list of column directives a pipeline applies. It is plain
//! configuration data: the engine knows how to apply each kind of directive, the catalog says
//! which columns get which treatment. Catalogs serialize to JSON so dataset-specific tables
//! (ordinal scales, grouping tables, misspelling fixes) can be versioned outside the engine.
//!
//! Each [`Directive`] belongs to exactly one [`Stage`]; stages always run in the order the
//! `Stage` enum declares them, whatever the order of directives in the catalog.

pub mod housing;

use crate::exceptions::{PrepError, PrepResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    Imputation,
    Consistency,
    Normalization,
    TypeCorrection,
    OrdinalEncoding,
    OneHotEncoding,
}

impl Stage {
    pub const ALL: [Stage; 6] = [
        Stage::Imputation,
        Stage::Consistency,
        Stage::Normalization,
        Stage::TypeCorrection,
        Stage::OrdinalEncoding,
        Stage::OneHotEncoding,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Stage::Imputation => "imputation",
            Stage::Consistency => "consistency",
            Stage::Normalization => "normalization",
            Stage::TypeCorrection => "type-correction",
            Stage::OrdinalEncoding => "ordinal-encoding",
            Stage::OneHotEncoding => "one-hot-encoding",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Fixed value written into missing cells by constant imputation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Sentinel {
    Number(f64),
    Label(String),
}

impl Sentinel {
    pub fn label(label: impl Into<String>) -> Self {
        Sentinel::Label(label.into())
    }
}

impl fmt::Display for Sentinel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sentinel::Number(n) => write!(f, "{}", n),
            Sentinel::Label(l) => write!(f, "'{}'", l),
        }
    }
}

/// A total order over a finite label set.
///
/// When the scale has an `absent` label ("feature not present"), that label ranks 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrdinalScale {
    pub ranks: BTreeMap<String, i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub absent: Option<String>,
}

impl OrdinalScale {
    pub fn new(pairs: &[(&str, i64)]) -> Self {
        Self {
            ranks: pairs
                .iter()
                .map(|(label, rank)| (label.to_string(), *rank))
                .collect(),
            absent: None,
        }
    }

    /// Marks `label` as the absence category.
    pub fn with_absent(mut self, label: impl Into<String>) -> Self {
        self.absent = Some(label.into());
        self
    }

    pub fn rank(&self, label: &str) -> Option<i64> {
        self.ranks.get(label).copied()
    }

    fn validate(&self, column: &str) -> PrepResult<()> {
        if self.ranks.is_empty() {
            return Err(PrepError::Configuration(format!(
                "ordinal scale for '{}' is empty",
                column
            )));
        }
        let mut seen: HashMap<i64, &str> = HashMap::new();
        for (label, rank) in &self.ranks {
            if *rank < 0 {
                return Err(PrepError::Configuration(format!(
                    "ordinal scale for '{}' gives '{}' negative rank {}",
                    column, label, rank
                )));
            }
            if let Some(other) = seen.insert(*rank, label) {
                return Err(PrepError::Configuration(format!(
                    "ordinal scale for '{}' gives '{}' and '{}' the same rank {}",
                    column, other, label, rank
                )));
            }
        }
        if let Some(absent) = &self.absent {
            if self.rank(absent) != Some(0) {
                return Err(PrepError::Configuration(format!(
                    "absent label '{}' of '{}' must rank 0",
                    absent, column
                )));
            }
        }
        Ok(())
    }
}

/// A rule bound to one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Directive {
    /// Missing values take the median of the rows sharing the grouping column's value.
    GroupMedianImpute {
        column: String,
        /// Falls back to the settings' grouping column.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        group_by: Option<String>,
    },
    ConstantImpute {
        column: String,
        value: Sentinel,
    },
    ModeImpute {
        column: String,
    },
    /// Exact-match spelling corrections.
    LabelNormalize {
        column: String,
        mapping: BTreeMap<String, String>,
    },
    /// Merges low-frequency labels into aggregate buckets.
    RareCategoryGroup {
        column: String,
        mapping: BTreeMap<String, String>,
    },
    /// Stores a numeric code column as labels.
    TypeReclassify {
        column: String,
    },
    OrdinalMap {
        column: String,
        scale: OrdinalScale,
    },
    OneHotExpand {
        column: String,
    },
}

impl Directive {
    pub fn column(&self) -> &str {
        match self {
            Directive::GroupMedianImpute { column, .. }
            | Directive::ConstantImpute { column, .. }
            | Directive::ModeImpute { column }
            | Directive::LabelNormalize { column, .. }
            | Directive::RareCategoryGroup { column, .. }
            | Directive::TypeReclassify { column }
            | Directive::OrdinalMap { column, .. }
            | Directive::OneHotExpand { column } => column,
        }
    }

    pub fn stage(&self) -> Stage {
        match self {
            Directive::GroupMedianImpute { .. }
            | Directive::ConstantImpute { .. }
            | Directive::ModeImpute { .. } => Stage::Imputation,
            Directive::LabelNormalize { .. } | Directive::RareCategoryGroup { .. } => {
                Stage::Normalization
            }
            Directive::TypeReclassify { .. } => Stage::TypeCorrection,
            Directive::OrdinalMap { .. } => Stage::OrdinalEncoding,
            Directive::OneHotExpand { .. } => Stage::OneHotEncoding,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Directive::GroupMedianImpute { .. } => "group-median-impute",
            Directive::ConstantImpute { .. } => "constant-impute",
            Directive::ModeImpute { .. } => "mode-impute",
            Directive::LabelNormalize { .. } => "label-normalize",
            Directive::RareCategoryGroup { .. } => "rare-category-group",
            Directive::TypeReclassify { .. } => "type-reclassify",
            Directive::OrdinalMap { .. } => "ordinal-map",
            Directive::OneHotExpand { .. } => "one-hot-expand",
        }
    }
}

/// A cross-column fix-up: rows whose trigger column equals `trigger_label`
/// get `forced_value` in the target column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsistencyRule {
    pub trigger_column: String,
    pub trigger_label: String,
    pub target_column: String,
    pub forced_value: f64,
    /// The trigger column's own imputation value, used to repair a trigger that is still incomplete.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_fill: Option<String>,
}

/// The ordered directive catalog of one dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectiveCatalog {
    pub name: String,
    pub version: String,
    /// Columns removed from the raw table before deduplication.
    #[serde(default)]
    pub dropped_columns: Vec<String>,
    pub directives: Vec<Directive>,
    #[serde(default)]
    pub consistency_rules: Vec<ConsistencyRule>,
}

impl DirectiveCatalog {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            dropped_columns: Vec::new(),
            directives: Vec::new(),
            consistency_rules: Vec::new(),
        }
    }

    pub fn drop_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dropped_columns
            .extend(columns.into_iter().map(Into::into));
        self
    }

    pub fn directive(mut self, directive: Directive) -> Self {
        self.directives.push(directive);
        self
    }

    pub fn consistency_rule(mut self, rule: ConsistencyRule) -> Self {
        self.consistency_rules.push(rule);
        self
    }

    /// Directives of one stage, in catalog order.
    pub fn directives_for(&self, stage: Stage) -> impl Iterator<Item = &Directive> {
        self.directives.iter().filter(move |d| d.stage() == stage)
    }

    /// Columns expanded by one-hot directives.
    pub fn one_hot_columns(&self) -> BTreeSet<&str> {
        self.directives_for(Stage::OneHotEncoding)
            .map(Directive::column)
            .collect()
    }

    /// Every column the directives and consistency rules read, sorted.
    ///
    /// `default_group_column` is the grouping column used by group-median directives that
    /// do not name one.
    pub fn required_columns(&self, default_group_column: &str) -> Vec<String> {
        let mut columns: BTreeSet<String> = BTreeSet::new();
        for directive in &self.directives {
            columns.insert(directive.column().to_string());
            if let Directive::GroupMedianImpute { group_by, .. } = directive {
                columns.insert(
                    group_by
                        .clone()
                        .unwrap_or_else(|| default_group_column.to_string()),
                );
            }
        }
        for rule in &self.consistency_rules {
            columns.insert(rule.trigger_column.clone());
            columns.insert(rule.target_column.clone());
        }
        for dropped in &self.dropped_columns {
            columns.remove(dropped);
        }
        columns.into_iter().collect()
    }

    /// Checks the catalog for configuration problems.
    pub fn validate(&self, default_group_column: &str) -> PrepResult<()> {
        let mut imputed: HashMap<&str, &'static str> = HashMap::new();
        let mut encoded: HashMap<&str, &'static str> = HashMap::new();
        let mut reclassified: BTreeSet<&str> = BTreeSet::new();
        let mut normalized: BTreeSet<(&str, &'static str)> = BTreeSet::new();

        for directive in &self.directives {
            let column = directive.column();
            if column.is_empty() {
                return Err(PrepError::Configuration(format!(
                    "{} directive without a column",
                    directive.kind()
                )));
            }
            if self.dropped_columns.iter().any(|c| c == column) {
                return Err(PrepError::Configuration(format!(
                    "'{}' is dropped but also has a {} directive",
                    column,
                    directive.kind()
                )));
            }
            match directive {
                Directive::GroupMedianImpute { group_by, .. } => {
                    let group = group_by.as_deref().unwrap_or(default_group_column);
                    if group == column {
                        return Err(PrepError::Configuration(format!(
                            "'{}' cannot be grouped by itself",
                            column
                        )));
                    }
                }
                Directive::LabelNormalize { mapping, .. }
                | Directive::RareCategoryGroup { mapping, .. } => {
                    if !normalized.insert((column, directive.kind())) {
                        return Err(PrepError::Configuration(format!(
                            "'{}' has more than one {} directive",
                            column,
                            directive.kind()
                        )));
                    }
                    validate_mapping(column, mapping)?;
                }
                Directive::TypeReclassify { .. } => {
                    reclassified.insert(column);
                }
                Directive::OrdinalMap { scale, .. } => scale.validate(column)?,
                _ => {}
            }
            match directive.stage() {
                Stage::Imputation => {
                    if let Some(previous) = imputed.insert(column, directive.kind()) {
                        return Err(PrepError::Configuration(format!(
                            "'{}' has both {} and {} directives",
                            column,
                            previous,
                            directive.kind()
                        )));
                    }
                }
                Stage::OrdinalEncoding | Stage::OneHotEncoding => {
                    if let Some(previous) = encoded.insert(column, directive.kind()) {
                        return Err(PrepError::Configuration(format!(
                            "'{}' has both {} and {} directives",
                            column,
                            previous,
                            directive.kind()
                        )));
                    }
                }
                _ => {}
            }
        }

        for column in &reclassified {
            if encoded.get(column) == Some(&"ordinal-map") {
                return Err(PrepError::Configuration(format!(
                    "'{}' is ordinal and cannot be reclassified as nominal",
                    column
                )));
            }
        }

        for rule in &self.consistency_rules {
            if rule.trigger_column == rule.target_column {
                return Err(PrepError::Configuration(format!(
                    "consistency rule on '{}' targets its own trigger column",
                    rule.trigger_column
                )));
            }
            if !rule.forced_value.is_finite() {
                return Err(PrepError::Configuration(format!(
                    "consistency rule for '{}' forces a non-finite value",
                    rule.target_column
                )));
            }
        }
        Ok(())
    }

    pub fn from_json(json: &str) -> PrepResult<Self> {
        serde_json::from_str(json).map_err(PrepError::from)
    }

    pub fn to_json(&self) -> PrepResult<String> {
        serde_json::to_string_pretty(self).map_err(PrepError::from)
    }
}

/// A lookup table is idempotent when no target label is itself rewritten to something else.
fn validate_mapping(column: &str, mapping: &BTreeMap<String, String>) -> PrepResult<()> {
    if mapping.is_empty() {
        return Err(PrepError::Configuration(format!(
            "lookup table for '{}' is empty",
            column
        )));
    }
    for target in mapping.values() {
        if let Some(next) = mapping.get(target) {
            if next != target {
                return Err(PrepError::Configuration(format!(
                    "lookup table for '{}' rewrites '{}' again to '{}'",
                    column, target, next
                )));
            }
        }
    }
    Ok(())
}

/// Builds a lookup table from string pairs.
pub fn lookup(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(from, to)| (from.to_string(), to.to_string()))
        .collect()
}
