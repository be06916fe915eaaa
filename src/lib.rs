//! # housing-prep
//!
//! A rule-based feature-transformation pipeline that turns a raw residential-property table
//! into a complete, fully numeric table ready for model training.
//!
//! Every transformation is driven by a [`catalog::DirectiveCatalog`]: a fixed, declarative list
//! of column directives (impute, normalize, reclassify, encode) grouped into stages that always
//! run in the same order. The engine in [`preparation`] applies a catalog to a table; the
//! catalog for the residential-housing dataset lives in [`catalog::housing`].
//!
//! Tables are Apache DataFusion `DataFrame`s, so each stage only extends a logical plan and
//! nothing executes until a stage needs statistics or the result is collected.
//!
//! ## Example
//!
//! ```rust,no_run
//! use housing_prep::preparation::FeaturePipeline;
//! use housing_prep::settings::session_context;
//! use datafusion::prelude::CsvReadOptions;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // The housing file writes missing values as `NA`.
//! let options = CsvReadOptions::new().null_regex(Some("^NA$".to_string()));
//! let raw = session_context().read_csv("train.csv", options).await?;
//! let prepared = FeaturePipeline::housing()?.run(raw).await?;
//! println!("{} rows, {} columns", prepared.report.output_rows, prepared.report.output_columns.len());
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod exceptions;
pub mod logging;
pub mod pipeline;
pub mod preparation;
pub mod settings;
pub mod table;
pub mod transformers;
