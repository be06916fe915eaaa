//! ## Transformer Pipeline
//!
//! Core abstractions for chaining table transformations.
//!
//! ### Overview
//!
//! - The [`Transformer`] trait is the common interface of every stage: an asynchronous `fit`
//!   that inspects the table (and fails fast on data-quality problems), and a `transform` that
//!   returns a new table snapshot without executing anything.
//! - The [`Pipeline`] struct runs named transformers in order, fitting each one on the output of
//!   the previous one.
//! - Macros [`crate::impl_transformer`] and [`crate::make_pipeline`] cut the boilerplate of
//!   implementing the trait and assembling pipelines.

use crate::exceptions::{PrepError, PrepResult, PrepWarning};
use async_trait::async_trait;
use datafusion::prelude::*;
use std::time::Instant;
use tracing::{debug, error, info};

/// Trait for components used in the preparation pipeline.
///
/// `fit` may execute queries against the table to compute parameters or validate it;
/// `transform` only extends the table's logical plan.
#[async_trait]
pub trait Transformer {
    /// Fit the transformer on a table.
    ///
    /// # Arguments
    ///
    /// * `df` - The input table.
    ///
    /// # Returns
    ///
    /// * `PrepResult<()>` - Ok if the table satisfies the transformer's preconditions.
    async fn fit(&mut self, df: &DataFrame) -> PrepResult<()>;

    /// Transform the input table, returning a new table with the transformation applied.
    fn transform(&self, df: DataFrame) -> PrepResult<DataFrame>;

    /// Returns true if the transformer must be fitted before `transform` can be called.
    fn is_stateful(&self) -> bool;

    /// Recoverable problems found by the last `fit`.
    fn warnings(&self) -> Vec<PrepWarning> {
        Vec::new()
    }
}

/// Macro to implement the [`Transformer`] trait for a transformer type.
///
/// The type must already have inherent methods:
/// - `async fn fit(&mut self, &DataFrame) -> PrepResult<()>`
/// - `fn transform(&self, DataFrame) -> PrepResult<DataFrame>`
/// - `fn inherent_is_stateful(&self) -> bool`
///
/// Passing `warnings` as a second argument also forwards an inherent
/// `fn warnings(&self) -> Vec<PrepWarning>`.
///
/// # Example
///
/// ```rust,no_run
/// use housing_prep::exceptions::PrepResult;
/// use datafusion::prelude::DataFrame;
/// use housing_prep::impl_transformer;
///
/// pub struct Passthrough;
///
/// impl Passthrough {
///     pub async fn fit(&mut self, _df: &DataFrame) -> PrepResult<()> {
///         Ok(())
///     }
///
///     pub fn transform(&self, df: DataFrame) -> PrepResult<DataFrame> {
///         Ok(df)
///     }
///
///     fn inherent_is_stateful(&self) -> bool {
///         false
///     }
/// }
///
/// impl_transformer!(Passthrough);
/// ```
#[macro_export]
macro_rules! impl_transformer {
    (@impl $ty:ty, { $($extra:tt)* }) => {
        #[async_trait::async_trait]
        impl $crate::pipeline::Transformer for $ty {
            async fn fit(
                &mut self,
                df: &datafusion::prelude::DataFrame,
            ) -> $crate::exceptions::PrepResult<()> {
                <$ty>::fit(self, df).await
            }
            fn transform(
                &self,
                df: datafusion::prelude::DataFrame,
            ) -> $crate::exceptions::PrepResult<datafusion::prelude::DataFrame> {
                <$ty>::transform(self, df)
            }
            fn is_stateful(&self) -> bool {
                <$ty>::inherent_is_stateful(self)
            }
            $($extra)*
        }
    };
    ($ty:ty) => {
        $crate::impl_transformer!(@impl $ty, {});
    };
    ($ty:ty, warnings) => {
        $crate::impl_transformer!(@impl $ty, {
            fn warnings(&self) -> Vec<$crate::exceptions::PrepWarning> {
                <$ty>::warnings(self)
            }
        });
    };
}

/// A named step of a [`Pipeline`].
pub type PipelineStep = (String, Box<dyn Transformer + Send + Sync>);

/// A pipeline that chains a sequence of transformers.
///
/// Each transformer's output (a new logical plan) is passed as input to the next transformer,
/// so nothing executes until a transformer's `fit` or the caller collects the result.
pub struct Pipeline {
    steps: Vec<PipelineStep>,
    verbose: bool,
}

impl Pipeline {
    /// Creates a new pipeline.
    ///
    /// # Arguments
    ///
    /// * `steps` - A vector of (name, transformer) pairs (each transformer is already boxed).
    /// * `verbose` - If true, step timings are logged at `INFO` instead of `DEBUG`.
    pub fn new(steps: Vec<PipelineStep>, verbose: bool) -> Self {
        Self { steps, verbose }
    }

    /// Names of the steps, in execution order.
    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Fits each transformer (sequentially) on the output of the previous one
    /// and returns the final table.
    pub async fn fit(&mut self, df: &DataFrame) -> PrepResult<DataFrame> {
        if self.steps.is_empty() {
            return Err(PrepError::InvalidParameter(
                "Pipeline must have at least one transformer.".to_string(),
            ));
        }
        let verbose = self.verbose;
        let mut current_df = df.clone();
        for (name, step) in self.steps.iter_mut() {
            let start = Instant::now();
            step.fit(&current_df).await.inspect_err(|e| {
                error!(step = %name, error = %e, "fitting failed");
            })?;
            current_df = step.transform(current_df).inspect_err(|e| {
                error!(step = %name, error = %e, "transform failed");
            })?;
            if verbose {
                info!(step = %name, elapsed = ?start.elapsed(), "step completed");
            } else {
                debug!(step = %name, elapsed = ?start.elapsed(), "step completed");
            }
        }
        Ok(current_df)
    }

    /// Applies the `transform` method of each transformer (without fitting).
    pub fn transform(&self, df: DataFrame) -> PrepResult<DataFrame> {
        if self.steps.is_empty() {
            return Err(PrepError::InvalidParameter(
                "Pipeline must have at least one transformer.".to_string(),
            ));
        }
        let mut current_df = df;
        for (name, step) in self.steps.iter() {
            debug!(step = %name, "applying transformer");
            current_df = step.transform(current_df).inspect_err(|e| {
                error!(step = %name, error = %e, "transform failed");
            })?;
        }
        Ok(current_df)
    }

    /// Convenience method to call `fit` and then return the final transformed table.
    pub async fn fit_transform(&mut self, df: &DataFrame) -> PrepResult<DataFrame> {
        self.fit(df).await
    }

    /// Warnings collected by every step during the last `fit`.
    pub fn warnings(&self) -> Vec<PrepWarning> {
        self.steps
            .iter()
            .flat_map(|(_, step)| step.warnings())
            .collect()
    }
}

/// Macro to simplify pipeline creation by automatically boxing transformers.
///
/// # Example
///
/// ```rust,no_run
/// use housing_prep::make_pipeline;
/// use housing_prep::transformers::cleaning::DropColumns;
///
/// let pipeline = make_pipeline!(false,
///     ("drop_ids", DropColumns::new(vec!["Id".to_string()])),
/// );
/// ```
#[macro_export]
macro_rules! make_pipeline {
    ($verbose:expr, $(($name:expr, $transformer:expr)),+ $(,)?) => {
        {
            let steps: Vec<$crate::pipeline::PipelineStep> = vec![
                $(
                    ($name.to_string(), Box::new($transformer)),
                )+
            ];
            $crate::pipeline::Pipeline::new(steps, $verbose)
        }
    };
}
