//! # Transformer Implementations
//!
//! The submodules contain the transformers of each pipeline stage, plus the raw-table
//! cleaning and validation steps that surround them.

pub mod categorical_encoding;
pub mod cleaning;
pub mod consistency;
pub mod imputation;
pub mod normalization;
pub mod type_correction;
pub mod validation;
