//! Core types and traits for the B3 ETL pipeline.
//!
//! This crate provides the foundational building blocks including:
//! - Raw input records and the resolved input schema
//! - Cleaned price bars and indicator rows
//! - The cleaning report
//! - Core traits for indicators, extractors, and loaders

pub mod error;
pub mod traits;
pub mod types;

pub use error::{DataError, EtlError, EtlResult, IndicatorError, LoadError};
pub use traits::*;
pub use types::*;
