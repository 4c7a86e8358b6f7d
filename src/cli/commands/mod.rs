//! CLI command implementations.

pub mod clean;
pub mod default_config;
pub mod indicators;
pub mod inspect;
pub mod run;
pub mod validate;
