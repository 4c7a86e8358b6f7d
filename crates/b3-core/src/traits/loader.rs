//! Loader trait definition.

use crate::error::LoadError;
use crate::types::{IndicatorRow, PriceBar};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Outcome of one load call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadStats {
    /// Logical table written
    pub table: String,
    /// Keys that did not exist before
    pub inserted: usize,
    /// Keys that existed and were overwritten
    pub updated: usize,
    /// Rows handed to the loader
    pub total_rows: usize,
}

/// Trait for persisting pipeline output.
///
/// Both record sets are keyed by `(date, ticker)` with insert-or-update
/// semantics: loading the same key twice keeps the latest values.
#[async_trait]
pub trait Loader: Send + Sync {
    /// Upsert cleaned OHLCV rows.
    async fn load_prices(&self, bars: &[PriceBar]) -> Result<LoadStats, LoadError>;

    /// Upsert indicator rows.
    ///
    /// # Arguments
    /// * `rows` - Rows produced by the indicator engine
    /// * `columns` - Indicator column order to persist
    async fn load_indicators(
        &self,
        rows: &[IndicatorRow],
        columns: &[String],
    ) -> Result<LoadStats, LoadError>;

    /// Get the loader name.
    fn name(&self) -> &str;
}
