//! Loaders with `(date, ticker)` upsert semantics.

use async_trait::async_trait;
use b3_core::error::LoadError;
use b3_core::traits::{LoadStats, Loader};
use b3_core::types::{IndicatorRow, PreciseBar, PriceBar};
use chrono::NaiveDate;
use csv::{ReaderBuilder, Writer};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::info;

/// Natural key of both record sets.
pub type RowKey = (NaiveDate, String);

type IndicatorValues = BTreeMap<String, Option<f64>>;

pub const PRICES_TABLE: &str = "stock_data";
pub const INDICATORS_TABLE: &str = "technical_indicators";

/// Insert-or-update `incoming` into `store`, counting both outcomes.
fn upsert<V>(
    store: &mut BTreeMap<RowKey, V>,
    incoming: impl IntoIterator<Item = (RowKey, V)>,
    merge: impl Fn(&mut V, V),
) -> (usize, usize) {
    let (mut inserted, mut updated) = (0, 0);
    for (key, value) in incoming {
        match store.get_mut(&key) {
            Some(existing) => {
                merge(existing, value);
                updated += 1;
            }
            None => {
                store.insert(key, value);
                inserted += 1;
            }
        }
    }
    (inserted, updated)
}

/// Convert bars to their stored form, rejecting the batch on any
/// unrepresentable price.
fn precise_rows(bars: &[PriceBar]) -> Result<Vec<(RowKey, PreciseBar)>, LoadError> {
    bars.iter()
        .map(|b| Ok(((b.date, b.ticker.clone()), PreciseBar::try_from(b)?)))
        .collect()
}

fn merge_indicators(existing: &mut IndicatorValues, incoming: IndicatorValues) {
    existing.extend(incoming);
}

fn indicator_values(row: &IndicatorRow, columns: &[String]) -> IndicatorValues {
    columns.iter().map(|c| (c.clone(), row.get(c))).collect()
}

#[derive(Debug, Default)]
struct MemoryStore {
    prices: BTreeMap<RowKey, PreciseBar>,
    indicators: BTreeMap<RowKey, IndicatorValues>,
}

/// In-memory loader, used for dry runs and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    store: Arc<Mutex<MemoryStore>>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    fn store(&self) -> std::sync::MutexGuard<'_, MemoryStore> {
        self.store.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn price_count(&self) -> usize {
        self.store().prices.len()
    }

    pub fn indicator_count(&self) -> usize {
        self.store().indicators.len()
    }

    pub fn price(&self, date: NaiveDate, ticker: &str) -> Option<PreciseBar> {
        self.store().prices.get(&(date, ticker.to_string())).cloned()
    }

    pub fn indicator(&self, date: NaiveDate, ticker: &str, column: &str) -> Option<f64> {
        self.store()
            .indicators
            .get(&(date, ticker.to_string()))
            .and_then(|values| values.get(column).copied().flatten())
    }
}

#[async_trait]
impl Loader for MemoryLoader {
    async fn load_prices(&self, bars: &[PriceBar]) -> Result<LoadStats, LoadError> {
        let mut store = self.store();
        let incoming = precise_rows(bars)?;
        let (inserted, updated) = upsert(&mut store.prices, incoming, |old, new| *old = new);

        Ok(LoadStats {
            table: PRICES_TABLE.to_string(),
            inserted,
            updated,
            total_rows: bars.len(),
        })
    }

    async fn load_indicators(
        &self,
        rows: &[IndicatorRow],
        columns: &[String],
    ) -> Result<LoadStats, LoadError> {
        let mut store = self.store();
        let incoming = rows.iter().map(|r| {
            (
                (r.date(), r.ticker().to_string()),
                indicator_values(r, columns),
            )
        });
        let (inserted, updated) = upsert(&mut store.indicators, incoming, merge_indicators);

        Ok(LoadStats {
            table: INDICATORS_TABLE.to_string(),
            inserted,
            updated,
            total_rows: rows.len(),
        })
    }

    fn name(&self) -> &str {
        "memory"
    }
}

/// Loader that maintains `stock_data.csv` and `technical_indicators.csv`
/// under an output directory, merging with their current content.
#[derive(Debug, Clone)]
pub struct CsvLoader {
    output_dir: PathBuf,
}

impl CsvLoader {
    /// Create a loader, creating the directory if needed.
    pub fn new(output_dir: impl AsRef<Path>) -> Result<Self, LoadError> {
        let output_dir = output_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&output_dir)?;
        Ok(Self { output_dir })
    }

    pub fn prices_path(&self) -> PathBuf {
        self.output_dir.join(format!("{PRICES_TABLE}.csv"))
    }

    pub fn indicators_path(&self) -> PathBuf {
        self.output_dir.join(format!("{INDICATORS_TABLE}.csv"))
    }

    fn read_prices(&self) -> Result<BTreeMap<RowKey, PreciseBar>, LoadError> {
        let path = self.prices_path();
        let mut store = BTreeMap::new();
        if !path.exists() {
            return Ok(store);
        }

        let mut reader = ReaderBuilder::new()
            .from_path(&path)
            .map_err(|e| LoadError::Csv(e.to_string()))?;
        for result in reader.deserialize::<PreciseBar>() {
            let bar = result.map_err(|e| LoadError::Parse {
                table: PRICES_TABLE.to_string(),
                message: e.to_string(),
            })?;
            store.insert((bar.date, bar.ticker.clone()), bar);
        }
        Ok(store)
    }

    fn write_prices(&self, store: &BTreeMap<RowKey, PreciseBar>) -> Result<(), LoadError> {
        let mut writer =
            Writer::from_path(self.prices_path()).map_err(|e| LoadError::Csv(e.to_string()))?;
        for bar in store.values() {
            writer
                .serialize(bar)
                .map_err(|e| LoadError::Csv(e.to_string()))?;
        }
        writer.flush()?;
        Ok(())
    }

    fn read_indicators(
        &self,
    ) -> Result<(Vec<String>, BTreeMap<RowKey, IndicatorValues>), LoadError> {
        let path = self.indicators_path();
        let mut store = BTreeMap::new();
        if !path.exists() {
            return Ok((Vec::new(), store));
        }

        let parse_error = |message: String| LoadError::Parse {
            table: INDICATORS_TABLE.to_string(),
            message,
        };

        let mut reader = ReaderBuilder::new()
            .from_path(&path)
            .map_err(|e| LoadError::Csv(e.to_string()))?;
        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| LoadError::Csv(e.to_string()))?
            .iter()
            .map(str::to_string)
            .collect();
        let columns: Vec<String> = headers.iter().skip(2).cloned().collect();

        for result in reader.records() {
            let record = result.map_err(|e| LoadError::Csv(e.to_string()))?;
            let date = record
                .get(0)
                .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
                .ok_or_else(|| parse_error(format!("bad date in {:?}", record.get(0))))?;
            let ticker = record.get(1).unwrap_or_default().to_string();

            let mut values = IndicatorValues::new();
            for (column, cell) in columns.iter().zip(record.iter().skip(2)) {
                let value = if cell.is_empty() {
                    None
                } else {
                    Some(
                        cell.parse::<f64>()
                            .map_err(|e| parse_error(format!("{column}: {e}")))?,
                    )
                };
                values.insert(column.clone(), value);
            }
            store.insert((date, ticker), values);
        }
        Ok((columns, store))
    }

    fn write_indicators(
        &self,
        columns: &[String],
        store: &BTreeMap<RowKey, IndicatorValues>,
    ) -> Result<(), LoadError> {
        let mut writer =
            Writer::from_path(self.indicators_path()).map_err(|e| LoadError::Csv(e.to_string()))?;

        let mut header = vec!["date".to_string(), "ticker".to_string()];
        header.extend(columns.iter().cloned());
        writer
            .write_record(&header)
            .map_err(|e| LoadError::Csv(e.to_string()))?;

        for ((date, ticker), values) in store {
            let mut record = vec![date.to_string(), ticker.clone()];
            record.extend(columns.iter().map(|c| {
                values
                    .get(c)
                    .copied()
                    .flatten()
                    .map(|v| v.to_string())
                    .unwrap_or_default()
            }));
            writer
                .write_record(&record)
                .map_err(|e| LoadError::Csv(e.to_string()))?;
        }
        writer.flush()?;
        Ok(())
    }
}

#[async_trait]
impl Loader for CsvLoader {
    async fn load_prices(&self, bars: &[PriceBar]) -> Result<LoadStats, LoadError> {
        let mut store = self.read_prices()?;
        let incoming = precise_rows(bars)?;
        let (inserted, updated) = upsert(&mut store, incoming, |old, new| *old = new);
        self.write_prices(&store)?;

        info!(
            path = %self.prices_path().display(),
            inserted,
            updated,
            total = store.len(),
            "Prices loaded"
        );
        Ok(LoadStats {
            table: PRICES_TABLE.to_string(),
            inserted,
            updated,
            total_rows: bars.len(),
        })
    }

    async fn load_indicators(
        &self,
        rows: &[IndicatorRow],
        columns: &[String],
    ) -> Result<LoadStats, LoadError> {
        let (mut all_columns, mut store) = self.read_indicators()?;
        for column in columns {
            if !all_columns.contains(column) {
                all_columns.push(column.clone());
            }
        }

        let incoming = rows.iter().map(|r| {
            (
                (r.date(), r.ticker().to_string()),
                indicator_values(r, columns),
            )
        });
        let (inserted, updated) = upsert(&mut store, incoming, merge_indicators);
        self.write_indicators(&all_columns, &store)?;

        info!(
            path = %self.indicators_path().display(),
            inserted,
            updated,
            columns = all_columns.len(),
            "Indicators loaded"
        );
        Ok(LoadStats {
            table: INDICATORS_TABLE.to_string(),
            inserted,
            updated,
            total_rows: rows.len(),
        })
    }

    fn name(&self) -> &str {
        "csv"
    }
}
