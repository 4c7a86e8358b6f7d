//! Raw, uncoerced input rows and the input schema.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::error::DataError;

/// Mandatory input columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Column {
    Date,
    Ticker,
    Open,
    High,
    Low,
    Close,
    Volume,
}

impl Column {
    pub const ALL: [Column; 7] = [
        Column::Date,
        Column::Ticker,
        Column::Open,
        Column::High,
        Column::Low,
        Column::Close,
        Column::Volume,
    ];

    /// Price columns, in the order outlier filters visit them.
    pub const PRICES: [Column; 4] = [Column::Open, Column::Close, Column::High, Column::Low];

    pub fn as_str(&self) -> &'static str {
        match self {
            Column::Date => "date",
            Column::Ticker => "ticker",
            Column::Open => "open",
            Column::High => "high",
            Column::Low => "low",
            Column::Close => "close",
            Column::Volume => "volume",
        }
    }

    /// Match a header cell. `datetime` is accepted for the date column.
    pub fn from_header(header: &str) -> Option<Self> {
        match header.trim().to_ascii_lowercase().as_str() {
            "date" | "datetime" => Some(Column::Date),
            "ticker" => Some(Column::Ticker),
            "open" => Some(Column::Open),
            "high" => Some(Column::High),
            "low" => Some(Column::Low),
            "close" => Some(Column::Close),
            "volume" => Some(Column::Volume),
            _ => None,
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where each column of an input table lives, resolved once per run.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InputSchema {
    /// Header index of each recognised mandatory column
    positions: BTreeMap<Column, usize>,
    /// Header name used for the date column (`date` or `datetime`)
    date_header: Option<String>,
    /// Remaining columns, in header order, with their indexes
    extra: Vec<(usize, String)>,
}

impl InputSchema {
    /// Resolve a header row. Never fails: use [`ensure_complete`](Self::ensure_complete).
    ///
    /// When both `date` and `datetime` exist, the first one wins and the
    /// other is passed through as an extra column.
    pub fn from_headers<S: AsRef<str>>(headers: &[S]) -> Self {
        let mut schema = InputSchema::default();
        for (idx, header) in headers.iter().enumerate() {
            let header = header.as_ref();
            match Column::from_header(header) {
                Some(column) if !schema.positions.contains_key(&column) => {
                    if column == Column::Date {
                        schema.date_header = Some(header.trim().to_string());
                    }
                    schema.positions.insert(column, idx);
                }
                _ => schema.extra.push((idx, header.trim().to_string())),
            }
        }
        schema
    }

    /// Schema of a table holding exactly the mandatory columns.
    pub fn standard() -> Self {
        let headers: Vec<&str> = Column::ALL.iter().map(|c| c.as_str()).collect();
        Self::from_headers(&headers)
    }

    /// Typed presence flag for a column.
    pub fn has(&self, column: Column) -> bool {
        self.positions.contains_key(&column)
    }

    pub fn position(&self, column: Column) -> Option<usize> {
        self.positions.get(&column).copied()
    }

    pub fn date_header(&self) -> &str {
        self.date_header.as_deref().unwrap_or("date")
    }

    /// Pass-through columns with their header indexes.
    pub fn extra_columns(&self) -> &[(usize, String)] {
        &self.extra
    }

    pub fn missing(&self) -> Vec<Column> {
        Column::ALL
            .iter()
            .copied()
            .filter(|c| !self.has(*c))
            .collect()
    }

    /// Fail with the list of absent mandatory columns.
    pub fn ensure_complete(&self) -> Result<(), DataError> {
        let missing = self.missing();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(DataError::MissingColumns {
                columns: missing.iter().map(|c| c.to_string()).collect(),
            })
        }
    }
}

/// One input row before any coercion. `None` is a null cell.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawRecord {
    pub date: Option<String>,
    pub ticker: Option<String>,
    pub open: Option<String>,
    pub high: Option<String>,
    pub low: Option<String>,
    pub close: Option<String>,
    pub volume: Option<String>,
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
}

impl RawRecord {
    /// Build a fully populated record from text cells.
    pub fn new(
        date: &str,
        ticker: &str,
        open: &str,
        high: &str,
        low: &str,
        close: &str,
        volume: &str,
    ) -> Self {
        Self {
            date: Some(date.to_string()),
            ticker: Some(ticker.to_string()),
            open: Some(open.to_string()),
            high: Some(high.to_string()),
            low: Some(low.to_string()),
            close: Some(close.to_string()),
            volume: Some(volume.to_string()),
            extra: BTreeMap::new(),
        }
    }

    /// Build a record from one CSV row using a resolved schema.
    /// Blank cells become null.
    pub fn from_cells<S: AsRef<str>>(schema: &InputSchema, cells: &[S]) -> Self {
        let cell = |column: Column| {
            schema
                .position(column)
                .and_then(|idx| cells.get(idx))
                .map(|v| v.as_ref().trim())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let extra = schema
            .extra_columns()
            .iter()
            .filter_map(|(idx, name)| {
                cells
                    .get(*idx)
                    .map(|v| (name.clone(), v.as_ref().to_string()))
            })
            .collect();

        Self {
            date: cell(Column::Date),
            ticker: cell(Column::Ticker),
            open: cell(Column::Open),
            high: cell(Column::High),
            low: cell(Column::Low),
            close: cell(Column::Close),
            volume: cell(Column::Volume),
            extra,
        }
    }

    pub fn get(&self, column: Column) -> Option<&str> {
        let value = match column {
            Column::Date => &self.date,
            Column::Ticker => &self.ticker,
            Column::Open => &self.open,
            Column::High => &self.high,
            Column::Low => &self.low,
            Column::Close => &self.close,
            Column::Volume => &self.volume,
        };
        value.as_deref().filter(|v| !v.trim().is_empty())
    }

    pub fn set(&mut self, column: Column, value: Option<String>) {
        let slot = match column {
            Column::Date => &mut self.date,
            Column::Ticker => &mut self.ticker,
            Column::Open => &mut self.open,
            Column::High => &mut self.high,
            Column::Low => &mut self.low,
            Column::Close => &mut self.close,
            Column::Volume => &mut self.volume,
        };
        *slot = value;
    }

    /// Builder-style null for tests and fixtures.
    pub fn without(mut self, column: Column) -> Self {
        self.set(column, None);
        self
    }

    pub fn with_extra(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(column.into(), value.into());
        self
    }
}

/// An input table: a resolved schema and its rows in input order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawTable {
    pub schema: InputSchema,
    pub records: Vec<RawRecord>,
}

impl RawTable {
    pub fn new(schema: InputSchema, records: Vec<RawRecord>) -> Self {
        Self { schema, records }
    }

    /// Table with the standard mandatory columns.
    pub fn from_records(records: Vec<RawRecord>) -> Self {
        Self::new(InputSchema::standard(), records)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct non-null tickers, upper-cased.
    pub fn distinct_tickers(&self) -> BTreeSet<String> {
        self.records
            .iter()
            .filter_map(|r| r.get(Column::Ticker))
            .map(|t| t.trim().to_uppercase())
            .collect()
    }

    /// Structural check shared by every stage that consumes a table.
    pub fn validate_structure(&self, stage: &str) -> Result<(), DataError> {
        self.schema.ensure_complete()?;
        if self.records.is_empty() {
            return Err(DataError::empty(stage));
        }
        Ok(())
    }
}
