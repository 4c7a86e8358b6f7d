//! CSV extraction.

use async_trait::async_trait;
use b3_core::error::DataError;
use b3_core::traits::{ExtractFilter, Extractor};
use b3_core::types::{parse_date, Column, DateRange, InputSchema, RawRecord, RawTable};
use csv::{ReaderBuilder, StringRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Facts about a CSV file, gathered without cleaning it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CsvMetadata {
    pub file_path: String,
    pub file_size_bytes: u64,
    pub columns: Vec<String>,
    pub rows: usize,
    /// Range of the dates that parse
    pub date_range: Option<DateRange>,
    pub unique_tickers: usize,
    /// Mandatory columns absent from the header
    pub missing_columns: Vec<String>,
}

impl CsvMetadata {
    pub fn file_size_mb(&self) -> f64 {
        self.file_size_bytes as f64 / (1024.0 * 1024.0)
    }

    /// Generate a text summary.
    pub fn summary(&self) -> String {
        let mut s = String::new();
        s.push_str("═══════════════════════════════════════════════════════════\n");
        s.push_str("                       CSV METADATA\n");
        s.push_str("═══════════════════════════════════════════════════════════\n\n");
        s.push_str(&format!("  File:                {}\n", self.file_path));
        s.push_str(&format!("  Size:                {:.2} MB\n", self.file_size_mb()));
        s.push_str(&format!("  Columns:             {}\n", self.columns.join(", ")));
        s.push_str(&format!("  Rows:                {}\n", self.rows));
        s.push_str(&format!(
            "  Date Range:          {}\n",
            self.date_range
                .map(|r| r.to_string())
                .unwrap_or_else(|| "n/a".to_string())
        ));
        s.push_str(&format!("  Unique Tickers:      {}\n", self.unique_tickers));
        if !self.missing_columns.is_empty() {
            s.push_str(&format!(
                "  Missing Columns:     {}\n",
                self.missing_columns.join(", ")
            ));
        }
        s
    }
}

/// Reads a headered OHLCV CSV file into a raw table.
#[derive(Debug, Clone)]
pub struct CsvExtractor {
    path: PathBuf,
}

impl CsvExtractor {
    /// Create an extractor for an existing file.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, DataError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(DataError::FileNotFound(path.display().to_string()));
        }
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every row, unfiltered and unvalidated.
    pub fn read_all(&self) -> Result<RawTable, DataError> {
        read_table(&self.path, &ExtractFilter::default())
    }

    /// Inspect the file: header, row count, date span and tickers.
    pub fn metadata(&self) -> Result<CsvMetadata, DataError> {
        let file_size_bytes = std::fs::metadata(&self.path)
            .map_err(|e| DataError::Csv(e.to_string()))?
            .len();
        let mut reader = open(&self.path)?;
        let headers = headers(&mut reader)?;
        let schema = InputSchema::from_headers(&headers);

        let mut rows = 0;
        let mut dates = Vec::new();
        let mut tickers = BTreeSet::new();
        for result in reader.records() {
            let record = result.map_err(|e| DataError::Csv(e.to_string()))?;
            let raw = RawRecord::from_cells(&schema, &cells(&record));
            rows += 1;
            if let Some(date) = raw.get(Column::Date).and_then(parse_date) {
                dates.push(date);
            }
            if let Some(ticker) = raw.get(Column::Ticker) {
                tickers.insert(ticker.trim().to_uppercase());
            }
        }

        Ok(CsvMetadata {
            file_path: self.path.display().to_string(),
            file_size_bytes,
            columns: headers,
            rows,
            date_range: DateRange::covering(dates),
            unique_tickers: tickers.len(),
            missing_columns: schema.missing().iter().map(|c| c.to_string()).collect(),
        })
    }
}

#[async_trait]
impl Extractor for CsvExtractor {
    async fn extract(&self, filter: &ExtractFilter) -> Result<RawTable, DataError> {
        info!(path = %self.path.display(), "Extracting CSV data");

        let table = read_table(&self.path, filter)?;
        table.validate_structure("extraction")?;

        info!(
            rows = table.len(),
            tickers = table.distinct_tickers().len(),
            "CSV extraction complete"
        );
        Ok(table)
    }

    fn name(&self) -> &str {
        "csv"
    }
}

fn open(path: &Path) -> Result<csv::Reader<std::fs::File>, DataError> {
    ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(|e| DataError::Csv(e.to_string()))
}

fn headers(reader: &mut csv::Reader<std::fs::File>) -> Result<Vec<String>, DataError> {
    Ok(reader
        .headers()
        .map_err(|e| DataError::Csv(e.to_string()))?
        .iter()
        .map(str::to_string)
        .collect())
}

fn cells(record: &StringRecord) -> Vec<&str> {
    record.iter().collect()
}

/// Read a CSV file into a raw table, keeping only rows the filter accepts.
pub fn read_table(path: &Path, filter: &ExtractFilter) -> Result<RawTable, DataError> {
    let mut reader = open(path)?;
    let headers = headers(&mut reader)?;
    let schema = InputSchema::from_headers(&headers);
    schema.ensure_complete()?;

    let mut records = Vec::new();
    let mut skipped = 0usize;
    for result in reader.records() {
        let record = result.map_err(|e| DataError::Csv(e.to_string()))?;
        let raw = RawRecord::from_cells(&schema, &cells(&record));

        let date = if filter.has_date_bounds() {
            raw.get(Column::Date).and_then(parse_date)
        } else {
            None
        };
        if filter.is_empty() || filter.accepts(raw.get(Column::Ticker), date) {
            records.push(raw);
        } else {
            skipped += 1;
        }
    }

    if !filter.is_empty() {
        debug!(
            kept = records.len(),
            skipped,
            tickers = ?filter.tickers,
            start = ?filter.start_date,
            end = ?filter.end_date,
            "Extraction filters applied"
        );
    }

    Ok(RawTable::new(schema, records))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::io::Write;

    const SAMPLE: &str = "\
datetime,ticker,open,close,high,low,volume,source
2020-01-02 00:00:00,PETR4,30.5,30.9,31.0,30.1,1000,b3
2020-01-03 00:00:00,petr4,30.9,30.2,31.2,30.0,1200,b3
2020-01-02 00:00:00,VALE3,54.0,54.3,54.9,53.7,900,b3
2020-01-06 00:00:00,VALE3,,54.0,54.5,53.2,,b3
";

    fn write_csv(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn test_extract_all_rows() {
        let file = write_csv(SAMPLE);
        let extractor = CsvExtractor::new(file.path()).unwrap();

        let table = extractor.extract(&ExtractFilter::default()).await.unwrap();
        assert_eq!(table.len(), 4);
        assert_eq!(table.schema.date_header(), "datetime");
        assert_eq!(table.records[3].open, None);
        assert_eq!(
            table.records[0].extra.get("source").map(String::as_str),
            Some("b3")
        );
    }

    #[tokio::test]
    async fn test_extract_with_filters() {
        let file = write_csv(SAMPLE);
        let extractor = CsvExtractor::new(file.path()).unwrap();

        let filter = ExtractFilter {
            tickers: vec!["PETR4".to_string()],
            start_date: NaiveDate::from_ymd_opt(2020, 1, 3),
            end_date: None,
        };
        let table = extractor.extract(&filter).await.unwrap();

        assert_eq!(table.len(), 1);
        assert_eq!(table.records[0].ticker.as_deref(), Some("petr4"));
    }

    #[tokio::test]
    async fn test_missing_column_is_structural() {
        let file = write_csv("date,ticker,close\n2020-01-02,PETR4,10\n");
        let extractor = CsvExtractor::new(file.path()).unwrap();

        let err = extractor.extract(&ExtractFilter::default()).await.unwrap_err();
        assert!(err.is_structural());
    }

    #[tokio::test]
    async fn test_header_only_is_empty_dataset() {
        let file = write_csv("date,ticker,open,high,low,close,volume\n");
        let extractor = CsvExtractor::new(file.path()).unwrap();

        let err = extractor.extract(&ExtractFilter::default()).await.unwrap_err();
        assert!(matches!(err, DataError::EmptyDataset { .. }));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            CsvExtractor::new("/definitely/not/here.csv"),
            Err(DataError::FileNotFound(_))
        ));
    }

    #[test]
    fn test_metadata() {
        let file = write_csv(SAMPLE);
        let metadata = CsvExtractor::new(file.path()).unwrap().metadata().unwrap();

        assert_eq!(metadata.rows, 4);
        assert_eq!(metadata.unique_tickers, 2);
        assert_eq!(metadata.columns.len(), 8);
        assert!(metadata.missing_columns.is_empty());
        let range = metadata.date_range.unwrap();
        assert_eq!(range.start, NaiveDate::from_ymd_opt(2020, 1, 2).unwrap());
        assert_eq!(range.end, NaiveDate::from_ymd_opt(2020, 1, 6).unwrap());
        assert!(metadata.summary().contains("Unique Tickers:      2"));
    }
}
