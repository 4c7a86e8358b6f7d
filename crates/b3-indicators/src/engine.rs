//! Per-ticker indicator computation.

use b3_core::error::{DataError, EtlResult, IndicatorError};
use b3_core::traits::{Indicator, MultiOutputIndicator, OhlcvIndicator};
use b3_core::types::{IndicatorRow, PriceBar, TimeSeries};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

use crate::momentum::{Macd, Rsi, RsiZeroLoss, Stochastic, WilliamsR};
use crate::moving_average::{Ema, PriceVsSma, Sma};
use crate::returns::{cumulative_sum, log_diff, pct_change};
use crate::rolling::dense;
use crate::volatility::{Atr, BollingerBands, TrueRange, Volatility};
use crate::volume::{volume_ratio, Mfi, Obv, VolumeSma, Vpt};

/// Windows and policies used by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorSettings {
    /// SMA and EMA spans (also drive `price_vs_sma_{p}_pct`)
    pub ma_periods: Vec<usize>,
    /// Windows for annualized return volatility
    pub volatility_periods: Vec<usize>,
    /// Trading days used to annualize volatility
    pub annualization_days: f64,
    pub atr_period: usize,
    pub bollinger_period: usize,
    pub bollinger_std_dev: f64,
    pub rsi_periods: Vec<usize>,
    /// RSI value when a window has no losses
    pub rsi_zero_loss: RsiZeroLoss,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub stochastic_k: usize,
    pub stochastic_d: usize,
    pub williams_period: usize,
    pub volume_sma_period: usize,
    pub mfi_period: usize,
    /// Compute tickers on the rayon pool
    pub parallel: bool,
}

impl Default for IndicatorSettings {
    fn default() -> Self {
        Self {
            ma_periods: vec![5, 10, 20, 50, 100, 200],
            volatility_periods: vec![5, 10, 20, 30],
            annualization_days: 252.0,
            atr_period: 14,
            bollinger_period: 20,
            bollinger_std_dev: 2.0,
            rsi_periods: vec![14, 21],
            rsi_zero_loss: RsiZeroLoss::Sentinel,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            stochastic_k: 14,
            stochastic_d: 3,
            williams_period: 14,
            volume_sma_period: 20,
            mfi_period: 14,
            parallel: true,
        }
    }
}

impl IndicatorSettings {
    /// Reject windows the indicators cannot be built with.
    pub fn validate(&self) -> Result<(), IndicatorError> {
        let invalid = |msg: String| Err(IndicatorError::InvalidParameter(msg));

        if let Some(p) = self.ma_periods.iter().find(|&&p| p == 0) {
            return invalid(format!("moving average period must be positive, got {p}"));
        }
        if let Some(p) = self.volatility_periods.iter().find(|&&p| p < 2) {
            return invalid(format!("volatility period must be at least 2, got {p}"));
        }
        if let Some(p) = self.rsi_periods.iter().find(|&&p| p == 0) {
            return invalid(format!("RSI period must be positive, got {p}"));
        }
        if self.bollinger_period < 2 {
            return invalid(format!(
                "Bollinger period must be at least 2, got {}",
                self.bollinger_period
            ));
        }
        if !(self.bollinger_std_dev > 0.0) {
            return invalid("Bollinger std dev multiplier must be positive".into());
        }
        if !(self.annualization_days > 0.0) {
            return invalid("annualization days must be positive".into());
        }
        if self.macd_fast == 0 || self.macd_signal == 0 || self.macd_fast >= self.macd_slow {
            return invalid(format!(
                "MACD periods must satisfy 0 < fast < slow and signal > 0, got {}/{}/{}",
                self.macd_fast, self.macd_slow, self.macd_signal
            ));
        }
        for (name, value) in [
            ("atr_period", self.atr_period),
            ("stochastic_k", self.stochastic_k),
            ("stochastic_d", self.stochastic_d),
            ("williams_period", self.williams_period),
            ("volume_sma_period", self.volume_sma_period),
            ("mfi_period", self.mfi_period),
        ] {
            if value == 0 {
                return invalid(format!("{name} must be positive"));
            }
        }
        Ok(())
    }
}

/// Named output columns of one ticker, each aligned with its bars.
type Columns = Vec<(String, Vec<Option<f64>>)>;

/// Computes the indicator set for every ticker in a cleaned table.
#[derive(Debug, Clone)]
pub struct IndicatorEngine {
    settings: IndicatorSettings,
    columns: Vec<String>,
}

impl IndicatorEngine {
    /// Create an engine after validating its windows.
    pub fn new(settings: IndicatorSettings) -> Result<Self, IndicatorError> {
        settings.validate()?;
        let columns = column_names(&settings);
        Ok(Self { settings, columns })
    }

    pub fn settings(&self) -> &IndicatorSettings {
        &self.settings
    }

    /// Output columns, in computation order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Compute indicators for a cleaned table.
    ///
    /// Tickers are computed independently over their own date-sorted bars.
    /// Rows whose indicators are all null are dropped. The result is sorted
    /// by `(date, ticker)`.
    pub fn compute(&self, bars: &[PriceBar]) -> EtlResult<Vec<IndicatorRow>> {
        if bars.is_empty() {
            return Err(DataError::empty("indicator computation").into());
        }

        let start = Instant::now();
        let series = TimeSeries::group(bars);
        info!(
            rows = bars.len(),
            tickers = series.len(),
            parallel = self.settings.parallel,
            "Calculating technical indicators"
        );

        let per_ticker: Vec<Vec<IndicatorRow>> = if self.settings.parallel {
            series.par_iter().map(|s| self.compute_series(s)).collect()
        } else {
            series.iter().map(|s| self.compute_series(s)).collect()
        };

        let mut rows: Vec<IndicatorRow> = per_ticker.into_iter().flatten().collect();
        rows.sort_by(|a, b| a.bar.key().cmp(&b.bar.key()));

        info!(
            rows = rows.len(),
            dropped = bars.len() - rows.len(),
            columns = self.columns.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Indicators calculated"
        );
        Ok(rows)
    }

    /// Compute indicators for one ticker's series.
    pub fn compute_series(&self, series: &TimeSeries) -> Vec<IndicatorRow> {
        let columns = self.series_columns(series);
        let total = series.len();

        let rows: Vec<IndicatorRow> = series
            .bars()
            .iter()
            .enumerate()
            .map(|(i, bar)| {
                let mut row = IndicatorRow::new(bar.clone());
                for (name, values) in &columns {
                    row.set(name.as_str(), values[i]);
                }
                row
            })
            .filter(IndicatorRow::has_any_value)
            .collect();

        debug!(
            ticker = %series.ticker,
            bars = total,
            kept = rows.len(),
            "Ticker indicators computed"
        );
        rows
    }

    fn series_columns(&self, series: &TimeSeries) -> Columns {
        let s = &self.settings;
        let bars = series.bars();
        let close = series.closes();
        let mut out: Columns = Vec::with_capacity(self.columns.len());

        // Returns
        let returns = pct_change(&close);
        out.push(("daily_return".into(), returns.clone()));
        out.push(("daily_log_return".into(), log_diff(&close)));
        out.push(("cumulative_return".into(), cumulative_sum(&returns)));

        // Moving averages
        for &p in &s.ma_periods {
            let sma = Sma::new(p).calculate(&close);
            out.push((format!("price_vs_sma_{p}_pct"), PriceVsSma::from_sma(&close, &sma)));
            out.push((format!("sma_{p}"), sma));
            out.push((format!("ema_{p}"), Ema::new(p).calculate(&close)));
        }

        // Volatility
        for &p in &s.volatility_periods {
            let vol = Volatility::with_annualization(p, s.annualization_days);
            out.push((format!("volatility_{p}d"), vol.from_returns(&returns)));
        }
        let tr = TrueRange.calculate(bars);
        let atr = Atr::new(s.atr_period).from_true_range(&tr);
        out.push(("tr".into(), tr));
        out.push((format!("atr_{}", s.atr_period), atr));

        let bands = BollingerBands::with_params(s.bollinger_period, s.bollinger_std_dev)
            .calculate(&close);
        out.push(("bb_middle".into(), bands.iter().map(|b| b.map(|b| b.middle)).collect()));
        out.push(("bb_upper".into(), bands.iter().map(|b| b.map(|b| b.upper)).collect()));
        out.push(("bb_lower".into(), bands.iter().map(|b| b.map(|b| b.lower)).collect()));
        out.push(("bb_width".into(), bands.iter().map(|b| b.and_then(|b| b.bandwidth)).collect()));
        out.push((
            "bb_position".into(),
            bands.iter().map(|b| b.and_then(|b| b.percent_b)).collect(),
        ));

        // Momentum
        for &p in &s.rsi_periods {
            out.push((
                format!("rsi_{p}"),
                Rsi::with_zero_loss(p, s.rsi_zero_loss).calculate(&close),
            ));
        }
        let macd = Macd::with_params(s.macd_fast, s.macd_slow, s.macd_signal).calculate(&close);
        out.push(("macd".into(), macd.iter().map(|m| Some(m.macd)).collect()));
        out.push(("macd_signal".into(), macd.iter().map(|m| Some(m.signal)).collect()));
        out.push(("macd_histogram".into(), macd.iter().map(|m| Some(m.histogram)).collect()));

        let stoch = Stochastic::with_params(s.stochastic_k, s.stochastic_d).calculate(bars);
        out.push(("stoch_k".into(), stoch.iter().map(|o| o.and_then(|o| o.k)).collect()));
        out.push(("stoch_d".into(), stoch.iter().map(|o| o.and_then(|o| o.d)).collect()));
        out.push(("williams_r".into(), WilliamsR::new(s.williams_period).calculate(bars)));

        // Volume
        let volume_sma = VolumeSma::new(s.volume_sma_period).calculate(bars);
        let ratio = volume_ratio(&dense(&series.volumes()), &volume_sma);
        out.push((format!("volume_sma_{}", s.volume_sma_period), volume_sma));
        out.push(("volume_ratio".into(), ratio));
        out.push(("obv".into(), Obv.calculate(bars)));
        out.push(("vpt".into(), Vpt.calculate(bars)));
        out.push(("mfi".into(), Mfi::new(s.mfi_period).calculate(bars)));

        out
    }
}

/// Column names in the order `series_columns` produces them.
fn column_names(s: &IndicatorSettings) -> Vec<String> {
    let mut names: Vec<String> = vec![
        "daily_return".into(),
        "daily_log_return".into(),
        "cumulative_return".into(),
    ];
    for p in &s.ma_periods {
        names.push(format!("price_vs_sma_{p}_pct"));
        names.push(format!("sma_{p}"));
        names.push(format!("ema_{p}"));
    }
    names.extend(s.volatility_periods.iter().map(|p| format!("volatility_{p}d")));
    names.push("tr".into());
    names.push(format!("atr_{}", s.atr_period));
    names.extend(
        ["bb_middle", "bb_upper", "bb_lower", "bb_width", "bb_position"].map(String::from),
    );
    names.extend(s.rsi_periods.iter().map(|p| format!("rsi_{p}")));
    names.extend(
        ["macd", "macd_signal", "macd_histogram", "stoch_k", "stoch_d", "williams_r"]
            .map(String::from),
    );
    names.push(format!("volume_sma_{}", s.volume_sma_period));
    names.extend(["volume_ratio", "obv", "vpt", "mfi"].map(String::from));
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn series(ticker: &str, closes: &[f64]) -> Vec<PriceBar> {
        let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                PriceBar::new(
                    start + chrono::Days::new(i as u64),
                    ticker,
                    c,
                    c + 1.0,
                    c - 1.0,
                    c,
                    1_000 + i as u64,
                )
            })
            .collect()
    }

    #[test]
    fn test_default_columns() {
        let engine = IndicatorEngine::new(IndicatorSettings::default()).unwrap();
        let columns = engine.columns();

        for name in ["sma_200", "ema_5", "price_vs_sma_20_pct", "volatility_30d", "atr_14"] {
            assert!(columns.iter().any(|c| c == name), "missing {name}");
        }
        for name in ["rsi_14", "rsi_21", "macd_histogram", "volume_sma_20", "mfi", "bb_position"] {
            assert!(columns.iter().any(|c| c == name), "missing {name}");
        }
        assert!(!columns.iter().any(|c| c == "total_return"));
    }

    #[test]
    fn test_columns_match_computed_keys() {
        let engine = IndicatorEngine::new(IndicatorSettings::default()).unwrap();
        let rows = engine.compute(&series("PETR4", &[10.0, 11.0, 12.0])).unwrap();

        let mut expected: Vec<&str> = engine.columns().iter().map(String::as_str).collect();
        expected.sort_unstable();
        let keys: Vec<&str> = rows[0].indicators.keys().map(String::as_str).collect();
        assert_eq!(keys, expected);
    }

    #[test]
    fn test_empty_input_is_structural() {
        let engine = IndicatorEngine::new(IndicatorSettings::default()).unwrap();
        let err = engine.compute(&[]).unwrap_err();
        assert!(err.is_structural());
    }

    #[test]
    fn test_invalid_settings() {
        let settings = IndicatorSettings {
            macd_fast: 26,
            macd_slow: 12,
            ..Default::default()
        };
        assert!(IndicatorEngine::new(settings).is_err());

        let settings = IndicatorSettings {
            ma_periods: vec![5, 0],
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_output_sorted_by_date_then_ticker() {
        let mut bars = series("VALE3", &[50.0, 51.0, 52.0]);
        bars.extend(series("ITUB4", &[20.0, 21.0, 22.0]));
        bars.reverse();

        let engine = IndicatorEngine::new(IndicatorSettings::default()).unwrap();
        let rows = engine.compute(&bars).unwrap();

        let keys: Vec<_> = rows.iter().map(|r| (r.date(), r.ticker().to_string())).collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
        assert_eq!(rows[0].ticker(), "ITUB4");
    }

    #[test]
    fn test_sequential_matches_parallel() {
        let mut bars = series("PETR4", &(0..60).map(|i| 30.0 + (i as f64).sin()).collect::<Vec<_>>());
        bars.extend(series("BBDC4", &(0..60).map(|i| 15.0 + (i as f64 * 0.3).cos()).collect::<Vec<_>>()));

        let parallel = IndicatorEngine::new(IndicatorSettings::default()).unwrap();
        let sequential = IndicatorEngine::new(IndicatorSettings {
            parallel: false,
            ..Default::default()
        })
        .unwrap();

        assert_eq!(parallel.compute(&bars).unwrap(), sequential.compute(&bars).unwrap());
    }
}
