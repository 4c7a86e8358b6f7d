//! Technical indicators with SIMD optimization.
//!
//! This crate provides the indicator set computed by the pipeline:
//! - Returns (daily, log, cumulative)
//! - Moving averages (SMA, EMA, price vs SMA)
//! - Volatility indicators (annualized volatility, TR, ATR, Bollinger Bands)
//! - Momentum indicators (RSI, MACD, Stochastic, Williams %R)
//! - Volume indicators (volume SMA and ratio, OBV, VPT, MFI)
//!
//! Every indicator output is aligned with its input and uses `None` for
//! points without a defined value. Window reductions go through the SIMD
//! kernels in [`simd`]. [`IndicatorEngine`] runs the whole set per ticker.

pub mod engine;
pub mod momentum;
pub mod moving_average;
pub mod returns;
pub mod rolling;
pub mod simd;
pub mod summary;
pub mod volatility;
pub mod volume;

pub use engine::{IndicatorEngine, IndicatorSettings};
pub use momentum::{Macd, MacdOutput, Rsi, RsiZeroLoss, Stochastic, StochasticOutput, WilliamsR};
pub use moving_average::{Ema, PriceVsSma, Sma};
pub use returns::{CumulativeReturn, DailyReturn, LogReturn};
pub use summary::{categorize, IndicatorCategory, IndicatorSummary};
pub use volatility::{Atr, BollingerBands, BollingerOutput, StdDev, TrueRange, Volatility};
pub use volume::{Mfi, Obv, VolumeSma, Vpt};
