//! Volume indicators.
//!
//! The cumulative indicators are single passes with carried state over one
//! ticker's chronological bars.

use b3_core::traits::OhlcvIndicator;
use b3_core::types::PriceBar;

use crate::rolling::{rolling_mean, rolling_sum, safe_div, zip_with};

/// Volume over its trailing mean; null while the mean is unavailable or 0.
pub fn volume_ratio(volumes: &[Option<f64>], volume_sma: &[Option<f64>]) -> Vec<Option<f64>> {
    zip_with(volumes, volume_sma, safe_div)
}

/// Rolling mean of volume.
#[derive(Debug, Clone)]
pub struct VolumeSma {
    period: usize,
}

impl VolumeSma {
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "Period must be greater than 0");
        Self { period }
    }
}

impl OhlcvIndicator for VolumeSma {
    type Output = f64;

    fn calculate(&self, bars: &[PriceBar]) -> Vec<Option<f64>> {
        let volumes: Vec<Option<f64>> = bars.iter().map(|b| Some(b.volume_f64())).collect();
        rolling_mean(&volumes, self.period)
    }

    fn period(&self) -> usize {
        self.period
    }

    fn name(&self) -> &str {
        "volume_sma"
    }
}

/// On-Balance Volume.
///
/// Seeded with the first bar's volume, then adds the volume on an up
/// close and subtracts it on a down close.
#[derive(Debug, Clone, Default)]
pub struct Obv;

impl OhlcvIndicator for Obv {
    type Output = f64;

    fn calculate(&self, bars: &[PriceBar]) -> Vec<Option<f64>> {
        let mut prev_close: Option<f64> = None;
        bars.iter()
            .scan(0.0, |obv, bar| {
                let volume = bar.volume_f64();
                *obv = match prev_close {
                    None => volume,
                    Some(prev) if bar.close > prev => *obv + volume,
                    Some(prev) if bar.close < prev => *obv - volume,
                    Some(_) => *obv,
                };
                prev_close = Some(bar.close);
                Some(Some(*obv))
            })
            .collect()
    }

    fn period(&self) -> usize {
        1
    }

    fn name(&self) -> &str {
        "obv"
    }
}

/// Volume-Price Trend: running sum of `volume * daily_return`, seeded at 0.
#[derive(Debug, Clone, Default)]
pub struct Vpt;

impl OhlcvIndicator for Vpt {
    type Output = f64;

    fn calculate(&self, bars: &[PriceBar]) -> Vec<Option<f64>> {
        let mut prev_close: Option<f64> = None;
        bars.iter()
            .scan(0.0, |vpt, bar| {
                if let Some(ret) = prev_close.and_then(|p| safe_div(bar.close - p, p)) {
                    *vpt += bar.volume_f64() * ret;
                }
                prev_close = Some(bar.close);
                Some(Some(*vpt))
            })
            .collect()
    }

    fn period(&self) -> usize {
        1
    }

    fn name(&self) -> &str {
        "vpt"
    }
}

/// Money Flow Index.
///
/// Raw money flow (typical price times volume) is positive when the typical
/// price rose and negative when it fell. The first bar has no direction.
/// Null when a window holds no negative flow.
#[derive(Debug, Clone)]
pub struct Mfi {
    period: usize,
}

impl Mfi {
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "Period must be greater than 0");
        Self { period }
    }

    fn flows(bars: &[PriceBar]) -> (Vec<Option<f64>>, Vec<Option<f64>>) {
        let mut prev_tp: Option<f64> = None;
        bars.iter()
            .map(|bar| {
                let tp = bar.typical_price();
                let flow = tp * bar.volume_f64();
                let split = prev_tp.map(|prev| {
                    if tp > prev {
                        (flow, 0.0)
                    } else if tp < prev {
                        (0.0, flow)
                    } else {
                        (0.0, 0.0)
                    }
                });
                prev_tp = Some(tp);
                (split.map(|s| s.0), split.map(|s| s.1))
            })
            .unzip()
    }
}

impl OhlcvIndicator for Mfi {
    type Output = f64;

    fn calculate(&self, bars: &[PriceBar]) -> Vec<Option<f64>> {
        let (positive, negative) = Self::flows(bars);
        let positive = rolling_sum(&positive, self.period);
        let negative = rolling_sum(&negative, self.period);

        zip_with(&positive, &negative, |pos, neg| {
            safe_div(pos, neg).map(|ratio| 100.0 - 100.0 / (1.0 + ratio))
        })
    }

    fn period(&self) -> usize {
        self.period + 1
    }

    fn name(&self) -> &str {
        "mfi"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rolling::dense;
    use chrono::NaiveDate;

    fn bars(closes: &[f64], volumes: &[u64]) -> Vec<PriceBar> {
        let start = NaiveDate::from_ymd_opt(2022, 6, 1).unwrap();
        closes
            .iter()
            .zip(volumes)
            .enumerate()
            .map(|(i, (&c, &v))| {
                PriceBar::new(start + chrono::Days::new(i as u64), "VALE3", c, c, c, c, v)
            })
            .collect()
    }

    #[test]
    fn test_obv_seeded_with_first_volume() {
        let bars = bars(&[10.0, 11.0, 11.0, 10.5], &[100, 200, 300, 50]);
        let obv = Obv.calculate(&bars);

        assert_eq!(obv, vec![Some(100.0), Some(300.0), Some(300.0), Some(250.0)]);
    }

    #[test]
    fn test_vpt_seeded_at_zero() {
        let bars = bars(&[10.0, 11.0, 9.9], &[100, 200, 300]);
        let vpt = Vpt.calculate(&bars);

        assert_eq!(vpt[0], Some(0.0));
        assert!((vpt[1].unwrap() - 20.0).abs() < 1e-10);
        assert!((vpt[2].unwrap() - (20.0 - 30.0)).abs() < 1e-10);
    }

    #[test]
    fn test_mfi() {
        let bars = bars(&[10.0, 11.0, 10.0, 12.0], &[100, 100, 100, 100]);
        let mfi = Mfi::new(3).calculate(&bars);

        assert!(mfi[..3].iter().all(Option::is_none));
        // positive 1100 + 1200, negative 1000
        let expected = 100.0 - 100.0 / (1.0 + 2300.0 / 1000.0);
        assert!((mfi[3].unwrap() - expected).abs() < 1e-10);
    }

    #[test]
    fn test_mfi_without_negative_flow_is_null() {
        let bars = bars(&[10.0, 11.0, 12.0, 13.0], &[100; 4]);
        assert!(Mfi::new(3).calculate(&bars).iter().all(Option::is_none));
    }

    #[test]
    fn test_volume_ratio_zero_mean() {
        let bars = bars(&[10.0; 3], &[0, 0, 0]);
        let sma = VolumeSma::new(2).calculate(&bars);
        let ratio = volume_ratio(&dense(&[0.0, 0.0, 0.0]), &sma);

        assert_eq!(sma[1], Some(0.0));
        assert!(ratio.iter().all(Option::is_none));
    }
}
