//! Exponential Moving Average (EMA), recursive form.
//!
//! alpha = 2 / (period + 1)
//! EMA[0] = close[0]
//! EMA[t] = alpha * close[t] + (1 - alpha) * EMA[t-1]
//!
//! Seeded from the first observation, not from an SMA window, so the series
//! is defined for every index.

use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
    name: String,
}

impl Ema {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "EMA period must be >= 1");
        Self {
            period,
            name: format!("ema_{period}"),
        }
    }

    pub fn period(&self) -> usize {
        self.period
    }

    pub fn alpha(&self) -> f64 {
        smoothing_factor(self.period)
    }
}

impl Indicator for Ema {
    fn name(&self) -> &str {
        &self.name
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        calculate_moving_average(&closes, self.period)
    }
}

fn smoothing_factor(period: usize) -> f64 {
    2.0 / (period as f64 + 1.0)
}

/// Recursive EMA over a raw series. `period` must be >= 1.
pub fn calculate_moving_average(values: &[f64], period: usize) -> Vec<f64> {
    debug_assert!(period >= 1, "EMA period must be >= 1");
    let alpha = smoothing_factor(period);

    let mut result = Vec::with_capacity(values.len());
    let mut iter = values.iter();
    let Some(&first) = iter.next() else {
        return result;
    };

    let mut prev = first;
    result.push(prev);
    for &v in iter {
        let ema = alpha * v + (1.0 - alpha) * prev;
        result.push(ema);
        prev = ema;
    }
    result
}
