//! Strategy parameters and their validation.
//!
//! Parameters are validated once, before any signal or simulation work.
//! An invalid combination is a rejected evaluation, never a mid-run failure.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Bars per year assuming hourly bars: 252 trading days × 24 bars.
pub const HOURLY_BARS_PER_YEAR: f64 = 252.0 * 24.0;

/// Bars per year assuming daily bars.
pub const DAILY_BARS_PER_YEAR: f64 = 252.0;

/// Reasons a parameter set is rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParamError {
    #[error("fast_period must be >= 1 (got {0})")]
    ZeroFastPeriod(usize),

    #[error("fast_period ({fast}) must be < slow_period ({slow})")]
    FastNotBelowSlow { fast: usize, slow: usize },

    #[error("{name} must be a positive finite number (got {value})")]
    NonPositive { name: &'static str, value: f64 },
}

/// Complete parameter set for one backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyParams {
    pub fast_period: usize,
    pub slow_period: usize,
    pub initial_capital: f64,
    /// Percent of *initial* capital risked per trade.
    pub risk_percent: f64,
    pub stop_loss_percent: f64,
    pub take_profit_percent: f64,
    /// Annualisation factor for the Sharpe ratio. Must match bar granularity.
    #[serde(default = "default_bars_per_year")]
    pub bars_per_year: f64,
}

fn default_bars_per_year() -> f64 {
    HOURLY_BARS_PER_YEAR
}

impl Default for StrategyParams {
    fn default() -> Self {
        Self {
            fast_period: 12,
            slow_period: 26,
            initial_capital: 10_000.0,
            risk_percent: 2.0,
            stop_loss_percent: 2.0,
            take_profit_percent: 5.0,
            bars_per_year: HOURLY_BARS_PER_YEAR,
        }
    }
}

impl StrategyParams {
    /// Same parameters with different EMA periods.
    pub fn with_periods(&self, fast_period: usize, slow_period: usize) -> Self {
        Self {
            fast_period,
            slow_period,
            ..self.clone()
        }
    }

    /// Check every constraint. The first violation is returned.
    pub fn validate(&self) -> Result<(), ParamError> {
        if self.fast_period == 0 {
            return Err(ParamError::ZeroFastPeriod(self.fast_period));
        }
        if self.fast_period >= self.slow_period {
            return Err(ParamError::FastNotBelowSlow {
                fast: self.fast_period,
                slow: self.slow_period,
            });
        }
        for (name, value) in [
            ("initial_capital", self.initial_capital),
            ("risk_percent", self.risk_percent),
            ("stop_loss_percent", self.stop_loss_percent),
            ("take_profit_percent", self.take_profit_percent),
            ("bars_per_year", self.bars_per_year),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ParamError::NonPositive { name, value });
            }
        }
        Ok(())
    }

    /// Short label, e.g. `EMA (12/26)`.
    pub fn label(&self) -> String {
        format!("EMA ({}/{})", self.fast_period, self.slow_period)
    }
}
