//! Fixed-risk position sizer.
//!
//! A full stop-loss move always costs the same dollar amount:
//! size = (initial_capital × risk%) / (entry_price × stop_loss%).
//! The budget comes from the initial capital and is never re-derived from
//! the running balance.

use crate::params::StrategyParams;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedRiskSizer {
    risk_dollars: f64,
    stop_loss_fraction: f64,
}

impl FixedRiskSizer {
    pub fn new(initial_capital: f64, risk_percent: f64, stop_loss_percent: f64) -> Self {
        Self {
            risk_dollars: initial_capital * (risk_percent / 100.0),
            stop_loss_fraction: stop_loss_percent / 100.0,
        }
    }

    pub fn from_params(params: &StrategyParams) -> Self {
        Self::new(
            params.initial_capital,
            params.risk_percent,
            params.stop_loss_percent,
        )
    }

    /// Dollars lost if a position sized by this sizer hits its stop.
    pub fn risk_dollars(&self) -> f64 {
        self.risk_dollars
    }

    /// Units to buy at `entry_price`. Returns 0.0 for a non-positive price.
    pub fn size(&self, entry_price: f64) -> f64 {
        let stop_distance = entry_price * self.stop_loss_fraction;
        if entry_price <= 0.0 || stop_distance <= 0.0 {
            return 0.0;
        }
        self.risk_dollars / stop_distance
    }
}
