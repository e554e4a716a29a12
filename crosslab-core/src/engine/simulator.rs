//! Bar-by-bar trade simulation over precomputed crossovers.

use serde::{Deserialize, Serialize};

use crate::domain::{Bar, OpenPosition, Trade};
use crate::params::StrategyParams;
use crate::signals::Crossovers;

use super::state::{SimulationRules, SimulationState};

/// Output of one simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub trades: Vec<Trade>,
    /// Realized equity, one point per bar.
    pub equity_curve: Vec<f64>,
    pub final_capital: f64,
    /// A position still open on the last bar. It is reported, never force-closed.
    pub open_position: Option<OpenPosition>,
}

/// Run the long-only state machine over `bars`.
///
/// Bar 0 only seeds the equity curve; decisions start at bar 1. Parameters are
/// expected to be validated already.
pub fn simulate(bars: &[Bar], crossovers: &Crossovers, params: &StrategyParams) -> SimulationResult {
    if bars.is_empty() {
        return SimulationResult {
            trades: Vec::new(),
            equity_curve: Vec::new(),
            final_capital: params.initial_capital,
            open_position: None,
        };
    }

    let rules = SimulationRules::from_params(params);
    let initial = SimulationState::new(params.initial_capital, bars.len());

    let state = bars
        .iter()
        .enumerate()
        .skip(1)
        .fold(initial, |state, (i, bar)| {
            let transition = state.transition(i, bar.close, crossovers.at(i), &rules);
            state.apply(transition)
        });

    SimulationResult {
        open_position: state.position.open_position().copied(),
        final_capital: state.capital,
        trades: state.trades,
        equity_curve: state.equity_curve,
    }
}
