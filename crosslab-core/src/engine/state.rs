//! Simulation accumulator and per-bar transitions.
//!
//! The simulator folds bars into a `SimulationState`. Each step first decides
//! a `Transition` from the current state, then applies it. Deciding never
//! mutates; applying is the only place capital, trades, and equity change.

use crate::domain::{OpenPosition, PositionState, Trade};
use crate::params::StrategyParams;
use crate::signals::CrossDirection;
use crate::sizers::FixedRiskSizer;

use super::exits::{evaluate_exits, ExitLevels};

/// Fixed rules for one run, derived from the strategy parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationRules {
    pub sizer: FixedRiskSizer,
    pub levels: ExitLevels,
}

impl SimulationRules {
    pub fn from_params(params: &StrategyParams) -> Self {
        Self {
            sizer: FixedRiskSizer::from_params(params),
            levels: ExitLevels::from_params(params),
        }
    }
}

/// What happens on one bar.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    Hold,
    Enter(OpenPosition),
    Exit(Trade),
}

/// Everything carried from one bar to the next.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationState {
    pub position: PositionState,
    pub capital: f64,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<f64>,
}

impl SimulationState {
    /// Flat state with the first equity point already recorded.
    pub fn new(initial_capital: f64, capacity: usize) -> Self {
        let mut equity_curve = Vec::with_capacity(capacity);
        equity_curve.push(initial_capital);
        Self {
            position: PositionState::Flat,
            capital: initial_capital,
            trades: Vec::new(),
            equity_curve,
        }
    }

    /// Decide the transition for bar `index`.
    ///
    /// Entries are only considered while flat, so a bar that closes a position
    /// never reopens one.
    pub fn transition(
        &self,
        index: usize,
        close: f64,
        crossover: Option<CrossDirection>,
        rules: &SimulationRules,
    ) -> Transition {
        match self.position {
            PositionState::Long(pos) => {
                let sell_signal = crossover == Some(CrossDirection::Sell);
                match evaluate_exits(&pos, close, sell_signal, &rules.levels) {
                    Some(fill) => Transition::Exit(Trade {
                        entry_index: pos.entry_index,
                        entry_price: pos.entry_price,
                        exit_index: index,
                        exit_price: fill.price,
                        size: pos.size,
                        pnl: pos.pnl_at(fill.price),
                        pnl_percent: pos.move_percent(close),
                        exit_reason: fill.reason,
                    }),
                    None => Transition::Hold,
                }
            }
            PositionState::Flat if crossover == Some(CrossDirection::Buy) => {
                Transition::Enter(OpenPosition {
                    entry_index: index,
                    entry_price: close,
                    size: rules.sizer.size(close),
                })
            }
            PositionState::Flat => Transition::Hold,
        }
    }

    /// Apply a transition and record this bar's realized equity.
    pub fn apply(mut self, transition: Transition) -> Self {
        match transition {
            Transition::Hold => {}
            Transition::Enter(pos) => self.position = PositionState::Long(pos),
            Transition::Exit(trade) => {
                self.capital += trade.pnl;
                self.trades.push(trade);
                self.position = PositionState::Flat;
            }
        }
        self.equity_curve.push(self.capital);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ExitReason;

    fn rules() -> SimulationRules {
        SimulationRules::from_params(&StrategyParams::default())
    }

    #[test]
    fn new_state_is_flat_with_one_equity_point() {
        let state = SimulationState::new(10_000.0, 4);
        assert!(state.position.is_flat());
        assert_eq!(state.equity_curve, vec![10_000.0]);
        assert!(state.trades.is_empty());
    }

    #[test]
    fn buy_while_flat_enters_at_close() {
        let state = SimulationState::new(10_000.0, 4);
        let t = state.transition(1, 100.0, Some(CrossDirection::Buy), &rules());
        match t {
            Transition::Enter(pos) => {
                assert_eq!(pos.entry_index, 1);
                assert_eq!(pos.entry_price, 100.0);
                // 200 risk dollars over a 2.0 stop distance
                assert!((pos.size - 100.0).abs() < 1e-9);
            }
            other => panic!("expected entry, got {other:?}"),
        }
    }

    #[test]
    fn sell_while_flat_holds() {
        let state = SimulationState::new(10_000.0, 4);
        let t = state.transition(1, 100.0, Some(CrossDirection::Sell), &rules());
        assert_eq!(t, Transition::Hold);
    }

    #[test]
    fn exit_books_pnl_and_goes_flat() {
        let mut state = SimulationState::new(10_000.0, 4);
        state.position = PositionState::Long(OpenPosition {
            entry_index: 1,
            entry_price: 100.0,
            size: 100.0,
        });
        let t = state.transition(2, 103.0, Some(CrossDirection::Sell), &rules());
        let state = state.apply(t);
        assert!(state.position.is_flat());
        assert_eq!(state.trades.len(), 1);
        assert_eq!(state.trades[0].exit_reason, ExitReason::SignalExit);
        assert!((state.capital - 10_300.0).abs() < 1e-9);
        assert_eq!(state.equity_curve.len(), 2);
        assert!((state.equity_curve[1] - 10_300.0).abs() < 1e-9);
    }

    #[test]
    fn holding_keeps_equity_realized_only() {
        let mut state = SimulationState::new(10_000.0, 4);
        state.position = PositionState::Long(OpenPosition {
            entry_index: 1,
            entry_price: 100.0,
            size: 100.0,
        });
        let t = state.transition(2, 103.0, None, &rules());
        assert_eq!(t, Transition::Hold);
        let state = state.apply(t);
        assert_eq!(state.equity_curve, vec![10_000.0, 10_000.0]);
    }
}
