//! Exit rules and their evaluation priority.
//!
//! While long, each bar is checked against the rules in `EXIT_PRIORITY`
//! order and the first match wins. A bar can close a position at most once.

use crate::domain::{ExitReason, OpenPosition};
use crate::params::StrategyParams;

/// Stop and target distances in percent of entry price.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExitLevels {
    pub stop_loss_percent: f64,
    pub take_profit_percent: f64,
}

impl ExitLevels {
    pub fn from_params(params: &StrategyParams) -> Self {
        Self {
            stop_loss_percent: params.stop_loss_percent,
            take_profit_percent: params.take_profit_percent,
        }
    }

    /// Synthetic fill for a stop-loss exit.
    pub fn stop_price(&self, entry_price: f64) -> f64 {
        entry_price * (1.0 - self.stop_loss_percent / 100.0)
    }

    /// Synthetic fill for a take-profit exit.
    pub fn target_price(&self, entry_price: f64) -> f64 {
        entry_price * (1.0 + self.take_profit_percent / 100.0)
    }
}

/// One exit condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitRule {
    StopLoss,
    TakeProfit,
    SignalExit,
}

/// Evaluation order. Stops are checked before targets, targets before signals.
pub const EXIT_PRIORITY: [ExitRule; 3] =
    [ExitRule::StopLoss, ExitRule::TakeProfit, ExitRule::SignalExit];

/// Price and reason of a triggered exit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExitFill {
    pub price: f64,
    pub reason: ExitReason,
}

impl ExitRule {
    pub fn reason(&self) -> ExitReason {
        match self {
            ExitRule::StopLoss => ExitReason::StopLoss,
            ExitRule::TakeProfit => ExitReason::TakeProfit,
            ExitRule::SignalExit => ExitReason::SignalExit,
        }
    }

    /// Check this rule alone against the bar's close.
    pub fn check(
        &self,
        position: &OpenPosition,
        close: f64,
        sell_signal: bool,
        levels: &ExitLevels,
    ) -> Option<ExitFill> {
        let move_pct = position.move_percent(close);
        let price = match self {
            ExitRule::StopLoss if move_pct <= -levels.stop_loss_percent => {
                levels.stop_price(position.entry_price)
            }
            ExitRule::TakeProfit if move_pct >= levels.take_profit_percent => {
                levels.target_price(position.entry_price)
            }
            ExitRule::SignalExit if sell_signal => close,
            _ => return None,
        };
        Some(ExitFill {
            price,
            reason: self.reason(),
        })
    }
}

/// First matching rule in priority order, if any.
pub fn evaluate_exits(
    position: &OpenPosition,
    close: f64,
    sell_signal: bool,
    levels: &ExitLevels,
) -> Option<ExitFill> {
    EXIT_PRIORITY
        .iter()
        .find_map(|rule| rule.check(position, close, sell_signal, levels))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position() -> OpenPosition {
        OpenPosition {
            entry_index: 1,
            entry_price: 100.0,
            size: 10.0,
        }
    }

    fn levels() -> ExitLevels {
        ExitLevels {
            stop_loss_percent: 2.0,
            take_profit_percent: 5.0,
        }
    }

    #[test]
    fn stop_fills_at_synthetic_price() {
        let fill = evaluate_exits(&position(), 90.0, false, &levels()).unwrap();
        assert_eq!(fill.reason, ExitReason::StopLoss);
        assert_eq!(fill.price, 100.0 * (1.0 - 2.0 / 100.0));
    }

    #[test]
    fn stop_boundary_is_inclusive() {
        let fill = evaluate_exits(&position(), 98.0, false, &levels()).unwrap();
        assert_eq!(fill.reason, ExitReason::StopLoss);
    }

    #[test]
    fn target_fills_at_synthetic_price() {
        let fill = evaluate_exits(&position(), 120.0, false, &levels()).unwrap();
        assert_eq!(fill.reason, ExitReason::TakeProfit);
        assert_eq!(fill.price, 100.0 * (1.0 + 5.0 / 100.0));
    }

    #[test]
    fn stop_beats_sell_signal() {
        let fill = evaluate_exits(&position(), 97.0, true, &levels()).unwrap();
        assert_eq!(fill.reason, ExitReason::StopLoss);
    }

    #[test]
    fn target_beats_sell_signal() {
        let fill = evaluate_exits(&position(), 106.0, true, &levels()).unwrap();
        assert_eq!(fill.reason, ExitReason::TakeProfit);
    }

    #[test]
    fn sell_signal_fills_at_close() {
        let fill = evaluate_exits(&position(), 101.5, true, &levels()).unwrap();
        assert_eq!(fill.reason, ExitReason::SignalExit);
        assert_eq!(fill.price, 101.5);
    }

    #[test]
    fn holds_inside_band_without_signal() {
        assert!(evaluate_exits(&position(), 101.0, false, &levels()).is_none());
        assert!(evaluate_exits(&position(), 99.0, false, &levels()).is_none());
    }

    #[test]
    fn priority_order_is_stop_target_signal() {
        assert_eq!(
            EXIT_PRIORITY,
            [ExitRule::StopLoss, ExitRule::TakeProfit, ExitRule::SignalExit]
        );
    }
}
