//! Trade — a completed round trip on the single long position.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExitReason {
    StopLoss,
    TakeProfit,
    SignalExit,
}

impl ExitReason {
    pub fn label(&self) -> &'static str {
        match self {
            ExitReason::StopLoss => "Stop Loss",
            ExitReason::TakeProfit => "Take Profit",
            ExitReason::SignalExit => "Sell Signal",
        }
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A closed long trade: entry → exit.
///
/// `exit_index > entry_index` always holds for trades produced by the simulator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub entry_index: usize,
    pub entry_price: f64,
    pub exit_index: usize,
    pub exit_price: f64,
    /// Units held, fixed at entry.
    pub size: f64,
    /// Signed currency PnL: `size * (exit_price - entry_price)`.
    pub pnl: f64,
    /// Close-to-entry move in percent observed on the exit bar.
    ///
    /// For stop-loss and take-profit exits this differs from the fill-based
    /// move because the fill is synthetic.
    pub pnl_percent: f64,
    pub exit_reason: ExitReason,
}

impl Trade {
    pub fn is_winner(&self) -> bool {
        self.pnl > 0.0
    }

    pub fn is_loser(&self) -> bool {
        self.pnl < 0.0
    }

    pub fn bars_held(&self) -> usize {
        self.exit_index.saturating_sub(self.entry_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_trade(pnl: f64) -> Trade {
        Trade {
            entry_index: 4,
            entry_price: 100.0,
            exit_index: 8,
            exit_price: 100.0 + pnl / 50.0,
            size: 50.0,
            pnl,
            pnl_percent: pnl / 50.0,
            exit_reason: ExitReason::SignalExit,
        }
    }

    #[test]
    fn winner_and_loser_are_exclusive() {
        assert!(sample_trade(10.0).is_winner());
        assert!(!sample_trade(10.0).is_loser());
        assert!(sample_trade(-10.0).is_loser());
        let flat = sample_trade(0.0);
        assert!(!flat.is_winner() && !flat.is_loser());
    }

    #[test]
    fn bars_held() {
        assert_eq!(sample_trade(1.0).bars_held(), 4);
    }

    #[test]
    fn exit_reason_labels() {
        assert_eq!(ExitReason::StopLoss.to_string(), "Stop Loss");
        assert_eq!(ExitReason::TakeProfit.to_string(), "Take Profit");
        assert_eq!(ExitReason::SignalExit.to_string(), "Sell Signal");
    }

    #[test]
    fn trade_serialization_roundtrip() {
        let trade = sample_trade(250.0);
        let json = serde_json::to_string(&trade).unwrap();
        let deser: Trade = serde_json::from_str(&json).unwrap();
        assert_eq!(trade, deser);
    }
}
