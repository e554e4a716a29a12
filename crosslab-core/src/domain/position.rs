//! Position state — the two states of the single-position simulator.

use serde::{Deserialize, Serialize};

/// An open long position. Every field is fixed at entry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OpenPosition {
    pub entry_index: usize,
    pub entry_price: f64,
    pub size: f64,
}

impl OpenPosition {
    /// Close-to-entry move in percent.
    pub fn move_percent(&self, close: f64) -> f64 {
        (close - self.entry_price) / self.entry_price * 100.0
    }

    /// Realized PnL if closed at `exit_price`.
    pub fn pnl_at(&self, exit_price: f64) -> f64 {
        self.size * (exit_price - self.entry_price)
    }
}

/// Flat or holding exactly one long position.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum PositionState {
    #[default]
    Flat,
    Long(OpenPosition),
}

impl PositionState {
    pub fn is_flat(&self) -> bool {
        matches!(self, PositionState::Flat)
    }

    pub fn open_position(&self) -> Option<&OpenPosition> {
        match self {
            PositionState::Flat => None,
            PositionState::Long(pos) => Some(pos),
        }
    }
}
