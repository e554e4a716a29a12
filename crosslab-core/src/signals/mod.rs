//! Signals — moving-average series, trend flags, and crossover events.
//!
//! Signal generation is a pure pass over the full bar history. Its output
//! feeds the simulator; nothing here sees position or capital state.

pub mod ma_crossover;

pub use ma_crossover::{generate_signals, identify_crossovers, EmaCrossover};

use serde::{Deserialize, Serialize};

/// Direction of a crossover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CrossDirection {
    /// Fast average crosses above the slow average.
    Buy,
    /// Fast average crosses below the slow average.
    Sell,
}

/// A crossover observed between bars `index - 1` and `index`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossoverEvent {
    pub index: usize,
    pub direction: CrossDirection,
    /// True when `index` falls before the slow-average warm-up boundary.
    /// Such events are kept; the flag only makes them visible.
    pub during_warmup: bool,
}

/// Moving averages and trend state for every bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalFrame {
    pub fast_period: usize,
    pub slow_period: usize,
    pub fast: Vec<f64>,
    pub slow: Vec<f64>,
    /// `fast > slow`, forced false for every index below `warmup_bars`.
    pub trend_up: Vec<bool>,
    /// First difference of `trend_up`: +1 entering, -1 leaving, 0 otherwise.
    pub position_change: Vec<i8>,
    /// Bars before this index carry no directional signal.
    pub warmup_bars: usize,
}

impl SignalFrame {
    pub fn len(&self) -> usize {
        self.fast.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fast.is_empty()
    }

    /// Whether `index` is at or past the warm-up boundary.
    pub fn is_warm(&self, index: usize) -> bool {
        index >= self.warmup_bars
    }

    /// Bars where the trend flag switched on.
    pub fn trend_entries(&self) -> usize {
        self.position_change.iter().filter(|&&d| d > 0).count()
    }

    /// Bars where the trend flag switched off.
    pub fn trend_exits(&self) -> usize {
        self.position_change.iter().filter(|&&d| d < 0).count()
    }
}

/// Ordered crossover events with O(1) per-bar lookup.
///
/// A bar carries at most one event: Buy needs `fast > slow` at the bar,
/// Sell needs `fast < slow`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Crossovers {
    events: Vec<CrossoverEvent>,
    by_bar: Vec<Option<CrossDirection>>,
}

impl Crossovers {
    /// Build from events in index order over a series of `len` bars.
    pub fn new(events: Vec<CrossoverEvent>, len: usize) -> Self {
        let mut by_bar = vec![None; len];
        for event in &events {
            if let Some(slot) = by_bar.get_mut(event.index) {
                *slot = Some(event.direction);
            }
        }
        Self { events, by_bar }
    }

    pub fn events(&self) -> &[CrossoverEvent] {
        &self.events
    }

    /// Event direction at `index`, if any.
    pub fn at(&self, index: usize) -> Option<CrossDirection> {
        self.by_bar.get(index).copied().flatten()
    }

    pub fn is_buy(&self, index: usize) -> bool {
        self.at(index) == Some(CrossDirection::Buy)
    }

    pub fn is_sell(&self, index: usize) -> bool {
        self.at(index) == Some(CrossDirection::Sell)
    }

    pub fn indices(&self, direction: CrossDirection) -> Vec<usize> {
        self.events
            .iter()
            .filter(|e| e.direction == direction)
            .map(|e| e.index)
            .collect()
    }

    pub fn count(&self, direction: CrossDirection) -> usize {
        self.events.iter().filter(|e| e.direction == direction).count()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(index: usize, direction: CrossDirection) -> CrossoverEvent {
        CrossoverEvent {
            index,
            direction,
            during_warmup: false,
        }
    }

    #[test]
    fn lookup_by_bar() {
        let c = Crossovers::new(
            vec![event(2, CrossDirection::Buy), event(5, CrossDirection::Sell)],
            8,
        );
        assert!(c.is_buy(2));
        assert!(c.is_sell(5));
        assert_eq!(c.at(3), None);
        assert_eq!(c.at(100), None);
        assert_eq!(c.indices(CrossDirection::Buy), vec![2]);
        assert_eq!(c.count(CrossDirection::Sell), 1);
        assert_eq!(c.len(), 2);
    }

    #[test]
    fn empty_crossovers() {
        let c = Crossovers::default();
        assert!(c.is_empty());
        assert!(!c.is_buy(0));
    }
}
