//! CrossLab Core — EMA crossover signals and the single-position trade simulator.
//!
//! This crate is pure computation with no I/O:
//! - Domain types (bars, open positions, closed trades)
//! - Recursive EMA indicator
//! - Crossover signal generation with warm-up tagging
//! - Fixed-risk position sizing
//! - Flat/Long state machine folded over the bar series

pub mod domain;
pub mod engine;
pub mod indicators;
pub mod params;
pub mod signals;
pub mod sizers;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: core types can cross thread boundaries.
    ///
    /// Parameter sweeps run simulations on a rayon pool, so every type that
    /// flows in or out of `engine::simulate` must stay Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        // Domain types
        require_send::<domain::Bar>();
        require_sync::<domain::Bar>();
        require_send::<domain::Trade>();
        require_sync::<domain::Trade>();
        require_send::<domain::OpenPosition>();
        require_sync::<domain::OpenPosition>();
        require_send::<domain::PositionState>();
        require_sync::<domain::PositionState>();

        // Signals
        require_send::<signals::SignalFrame>();
        require_sync::<signals::SignalFrame>();
        require_send::<signals::Crossovers>();
        require_sync::<signals::Crossovers>();
        require_send::<signals::EmaCrossover>();
        require_sync::<signals::EmaCrossover>();

        // Engine types
        require_send::<params::StrategyParams>();
        require_sync::<params::StrategyParams>();
        require_send::<engine::SimulationResult>();
        require_sync::<engine::SimulationResult>();
        require_send::<engine::SimulationState>();
        require_sync::<engine::SimulationState>();
        require_send::<sizers::FixedRiskSizer>();
        require_sync::<sizers::FixedRiskSizer>();
    }

    /// Signal generation never sees position or capital state.
    ///
    /// `identify_crossovers` takes only the signal frame. If it ever gains a
    /// portfolio argument this stops compiling.
    #[test]
    fn crossover_detection_has_no_portfolio_parameter() {
        fn _check(frame: &signals::SignalFrame) -> signals::Crossovers {
            signals::identify_crossovers(frame)
        }
    }
}
