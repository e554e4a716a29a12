//! Trade simulation: exit rules, the per-bar state machine, and the fold
//! that drives it.

pub mod exits;
pub mod simulator;
pub mod state;

pub use exits::{evaluate_exits, ExitFill, ExitLevels, ExitRule, EXIT_PRIORITY};
pub use simulator::{simulate, SimulationResult};
pub use state::{SimulationRules, SimulationState, Transition};
