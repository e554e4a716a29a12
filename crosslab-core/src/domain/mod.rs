//! Domain types for CrossLab

pub mod bar;
pub mod position;
pub mod trade;

pub use bar::{closes, Bar};
pub use position::{OpenPosition, PositionState};
pub use trade::{ExitReason, Trade};
