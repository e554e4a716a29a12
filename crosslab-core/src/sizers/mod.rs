//! Position sizers — determine trade quantity.
//!
//! Sizers translate a risk budget into units. They are signal-agnostic and
//! never look at running capital.

pub mod fixed_risk;

pub use fixed_risk::FixedRiskSizer;
