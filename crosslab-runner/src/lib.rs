//! CrossLab Runner — backtest orchestration, parameter sweeps, metrics, reporting.
//!
//! This crate builds on `crosslab-core` to provide:
//! - TOML run configuration
//! - CSV price loading and seeded synthetic data
//! - Single-backtest runner with metrics
//! - Parallel fast/slow parameter sweeps ranked by Sharpe
//! - JSON/CSV export and plain-text reports

pub mod config;
pub mod data_loader;
pub mod export;
pub mod metrics;
pub mod report;
pub mod runner;
pub mod sweep;

pub use config::{BacktestConfig, ConfigError};
pub use data_loader::{
    generate_synthetic_bars, load_csv, load_synthetic, write_csv, DataSource, LoadError,
    LoadedData, SyntheticSpec,
};
pub use export::{
    export_equity_csv, export_json, export_sweep_csv, export_trades_csv, import_json,
    load_artifacts, save_artifacts, save_sweep_csv,
};
pub use metrics::PerformanceMetrics;
pub use report::{render_leaderboard, render_report};
pub use runner::{
    run_backtest, run_backtest_from_data, run_single_backtest, BacktestResult, RunError,
    SCHEMA_VERSION,
};
pub use sweep::{ParamGrid, ParamSweep, SweepEntry, SweepResults};
