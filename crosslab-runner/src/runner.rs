//! Backtest runner — wires together signals, simulation, and metrics.
//!
//! Three entry points:
//! - `run_single_backtest()`: loads the CSV named in a config, then runs. Used by CLI.
//! - `run_backtest_from_data()`: takes pre-loaded data. Used by parameter sweeps.
//! - `run_backtest()`: takes a bare bar slice and hashes it itself.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crosslab_core::domain::{Bar, OpenPosition, Trade};
use crosslab_core::engine::simulate;
use crosslab_core::params::{ParamError, StrategyParams};
use crosslab_core::signals::{identify_crossovers, CrossDirection, EmaCrossover};

use crate::config::{BacktestConfig, ConfigError};
use crate::data_loader::{load_csv, DataSource, LoadError, LoadedData};
use crate::metrics::PerformanceMetrics;

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("invalid parameters: {0}")]
    Params(#[from] ParamError),
    #[error("config has no [data] path")]
    NoDataPath,
    #[error("price series is empty")]
    EmptySeries,
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete result of a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub params: StrategyParams,
    pub symbol: Option<String>,
    pub dataset_hash: String,
    pub has_synthetic: bool,
    pub bar_count: usize,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    /// Bars before this index carry no trend flag.
    pub warmup_bars: usize,
    pub buy_signals: usize,
    pub sell_signals: usize,
    /// Crossovers that fell inside the warm-up window. Included in the counts above.
    pub warmup_crossovers: usize,
    /// Bars where the post-warm-up trend flag turned on / off.
    #[serde(default)]
    pub trend_entries: usize,
    #[serde(default)]
    pub trend_exits: usize,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<f64>,
    /// Bar timestamps, aligned with `equity_curve`.
    pub timestamps: Vec<NaiveDateTime>,
    /// Position still open on the last bar, if any. Never force-closed.
    pub open_position: Option<OpenPosition>,
    /// None when no trade closed.
    pub metrics: Option<PerformanceMetrics>,
}

/// Default schema version for serde deserialization of older JSON without the field.
fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl BacktestResult {
    pub fn final_capital(&self) -> f64 {
        self.equity_curve
            .last()
            .copied()
            .unwrap_or(self.params.initial_capital)
    }
}

/// Run a single backtest from a BacktestConfig (loads data from its CSV path).
pub fn run_single_backtest(config: &BacktestConfig) -> Result<BacktestResult, RunError> {
    let params = config.to_params()?;
    let path = config.data.path.as_deref().ok_or(RunError::NoDataPath)?;
    let loaded = load_csv(path)?;
    run_backtest_from_data(&loaded, &params, config.data.symbol.as_deref())
}

/// Run a backtest over a bare bar slice.
pub fn run_backtest(bars: &[Bar], params: &StrategyParams) -> Result<BacktestResult, RunError> {
    let hash = crate::data_loader::compute_dataset_hash(bars);
    execute(bars, params, None, &hash, false)
}

/// Run a backtest over pre-loaded data without touching the filesystem.
///
/// Used by sweeps to avoid re-reading and re-hashing the CSV on every combination.
pub fn run_backtest_from_data(
    data: &LoadedData,
    params: &StrategyParams,
    symbol: Option<&str>,
) -> Result<BacktestResult, RunError> {
    let has_synthetic = matches!(data.source, DataSource::Synthetic { .. });
    execute(&data.bars, params, symbol, &data.dataset_hash, has_synthetic)
}

fn execute(
    bars: &[Bar],
    params: &StrategyParams,
    symbol: Option<&str>,
    dataset_hash: &str,
    has_synthetic: bool,
) -> Result<BacktestResult, RunError> {
    params.validate()?;
    let (first, last) = match (bars.first(), bars.last()) {
        (Some(first), Some(last)) => (first.timestamp, last.timestamp),
        _ => return Err(RunError::EmptySeries),
    };

    let span = tracing::debug_span!(
        "backtest",
        fast = params.fast_period,
        slow = params.slow_period
    );
    let _guard = span.enter();

    // Signals
    let signal = EmaCrossover::new(params.fast_period, params.slow_period)?;
    let frame = signal.generate_signals(bars);
    let crossovers = identify_crossovers(&frame);
    let warmup_crossovers = crossovers
        .events()
        .iter()
        .filter(|e| e.during_warmup)
        .count();
    tracing::debug!(
        buys = crossovers.count(CrossDirection::Buy),
        sells = crossovers.count(CrossDirection::Sell),
        warmup_crossovers,
        "crossovers identified"
    );

    // Simulation
    let sim = simulate(bars, &crossovers, params);

    // Metrics
    let metrics = PerformanceMetrics::compute(
        &sim.trades,
        &sim.equity_curve,
        params.initial_capital,
        params.bars_per_year,
    );

    match &metrics {
        Some(m) => tracing::debug!(
            trades = m.total_trades,
            sharpe = m.sharpe_ratio,
            total_return_pct = m.total_return_percent,
            "backtest finished"
        ),
        None => tracing::debug!("backtest finished without trades"),
    }

    Ok(BacktestResult {
        schema_version: SCHEMA_VERSION,
        params: params.clone(),
        symbol: symbol.map(str::to_string),
        dataset_hash: dataset_hash.to_string(),
        has_synthetic,
        bar_count: bars.len(),
        start: first,
        end: last,
        warmup_bars: frame.warmup_bars,
        buy_signals: crossovers.count(CrossDirection::Buy),
        sell_signals: crossovers.count(CrossDirection::Sell),
        warmup_crossovers,
        trend_entries: frame.trend_entries(),
        trend_exits: frame.trend_exits(),
        trades: sim.trades,
        equity_curve: sim.equity_curve,
        timestamps: bars.iter().map(|b| b.timestamp).collect(),
        open_position: sim.open_position,
        metrics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_loader::{generate_synthetic_bars, SyntheticSpec};

    fn synthetic(days: usize) -> Vec<Bar> {
        generate_synthetic_bars(&SyntheticSpec {
            days,
            ..SyntheticSpec::default()
        })
    }

    #[test]
    fn invalid_params_rejected_before_running() {
        let bars = synthetic(5);
        let params = StrategyParams::default().with_periods(26, 12);
        assert!(matches!(
            run_backtest(&bars, &params),
            Err(RunError::Params(ParamError::FastNotBelowSlow { .. }))
        ));
    }

    #[test]
    fn empty_series_is_an_error() {
        assert!(matches!(
            run_backtest(&[], &StrategyParams::default()),
            Err(RunError::EmptySeries)
        ));
    }

    #[test]
    fn result_shapes_match_input() {
        let bars = synthetic(60);
        let result = run_backtest(&bars, &StrategyParams::default()).unwrap();
        assert_eq!(result.bar_count, bars.len());
        assert_eq!(result.equity_curve.len(), bars.len());
        assert_eq!(result.timestamps.len(), bars.len());
        assert_eq!(result.equity_curve[0], 10_000.0);
        assert_eq!(result.start, bars[0].timestamp);
        assert_eq!(result.warmup_bars, 26);
        assert_eq!(result.schema_version, SCHEMA_VERSION);
        assert_eq!(result.metrics.is_some(), !result.trades.is_empty());
    }

    #[test]
    fn trend_changes_follow_signal_frame() {
        let bars = synthetic(90);
        let params = StrategyParams::default();
        let result = run_backtest(&bars, &params).unwrap();
        let frame = EmaCrossover::new(params.fast_period, params.slow_period)
            .unwrap()
            .generate_signals(&bars);

        let ups = frame.position_change.iter().filter(|&&d| d == 1).count();
        let downs = frame.position_change.iter().filter(|&&d| d == -1).count();
        assert_eq!(result.trend_entries, ups);
        assert_eq!(result.trend_exits, downs);
        assert!(result.trend_entries > 0);
        // Trend flips alternate, so the counts differ by at most one.
        assert!(ups.abs_diff(downs) <= 1);
    }

    #[test]
    fn constant_prices_produce_no_result() {
        let mut bars = synthetic(3);
        for bar in &mut bars {
            bar.open = 100.0;
            bar.high = 100.0;
            bar.low = 100.0;
            bar.close = 100.0;
        }
        let result = run_backtest(&bars, &StrategyParams::default()).unwrap();
        assert!(result.trades.is_empty());
        assert!(result.metrics.is_none());
        assert_eq!(result.final_capital(), 10_000.0);
    }

    #[test]
    fn missing_data_path_is_reported() {
        let config = BacktestConfig::default();
        assert!(matches!(
            run_single_backtest(&config),
            Err(RunError::NoDataPath)
        ));
    }
}
