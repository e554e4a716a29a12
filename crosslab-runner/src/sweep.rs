//! Parameter sweep over fast/slow EMA period grids.
//!
//! Every combination is an independent backtest over the same loaded data.
//! Runs share nothing mutable, so they execute on the rayon pool.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crosslab_core::params::StrategyParams;

use crate::data_loader::LoadedData;
use crate::metrics::PerformanceMetrics;
use crate::runner::run_backtest_from_data;

/// Parameter grid specification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamGrid {
    pub fast_periods: Vec<usize>,
    pub slow_periods: Vec<usize>,
}

impl Default for ParamGrid {
    /// Fast 5–20 against slow 20–50.
    fn default() -> Self {
        Self {
            fast_periods: vec![5, 8, 10, 12, 14, 15, 20],
            slow_periods: vec![20, 26, 30, 35, 40, 50],
        }
    }
}

impl ParamGrid {
    pub fn new(fast_periods: Vec<usize>, slow_periods: Vec<usize>) -> Self {
        Self {
            fast_periods,
            slow_periods,
        }
    }

    /// Total number of combinations, valid or not.
    pub fn size(&self) -> usize {
        self.fast_periods.len() * self.slow_periods.len()
    }

    /// Expand the grid over `base`, splitting valid parameter sets from
    /// rejected ones (fast >= slow, zero period, or invalid base values).
    pub fn generate_params(&self, base: &StrategyParams) -> (Vec<StrategyParams>, usize) {
        let mut valid = Vec::with_capacity(self.size());
        let mut rejected = 0;

        for &fast in &self.fast_periods {
            for &slow in &self.slow_periods {
                let params = base.with_periods(fast, slow);
                match params.validate() {
                    Ok(()) => valid.push(params),
                    Err(e) => {
                        tracing::debug!(fast, slow, reason = %e, "skipping combination");
                        rejected += 1;
                    }
                }
            }
        }

        (valid, rejected)
    }
}

/// One ranked sweep result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepEntry {
    pub params: StrategyParams,
    pub metrics: PerformanceMetrics,
}

impl SweepEntry {
    pub fn fast_period(&self) -> usize {
        self.params.fast_period
    }

    pub fn slow_period(&self) -> usize {
        self.params.slow_period
    }
}

/// Parameter sweep executor.
pub struct ParamSweep {
    parallel: bool,
}

impl Default for ParamSweep {
    fn default() -> Self {
        Self::new()
    }
}

impl ParamSweep {
    pub fn new() -> Self {
        Self { parallel: true }
    }

    /// Enables or disables parallel execution.
    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Run every valid combination of `grid` over `data`.
    pub fn sweep(&self, grid: &ParamGrid, base: &StrategyParams, data: &LoadedData) -> SweepResults {
        self.sweep_with_progress(grid, base, data, |_, _| {})
    }

    /// Same as `sweep`, invoking `progress(done, total)` after each run.
    ///
    /// In parallel mode `done` counts completions, not grid positions.
    pub fn sweep_with_progress<F>(
        &self,
        grid: &ParamGrid,
        base: &StrategyParams,
        data: &LoadedData,
        progress: F,
    ) -> SweepResults
    where
        F: Fn(usize, usize) + Send + Sync,
    {
        let (params, rejected) = grid.generate_params(base);
        let total = params.len();
        let done = std::sync::atomic::AtomicUsize::new(0);

        tracing::info!(
            combinations = grid.size(),
            valid = total,
            rejected,
            parallel = self.parallel,
            "starting parameter sweep"
        );

        let run_one = |p: &StrategyParams| -> Outcome {
            let outcome = match run_backtest_from_data(data, p, None) {
                Ok(result) => match result.metrics {
                    Some(metrics) => Outcome::Ranked(SweepEntry {
                        params: p.clone(),
                        metrics,
                    }),
                    None => Outcome::NoTrades,
                },
                Err(e) => {
                    tracing::warn!(
                        fast = p.fast_period,
                        slow = p.slow_period,
                        error = %e,
                        "sweep run failed"
                    );
                    Outcome::Failed
                }
            };
            let n = done.fetch_add(1, std::sync::atomic::Ordering::Relaxed) + 1;
            progress(n, total);
            outcome
        };

        let outcomes: Vec<Outcome> = if self.parallel {
            params.par_iter().map(run_one).collect()
        } else {
            params.iter().map(run_one).collect()
        };

        let mut results = SweepResults {
            entries: Vec::new(),
            total_combinations: grid.size(),
            rejected,
            no_trades: 0,
            failed: 0,
        };
        for outcome in outcomes {
            match outcome {
                Outcome::Ranked(entry) => results.entries.push(entry),
                Outcome::NoTrades => results.no_trades += 1,
                Outcome::Failed => results.failed += 1,
            }
        }
        results.rank();

        tracing::info!(
            ranked = results.entries.len(),
            no_trades = results.no_trades,
            failed = results.failed,
            "parameter sweep finished"
        );
        results
    }
}

enum Outcome {
    Ranked(SweepEntry),
    NoTrades,
    Failed,
}

/// Results from a parameter sweep, ranked by Sharpe ratio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepResults {
    entries: Vec<SweepEntry>,
    pub total_combinations: usize,
    /// Combinations that failed parameter validation.
    pub rejected: usize,
    /// Valid combinations that closed no trades.
    pub no_trades: usize,
    /// Runs that returned an error.
    pub failed: usize,
}

impl SweepResults {
    /// Sort by Sharpe descending. NaN ranks last; ties keep grid order.
    fn rank(&mut self) {
        self.entries
            .sort_by(|a, b| sort_key(b.metrics.sharpe_ratio).total_cmp(&sort_key(a.metrics.sharpe_ratio)));
    }

    /// Ranked entries, best first.
    pub fn ranked(&self) -> &[SweepEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the top N results by Sharpe.
    pub fn top_n(&self, n: usize) -> &[SweepEntry] {
        &self.entries[..n.min(self.entries.len())]
    }

    /// Returns the best result by Sharpe.
    pub fn best(&self) -> Option<&SweepEntry> {
        self.entries.first()
    }
}

fn sort_key(sharpe: f64) -> f64 {
    if sharpe.is_nan() {
        f64::NEG_INFINITY
    } else {
        sharpe
    }
}
