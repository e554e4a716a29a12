//! Performance metrics — pure functions that compute strategy statistics.
//!
//! Every metric is a pure function: equity curve and/or trade list in, scalar out.
//! No dependencies on the runner, data pipeline, or file formats.

use serde::{Deserialize, Serialize};
use crosslab_core::domain::{ExitReason, Trade};

/// Aggregate performance metrics for a single backtest run.
///
/// Only built when at least one trade closed. A run without trades has no
/// metrics record at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub win_rate_percent: f64,
    pub total_pnl: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    /// Gross profit over gross loss. `+inf` when nothing lost.
    #[serde(with = "infinite_f64")]
    pub profit_factor: f64,
    pub initial_capital: f64,
    pub final_capital: f64,
    pub total_return_percent: f64,
    pub sharpe_ratio: f64,
    /// Deepest peak-to-trough decline in percent, always <= 0.
    pub max_drawdown_percent: f64,
    pub stop_loss_exits: usize,
    pub take_profit_exits: usize,
    pub signal_exits: usize,
    pub max_consecutive_wins: usize,
    pub max_consecutive_losses: usize,
}

impl PerformanceMetrics {
    /// Compute all metrics from the trade list and realized equity curve.
    ///
    /// Returns `None` when `trades` is empty.
    pub fn compute(
        trades: &[Trade],
        equity_curve: &[f64],
        initial_capital: f64,
        bars_per_year: f64,
    ) -> Option<Self> {
        if trades.is_empty() {
            return None;
        }
        let final_capital = equity_curve.last().copied().unwrap_or(initial_capital);
        let returns = bar_returns(equity_curve);

        Some(Self {
            total_trades: trades.len(),
            winning_trades: trades.iter().filter(|t| t.is_winner()).count(),
            losing_trades: trades.iter().filter(|t| t.is_loser()).count(),
            win_rate_percent: win_rate_percent(trades),
            total_pnl: trades.iter().map(|t| t.pnl).sum(),
            avg_win: avg_win(trades),
            avg_loss: avg_loss(trades),
            profit_factor: profit_factor(trades),
            initial_capital,
            final_capital,
            total_return_percent: total_return_percent(initial_capital, final_capital),
            sharpe_ratio: sharpe_ratio(&returns, bars_per_year),
            max_drawdown_percent: max_drawdown_percent(&returns),
            stop_loss_exits: count_exits(trades, ExitReason::StopLoss),
            take_profit_exits: count_exits(trades, ExitReason::TakeProfit),
            signal_exits: count_exits(trades, ExitReason::SignalExit),
            max_consecutive_wins: max_consecutive_wins(trades),
            max_consecutive_losses: max_consecutive_losses(trades),
        })
    }

    /// Profit factor formatted for text output (`inf` when unbounded).
    pub fn profit_factor_display(&self) -> String {
        format_ratio(self.profit_factor)
    }
}

/// Two-decimal formatting that spells out infinity.
pub fn format_ratio(value: f64) -> String {
    if value.is_infinite() && value > 0.0 {
        "inf".to_string()
    } else {
        format!("{value:.2}")
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// Winners as a percentage of all trades. Break-even trades are neither.
pub fn win_rate_percent(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let winners = trades.iter().filter(|t| t.is_winner()).count();
    winners as f64 / trades.len() as f64 * 100.0
}

/// Mean PnL of winning trades, 0.0 if none.
pub fn avg_win(trades: &[Trade]) -> f64 {
    let wins: Vec<f64> = trades.iter().filter(|t| t.is_winner()).map(|t| t.pnl).collect();
    mean_f64(&wins)
}

/// Mean PnL of losing trades (negative), 0.0 if none.
pub fn avg_loss(trades: &[Trade]) -> f64 {
    let losses: Vec<f64> = trades.iter().filter(|t| t.is_loser()).map(|t| t.pnl).collect();
    mean_f64(&losses)
}

/// Profit factor: gross profits / gross losses.
///
/// `+inf` when there are winners and no losers; 0.0 when there are neither.
pub fn profit_factor(trades: &[Trade]) -> f64 {
    let gross_profit: f64 = trades.iter().filter(|t| t.is_winner()).map(|t| t.pnl).sum();
    let gross_loss: f64 = trades
        .iter()
        .filter(|t| t.is_loser())
        .map(|t| t.pnl.abs())
        .sum();

    if gross_loss == 0.0 {
        return if gross_profit > 0.0 { f64::INFINITY } else { 0.0 };
    }
    gross_profit / gross_loss
}

/// Total return in percent of initial capital.
pub fn total_return_percent(initial_capital: f64, final_capital: f64) -> f64 {
    if initial_capital == 0.0 {
        return 0.0;
    }
    (final_capital - initial_capital) / initial_capital * 100.0
}

/// Annualized Sharpe ratio from per-bar returns (zero risk-free rate).
///
/// Sharpe = mean(returns) / sample_std(returns) * sqrt(bars_per_year).
/// Returns 0.0 if variance is zero or fewer than 2 returns.
pub fn sharpe_ratio(returns: &[f64], bars_per_year: f64) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }
    let std = std_dev(returns);
    if std == 0.0 || !std.is_finite() {
        return 0.0;
    }
    mean_f64(returns) / std * bars_per_year.sqrt()
}

/// Maximum drawdown in percent of the running peak of compounded returns.
///
/// The compounded curve starts at 1.0, so the result matches the drawdown of
/// the equity curve itself. Returns 0.0 for monotonically rising equity.
pub fn max_drawdown_percent(returns: &[f64]) -> f64 {
    let mut cumulative = 1.0_f64;
    let mut peak = 1.0_f64;
    let mut max_dd = 0.0_f64;

    for r in returns {
        cumulative *= 1.0 + r;
        if cumulative > peak {
            peak = cumulative;
        }
        if peak > 0.0 {
            let dd = (cumulative - peak) / peak * 100.0;
            if dd < max_dd {
                max_dd = dd;
            }
        }
    }
    max_dd
}

/// Number of trades closed for `reason`.
pub fn count_exits(trades: &[Trade], reason: ExitReason) -> usize {
    trades.iter().filter(|t| t.exit_reason == reason).count()
}

/// Maximum consecutive winning trades.
pub fn max_consecutive_wins(trades: &[Trade]) -> usize {
    max_consecutive(trades, Trade::is_winner)
}

/// Maximum consecutive losing trades.
pub fn max_consecutive_losses(trades: &[Trade]) -> usize {
    max_consecutive(trades, Trade::is_loser)
}

// ─── Helpers ────────────────────────────────────────────────────────

/// Percent change of equity from bar to bar, first bar dropped.
///
/// A step away from exactly zero equity has no defined return and counts as 0.0.
pub fn bar_returns(equity_curve: &[f64]) -> Vec<f64> {
    if equity_curve.len() < 2 {
        return Vec::new();
    }
    equity_curve
        .windows(2)
        .map(|w| {
            if w[0] != 0.0 {
                (w[1] - w[0]) / w[0]
            } else {
                0.0
            }
        })
        .collect()
}

pub(crate) fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub(crate) fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(values);
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

fn max_consecutive(trades: &[Trade], hit: fn(&Trade) -> bool) -> usize {
    let mut max_streak = 0;
    let mut current = 0;

    for trade in trades {
        if hit(trade) {
            current += 1;
            max_streak = max_streak.max(current);
        } else {
            current = 0;
        }
    }
    max_streak
}

/// Serde adapter for floats that may be infinite.
///
/// Finite values stay JSON numbers; infinities become the strings `"inf"` and
/// `"-inf"`.
pub mod infinite_f64 {
    use serde::de::{self, Deserializer};
    use serde::{Deserialize, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_infinite() {
            serializer.serialize_str(if *value > 0.0 { "inf" } else { "-inf" })
        } else {
            serializer.serialize_f64(*value)
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Text(String),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Number(v) => Ok(v),
            Repr::Text(s) => match s.as_str() {
                "inf" | "+inf" | "Infinity" => Ok(f64::INFINITY),
                "-inf" | "-Infinity" => Ok(f64::NEG_INFINITY),
                other => Err(de::Error::custom(format!("invalid float: {other}"))),
            },
        }
    }
}
