//! Property tests for metric invariants.

use crosslab_core::domain::{ExitReason, Trade};
use crosslab_runner::metrics::{bar_returns, max_drawdown_percent, profit_factor};
use crosslab_runner::PerformanceMetrics;
use proptest::prelude::*;

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_pnls() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(prop_oneof![Just(0.0), -500.0..500.0_f64], 1..40)
}

fn trades_from(pnls: &[f64]) -> Vec<Trade> {
    pnls.iter()
        .enumerate()
        .map(|(i, &pnl)| Trade {
            entry_index: i * 2 + 1,
            entry_price: 100.0,
            exit_index: i * 2 + 2,
            exit_price: 100.0 + pnl / 10.0,
            size: 10.0,
            pnl,
            pnl_percent: pnl / 10.0,
            exit_reason: ExitReason::SignalExit,
        })
        .collect()
}

fn equity_from(initial: f64, pnls: &[f64]) -> Vec<f64> {
    let mut equity = vec![initial];
    let mut capital = initial;
    for pnl in pnls {
        equity.push(capital);
        capital += pnl;
        equity.push(capital);
    }
    equity
}

// ── Invariants ───────────────────────────────────────────────────────

proptest! {
    /// +inf exactly when there are winners and no losers.
    #[test]
    fn profit_factor_infinite_iff_no_losers(pnls in arb_pnls()) {
        let trades = trades_from(&pnls);
        let winners = pnls.iter().any(|&p| p > 0.0);
        let losers = pnls.iter().any(|&p| p < 0.0);
        let pf = profit_factor(&trades);
        prop_assert_eq!(pf.is_infinite(), winners && !losers);
        prop_assert!(pf >= 0.0);
    }

    #[test]
    fn counts_partition_trades(pnls in arb_pnls()) {
        let trades = trades_from(&pnls);
        let equity = equity_from(10_000.0, &pnls);
        let m = PerformanceMetrics::compute(&trades, &equity, 10_000.0, 6048.0).unwrap();
        let flat = pnls.iter().filter(|&&p| p == 0.0).count();
        prop_assert_eq!(m.winning_trades + m.losing_trades + flat, m.total_trades);
        prop_assert!((0.0..=100.0).contains(&m.win_rate_percent));
        prop_assert!((m.final_capital - (10_000.0 + m.total_pnl)).abs() < 1e-6);
    }

    #[test]
    fn drawdown_is_non_positive(pnls in arb_pnls()) {
        let equity = equity_from(100_000.0, &pnls);
        let dd = max_drawdown_percent(&bar_returns(&equity));
        prop_assert!(dd <= 0.0);
        prop_assert!(dd >= -100.0);
    }
}
