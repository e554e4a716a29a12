//! Plain-text reports for terminal output.
//!
//! Numbers are rounded to two decimals here and only here. Stored results
//! keep full precision.

use std::fmt::Write as _;

use crate::metrics::format_ratio;
use crate::runner::BacktestResult;
use crate::sweep::SweepResults;

const WIDE: usize = 60;
const LEADERBOARD_WIDE: usize = 80;

/// Trades listed in the single-run report.
pub const SAMPLE_TRADES: usize = 10;

/// Render the single-run report.
pub fn render_report(result: &BacktestResult) -> String {
    let mut out = String::with_capacity(2048);
    let heavy = "=".repeat(WIDE);
    let light = "-".repeat(WIDE);

    let _ = writeln!(out, "{heavy}");
    let _ = writeln!(out, "BACKTEST REPORT");
    let _ = writeln!(out, "{heavy}");
    let _ = writeln!(out);
    let _ = writeln!(out, "Strategy: {}", result.params.label());
    if let Some(symbol) = &result.symbol {
        let _ = writeln!(out, "Symbol: {symbol}");
    }
    let _ = writeln!(out, "Data Points: {}", result.bar_count);
    let _ = writeln!(
        out,
        "Period: {} to {}",
        result.start.date(),
        result.end.date()
    );
    let _ = writeln!(
        out,
        "Signals: {} buy / {} sell ({} during warm-up)",
        result.buy_signals, result.sell_signals, result.warmup_crossovers
    );
    let _ = writeln!(
        out,
        "Trend: {} entries / {} exits after warm-up",
        result.trend_entries, result.trend_exits
    );
    if result.has_synthetic {
        let _ = writeln!(out, "Data: SYNTHETIC");
    }

    let Some(m) = &result.metrics else {
        let _ = writeln!(out);
        let _ = writeln!(out, "No trades executed!");
        write_open_position(&mut out, result);
        return out;
    };

    section(&mut out, &light, "TRADE STATISTICS");
    let _ = writeln!(out, "Total Trades:        {}", m.total_trades);
    let _ = writeln!(out, "Winning Trades:      {}", m.winning_trades);
    let _ = writeln!(out, "Losing Trades:       {}", m.losing_trades);
    let _ = writeln!(out, "Win Rate:            {:.2}%", m.win_rate_percent);
    let _ = writeln!(
        out,
        "Exits (SL/TP/Sig):   {}/{}/{}",
        m.stop_loss_exits, m.take_profit_exits, m.signal_exits
    );

    section(&mut out, &light, "P&L METRICS");
    let _ = writeln!(out, "Total P&L:           {}", format_money(m.total_pnl));
    let _ = writeln!(out, "Average Win:         {}", format_money(m.avg_win));
    let _ = writeln!(out, "Average Loss:        {}", format_money(m.avg_loss));
    let _ = writeln!(out, "Profit Factor:       {}", m.profit_factor_display());

    section(&mut out, &light, "RETURN METRICS");
    let _ = writeln!(out, "Initial Capital:     {}", format_money(m.initial_capital));
    let _ = writeln!(out, "Final Capital:       {}", format_money(m.final_capital));
    let _ = writeln!(out, "Total Return:        {:.2}%", m.total_return_percent);
    let _ = writeln!(out, "Sharpe Ratio:        {:.2}", m.sharpe_ratio);
    let _ = writeln!(out, "Max Drawdown:        {:.2}%", m.max_drawdown_percent);

    let _ = writeln!(out);
    let _ = writeln!(out, "{heavy}");
    let _ = writeln!(out, "SAMPLE TRADES (First {SAMPLE_TRADES})");
    let _ = writeln!(out, "{heavy}");
    let _ = writeln!(
        out,
        "{:>5} {:>6} {:>12} {:>12} {:>12} {:>8}  {}",
        "entry", "exit", "entry_price", "exit_price", "pnl", "pnl_%", "reason"
    );
    for t in result.trades.iter().take(SAMPLE_TRADES) {
        let _ = writeln!(
            out,
            "{:>5} {:>6} {:>12.2} {:>12.2} {:>12.2} {:>8.2}  {}",
            t.entry_index, t.exit_index, t.entry_price, t.exit_price, t.pnl, t.pnl_percent, t.exit_reason
        );
    }

    write_open_position(&mut out, result);
    out
}

fn write_open_position(out: &mut String, result: &BacktestResult) {
    if let Some(pos) = &result.open_position {
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "Open position: entered bar {} at {:.2}, size {:.4} (not closed)",
            pos.entry_index, pos.entry_price, pos.size
        );
    }
}

fn section(out: &mut String, rule: &str, title: &str) {
    let _ = writeln!(out);
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "{title}");
    let _ = writeln!(out, "{rule}");
}

/// Render the top `top_n` sweep entries and a short summary.
pub fn render_leaderboard(results: &SweepResults, top_n: usize) -> String {
    let mut out = String::with_capacity(4096);
    let heavy = "=".repeat(LEADERBOARD_WIDE);

    let _ = writeln!(out, "{heavy}");
    let _ = writeln!(
        out,
        "TOP {top_n} PARAMETER COMBINATIONS (Ranked by Sharpe Ratio)"
    );
    let _ = writeln!(out, "{heavy}");
    let _ = writeln!(
        out,
        "{:>4} {:>5} {:>5} {:>7} {:>8} {:>8} {:>12} {:>9} {:>9} {:>7}",
        "rank", "fast", "slow", "trades", "win_%", "sharpe", "pnl", "return_%", "max_dd_%", "pf"
    );
    for (i, e) in results.top_n(top_n).iter().enumerate() {
        let m = &e.metrics;
        let _ = writeln!(
            out,
            "{:>4} {:>5} {:>5} {:>7} {:>8.2} {:>8.2} {:>12.2} {:>9.2} {:>9.2} {:>7}",
            i + 1,
            e.fast_period(),
            e.slow_period(),
            m.total_trades,
            m.win_rate_percent,
            m.sharpe_ratio,
            m.total_pnl,
            m.total_return_percent,
            m.max_drawdown_percent,
            format_ratio(m.profit_factor)
        );
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "{heavy}");
    let _ = writeln!(out, "OPTIMIZATION SUMMARY");
    let _ = writeln!(out, "{heavy}");
    let _ = writeln!(
        out,
        "Combinations: {} total, {} ranked, {} without trades, {} rejected, {} failed",
        results.total_combinations,
        results.len(),
        results.no_trades,
        results.rejected,
        results.failed
    );

    let ranked = results.ranked();
    if let Some(best) = results.best() {
        let mean_sharpe =
            ranked.iter().map(|e| e.metrics.sharpe_ratio).sum::<f64>() / ranked.len() as f64;
        let best_win = ranked
            .iter()
            .map(|e| e.metrics.win_rate_percent)
            .fold(f64::NEG_INFINITY, f64::max);
        let best_return = ranked
            .iter()
            .map(|e| e.metrics.total_return_percent)
            .fold(f64::NEG_INFINITY, f64::max);

        let _ = writeln!(out, "Best Sharpe Ratio: {:.2}", best.metrics.sharpe_ratio);
        let _ = writeln!(out, "Average Sharpe Ratio: {mean_sharpe:.2}");
        let _ = writeln!(out, "Best Win Rate: {best_win:.2}%");
        let _ = writeln!(out, "Best Return: {best_return:.2}%");
        let _ = writeln!(out);
        let _ = writeln!(out, "Recommended EMA periods:");
        let _ = writeln!(out, "  Fast EMA: {}", best.fast_period());
        let _ = writeln!(out, "  Slow EMA: {}", best.slow_period());
    } else {
        let _ = writeln!(out, "No combination produced trades.");
    }
    out
}

/// `$1,234.56` style formatting. Negative values render as `$-1,234.56`.
pub fn format_money(value: f64) -> String {
    if !value.is_finite() {
        return format!("${value}");
    }
    let text = format!("{:.2}", value.abs());
    let (int_part, frac) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 && text != "0.00" { "-" } else { "" };
    format!("${sign}{grouped}.{frac}")
}
