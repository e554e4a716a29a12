//! Export — JSON manifests, CSV tables, and on-disk artifact bundles.
//!
//! All persisted JSON includes a `schema_version` field. Newer versions are
//! rejected on load. Infinite profit factors are written as `inf` in both
//! CSV and JSON.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use crosslab_core::domain::Trade;

use crate::metrics::format_ratio;
use crate::report::render_report;
use crate::runner::{BacktestResult, SCHEMA_VERSION};
use crate::sweep::SweepResults;

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `BacktestResult` to pretty JSON.
pub fn export_json(result: &BacktestResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize BacktestResult to JSON")
}

/// Deserialize a `BacktestResult` from JSON, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<BacktestResult> {
    let result: BacktestResult =
        serde_json::from_str(json).context("failed to deserialize BacktestResult from JSON")?;
    if result.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            result.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(result)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Export a trade list as CSV.
///
/// Columns: entry_index, entry_price, exit_index, exit_price, size, pnl,
/// pnl_percent, bars_held, exit_reason
pub fn export_trades_csv(trades: &[Trade]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "entry_index",
        "entry_price",
        "exit_index",
        "exit_price",
        "size",
        "pnl",
        "pnl_percent",
        "bars_held",
        "exit_reason",
    ])?;

    for t in trades {
        wtr.write_record([
            &t.entry_index.to_string(),
            &format!("{:.6}", t.entry_price),
            &t.exit_index.to_string(),
            &format!("{:.6}", t.exit_price),
            &format!("{:.6}", t.size),
            &format!("{:.2}", t.pnl),
            &format!("{:.4}", t.pnl_percent),
            &t.bars_held().to_string(),
            t.exit_reason.label(),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Export an equity curve as CSV with bar_index, timestamp and equity columns.
///
/// The timestamp column is left empty past the end of `timestamps`.
pub fn export_equity_csv(
    equity_curve: &[f64],
    timestamps: &[chrono::NaiveDateTime],
) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["bar_index", "timestamp", "equity"])?;
    for (i, eq) in equity_curve.iter().enumerate() {
        let ts = timestamps
            .get(i)
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default();
        wtr.write_record([&i.to_string(), &ts, &format!("{:.2}", eq)])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Export ranked sweep entries as CSV, best first.
pub fn export_sweep_csv(results: &SweepResults) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "rank",
        "fast_ema",
        "slow_ema",
        "total_trades",
        "winning_trades",
        "losing_trades",
        "win_rate_percent",
        "total_pnl",
        "avg_win",
        "avg_loss",
        "profit_factor",
        "final_capital",
        "total_return_percent",
        "sharpe_ratio",
        "max_drawdown_percent",
    ])?;
    for (i, e) in results.ranked().iter().enumerate() {
        let m = &e.metrics;
        wtr.write_record([
            &(i + 1).to_string(),
            &e.fast_period().to_string(),
            &e.slow_period().to_string(),
            &m.total_trades.to_string(),
            &m.winning_trades.to_string(),
            &m.losing_trades.to_string(),
            &format!("{:.2}", m.win_rate_percent),
            &format!("{:.2}", m.total_pnl),
            &format!("{:.2}", m.avg_win),
            &format!("{:.2}", m.avg_loss),
            &format_ratio(m.profit_factor),
            &format!("{:.2}", m.final_capital),
            &format!("{:.2}", m.total_return_percent),
            &format!("{:.4}", m.sharpe_ratio),
            &format!("{:.2}", m.max_drawdown_percent),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Write the sweep CSV to `path`, creating parent directories.
pub fn save_sweep_csv(results: &SweepResults, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let csv = export_sweep_csv(results)?;
    std::fs::write(path, csv).with_context(|| format!("failed to write {}", path.display()))
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the full artifact set for a single backtest run.
///
/// Creates a directory named `{symbol}_ema{fast}_{slow}_{timestamp}/` under
/// `output_dir` containing:
/// - `manifest.json` — the full `BacktestResult`
/// - `trades.csv` — closed trades
/// - `equity.csv` — bar-by-bar realized equity
/// - `report.txt` — the text report
///
/// Returns the path to the created directory.
pub fn save_artifacts(result: &BacktestResult, output_dir: &Path) -> Result<PathBuf> {
    let dirname = format!(
        "{}_ema{}_{}_{}",
        result.symbol.as_deref().unwrap_or("run"),
        result.params.fast_period,
        result.params.slow_period,
        chrono::Local::now().format("%Y%m%d_%H%M%S")
    );
    let run_dir = output_dir.join(dirname);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    let json = export_json(result)?;
    std::fs::write(run_dir.join("manifest.json"), &json)?;

    let trades_csv = export_trades_csv(&result.trades)?;
    std::fs::write(run_dir.join("trades.csv"), &trades_csv)?;

    let equity_csv = export_equity_csv(&result.equity_curve, &result.timestamps)?;
    std::fs::write(run_dir.join("equity.csv"), &equity_csv)?;

    std::fs::write(run_dir.join("report.txt"), render_report(result))?;

    tracing::info!(dir = %run_dir.display(), "saved artifacts");
    Ok(run_dir)
}

/// Load a `BacktestResult` from an artifact directory's manifest.json.
///
/// Rejects unknown schema versions.
pub fn load_artifacts(dir: &Path) -> Result<BacktestResult> {
    let manifest_path = dir.join("manifest.json");
    let json = std::fs::read_to_string(&manifest_path)
        .with_context(|| format!("failed to read {}", manifest_path.display()))?;
    import_json(&json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crosslab_core::domain::ExitReason;

    fn trade(pnl: f64, reason: ExitReason) -> Trade {
        Trade {
            entry_index: 3,
            entry_price: 100.0,
            exit_index: 8,
            exit_price: 100.0 + pnl / 10.0,
            size: 10.0,
            pnl,
            pnl_percent: pnl / 10.0,
            exit_reason: reason,
        }
    }

    #[test]
    fn trades_csv_has_header_and_rows() {
        let csv = export_trades_csv(&[
            trade(50.0, ExitReason::TakeProfit),
            trade(-20.0, ExitReason::StopLoss),
        ])
        .unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("entry_index,entry_price"));
        assert!(lines[1].ends_with("Take Profit"));
        assert!(lines[2].contains(",-20.00,"));
        assert!(lines[2].contains(",5,Stop Loss"));
    }

    #[test]
    fn equity_csv_includes_timestamps() {
        let ts = chrono::NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(5, 0, 0)
            .unwrap();
        let csv = export_equity_csv(&[10_000.0, 10_050.5], &[ts]).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "bar_index,timestamp,equity");
        assert_eq!(lines[1], "0,2024-01-02 05:00:00,10000.00");
        assert_eq!(lines[2], "1,,10050.50");
    }

    #[test]
    fn import_rejects_newer_schema() {
        let bars = crate::data_loader::generate_synthetic_bars(&crate::data_loader::SyntheticSpec {
            days: 3,
            ..Default::default()
        });
        let result =
            crate::runner::run_backtest(&bars, &crosslab_core::params::StrategyParams::default())
                .unwrap();
        let json = export_json(&result).unwrap();
        let back = import_json(&json).unwrap();
        assert_eq!(back.bar_count, result.bar_count);
        assert_eq!(back.dataset_hash, result.dataset_hash);
        assert_eq!(back.trades.len(), result.trades.len());

        let newer = json.replacen(
            &format!("\"schema_version\": {SCHEMA_VERSION}"),
            &format!("\"schema_version\": {}", SCHEMA_VERSION + 1),
            1,
        );
        assert!(import_json(&newer).is_err());
    }
}
