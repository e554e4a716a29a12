//! CrossLab CLI — run, sweep, and data generation commands.
//!
//! Commands:
//! - `run` — single EMA crossover backtest from a CSV and/or TOML config
//! - `sweep` — fast/slow period grid search ranked by Sharpe
//! - `generate` — write a seeded synthetic price series as CSV

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};

use crosslab_core::params::{StrategyParams, DAILY_BARS_PER_YEAR};
use crosslab_runner::{
    load_csv, load_synthetic, render_leaderboard, render_report, run_backtest_from_data,
    save_artifacts, save_sweep_csv, write_csv, BacktestConfig, LoadedData, ParamGrid, ParamSweep,
    SyntheticSpec,
};

#[derive(Parser)]
#[command(
    name = "crosslab",
    about = "CrossLab CLI — EMA crossover backtesting"
)]
struct Cli {
    /// Log filter used when CROSSLAB_LOG is unset (e.g. info, crosslab_runner=debug).
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Log output format: text or json.
    #[arg(long, global = true, default_value = "text")]
    log_format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single backtest and print the report.
    Run {
        #[command(flatten)]
        source: SourceArgs,

        /// Path to a TOML config file. Flags below override its values.
        #[arg(long)]
        config: Option<PathBuf>,

        #[command(flatten)]
        overrides: ParamOverrides,

        /// Fast EMA period.
        #[arg(long)]
        fast: Option<usize>,

        /// Slow EMA period.
        #[arg(long)]
        slow: Option<usize>,

        /// Write manifest.json, trades.csv, equity.csv and report.txt here.
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Grid search over fast/slow periods.
    Sweep {
        #[command(flatten)]
        source: SourceArgs,

        /// Path to a TOML config file supplying the non-period parameters.
        #[arg(long)]
        config: Option<PathBuf>,

        #[command(flatten)]
        overrides: ParamOverrides,

        /// Comma-separated fast periods.
        #[arg(long, value_delimiter = ',', default_values_t = ParamGrid::default().fast_periods)]
        fast: Vec<usize>,

        /// Comma-separated slow periods.
        #[arg(long, value_delimiter = ',', default_values_t = ParamGrid::default().slow_periods)]
        slow: Vec<usize>,

        /// Rows shown in the leaderboard.
        #[arg(long, default_value_t = 15)]
        top: usize,

        /// Write the full ranking as CSV.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Run combinations one at a time.
        #[arg(long, default_value_t = false)]
        sequential: bool,
    },
    /// Write a synthetic price series as CSV.
    Generate {
        /// Destination CSV file.
        #[arg(long)]
        output: PathBuf,

        /// Calendar days to generate.
        #[arg(long, default_value_t = 3650)]
        days: usize,

        /// One bar per day instead of one per hour.
        #[arg(long, default_value_t = false)]
        daily: bool,

        #[arg(long, default_value_t = 42)]
        seed: u64,

        #[arg(long, default_value_t = 2000.0)]
        start_price: f64,
    },
}

/// Where price data comes from.
#[derive(Args)]
struct SourceArgs {
    /// OHLCV CSV file. Falls back to the config's [data] path.
    #[arg(long)]
    data: Option<PathBuf>,

    /// Use seeded synthetic hourly data instead of a file.
    #[arg(long, default_value_t = false, conflicts_with = "data")]
    synthetic: bool,

    /// Symbol label for reports.
    #[arg(long)]
    symbol: Option<String>,
}

#[derive(Args)]
struct ParamOverrides {
    #[arg(long)]
    capital: Option<f64>,

    /// Percent of initial capital risked per trade.
    #[arg(long)]
    risk: Option<f64>,

    #[arg(long)]
    stop_loss: Option<f64>,

    #[arg(long)]
    take_profit: Option<f64>,

    /// Sharpe annualisation factor (6048 hourly, 252 daily).
    #[arg(long)]
    bars_per_year: Option<f64>,
}

impl ParamOverrides {
    fn apply(&self, config: &mut BacktestConfig) {
        if let Some(v) = self.capital {
            config.risk.initial_capital = v;
        }
        if let Some(v) = self.risk {
            config.risk.risk_percent = v;
        }
        if let Some(v) = self.stop_loss {
            config.risk.stop_loss_percent = v;
        }
        if let Some(v) = self.take_profit {
            config.risk.take_profit_percent = v;
        }
        if let Some(v) = self.bars_per_year {
            config.metrics.bars_per_year = v;
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level, &cli.log_format)?;

    match cli.command {
        Commands::Run {
            source,
            config,
            overrides,
            fast,
            slow,
            output_dir,
        } => run_cmd(source, config, overrides, fast, slow, output_dir),
        Commands::Sweep {
            source,
            config,
            overrides,
            fast,
            slow,
            top,
            output,
            sequential,
        } => sweep_cmd(
            source,
            config,
            overrides,
            ParamGrid::new(fast, slow),
            top,
            output,
            sequential,
        ),
        Commands::Generate {
            output,
            days,
            daily,
            seed,
            start_price,
        } => generate_cmd(output, days, daily, seed, start_price),
    }
}

/// `CROSSLAB_LOG` wins over `--log-level`.
fn init_tracing(log_level: &str, log_format: &str) -> Result<()> {
    let filter = std::env::var("CROSSLAB_LOG").unwrap_or_else(|_| log_level.to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_new(filter)
        .map_err(|err| anyhow::anyhow!("invalid log filter: {err}"))?;

    match log_format.trim().to_lowercase().as_str() {
        "json" => tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .json()
            .init(),
        "text" => tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init(),
        other => bail!("unknown --log-format '{other}' (expected text or json)"),
    }
    Ok(())
}

fn load_config(path: Option<&PathBuf>) -> Result<BacktestConfig> {
    match path {
        Some(p) => BacktestConfig::from_file(p)
            .with_context(|| format!("loading config {}", p.display())),
        None => Ok(BacktestConfig::default()),
    }
}

fn load_data(source: &SourceArgs, config: &BacktestConfig) -> Result<LoadedData> {
    if source.synthetic {
        return Ok(load_synthetic(&SyntheticSpec::default()));
    }
    let Some(path) = source.data.as_ref().or(config.data.path.as_ref()) else {
        bail!("no price data: pass --data <csv>, --synthetic, or set [data] path in the config");
    };
    load_csv(path).with_context(|| format!("loading prices from {}", path.display()))
}

fn run_cmd(
    source: SourceArgs,
    config_path: Option<PathBuf>,
    overrides: ParamOverrides,
    fast: Option<usize>,
    slow: Option<usize>,
    output_dir: Option<PathBuf>,
) -> Result<()> {
    let mut config = load_config(config_path.as_ref())?;
    overrides.apply(&mut config);
    if let Some(f) = fast {
        config.strategy.fast_period = f;
    }
    if let Some(s) = slow {
        config.strategy.slow_period = s;
    }
    let params = config.to_params()?;

    let data = load_data(&source, &config)?;
    let symbol = source.symbol.as_deref().or(config.data.symbol.as_deref());
    tracing::info!(
        strategy = %params.label(),
        bars = data.bars.len(),
        config_hash = %config.config_hash(),
        "starting backtest"
    );
    let result = run_backtest_from_data(&data, &params, symbol)?;

    print!("{}", render_report(&result));
    if result.has_synthetic {
        println!();
        println!("WARNING: Results based on SYNTHETIC data");
    }

    if let Some(dir) = output_dir {
        let run_dir = save_artifacts(&result, &dir)?;
        println!("Artifacts saved to: {}", run_dir.display());
    }
    Ok(())
}

fn sweep_cmd(
    source: SourceArgs,
    config_path: Option<PathBuf>,
    overrides: ParamOverrides,
    grid: ParamGrid,
    top: usize,
    output: Option<PathBuf>,
    sequential: bool,
) -> Result<()> {
    let mut config = load_config(config_path.as_ref())?;
    overrides.apply(&mut config);
    // Periods come from the grid; only the risk and metrics sections matter here.
    let base = StrategyParams {
        initial_capital: config.risk.initial_capital,
        risk_percent: config.risk.risk_percent,
        stop_loss_percent: config.risk.stop_loss_percent,
        take_profit_percent: config.risk.take_profit_percent,
        bars_per_year: config.metrics.bars_per_year,
        ..StrategyParams::default()
    };

    let data = load_data(&source, &config)?;
    println!(
        "Testing {} combinations over {} bars...",
        grid.size(),
        data.bars.len()
    );

    let results = ParamSweep::new()
        .with_parallelism(!sequential)
        .sweep(&grid, &base, &data);

    if results.is_empty() {
        println!("No parameter combination produced trades.");
    } else {
        print!("{}", render_leaderboard(&results, top));
    }

    if let Some(path) = output {
        save_sweep_csv(&results, &path)?;
        println!("Full results saved to: {}", path.display());
    }
    Ok(())
}

fn generate_cmd(output: PathBuf, days: usize, daily: bool, seed: u64, start_price: f64) -> Result<()> {
    if days == 0 {
        bail!("--days must be at least 1");
    }
    let spec = SyntheticSpec {
        days,
        hourly: !daily,
        seed,
        start_price,
        ..SyntheticSpec::default()
    };
    let data = load_synthetic(&spec);
    write_csv(&output, &data.bars)?;

    println!("Wrote {} bars to {}", data.bars.len(), output.display());
    if daily {
        println!("Use --bars-per-year {DAILY_BARS_PER_YEAR} when backtesting this file.");
    }
    Ok(())
}
