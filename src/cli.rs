//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{BacktestConfig, StrategyRun, run_all};
use crate::domain::config_validation::{
    DEFAULT_MOMENTUM_WINDOWS, DEFAULT_REVERSAL_WINDOWS, parse_date, validate_backtest_config,
    windows_or_default,
};
use crate::domain::error::StatArbError;
use crate::domain::portfolio::{PortfolioConfig, WeightingScheme};
use crate::domain::signal::ScoreMethod;
use crate::domain::universe::{
    SkipReason, filter_by_liquidity, load_benchmark, load_universe, parse_assets,
};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

pub const DEFAULT_OUTPUT_DIR: &str = "results";

#[derive(Parser, Debug)]
#[command(name = "statarb", about = "Cross-sectional momentum and reversal backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run every configured strategy and write the report
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Validate config and load data without simulating
        #[arg(long)]
        dry_run: bool,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show data range for each configured asset
    Info {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List assets available in the data directory
    ListAssets {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            output,
            dry_run,
        } => {
            if dry_run {
                run_dry_run(&config)
            } else {
                run_backtest(&config, output.as_deref())
            }
        }
        Command::Validate { config } => run_validate(&config),
        Command::Info { config } => run_info(&config),
        Command::ListAssets { config } => run_list_assets(&config),
    }
}

fn fail(err: &StatArbError) -> ExitCode {
    eprintln!("error: {err}");
    err.into()
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, StatArbError> {
    FileConfigAdapter::from_file(path).map_err(|e| StatArbError::ConfigParse {
        file: path.display().to_string(),
        reason: e.to_string(),
    })
}

/// Validate `adapter` and assemble the run-wide configuration.
pub fn build_backtest_config(adapter: &dyn ConfigPort) -> Result<BacktestConfig, StatArbError> {
    validate_backtest_config(adapter)?;

    let start_date = parse_date(
        adapter.get_string("backtest", "start_date").as_deref(),
        "start_date",
    )?;
    let end_date = parse_date(
        adapter.get_string("backtest", "end_date").as_deref(),
        "end_date",
    )?;

    let assets = parse_assets(&adapter.get_string("backtest", "assets").unwrap_or_default())
        .map_err(|e| StatArbError::ConfigInvalid {
            section: "backtest".into(),
            key: "assets".into(),
            reason: e.to_string(),
        })?;

    let benchmark = adapter
        .get_string("backtest", "benchmark")
        .map(|b| b.trim().to_uppercase())
        .filter(|b| !b.is_empty());

    let score_method = match adapter.get_string("signals", "score_method") {
        Some(s) => s.parse::<ScoreMethod>().map_err(|reason| StatArbError::ConfigInvalid {
            section: "signals".into(),
            key: "score_method".into(),
            reason,
        })?,
        None => ScoreMethod::default(),
    };

    let weighting = match adapter.get_string("portfolio", "weighting") {
        Some(s) => s
            .parse::<WeightingScheme>()
            .map_err(|reason| StatArbError::ConfigInvalid {
                section: "portfolio".into(),
                key: "weighting".into(),
                reason,
            })?,
        None => WeightingScheme::default(),
    };

    let max_per_side = match adapter.get_int("portfolio", "max_per_side", 0) {
        k if k > 0 => Some(k as usize),
        _ => None,
    };

    Ok(BacktestConfig {
        start_date,
        end_date,
        assets,
        benchmark,
        liquidity_threshold: adapter.get_double("backtest", "liquidity_threshold", 0.0),
        momentum_windows: windows_or_default(adapter, "momentum_windows", DEFAULT_MOMENTUM_WINDOWS)?,
        reversal_windows: windows_or_default(adapter, "reversal_windows", DEFAULT_REVERSAL_WINDOWS)?,
        score_method,
        portfolio: PortfolioConfig {
            gross_exposure: adapter.get_double("portfolio", "gross_exposure", 1.0),
            max_per_side,
            weighting,
        },
        transaction_cost: adapter.get_double("backtest", "transaction_cost", 0.0005),
        rebalance_every: adapter.get_int("backtest", "rebalance_every", 1).max(1) as usize,
        periods_per_year: adapter.get_double("backtest", "periods_per_year", 365.0),
        risk_free_rate: adapter.get_double("backtest", "risk_free_rate", 0.0),
    })
}

fn data_adapter(adapter: &dyn ConfigPort) -> Result<CsvAdapter, StatArbError> {
    adapter
        .get_string("data", "dir")
        .filter(|d| !d.trim().is_empty())
        .map(|d| CsvAdapter::new(PathBuf::from(d.trim())))
        .ok_or_else(|| StatArbError::ConfigMissing {
            section: "data".into(),
            key: "dir".into(),
        })
}

/// `--output` wins over `[report] output_dir`, which wins over the default.
pub fn resolve_output_dir(output_override: Option<&Path>, config: &dyn ConfigPort) -> PathBuf {
    if let Some(p) = output_override {
        return p.to_path_buf();
    }
    config
        .get_string("report", "output_dir")
        .filter(|d| !d.trim().is_empty())
        .map(|d| PathBuf::from(d.trim()))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR))
}

fn run_backtest(config_path: &Path, output_override: Option<&Path>) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(e) => return fail(&e),
    };

    let bt_config = match build_backtest_config(&adapter) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };

    let data_port = match data_adapter(&adapter) {
        Ok(d) => d,
        Err(e) => return fail(&e),
    };

    let output_dir = resolve_output_dir(output_override, &adapter);

    match run_backtest_pipeline(&data_port, &CsvReportAdapter, &bt_config, &output_dir) {
        Ok(runs) => {
            print_summary(&runs);
            eprintln!("\nReport written to: {}", output_dir.display());
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e),
    }
}

/// Load, filter, simulate every strategy and write the report.
pub fn run_backtest_pipeline(
    data_port: &dyn DataPort,
    report_port: &dyn ReportPort,
    bt_config: &BacktestConfig,
    output_dir: &Path,
) -> Result<Vec<StrategyRun>, StatArbError> {
    let loaded = load_universe(
        data_port,
        &bt_config.assets,
        bt_config.start_date,
        bt_config.end_date,
    )?;
    let filtered = filter_by_liquidity(&loaded.panel, bt_config.liquidity_threshold)?;
    let panel = filtered.panel;

    let benchmark = match &bt_config.benchmark {
        Some(asset) => Some(load_benchmark(
            data_port,
            asset,
            bt_config.start_date,
            bt_config.end_date,
        )?),
        None => None,
    };

    eprintln!(
        "Running backtest: {} assets, {} dates, {} to {}",
        panel.asset_count(),
        panel.len(),
        bt_config.start_date,
        bt_config.end_date,
    );
    let skipped = loaded.skipped.len() + filtered.skipped.len();
    if skipped > 0 {
        eprintln!("  Skipped: {} assets", skipped);
    }

    let runs = run_all(&panel, benchmark.as_ref(), bt_config);
    report_port.write(&runs, output_dir)?;
    Ok(runs)
}

fn fmt_pct(value: f64) -> String {
    if value.is_finite() {
        format!("{:.2}%", value * 100.0)
    } else {
        "n/a".to_string()
    }
}

fn fmt_num(value: f64) -> String {
    if value.is_finite() {
        format!("{:.2}", value)
    } else {
        "n/a".to_string()
    }
}

pub fn print_summary(runs: &[StrategyRun]) {
    eprintln!("\n=== Strategy Results ===");
    eprintln!(
        "{:<10} {:>8} {:>10} {:>10} {:>8} {:>10} {:>8} {:>10}",
        "strategy", "periods", "ann.ret", "ann.vol", "sharpe", "max.dd", "beta", "turnover"
    );
    for run in runs {
        let r = &run.report;
        eprintln!(
            "{:<10} {:>8} {:>10} {:>10} {:>8} {:>10} {:>8} {:>10}",
            run.id.name(),
            r.periods,
            fmt_pct(r.annualized_return),
            fmt_pct(r.annualized_volatility),
            fmt_num(r.sharpe_ratio),
            fmt_pct(r.max_drawdown),
            fmt_num(r.beta),
            fmt_num(run.stats.avg_turnover),
        );
    }

    let flagged: Vec<_> = runs
        .iter()
        .filter(|run| !run.returns.flagged().is_empty())
        .collect();
    if !flagged.is_empty() {
        eprintln!("\n=== Flagged Periods ===");
        for run in flagged {
            eprintln!(
                "  {}: {} periods without returns",
                run.id.name(),
                run.returns.flagged().len()
            );
        }
    }
}

pub fn run_dry_run(config_path: &Path) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(e) => return fail(&e),
    };

    let bt_config = match build_backtest_config(&adapter) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };
    eprintln!("Config validated successfully");
    print_plan(&bt_config);

    let data_port = match data_adapter(&adapter) {
        Ok(d) => d,
        Err(e) => return fail(&e),
    };

    let loaded = match load_universe(
        &data_port,
        &bt_config.assets,
        bt_config.start_date,
        bt_config.end_date,
    ) {
        Ok(l) => l,
        Err(e) => return fail(&e),
    };
    let filtered = match filter_by_liquidity(&loaded.panel, bt_config.liquidity_threshold) {
        Ok(f) => f,
        Err(e) => return fail(&e),
    };

    eprintln!("\nUniverse:");
    eprintln!("  tradable: {}", filtered.panel.assets().join(", "));
    for s in loaded.skipped.iter().chain(&filtered.skipped) {
        match s.reason {
            SkipReason::NoData => eprintln!("  skipped:  {} (no data)", s.asset),
            SkipReason::Illiquid { active_share } => eprintln!(
                "  skipped:  {} (active {:.1}%)",
                s.asset,
                active_share * 100.0
            ),
        }
    }
    eprintln!("  dates:    {}", filtered.panel.len());

    eprintln!("\nDry run complete: configuration is valid");
    ExitCode::SUCCESS
}

fn print_plan(bt_config: &BacktestConfig) {
    eprintln!("\nBacktest:");
    eprintln!("  period:     {} to {}", bt_config.start_date, bt_config.end_date);
    eprintln!("  assets:     {}", bt_config.assets.join(", "));
    eprintln!(
        "  benchmark:  {}",
        bt_config.benchmark.as_deref().unwrap_or("none")
    );
    eprintln!("  cost:       {}", bt_config.transaction_cost);
    eprintln!("  rebalance:  every {} periods", bt_config.rebalance_every);

    eprintln!("\nStrategies:");
    for id in bt_config.strategy_ids() {
        eprintln!("  {} ({})", id.name(), id);
    }
}

fn run_validate(config_path: &Path) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(e) => return fail(&e),
    };

    match build_backtest_config(&adapter) {
        Ok(bt_config) => {
            print_plan(&bt_config);
            eprintln!("\nConfiguration is valid.");
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e),
    }
}

fn run_info(config_path: &Path) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(e) => return fail(&e),
    };
    let data_port = match data_adapter(&adapter) {
        Ok(d) => d,
        Err(e) => return fail(&e),
    };

    let mut assets = match adapter.get_string("backtest", "assets") {
        Some(s) => match parse_assets(&s) {
            Ok(a) => a,
            Err(e) => {
                eprintln!("error: failed to parse assets: {e}");
                return ExitCode::from(2);
            }
        },
        None => match data_port.list_assets() {
            Ok(a) => a,
            Err(e) => return fail(&e),
        },
    };
    if let Some(b) = adapter.get_string("backtest", "benchmark") {
        let b = b.trim().to_uppercase();
        if !b.is_empty() && !assets.contains(&b) {
            assets.push(b);
        }
    }

    for asset in &assets {
        match data_port.get_data_range(asset) {
            Ok(Some((min_date, max_date, count))) => {
                println!("{}: {} rows, {} to {}", asset, count, min_date, max_date);
            }
            Ok(None) => {
                eprintln!("{}: no data found", asset);
            }
            Err(e) => {
                eprintln!("error reading {}: {}", asset, e);
            }
        }
    }
    ExitCode::SUCCESS
}

fn run_list_assets(config_path: &Path) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(e) => return fail(&e),
    };
    let data_port = match data_adapter(&adapter) {
        Ok(d) => d,
        Err(e) => return fail(&e),
    };

    let assets = match data_port.list_assets() {
        Ok(a) => a,
        Err(e) => return fail(&e),
    };

    if assets.is_empty() {
        eprintln!("No assets found");
    } else {
        for asset in &assets {
            println!("{}", asset);
        }
        eprintln!("{} assets found", assets.len());
    }
    ExitCode::SUCCESS
}
