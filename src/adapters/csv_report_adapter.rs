//! CSV report adapter implementing ReportPort.
//!
//! Writes `performance_metrics.csv` with one row per strategy and one
//! `<strategy>_returns.csv` per strategy with the per-period breakdown.

use std::fmt::Display;
use std::fs;
use std::path::Path;

use crate::domain::backtest::StrategyRun;
use crate::domain::error::StatArbError;
use crate::ports::report_port::ReportPort;

pub const METRICS_FILE: &str = "performance_metrics.csv";

const METRICS_HEADER: [&str; 20] = [
    "strategy",
    "periods",
    "total_return",
    "annualized_return",
    "annualized_volatility",
    "sharpe_ratio",
    "max_drawdown",
    "win_rate",
    "benchmark_annualized_return",
    "beta",
    "alpha",
    "correlation",
    "total_turnover",
    "total_cost",
    "avg_turnover",
    "mean_long_weight",
    "mean_short_weight",
    "max_concentration",
    "degenerate_periods",
    "flagged_periods",
];

const RETURNS_HEADER: [&str; 7] = [
    "date",
    "gross",
    "turnover",
    "cost",
    "net",
    "status",
    "cumulative",
];

pub struct CsvReportAdapter;

fn report_error(path: &Path, e: impl Display) -> StatArbError {
    StatArbError::Report {
        reason: format!("{}: {}", path.display(), e),
    }
}

pub fn returns_file_name(run: &StrategyRun) -> String {
    format!("{}_returns.csv", run.id.name())
}

fn write_metrics(runs: &[StrategyRun], path: &Path) -> Result<(), StatArbError> {
    let mut wtr = csv::Writer::from_path(path).map_err(|e| report_error(path, e))?;
    wtr.write_record(METRICS_HEADER)
        .map_err(|e| report_error(path, e))?;

    for run in runs {
        let r = &run.report;
        let s = &run.stats;
        wtr.write_record([
            run.id.name(),
            r.periods.to_string(),
            r.total_return.to_string(),
            r.annualized_return.to_string(),
            r.annualized_volatility.to_string(),
            r.sharpe_ratio.to_string(),
            r.max_drawdown.to_string(),
            r.win_rate.to_string(),
            r.benchmark_annualized_return.to_string(),
            r.beta.to_string(),
            r.alpha.to_string(),
            r.correlation.to_string(),
            run.returns.total_turnover().to_string(),
            run.returns.total_cost().to_string(),
            s.avg_turnover.to_string(),
            s.mean_long_weight.to_string(),
            s.mean_short_weight.to_string(),
            s.max_concentration.to_string(),
            s.degenerate_periods.to_string(),
            run.returns.flagged().len().to_string(),
        ])
        .map_err(|e| report_error(path, e))?;
    }

    wtr.flush()?;
    Ok(())
}

fn write_returns(run: &StrategyRun, path: &Path) -> Result<(), StatArbError> {
    let mut wtr = csv::Writer::from_path(path).map_err(|e| report_error(path, e))?;
    wtr.write_record(RETURNS_HEADER)
        .map_err(|e| report_error(path, e))?;

    let mut equity = 1.0;
    for p in run.returns.periods() {
        equity *= 1.0 + p.net_return;
        wtr.write_record([
            p.date.format("%Y-%m-%d").to_string(),
            p.gross_return.to_string(),
            p.turnover.to_string(),
            p.cost.to_string(),
            p.net_return.to_string(),
            p.status.as_str().to_string(),
            equity.to_string(),
        ])
        .map_err(|e| report_error(path, e))?;
    }

    wtr.flush()?;
    Ok(())
}

impl ReportPort for CsvReportAdapter {
    fn write(&self, runs: &[StrategyRun], output_dir: &Path) -> Result<(), StatArbError> {
        fs::create_dir_all(output_dir)?;

        write_metrics(runs, &output_dir.join(METRICS_FILE))?;
        for run in runs {
            write_returns(run, &output_dir.join(returns_file_name(run)))?;
        }

        tracing::info!(
            dir = %output_dir.display(),
            strategies = runs.len(),
            "report written"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::backtest::{BacktestConfig, run_all};
    use crate::domain::panel::{Observation, Panel};
    use crate::domain::portfolio::PortfolioConfig;
    use crate::domain::signal::ScoreMethod;
    use chrono::NaiveDate;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn sample_runs() -> Vec<StrategyRun> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let mut series = BTreeMap::new();
        for (asset, drift) in [("A", 0.02), ("B", 0.0), ("C", -0.01)] {
            let obs = (0..8)
                .map(|i| Observation {
                    date: start + chrono::Duration::days(i),
                    ret: drift + 0.001 * i as f64,
                    volume: 1.0,
                })
                .collect();
            series.insert(asset.to_string(), obs);
        }
        let panel = Panel::new(series).unwrap();
        let config = BacktestConfig {
            start_date: start,
            end_date: start + chrono::Duration::days(7),
            assets: vec!["A".into(), "B".into(), "C".into()],
            benchmark: None,
            liquidity_threshold: 0.0,
            momentum_windows: vec![2],
            reversal_windows: vec![1],
            score_method: ScoreMethod::Compounded,
            portfolio: PortfolioConfig::default(),
            transaction_cost: 0.001,
            rebalance_every: 1,
            periods_per_year: 365.0,
            risk_free_rate: 0.0,
        };
        run_all(&panel, None, &config)
    }

    #[test]
    fn writes_metrics_and_returns_files() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("results");
        let runs = sample_runs();

        CsvReportAdapter.write(&runs, &out).unwrap();

        let metrics = fs::read_to_string(out.join(METRICS_FILE)).unwrap();
        let lines: Vec<&str> = metrics.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("strategy,periods,total_return"));
        assert!(lines[1].starts_with("mom_2d,7,"));
        assert!(lines[2].starts_with("rev_1d,8,"));

        let returns = fs::read_to_string(out.join("mom_2d_returns.csv")).unwrap();
        let lines: Vec<&str> = returns.lines().collect();
        assert_eq!(lines[0], "date,gross,turnover,cost,net,status,cumulative");
        assert_eq!(lines.len(), 8);
        let first: Vec<&str> = lines[1].split(',').collect();
        assert_eq!(first[0], "2024-01-02");
        assert_eq!(first[2], "1");
        assert_eq!(first[3], "0.001");
        assert_eq!(first[5], "traded");
        let cumulative: f64 = first[6].parse().unwrap();
        assert!((cumulative - 0.999).abs() < 1e-12);
    }

    #[test]
    fn empty_run_list_writes_header_only() {
        let dir = TempDir::new().unwrap();
        CsvReportAdapter.write(&[], dir.path()).unwrap();
        let metrics = fs::read_to_string(dir.path().join(METRICS_FILE)).unwrap();
        assert_eq!(metrics.lines().count(), 1);
    }

    #[test]
    fn unwritable_output_is_error() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "x").unwrap();
        assert!(CsvReportAdapter.write(&sample_runs(), &blocker).is_err());
    }
}
