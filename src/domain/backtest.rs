//! Backtest configuration and the end-to-end pipeline.
//!
//! Panel -> scores -> positions -> simulated returns -> report. Each stage
//! produces a new value; nothing upstream is mutated.

use crate::domain::metrics::{PerformanceReport, analyze, analyze_standalone};
use crate::domain::panel::{Panel, ReturnSeries, ReturnTable};
use crate::domain::portfolio::{
    PortfolioConfig, PositionStats, PositionVector, build_position_series,
};
use crate::domain::signal::{ScoreMethod, compute_scores};
use crate::domain::simulation::{StrategyReturnSeries, simulate};
use crate::domain::strategy::StrategyId;
use chrono::NaiveDate;
use std::collections::BTreeSet;

/// Run-wide parameters, passed by reference into every stage.
#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub assets: Vec<String>,
    pub benchmark: Option<String>,
    pub liquidity_threshold: f64,
    pub momentum_windows: Vec<usize>,
    pub reversal_windows: Vec<usize>,
    pub score_method: ScoreMethod,
    pub portfolio: PortfolioConfig,
    /// Cost per unit of turnover.
    pub transaction_cost: f64,
    pub rebalance_every: usize,
    pub periods_per_year: f64,
    pub risk_free_rate: f64,
}

impl BacktestConfig {
    /// Momentum horizons first, then reversal, each in configured order
    /// with repeats removed.
    pub fn strategy_ids(&self) -> Vec<StrategyId> {
        let mut seen = BTreeSet::new();
        self.momentum_windows
            .iter()
            .map(|&h| StrategyId::momentum(h))
            .chain(self.reversal_windows.iter().map(|&h| StrategyId::reversal(h)))
            .filter(|id| seen.insert(*id))
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct StrategyRun {
    pub id: StrategyId,
    pub positions: Vec<PositionVector>,
    pub returns: StrategyReturnSeries,
    pub stats: PositionStats,
    pub report: PerformanceReport,
}

pub fn run_strategy(
    panel: &Panel,
    benchmark: Option<&ReturnSeries>,
    config: &BacktestConfig,
    id: StrategyId,
) -> StrategyRun {
    run_with_returns(panel, &panel.returns_by_date(), benchmark, config, id)
}

/// Every configured strategy, in `strategy_ids` order.
pub fn run_all(
    panel: &Panel,
    benchmark: Option<&ReturnSeries>,
    config: &BacktestConfig,
) -> Vec<StrategyRun> {
    let forward = panel.returns_by_date();
    config
        .strategy_ids()
        .into_iter()
        .map(|id| run_with_returns(panel, &forward, benchmark, config, id))
        .collect()
}

fn run_with_returns(
    panel: &Panel,
    forward: &ReturnTable,
    benchmark: Option<&ReturnSeries>,
    config: &BacktestConfig,
    id: StrategyId,
) -> StrategyRun {
    let scores = compute_scores(panel, &[id.horizon], id.signal_type, config.score_method);
    let positions = scores
        .first()
        .map(|hs| build_position_series(hs, &config.portfolio, config.rebalance_every))
        .unwrap_or_default();

    let returns = simulate(&positions, forward, config.transaction_cost);
    let net = returns.net_returns();
    let report = match benchmark {
        Some(b) => analyze(&net, b, config.periods_per_year, config.risk_free_rate),
        None => analyze_standalone(&net, config.periods_per_year, config.risk_free_rate),
    };
    let stats = PositionStats::compute(&positions);

    tracing::info!(
        strategy = %id.name(),
        periods = returns.len(),
        flagged = returns.flagged().len(),
        degenerate = stats.degenerate_periods,
        "strategy simulated"
    );

    StrategyRun {
        id,
        positions,
        returns,
        stats,
        report,
    }
}
