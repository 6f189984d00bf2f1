//! Realized strategy returns from a position series.
//!
//! The simulator only ever holds the weights decided at the previous step.
//! A period's gross return is the held weights against that period's asset
//! returns; the new target is adopted afterwards, so a decision at t can
//! only earn the return of t+1.

use crate::domain::panel::{ReturnPoint, ReturnSeries, ReturnTable};
use crate::domain::portfolio::PositionVector;
use chrono::NaiveDate;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodStatus {
    Traded,
    /// Target for this period was flat (fewer than two eligible assets).
    Degenerate,
    /// No usable returns for this date; return is 0 and the rebalance is deferred.
    MissingReturns,
}

impl PeriodStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PeriodStatus::Traded => "traded",
            PeriodStatus::Degenerate => "degenerate",
            PeriodStatus::MissingReturns => "missing_returns",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StrategyPeriod {
    pub date: NaiveDate,
    pub gross_return: f64,
    pub turnover: f64,
    pub cost: f64,
    pub net_return: f64,
    pub status: PeriodStatus,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StrategyReturnSeries {
    periods: Vec<StrategyPeriod>,
}

impl StrategyReturnSeries {
    pub fn periods(&self) -> &[StrategyPeriod] {
        &self.periods
    }

    pub fn len(&self) -> usize {
        self.periods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }

    pub fn net_returns(&self) -> ReturnSeries {
        ReturnSeries {
            points: self
                .periods
                .iter()
                .map(|p| ReturnPoint {
                    date: p.date,
                    value: p.net_return,
                })
                .collect(),
        }
    }

    pub fn total_turnover(&self) -> f64 {
        self.periods.iter().map(|p| p.turnover).sum()
    }

    pub fn total_cost(&self) -> f64 {
        self.periods.iter().map(|p| p.cost).sum()
    }

    /// Dates that had no usable returns.
    pub fn flagged(&self) -> Vec<NaiveDate> {
        self.periods
            .iter()
            .filter(|p| p.status == PeriodStatus::MissingReturns)
            .map(|p| p.date)
            .collect()
    }
}

struct Simulator {
    held: BTreeMap<String, f64>,
    cost_per_trade: f64,
}

impl Simulator {
    fn new(cost_per_trade: f64) -> Self {
        Simulator {
            held: BTreeMap::new(),
            cost_per_trade,
        }
    }

    fn step(
        &mut self,
        target: &PositionVector,
        returns: Option<&BTreeMap<String, f64>>,
    ) -> StrategyPeriod {
        let row = returns.filter(|row| {
            self.held
                .iter()
                .filter(|(_, w)| **w != 0.0)
                .all(|(asset, _)| row.get(asset).is_some_and(|r| r.is_finite()))
        });

        let Some(row) = row else {
            tracing::warn!(date = %target.date, "no usable returns, period flagged");
            return StrategyPeriod {
                date: target.date,
                gross_return: 0.0,
                turnover: 0.0,
                cost: 0.0,
                net_return: 0.0,
                status: PeriodStatus::MissingReturns,
            };
        };

        let gross_return = self
            .held
            .iter()
            .filter(|(_, w)| **w != 0.0)
            .fold(0.0, |acc, (asset, w)| acc + w * row[asset]);
        let turnover = target.turnover_from(&self.held);
        let cost = self.cost_per_trade * turnover;
        self.held = target.weights.clone();

        StrategyPeriod {
            date: target.date,
            gross_return,
            turnover,
            cost,
            net_return: gross_return - cost,
            status: if target.degenerate {
                PeriodStatus::Degenerate
            } else {
                PeriodStatus::Traded
            },
        }
    }
}

/// Apply `positions` to `forward_returns`, starting flat.
///
/// Every date in `positions` yields exactly one period, in order.
pub fn simulate(
    positions: &[PositionVector],
    forward_returns: &ReturnTable,
    cost_per_trade: f64,
) -> StrategyReturnSeries {
    let mut sim = Simulator::new(cost_per_trade);
    let periods = positions
        .iter()
        .map(|target| sim.step(target, forward_returns.get(&target.date)))
        .collect();
    StrategyReturnSeries { periods }
}
