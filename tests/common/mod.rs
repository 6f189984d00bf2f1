#![allow(dead_code)]

use chrono::NaiveDate;
use statarb::domain::backtest::BacktestConfig;
use statarb::domain::error::StatArbError;
pub use statarb::domain::panel::{Observation, Panel};
use statarb::domain::portfolio::PortfolioConfig;
use statarb::domain::signal::ScoreMethod;
use statarb::ports::data_port::DataPort;
use std::collections::{BTreeMap, HashMap};

pub struct MockDataPort {
    pub data: HashMap<String, Vec<Observation>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_series(mut self, asset: &str, obs: Vec<Observation>) -> Self {
        self.data.insert(asset.to_string(), obs);
        self
    }

    pub fn with_error(mut self, asset: &str, reason: &str) -> Self {
        self.errors.insert(asset.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_series(
        &self,
        asset: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<Observation>, StatArbError> {
        if let Some(reason) = self.errors.get(asset) {
            return Err(StatArbError::Data {
                reason: reason.clone(),
            });
        }
        Ok(self
            .data
            .get(asset)
            .map(|obs| {
                obs.iter()
                    .filter(|o| o.date >= start_date && o.date <= end_date)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn list_assets(&self) -> Result<Vec<String>, StatArbError> {
        let mut assets: Vec<String> = self.data.keys().cloned().collect();
        assets.sort();
        Ok(assets)
    }

    fn get_data_range(
        &self,
        asset: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, StatArbError> {
        match self.data.get(asset) {
            Some(obs) if !obs.is_empty() => {
                let min = obs.iter().map(|o| o.date).min().unwrap();
                let max = obs.iter().map(|o| o.date).max().unwrap();
                Ok(Some((min, max, obs.len())))
            }
            _ => Ok(None),
        }
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn day(i: usize) -> NaiveDate {
    date(2024, 1, 1) + chrono::Duration::days(i as i64)
}

/// One observation per value, on consecutive days from 2024-01-01.
pub fn series(returns: &[f64]) -> Vec<Observation> {
    returns
        .iter()
        .enumerate()
        .map(|(i, &ret)| Observation {
            date: day(i),
            ret,
            volume: 1000.0,
        })
        .collect()
}

/// Constant return every day.
pub fn constant_series(ret: f64, count: usize) -> Vec<Observation> {
    series(&vec![ret; count])
}

pub fn make_panel(assets: &[(&str, Vec<f64>)]) -> Panel {
    let map: BTreeMap<String, Vec<Observation>> = assets
        .iter()
        .map(|(a, r)| (a.to_string(), series(r)))
        .collect();
    Panel::new(map).unwrap()
}

pub fn sample_config() -> BacktestConfig {
    BacktestConfig {
        start_date: date(2024, 1, 1),
        end_date: date(2024, 12, 31),
        assets: vec!["A".into(), "B".into(), "C".into()],
        benchmark: None,
        liquidity_threshold: 0.0,
        momentum_windows: vec![120],
        reversal_windows: vec![],
        score_method: ScoreMethod::Compounded,
        portfolio: PortfolioConfig::default(),
        transaction_cost: 0.0,
        rebalance_every: 1,
        periods_per_year: 365.0,
        risk_free_rate: 0.0,
    }
}

/// Deterministic pseudo-random returns in roughly [-0.05, 0.05].
pub fn noisy_returns(seed: u64, count: usize) -> Vec<f64> {
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    (0..count)
        .map(|_| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            ((state >> 33) as f64 / (1u64 << 31) as f64 - 0.5) * 0.1
        })
        .collect()
}
