//! Asset universe: parsing, loading and the liquidity pre-filter.
//!
//! Assets that cannot be loaded are skipped with a warning. Assets that load
//! but disagree on dates are a hard error from [`Panel::new`].

use crate::domain::error::StatArbError;
use crate::domain::panel::{Panel, ReturnPoint, ReturnSeries};
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Clone, thiserror::Error)]
pub enum UniverseError {
    #[error("empty token in asset list")]
    EmptyToken,

    #[error("duplicate asset: {0}")]
    DuplicateAsset(String),
}

pub fn parse_assets(input: &str) -> Result<Vec<String>, UniverseError> {
    let mut assets = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        let asset = trimmed.to_uppercase();
        if !seen.insert(asset.clone()) {
            return Err(UniverseError::DuplicateAsset(asset));
        }
        assets.push(asset);
    }

    Ok(assets)
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedAsset {
    pub asset: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    NoData,
    /// Share of periods with non-zero volume fell below the threshold.
    Illiquid { active_share: f64 },
}

#[derive(Debug, Clone)]
pub struct UniverseLoad {
    pub panel: Panel,
    pub skipped: Vec<SkippedAsset>,
}

/// Fetch each asset and build a panel from those that returned data.
pub fn load_universe(
    data_port: &dyn DataPort,
    assets: &[String],
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<UniverseLoad, StatArbError> {
    let mut series = BTreeMap::new();
    let mut skipped = Vec::new();

    for asset in assets {
        match data_port.fetch_series(asset, start_date, end_date) {
            Ok(obs) if !obs.is_empty() => {
                tracing::debug!(asset = %asset, rows = obs.len(), "loaded");
                series.insert(asset.clone(), obs);
            }
            Ok(_) => {
                tracing::warn!(asset = %asset, "skipping, no data in range");
                skipped.push(SkippedAsset {
                    asset: asset.clone(),
                    reason: SkipReason::NoData,
                });
            }
            Err(e) => {
                tracing::warn!(asset = %asset, error = %e, "skipping");
                skipped.push(SkippedAsset {
                    asset: asset.clone(),
                    reason: SkipReason::NoData,
                });
            }
        }
    }

    if series.is_empty() {
        return Err(StatArbError::InsufficientData {
            asset: "all".to_string(),
            observations: 0,
            minimum: 1,
        });
    }

    Ok(UniverseLoad {
        panel: Panel::new(series)?,
        skipped,
    })
}

/// Benchmark returns for `asset`; need not share the panel's dates.
pub fn load_benchmark(
    data_port: &dyn DataPort,
    asset: &str,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<ReturnSeries, StatArbError> {
    let obs = data_port.fetch_series(asset, start_date, end_date)?;
    if obs.is_empty() {
        return Err(StatArbError::NoData {
            asset: asset.to_string(),
        });
    }
    Ok(ReturnSeries::new(
        obs.into_iter()
            .map(|o| ReturnPoint {
                date: o.date,
                value: o.ret,
            })
            .collect(),
    ))
}

/// Keep assets whose share of non-zero-volume periods is at least `threshold`.
pub fn filter_by_liquidity(panel: &Panel, threshold: f64) -> Result<UniverseLoad, StatArbError> {
    let mut keep = Vec::new();
    let mut skipped = Vec::new();

    for asset in panel.assets() {
        let volumes = panel.volumes(&asset).unwrap_or_default();
        let active = volumes.iter().filter(|&&v| v != 0.0).count();
        let active_share = if volumes.is_empty() {
            0.0
        } else {
            active as f64 / volumes.len() as f64
        };

        if active_share >= threshold {
            keep.push(asset);
        } else {
            tracing::warn!(asset = %asset, active_share, threshold, "skipping, illiquid");
            skipped.push(SkippedAsset {
                asset,
                reason: SkipReason::Illiquid { active_share },
            });
        }
    }

    if keep.is_empty() {
        return Err(StatArbError::InsufficientData {
            asset: "all".to_string(),
            observations: 0,
            minimum: 1,
        });
    }

    Ok(UniverseLoad {
        panel: panel.select(&keep)?,
        skipped,
    })
}
