//! Aligned per-asset return/volume panel.
//!
//! Every asset shares one strictly increasing date index. Construction
//! rejects ragged, duplicated or unsorted input; the panel is never repaired.

use crate::domain::error::StatArbError;
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// One row of an asset's series.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub date: NaiveDate,
    pub ret: f64,
    pub volume: f64,
}

#[derive(Debug, Clone, PartialEq)]
struct AssetSeries {
    returns: Vec<f64>,
    volumes: Vec<f64>,
}

/// date -> asset -> period return.
pub type ReturnTable = BTreeMap<NaiveDate, BTreeMap<String, f64>>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReturnPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// A dated sequence of period returns, sorted by date.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReturnSeries {
    pub points: Vec<ReturnPoint>,
}

impl ReturnSeries {
    pub fn new(mut points: Vec<ReturnPoint>) -> Self {
        points.sort_by_key(|p| p.date);
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    /// Pairs of (self, other) values on dates present in both series.
    /// Dates missing from either side are dropped, never filled.
    pub fn inner_join(&self, other: &ReturnSeries) -> Vec<(NaiveDate, f64, f64)> {
        let lookup: BTreeMap<NaiveDate, f64> =
            other.points.iter().map(|p| (p.date, p.value)).collect();
        self.points
            .iter()
            .filter_map(|p| lookup.get(&p.date).map(|&o| (p.date, p.value, o)))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    dates: Vec<NaiveDate>,
    assets: BTreeMap<String, AssetSeries>,
}

impl Panel {
    pub fn new(series: BTreeMap<String, Vec<Observation>>) -> Result<Self, StatArbError> {
        let mut iter = series.iter();
        let (first_asset, first_obs) = iter.next().ok_or_else(|| StatArbError::NoData {
            asset: "all".to_string(),
        })?;

        check_ordering(first_asset, first_obs)?;
        let dates: Vec<NaiveDate> = first_obs.iter().map(|o| o.date).collect();

        for (asset, obs) in iter {
            check_ordering(asset, obs)?;
            if obs.len() != dates.len() {
                return Err(StatArbError::RaggedDates {
                    asset: asset.clone(),
                    expected: format!("{} dates", dates.len()),
                    found: format!("{} dates", obs.len()),
                });
            }
            if let Some((expected, found)) = dates
                .iter()
                .zip(obs.iter().map(|o| o.date))
                .find(|(e, f)| *e != f)
            {
                return Err(StatArbError::RaggedDates {
                    asset: asset.clone(),
                    expected: expected.to_string(),
                    found: found.to_string(),
                });
            }
        }

        let assets = series
            .into_iter()
            .map(|(asset, obs)| {
                let (returns, volumes) = obs.into_iter().map(|o| (o.ret, o.volume)).unzip();
                (asset, AssetSeries { returns, volumes })
            })
            .collect();

        Ok(Self { dates, assets })
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Asset identifiers in lexical order.
    pub fn assets(&self) -> Vec<String> {
        self.assets.keys().cloned().collect()
    }

    pub fn asset_count(&self) -> usize {
        self.assets.len()
    }

    /// Number of dates.
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn returns(&self, asset: &str) -> Option<&[f64]> {
        self.assets.get(asset).map(|s| s.returns.as_slice())
    }

    pub fn volumes(&self, asset: &str) -> Option<&[f64]> {
        self.assets.get(asset).map(|s| s.volumes.as_slice())
    }

    pub fn returns_by_date(&self) -> ReturnTable {
        self.dates
            .iter()
            .enumerate()
            .map(|(i, &date)| {
                let row = self
                    .assets
                    .iter()
                    .map(|(asset, s)| (asset.clone(), s.returns[i]))
                    .collect();
                (date, row)
            })
            .collect()
    }

    /// A new panel restricted to `assets`.
    pub fn select(&self, assets: &[String]) -> Result<Panel, StatArbError> {
        let mut selected = BTreeMap::new();
        for asset in assets {
            let series = self.assets.get(asset).ok_or_else(|| StatArbError::NoData {
                asset: asset.clone(),
            })?;
            selected.insert(asset.clone(), series.clone());
        }
        if selected.is_empty() {
            return Err(StatArbError::NoData {
                asset: "all".to_string(),
            });
        }
        Ok(Panel {
            dates: self.dates.clone(),
            assets: selected,
        })
    }
}

fn check_ordering(asset: &str, obs: &[Observation]) -> Result<(), StatArbError> {
    for pair in obs.windows(2) {
        if pair[1].date == pair[0].date {
            return Err(StatArbError::DuplicateDate {
                asset: asset.to_string(),
                date: pair[1].date,
            });
        }
        if pair[1].date < pair[0].date {
            return Err(StatArbError::UnsortedDates {
                asset: asset.to_string(),
                date: pair[1].date,
            });
        }
    }
    Ok(())
}
