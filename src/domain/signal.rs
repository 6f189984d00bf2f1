//! Cross-sectional momentum and reversal scores.
//!
//! The score for horizon h at date index t aggregates the h returns at
//! indices t-h+1 ..= t, so it is known at the close of t. A position built
//! from it earns the return of t+1. Scores are demeaned across eligible
//! assets per date.

use crate::domain::panel::Panel;
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SignalType {
    Momentum,
    Reversal,
}

impl SignalType {
    pub fn label(&self) -> &'static str {
        match self {
            SignalType::Momentum => "mom",
            SignalType::Reversal => "rev",
        }
    }
}

impl fmt::Display for SignalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalType::Momentum => write!(f, "Momentum"),
            SignalType::Reversal => write!(f, "Reversal"),
        }
    }
}

/// How a window of period returns collapses into one number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScoreMethod {
    /// prod(1 + r) - 1
    #[default]
    Compounded,
    /// sum(ln(1 + r))
    LogSum,
    /// Arithmetic mean of r.
    Mean,
}

impl FromStr for ScoreMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "compounded" | "cumulative" => Ok(ScoreMethod::Compounded),
            "log" | "logsum" | "log_sum" => Ok(ScoreMethod::LogSum),
            "mean" => Ok(ScoreMethod::Mean),
            other => Err(format!(
                "unknown score method '{other}' (expected compounded, log_sum or mean)"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalScore {
    /// Window aggregate, already negated for reversal.
    pub raw: f64,
    /// `raw` minus the cross-sectional mean at the same date.
    pub value: f64,
}

/// All scores of one horizon at one date.
#[derive(Debug, Clone, PartialEq)]
pub struct CrossSection {
    pub date: NaiveDate,
    pub scores: BTreeMap<String, SignalScore>,
    pub ineligible: BTreeSet<String>,
}

impl CrossSection {
    pub fn eligible_count(&self) -> usize {
        self.scores.len()
    }

    pub fn get(&self, asset: &str) -> Option<f64> {
        self.scores.get(asset).map(|s| s.value)
    }

    /// Every asset of the universe, eligible or not, in lexical order.
    pub fn universe(&self) -> Vec<String> {
        let all: BTreeSet<&String> = self.scores.keys().chain(self.ineligible.iter()).collect();
        all.into_iter().cloned().collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HorizonScores {
    pub signal_type: SignalType,
    pub horizon: usize,
    /// One entry per panel date, in date order.
    pub cross_sections: Vec<CrossSection>,
}

impl HorizonScores {
    pub fn at(&self, date: NaiveDate) -> Option<&CrossSection> {
        self.cross_sections
            .binary_search_by_key(&date, |cs| cs.date)
            .ok()
            .map(|i| &self.cross_sections[i])
    }

    pub fn score(&self, date: NaiveDate, asset: &str) -> Option<f64> {
        self.at(date).and_then(|cs| cs.get(asset))
    }

    /// First date at which at least one asset has a score.
    pub fn first_scored_date(&self) -> Option<NaiveDate> {
        self.cross_sections
            .iter()
            .find(|cs| cs.eligible_count() > 0)
            .map(|cs| cs.date)
    }
}

/// Aggregate a window of returns, or `None` if any value makes it undefined.
pub fn window_score(window: &[f64], method: ScoreMethod) -> Option<f64> {
    if window.is_empty() || window.iter().any(|r| !r.is_finite()) {
        return None;
    }
    match method {
        ScoreMethod::Compounded => Some(window.iter().map(|r| 1.0 + r).product::<f64>() - 1.0),
        ScoreMethod::LogSum => {
            if window.iter().any(|r| 1.0 + r <= 0.0) {
                return None;
            }
            Some(window.iter().map(|r| (1.0 + r).ln()).sum())
        }
        ScoreMethod::Mean => Some(window.iter().sum::<f64>() / window.len() as f64),
    }
}

/// Score every asset of `panel` at every date for each horizon.
///
/// Horizons are de-duplicated and sorted; a zero horizon has no window and
/// is skipped.
pub fn compute_scores(
    panel: &Panel,
    horizons: &[usize],
    signal_type: SignalType,
    method: ScoreMethod,
) -> Vec<HorizonScores> {
    let unique: BTreeSet<usize> = horizons.iter().copied().filter(|&h| h > 0).collect();
    unique
        .into_iter()
        .map(|horizon| {
            tracing::debug!(
                signal = %signal_type,
                horizon,
                dates = panel.len(),
                "computing scores"
            );
            HorizonScores {
                signal_type,
                horizon,
                cross_sections: score_horizon(panel, horizon, signal_type, method),
            }
        })
        .collect()
}

fn score_horizon(
    panel: &Panel,
    horizon: usize,
    signal_type: SignalType,
    method: ScoreMethod,
) -> Vec<CrossSection> {
    let assets = panel.assets();
    let sign = match signal_type {
        SignalType::Momentum => 1.0,
        SignalType::Reversal => -1.0,
    };

    panel
        .dates()
        .iter()
        .enumerate()
        .map(|(t, &date)| {
            let mut raw = BTreeMap::new();
            let mut ineligible = BTreeSet::new();

            for asset in &assets {
                // Window ends on the decision date; the simulator lags it.
                let score = if t + 1 >= horizon {
                    panel
                        .returns(asset)
                        .and_then(|r| window_score(&r[t + 1 - horizon..=t], method))
                } else {
                    None
                };
                match score {
                    Some(s) => {
                        raw.insert(asset.clone(), sign * s);
                    }
                    None => {
                        ineligible.insert(asset.clone());
                    }
                }
            }

            CrossSection {
                date,
                scores: demean(raw),
                ineligible,
            }
        })
        .collect()
}

fn demean(raw: BTreeMap<String, f64>) -> BTreeMap<String, SignalScore> {
    if raw.is_empty() {
        return BTreeMap::new();
    }
    let mean = raw.values().sum::<f64>() / raw.len() as f64;
    raw.into_iter()
        .map(|(asset, r)| {
            (
                asset,
                SignalScore {
                    raw: r,
                    value: r - mean,
                },
            )
        })
        .collect()
}
