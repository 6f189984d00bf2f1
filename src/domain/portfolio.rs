//! Dollar-neutral long/short position construction.

use crate::domain::signal::{CrossSection, HorizonScores};
use chrono::NaiveDate;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

/// Tolerance on net and gross exposure invariants.
pub const WEIGHT_TOLERANCE: f64 = 1e-9;

/// Demeaned scores this close to zero belong to neither side.
pub const ZERO_SCORE_TOLERANCE: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WeightingScheme {
    /// Equal weight within each side.
    #[default]
    EqualWeight,
    /// Weight proportional to the demeaned cross-sectional rank.
    RankWeighted,
}

impl FromStr for WeightingScheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "equal" | "equal_weight" => Ok(WeightingScheme::EqualWeight),
            "rank" | "rank_weighted" => Ok(WeightingScheme::RankWeighted),
            other => Err(format!(
                "unknown weighting '{other}' (expected equal or rank)"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioConfig {
    pub gross_exposure: f64,
    /// Cap on names per side; `None` keeps every eligible asset.
    pub max_per_side: Option<usize>,
    pub weighting: WeightingScheme,
}

impl Default for PortfolioConfig {
    fn default() -> Self {
        PortfolioConfig {
            gross_exposure: 1.0,
            max_per_side: None,
            weighting: WeightingScheme::EqualWeight,
        }
    }
}

/// Signed weights for every universe asset at one date.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionVector {
    pub date: NaiveDate,
    pub weights: BTreeMap<String, f64>,
    /// No long/short pair could be formed; all weights are exactly 0.
    pub degenerate: bool,
}

impl PositionVector {
    pub fn flat(date: NaiveDate, universe: &[String]) -> Self {
        PositionVector {
            date,
            weights: universe.iter().map(|a| (a.clone(), 0.0)).collect(),
            degenerate: true,
        }
    }

    pub fn weight(&self, asset: &str) -> f64 {
        self.weights.get(asset).copied().unwrap_or(0.0)
    }

    pub fn net_exposure(&self) -> f64 {
        self.weights.values().sum()
    }

    pub fn gross_exposure(&self) -> f64 {
        self.weights.values().map(|w| w.abs()).sum()
    }

    pub fn long_count(&self) -> usize {
        self.weights.values().filter(|&&w| w > 0.0).count()
    }

    pub fn short_count(&self) -> usize {
        self.weights.values().filter(|&&w| w < 0.0).count()
    }

    /// Sum of absolute weight changes from `previous` to `self`.
    pub fn turnover_from(&self, previous: &BTreeMap<String, f64>) -> f64 {
        let assets: BTreeSet<&String> = self.weights.keys().chain(previous.keys()).collect();
        assets
            .into_iter()
            .map(|a| {
                let new = self.weights.get(a).copied().unwrap_or(0.0);
                let old = previous.get(a).copied().unwrap_or(0.0);
                (new - old).abs()
            })
            .sum()
    }
}

struct Candidate<'a> {
    asset: &'a String,
    /// Ordering key within a side; larger is stronger.
    strength: f64,
    /// Relative size within a side.
    size: f64,
}

/// Turn one cross-section of demeaned scores into a dollar-neutral vector.
///
/// Each side is normalized to half the gross exposure, so the book stays
/// neutral even when the long and short sides hold different counts.
/// Ties are broken by asset identifier.
pub fn build_positions(cross_section: &CrossSection, config: &PortfolioConfig) -> PositionVector {
    let universe = cross_section.universe();
    if cross_section.eligible_count() < 2 {
        return PositionVector::flat(cross_section.date, &universe);
    }

    let (mut longs, mut shorts) = match config.weighting {
        WeightingScheme::EqualWeight => split_by_score(cross_section),
        WeightingScheme::RankWeighted => split_by_rank(cross_section),
    };

    for side in [&mut longs, &mut shorts] {
        side.sort_by(|a, b| {
            b.strength
                .partial_cmp(&a.strength)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.asset.cmp(b.asset))
        });
        if let Some(k) = config.max_per_side {
            side.truncate(k);
        }
    }

    if longs.is_empty() || shorts.is_empty() {
        return PositionVector::flat(cross_section.date, &universe);
    }

    let half = config.gross_exposure / 2.0;
    let mut weights: BTreeMap<String, f64> = universe.iter().map(|a| (a.clone(), 0.0)).collect();
    for (side, sign) in [(&longs, 1.0), (&shorts, -1.0)] {
        let total: f64 = side.iter().map(|c| c.size).sum();
        for c in side.iter() {
            weights.insert(c.asset.clone(), sign * half * c.size / total);
        }
    }

    PositionVector {
        date: cross_section.date,
        weights,
        degenerate: false,
    }
}

fn split_by_score(cs: &CrossSection) -> (Vec<Candidate<'_>>, Vec<Candidate<'_>>) {
    let mut longs = Vec::new();
    let mut shorts = Vec::new();
    for (asset, score) in &cs.scores {
        let v = score.value;
        if v > ZERO_SCORE_TOLERANCE {
            longs.push(Candidate { asset, strength: v, size: 1.0 });
        } else if v < -ZERO_SCORE_TOLERANCE {
            shorts.push(Candidate { asset, strength: -v, size: 1.0 });
        }
    }
    (longs, shorts)
}

fn split_by_rank(cs: &CrossSection) -> (Vec<Candidate<'_>>, Vec<Candidate<'_>>) {
    let ranks = average_ranks(cs);
    let mean_rank = (cs.eligible_count() as f64 + 1.0) / 2.0;
    let mut longs = Vec::new();
    let mut shorts = Vec::new();
    for (asset, rank) in ranks {
        let d = rank - mean_rank;
        if d > 0.0 {
            longs.push(Candidate { asset, strength: d, size: d });
        } else if d < 0.0 {
            shorts.push(Candidate { asset, strength: -d, size: -d });
        }
    }
    (longs, shorts)
}

/// 1-based ascending ranks; equal scores share the average of their ranks.
fn average_ranks(cs: &CrossSection) -> Vec<(&String, f64)> {
    let mut sorted: Vec<(&String, f64)> = cs.scores.iter().map(|(a, s)| (a, s.value)).collect();
    sorted.sort_by(|a, b| {
        a.1.partial_cmp(&b.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.0.cmp(b.0))
    });

    let mut ranked = Vec::with_capacity(sorted.len());
    let mut i = 0;
    while i < sorted.len() {
        let mut j = i;
        while j + 1 < sorted.len() && sorted[j + 1].1 == sorted[i].1 {
            j += 1;
        }
        let rank = (i + j) as f64 / 2.0 + 1.0;
        for entry in &sorted[i..=j] {
            ranked.push((entry.0, rank));
        }
        i = j + 1;
    }
    ranked
}

/// Target positions for every date from the first scored date onwards.
///
/// A new target is built every `rebalance_every` dates; in between, the last
/// target is carried forward unchanged.
pub fn build_position_series(
    scores: &HorizonScores,
    config: &PortfolioConfig,
    rebalance_every: usize,
) -> Vec<PositionVector> {
    let every = rebalance_every.max(1);
    let start = scores
        .cross_sections
        .iter()
        .position(|cs| cs.eligible_count() > 0);
    let Some(start) = start else {
        return Vec::new();
    };

    let mut series: Vec<PositionVector> = Vec::with_capacity(scores.cross_sections.len() - start);
    for (k, cs) in scores.cross_sections[start..].iter().enumerate() {
        let vector = match series.last() {
            Some(prev) if k % every != 0 => PositionVector {
                date: cs.date,
                ..prev.clone()
            },
            _ => build_positions(cs, config),
        };
        series.push(vector);
    }
    series
}

/// Summary of a position series.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionStats {
    pub mean_long_weight: f64,
    pub mean_short_weight: f64,
    pub max_concentration: f64,
    pub avg_turnover: f64,
    pub degenerate_periods: usize,
}

impl PositionStats {
    pub fn compute(series: &[PositionVector]) -> Self {
        let (mut long_sum, mut long_n) = (0.0, 0usize);
        let (mut short_sum, mut short_n) = (0.0, 0usize);
        let mut max_concentration = 0.0_f64;

        for pv in series {
            for &w in pv.weights.values() {
                if w > 0.0 {
                    long_sum += w;
                    long_n += 1;
                } else if w < 0.0 {
                    short_sum += w;
                    short_n += 1;
                }
                max_concentration = max_concentration.max(w.abs());
            }
        }

        let turnovers: Vec<f64> = series
            .windows(2)
            .map(|pair| pair[1].turnover_from(&pair[0].weights))
            .collect();

        PositionStats {
            mean_long_weight: if long_n > 0 { long_sum / long_n as f64 } else { 0.0 },
            mean_short_weight: if short_n > 0 { short_sum / short_n as f64 } else { 0.0 },
            max_concentration,
            avg_turnover: if turnovers.is_empty() {
                0.0
            } else {
                turnovers.iter().sum::<f64>() / turnovers.len() as f64
            },
            degenerate_periods: series.iter().filter(|pv| pv.degenerate).count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::signal::SignalScore;
    use approx::assert_abs_diff_eq;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    fn cross_section(values: &[(&str, f64)], ineligible: &[&str]) -> CrossSection {
        CrossSection {
            date: date(),
            scores: values
                .iter()
                .map(|&(a, v)| (a.to_string(), SignalScore { raw: v, value: v }))
                .collect(),
            ineligible: ineligible.iter().map(|a| a.to_string()).collect(),
        }
    }

    fn assert_invariants(pv: &PositionVector, gross: f64) {
        assert_abs_diff_eq!(pv.net_exposure(), 0.0, epsilon = WEIGHT_TOLERANCE);
        assert_abs_diff_eq!(pv.gross_exposure(), gross, epsilon = WEIGHT_TOLERANCE);
    }

    #[test]
    fn equal_weight_two_sides() {
        let cs = cross_section(&[("A", 0.2), ("B", 0.1), ("C", -0.1), ("D", -0.2)], &[]);
        let pv = build_positions(&cs, &PortfolioConfig::default());
        assert!(!pv.degenerate);
        assert_abs_diff_eq!(pv.weight("A"), 0.25);
        assert_abs_diff_eq!(pv.weight("B"), 0.25);
        assert_abs_diff_eq!(pv.weight("C"), -0.25);
        assert_abs_diff_eq!(pv.weight("D"), -0.25);
        assert_invariants(&pv, 1.0);
    }

    #[test]
    fn asymmetric_book_stays_neutral() {
        let cs = cross_section(&[("A", 0.3), ("B", -0.1), ("C", -0.1), ("D", -0.1)], &[]);
        let pv = build_positions(&cs, &PortfolioConfig::default());
        assert_abs_diff_eq!(pv.weight("A"), 0.5);
        assert_abs_diff_eq!(pv.weight("B"), -0.5 / 3.0, epsilon = 1e-15);
        assert_invariants(&pv, 1.0);
    }

    #[test]
    fn zero_score_gets_zero_weight() {
        let cs = cross_section(&[("A", 0.1), ("B", 0.0), ("C", -0.1)], &[]);
        let pv = build_positions(&cs, &PortfolioConfig::default());
        assert_eq!(pv.weight("B"), 0.0);
        assert_abs_diff_eq!(pv.weight("A"), 0.5);
        assert_abs_diff_eq!(pv.weight("C"), -0.5);
    }

    #[test]
    fn ineligible_assets_get_zero_weight() {
        let cs = cross_section(&[("A", 0.1), ("C", -0.1)], &["B"]);
        let pv = build_positions(&cs, &PortfolioConfig::default());
        assert_eq!(pv.weights.len(), 3);
        assert_eq!(pv.weight("B"), 0.0);
    }

    #[test]
    fn fewer_than_two_eligible_is_flat() {
        let cs = cross_section(&[("A", 0.0)], &["B", "C"]);
        let pv = build_positions(&cs, &PortfolioConfig::default());
        assert!(pv.degenerate);
        assert!(pv.weights.values().all(|&w| w == 0.0));
        assert_eq!(pv.weights.len(), 3);
    }

    #[test]
    fn identical_scores_are_flat() {
        let cs = cross_section(&[("A", 0.0), ("B", 0.0)], &[]);
        let pv = build_positions(&cs, &PortfolioConfig::default());
        assert!(pv.degenerate);
        assert_eq!(pv.gross_exposure(), 0.0);
    }

    #[test]
    fn max_per_side_breaks_ties_by_asset() {
        let cs = cross_section(
            &[("D", 0.1), ("B", 0.1), ("C", 0.1), ("X", -0.15), ("Y", -0.15)],
            &[],
        );
        let config = PortfolioConfig {
            max_per_side: Some(2),
            ..PortfolioConfig::default()
        };
        let pv = build_positions(&cs, &config);
        assert_abs_diff_eq!(pv.weight("B"), 0.25);
        assert_abs_diff_eq!(pv.weight("C"), 0.25);
        assert_eq!(pv.weight("D"), 0.0);
        assert_abs_diff_eq!(pv.weight("X"), -0.25);
        assert_abs_diff_eq!(pv.weight("Y"), -0.25);
    }

    #[test]
    fn max_per_side_keeps_strongest() {
        let cs = cross_section(&[("A", 0.3), ("B", 0.1), ("C", -0.05), ("D", -0.35)], &[]);
        let config = PortfolioConfig {
            max_per_side: Some(1),
            gross_exposure: 2.0,
            ..PortfolioConfig::default()
        };
        let pv = build_positions(&cs, &config);
        assert_abs_diff_eq!(pv.weight("A"), 1.0);
        assert_abs_diff_eq!(pv.weight("D"), -1.0);
        assert_eq!(pv.weight("B"), 0.0);
        assert_invariants(&pv, 2.0);
    }

    #[test]
    fn rank_weighted_matches_demeaned_ranks() {
        // Ranks 1..4, demeaned -1.5,-0.5,0.5,1.5, abs sum 4.
        let cs = cross_section(&[("A", 0.4), ("B", 0.1), ("C", -0.2), ("D", -0.3)], &[]);
        let config = PortfolioConfig {
            weighting: WeightingScheme::RankWeighted,
            ..PortfolioConfig::default()
        };
        let pv = build_positions(&cs, &config);
        assert_abs_diff_eq!(pv.weight("A"), 1.5 / 4.0, epsilon = 1e-15);
        assert_abs_diff_eq!(pv.weight("B"), 0.5 / 4.0, epsilon = 1e-15);
        assert_abs_diff_eq!(pv.weight("C"), -0.5 / 4.0, epsilon = 1e-15);
        assert_abs_diff_eq!(pv.weight("D"), -1.5 / 4.0, epsilon = 1e-15);
        assert_invariants(&pv, 1.0);
    }

    #[test]
    fn rank_weighted_averages_ties() {
        let cs = cross_section(&[("A", 0.2), ("B", 0.2), ("C", -0.4)], &[]);
        let ranks: BTreeMap<String, f64> = average_ranks(&cs)
            .into_iter()
            .map(|(a, r)| (a.clone(), r))
            .collect();
        assert_eq!(ranks["C"], 1.0);
        assert_eq!(ranks["A"], 2.5);
        assert_eq!(ranks["B"], 2.5);

        let config = PortfolioConfig {
            weighting: WeightingScheme::RankWeighted,
            ..PortfolioConfig::default()
        };
        let pv = build_positions(&cs, &config);
        assert_abs_diff_eq!(pv.weight("A"), 0.25);
        assert_abs_diff_eq!(pv.weight("C"), -0.5);
        assert_invariants(&pv, 1.0);
    }

    #[test]
    fn turnover_counts_both_sides() {
        let cs = cross_section(&[("A", 0.1), ("B", -0.1)], &[]);
        let pv = build_positions(&cs, &PortfolioConfig::default());
        let prev: BTreeMap<String, f64> =
            [("A".to_string(), -0.5), ("B".to_string(), 0.5)].into();
        assert_abs_diff_eq!(pv.turnover_from(&prev), 2.0);
        assert_abs_diff_eq!(pv.turnover_from(&BTreeMap::new()), 1.0);
    }

    #[test]
    fn weighting_from_str() {
        assert_eq!(
            "equal".parse::<WeightingScheme>(),
            Ok(WeightingScheme::EqualWeight)
        );
        assert_eq!(
            "Rank_Weighted".parse::<WeightingScheme>(),
            Ok(WeightingScheme::RankWeighted)
        );
        assert!("kelly".parse::<WeightingScheme>().is_err());
    }

    #[test]
    fn stats_over_series() {
        let a = build_positions(
            &cross_section(&[("A", 0.1), ("B", -0.1)], &[]),
            &PortfolioConfig::default(),
        );
        let mut b = build_positions(
            &cross_section(&[("A", -0.1), ("B", 0.1)], &[]),
            &PortfolioConfig::default(),
        );
        b.date = date() + chrono::Duration::days(1);
        let stats = PositionStats::compute(&[a, b]);
        assert_abs_diff_eq!(stats.mean_long_weight, 0.5);
        assert_abs_diff_eq!(stats.mean_short_weight, -0.5);
        assert_abs_diff_eq!(stats.max_concentration, 0.5);
        assert_abs_diff_eq!(stats.avg_turnover, 2.0);
        assert_eq!(stats.degenerate_periods, 0);
    }
}
