//! Risk and return statistics for a strategy return series.
//!
//! Statistics whose denominator is zero are reported as NaN; the remaining
//! fields of the report stay valid.

use crate::domain::panel::{ReturnPoint, ReturnSeries};

#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceReport {
    pub periods: usize,
    pub total_return: f64,
    pub annualized_return: f64,
    pub annualized_volatility: f64,
    pub sharpe_ratio: f64,
    /// Largest peak-to-trough decline, as a fraction <= 0.
    pub max_drawdown: f64,
    pub win_rate: f64,
    pub benchmark_annualized_return: f64,
    pub beta: f64,
    pub alpha: f64,
    pub correlation: f64,
    /// Growth of one unit of capital after each period.
    pub cumulative: Vec<ReturnPoint>,
}

/// Statistics over the dates shared by `strategy` and `benchmark`.
pub fn analyze(
    strategy: &ReturnSeries,
    benchmark: &ReturnSeries,
    periods_per_year: f64,
    risk_free_rate: f64,
) -> PerformanceReport {
    let joined = strategy.inner_join(benchmark);
    let aligned = ReturnSeries {
        points: joined
            .iter()
            .map(|&(date, s, _)| ReturnPoint { date, value: s })
            .collect(),
    };
    let bench: Vec<f64> = joined.iter().map(|&(_, _, b)| b).collect();

    let mut report = analyze_standalone(&aligned, periods_per_year, risk_free_rate);
    let strat = aligned.values();

    report.benchmark_annualized_return = annualized_return(&bench, periods_per_year);
    report.beta = match sample_variance(&bench) {
        Some(var) if var > 0.0 => sample_covariance(&strat, &bench) / var,
        _ => f64::NAN,
    };
    report.alpha = report.annualized_return - report.beta * report.benchmark_annualized_return;
    report.correlation = correlation(&strat, &bench);
    report
}

/// Statistics without a benchmark; beta, alpha and correlation are NaN.
pub fn analyze_standalone(
    strategy: &ReturnSeries,
    periods_per_year: f64,
    risk_free_rate: f64,
) -> PerformanceReport {
    let returns = strategy.values();
    let n = returns.len();

    if n > 0 && (n as f64) < periods_per_year {
        tracing::warn!(
            periods = n,
            periods_per_year,
            "fewer periods than one year, annualized figures are extrapolated"
        );
    }

    let growth: f64 = returns.iter().map(|r| 1.0 + r).product();
    let total_return = if n > 0 { growth - 1.0 } else { f64::NAN };
    let annualized_return = annualized_return(&returns, periods_per_year);

    let annualized_volatility = sample_variance(&returns)
        .map(|v| v.sqrt() * periods_per_year.sqrt())
        .unwrap_or(f64::NAN);

    let sharpe_ratio = if annualized_volatility > 0.0 {
        (annualized_return - risk_free_rate) / annualized_volatility
    } else {
        f64::NAN
    };

    let win_rate = if n > 0 {
        returns.iter().filter(|&&r| r > 0.0).count() as f64 / n as f64
    } else {
        f64::NAN
    };

    let cumulative = cumulative_growth(strategy);

    PerformanceReport {
        periods: n,
        total_return,
        annualized_return,
        annualized_volatility,
        sharpe_ratio,
        max_drawdown: max_drawdown(&cumulative),
        win_rate,
        benchmark_annualized_return: f64::NAN,
        beta: f64::NAN,
        alpha: f64::NAN,
        correlation: f64::NAN,
        cumulative,
    }
}

/// Geometric annualization: (prod(1 + r))^(periods_per_year / n) - 1.
pub fn annualized_return(returns: &[f64], periods_per_year: f64) -> f64 {
    if returns.is_empty() {
        return f64::NAN;
    }
    let growth: f64 = returns.iter().map(|r| 1.0 + r).product();
    growth.powf(periods_per_year / returns.len() as f64) - 1.0
}

fn cumulative_growth(series: &ReturnSeries) -> Vec<ReturnPoint> {
    let mut equity = 1.0;
    series
        .points
        .iter()
        .map(|p| {
            equity *= 1.0 + p.value;
            ReturnPoint {
                date: p.date,
                value: equity,
            }
        })
        .collect()
}

/// Worst ratio-to-peak minus one; the curve starts from 1.0.
fn max_drawdown(cumulative: &[ReturnPoint]) -> f64 {
    let mut peak = 1.0_f64;
    let mut worst = 0.0_f64;
    for p in cumulative {
        peak = peak.max(p.value);
        if peak > 0.0 {
            worst = worst.min(p.value / peak - 1.0);
        }
    }
    worst
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// n-1 denominator; `None` with fewer than two values.
fn sample_variance(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values);
    Some(values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64)
}

fn sample_covariance(a: &[f64], b: &[f64]) -> f64 {
    if a.len() < 2 {
        return f64::NAN;
    }
    let (ma, mb) = (mean(a), mean(b));
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - ma) * (y - mb))
        .sum::<f64>()
        / (a.len() - 1) as f64
}

fn correlation(a: &[f64], b: &[f64]) -> f64 {
    match (sample_variance(a), sample_variance(b)) {
        (Some(va), Some(vb)) if va > 0.0 && vb > 0.0 => {
            sample_covariance(a, b) / (va.sqrt() * vb.sqrt())
        }
        _ => f64::NAN,
    }
}
