//! Configuration validation.
//!
//! Validates all config fields before any data is loaded.

use crate::domain::error::StatArbError;
use crate::domain::portfolio::WeightingScheme;
use crate::domain::signal::ScoreMethod;
use crate::domain::universe::parse_assets;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

pub const DEFAULT_MOMENTUM_WINDOWS: &[usize] = &[60, 120, 252];
pub const DEFAULT_REVERSAL_WINDOWS: &[usize] = &[1, 5, 10, 20];

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), StatArbError> {
    validate_data_dir(config)?;
    validate_dates(config)?;
    validate_assets(config)?;
    validate_transaction_cost(config)?;
    validate_liquidity_threshold(config)?;
    validate_rebalance_every(config)?;
    validate_periods_per_year(config)?;
    validate_risk_free_rate(config)?;
    validate_windows(config)?;
    validate_score_method(config)?;
    validate_portfolio(config)?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> StatArbError {
    StatArbError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn validate_data_dir(config: &dyn ConfigPort) -> Result<(), StatArbError> {
    match config.get_string("data", "dir") {
        Some(s) if !s.trim().is_empty() => Ok(()),
        _ => Err(StatArbError::ConfigMissing {
            section: "data".to_string(),
            key: "dir".to_string(),
        }),
    }
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), StatArbError> {
    let start_str = config.get_string("backtest", "start_date");
    let end_str = config.get_string("backtest", "end_date");

    let start_date = parse_date(start_str.as_deref(), "start_date")?;
    let end_date = parse_date(end_str.as_deref(), "end_date")?;

    if start_date >= end_date {
        return Err(invalid(
            "backtest",
            "start_date",
            "start_date must be before end_date",
        ));
    }
    Ok(())
}

pub fn parse_date(value: Option<&str>, field: &str) -> Result<NaiveDate, StatArbError> {
    match value {
        None => Err(StatArbError::ConfigMissing {
            section: "backtest".to_string(),
            key: field.to_string(),
        }),
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| {
            invalid(
                "backtest",
                field,
                format!("invalid {field} format, expected YYYY-MM-DD"),
            )
        }),
    }
}

fn validate_assets(config: &dyn ConfigPort) -> Result<(), StatArbError> {
    match config.get_string("backtest", "assets") {
        Some(s) if !s.trim().is_empty() => parse_assets(&s)
            .map(|_| ())
            .map_err(|e| invalid("backtest", "assets", e.to_string())),
        _ => Err(StatArbError::ConfigMissing {
            section: "backtest".to_string(),
            key: "assets".to_string(),
        }),
    }
}

fn validate_transaction_cost(config: &dyn ConfigPort) -> Result<(), StatArbError> {
    let value = config.get_double("backtest", "transaction_cost", 0.0);
    if value < 0.0 || value.is_nan() {
        return Err(invalid(
            "backtest",
            "transaction_cost",
            "transaction_cost must be non-negative",
        ));
    }
    Ok(())
}

fn validate_liquidity_threshold(config: &dyn ConfigPort) -> Result<(), StatArbError> {
    let value = config.get_double("backtest", "liquidity_threshold", 0.0);
    if !(0.0..=1.0).contains(&value) {
        return Err(invalid(
            "backtest",
            "liquidity_threshold",
            "liquidity_threshold must be between 0 and 1",
        ));
    }
    Ok(())
}

fn validate_rebalance_every(config: &dyn ConfigPort) -> Result<(), StatArbError> {
    let value = config.get_int("backtest", "rebalance_every", 1);
    if value < 1 {
        return Err(invalid(
            "backtest",
            "rebalance_every",
            "rebalance_every must be at least 1",
        ));
    }
    Ok(())
}

fn validate_periods_per_year(config: &dyn ConfigPort) -> Result<(), StatArbError> {
    let value = config.get_double("backtest", "periods_per_year", 365.0);
    if value <= 0.0 || value.is_nan() {
        return Err(invalid(
            "backtest",
            "periods_per_year",
            "periods_per_year must be positive",
        ));
    }
    Ok(())
}

fn validate_risk_free_rate(config: &dyn ConfigPort) -> Result<(), StatArbError> {
    let value = config.get_double("backtest", "risk_free_rate", 0.0);
    if !(0.0..1.0).contains(&value) {
        return Err(invalid(
            "backtest",
            "risk_free_rate",
            "risk_free_rate must be between 0 and 1",
        ));
    }
    Ok(())
}

/// Parse a comma-separated list of positive horizons.
pub fn parse_windows(raw: &[String], key: &str) -> Result<Vec<usize>, StatArbError> {
    raw.iter()
        .map(|token| match token.parse::<usize>() {
            Ok(0) => Err(invalid("signals", key, "windows must be positive")),
            Ok(h) => Ok(h),
            Err(_) => Err(invalid(
                "signals",
                key,
                format!("'{token}' is not a whole number of periods"),
            )),
        })
        .collect()
}

/// Configured horizons for `key`, or `default` when the key is absent.
pub fn windows_or_default(
    config: &dyn ConfigPort,
    key: &str,
    default: &[usize],
) -> Result<Vec<usize>, StatArbError> {
    match config.get_list("signals", key) {
        Some(raw) => parse_windows(&raw, key),
        None => Ok(default.to_vec()),
    }
}

fn validate_windows(config: &dyn ConfigPort) -> Result<(), StatArbError> {
    let momentum = windows_or_default(config, "momentum_windows", DEFAULT_MOMENTUM_WINDOWS)?;
    let reversal = windows_or_default(config, "reversal_windows", DEFAULT_REVERSAL_WINDOWS)?;
    if momentum.is_empty() && reversal.is_empty() {
        return Err(invalid(
            "signals",
            "momentum_windows",
            "at least one momentum or reversal window is required",
        ));
    }
    Ok(())
}

fn validate_score_method(config: &dyn ConfigPort) -> Result<(), StatArbError> {
    if let Some(s) = config.get_string("signals", "score_method") {
        s.parse::<ScoreMethod>()
            .map_err(|e| invalid("signals", "score_method", e))?;
    }
    Ok(())
}

fn validate_portfolio(config: &dyn ConfigPort) -> Result<(), StatArbError> {
    let gross = config.get_double("portfolio", "gross_exposure", 1.0);
    if gross <= 0.0 || !gross.is_finite() {
        return Err(invalid(
            "portfolio",
            "gross_exposure",
            "gross_exposure must be positive",
        ));
    }

    let max_per_side = config.get_int("portfolio", "max_per_side", 0);
    if max_per_side < 0 {
        return Err(invalid(
            "portfolio",
            "max_per_side",
            "max_per_side must be non-negative (0 means unlimited)",
        ));
    }

    if let Some(s) = config.get_string("portfolio", "weighting") {
        s.parse::<WeightingScheme>()
            .map_err(|e| invalid("portfolio", "weighting", e))?;
    }
    Ok(())
}
