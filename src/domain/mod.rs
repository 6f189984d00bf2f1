//! Core domain types and logic.

pub mod panel;
pub mod signal;
pub mod portfolio;
pub mod simulation;
pub mod metrics;
pub mod strategy;
pub mod backtest;
pub mod universe;
pub mod config_validation;
pub mod error;
