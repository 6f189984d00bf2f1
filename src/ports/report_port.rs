//! Report generation port trait.

use crate::domain::backtest::StrategyRun;
use crate::domain::error::StatArbError;
use std::path::Path;

/// Port for writing backtest results.
pub trait ReportPort {
    fn write(&self, runs: &[StrategyRun], output_dir: &Path) -> Result<(), StatArbError>;
}
