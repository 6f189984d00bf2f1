//! Strategy identity: one signal type at one horizon.

use crate::domain::signal::SignalType;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StrategyId {
    pub signal_type: SignalType,
    pub horizon: usize,
}

impl StrategyId {
    pub fn momentum(horizon: usize) -> Self {
        StrategyId {
            signal_type: SignalType::Momentum,
            horizon,
        }
    }

    pub fn reversal(horizon: usize) -> Self {
        StrategyId {
            signal_type: SignalType::Reversal,
            horizon,
        }
    }

    /// File-friendly name such as `mom_120d`.
    pub fn name(&self) -> String {
        format!("{}_{}d", self.signal_type.label(), self.horizon)
    }
}

impl fmt::Display for StrategyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}d", self.signal_type, self.horizon)
    }
}
