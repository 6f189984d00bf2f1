//! Domain error types.

use chrono::NaiveDate;

/// Top-level error type for statarb.
///
/// Only structural problems live here. Per-date and per-asset degradations
/// (short history, thin cross-sections, zero-variance statistics) are carried
/// in the result data instead.
#[derive(Debug, thiserror::Error)]
pub enum StatArbError {
    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("no data for {asset}")]
    NoData { asset: String },

    #[error("insufficient data for {asset}: have {observations} observations, need {minimum}")]
    InsufficientData {
        asset: String,
        observations: usize,
        minimum: usize,
    },

    #[error("duplicate date {date} in {asset}")]
    DuplicateDate { asset: String, date: NaiveDate },

    #[error("dates out of order in {asset} at {date}")]
    UnsortedDates { asset: String, date: NaiveDate },

    #[error("ragged panel: {asset} has {found}, expected {expected}")]
    RaggedDates {
        asset: String,
        expected: String,
        found: String,
    },

    #[error("report error: {reason}")]
    Report { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl StatArbError {
    /// True for violations of the panel alignment invariant.
    pub fn is_input_shape(&self) -> bool {
        matches!(
            self,
            StatArbError::DuplicateDate { .. }
                | StatArbError::UnsortedDates { .. }
                | StatArbError::RaggedDates { .. }
        )
    }
}

impl From<&StatArbError> for std::process::ExitCode {
    fn from(err: &StatArbError) -> Self {
        let code: u8 = match err {
            StatArbError::Io(_) | StatArbError::Report { .. } => 1,
            StatArbError::ConfigParse { .. }
            | StatArbError::ConfigMissing { .. }
            | StatArbError::ConfigInvalid { .. } => 2,
            StatArbError::Data { .. } => 3,
            StatArbError::DuplicateDate { .. }
            | StatArbError::UnsortedDates { .. }
            | StatArbError::RaggedDates { .. } => 4,
            StatArbError::NoData { .. } | StatArbError::InsufficientData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
