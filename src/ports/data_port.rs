//! Data access port trait.

use crate::domain::error::StatArbError;
use crate::domain::panel::Observation;
use chrono::NaiveDate;

pub trait DataPort {
    /// Observations for `asset` within `[start_date, end_date]`, sorted by date.
    fn fetch_series(
        &self,
        asset: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<Observation>, StatArbError>;

    fn list_assets(&self) -> Result<Vec<String>, StatArbError>;

    /// First date, last date and row count for `asset`, or `None` if it has no rows.
    fn get_data_range(
        &self,
        asset: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, StatArbError>;
}
