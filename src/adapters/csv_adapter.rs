//! CSV file data adapter.
//!
//! One file per asset, `<base>/<ASSET>.csv`, with header `date,return,volume`.
//! An empty `return` cell is read as NaN and an empty `volume` cell as 0.

use crate::domain::error::StatArbError;
use crate::domain::panel::Observation;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, asset: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", asset))
    }

    fn read_all(&self, asset: &str) -> Result<Vec<Observation>, StatArbError> {
        let path = self.csv_path(asset);
        let content = fs::read_to_string(&path).map_err(|e| StatArbError::Data {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());
        let mut rows = Vec::new();

        for (line, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| StatArbError::Data {
                reason: format!("{}: CSV parse error: {}", path.display(), e),
            })?;
            // Header is line 1.
            let line = line + 2;

            let date_str = record.get(0).ok_or_else(|| StatArbError::Data {
                reason: format!("{}:{}: missing date column", path.display(), line),
            })?;
            let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").map_err(|e| {
                StatArbError::Data {
                    reason: format!("{}:{}: invalid date '{}': {}", path.display(), line, date_str, e),
                }
            })?;

            let ret = parse_field(record.get(1), f64::NAN).map_err(|e| StatArbError::Data {
                reason: format!("{}:{}: invalid return value: {}", path.display(), line, e),
            })?;
            let volume = parse_field(record.get(2), 0.0).map_err(|e| StatArbError::Data {
                reason: format!("{}:{}: invalid volume value: {}", path.display(), line, e),
            })?;

            rows.push(Observation { date, ret, volume });
        }

        rows.sort_by_key(|o| o.date);
        Ok(rows)
    }
}

fn parse_field(cell: Option<&str>, empty: f64) -> Result<f64, std::num::ParseFloatError> {
    match cell {
        None | Some("") => Ok(empty),
        Some(s) => s.parse(),
    }
}

impl DataPort for CsvAdapter {
    fn fetch_series(
        &self,
        asset: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<Observation>, StatArbError> {
        let rows = self.read_all(asset)?;
        Ok(rows
            .into_iter()
            .filter(|o| o.date >= start_date && o.date <= end_date)
            .collect())
    }

    fn list_assets(&self) -> Result<Vec<String>, StatArbError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| StatArbError::Data {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut assets = Vec::new();

        for entry in entries {
            let entry = entry.map_err(|e| StatArbError::Data {
                reason: format!("directory entry error: {}", e),
            })?;

            let name = entry.file_name();
            let name_str = name.to_string_lossy();

            if let Some(asset) = name_str.strip_suffix(".csv") {
                assets.push(asset.to_string());
            }
        }

        assets.sort();
        Ok(assets)
    }

    fn get_data_range(
        &self,
        asset: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, StatArbError> {
        if !self.csv_path(asset).exists() {
            return Ok(None);
        }
        let rows = self.read_all(asset)?;
        Ok(match (rows.first(), rows.last()) {
            (Some(first), Some(last)) => Some((first.date, last.date, rows.len())),
            _ => None,
        })
    }
}
