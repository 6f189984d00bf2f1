//! INI file configuration adapter.

use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let mut config = Ini::new();
        config.load(path).map_err(std::io::Error::other)?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, String> {
        let mut config = Ini::new();
        config.read(content.to_string())?;
        Ok(Self { config })
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key)
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.config
            .getint(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        self.config
            .getfloat(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    const SAMPLE: &str = r#"
[data]
dir = ./data/daily

[backtest]
start_date = 2020-09-01
end_date = 2024-12-31
assets = BTCUSDT, ETHUSDT, SOLUSDT
benchmark = BTCUSDT
transaction_cost = 0.0005
rebalance_every = 5

[signals]
momentum_windows = 60,120, 252
reversal_windows =
score_method = log_sum

[portfolio]
gross_exposure = 2.0
"#;

    #[test]
    fn from_string_parses_config() {
        let adapter = FileConfigAdapter::from_string(SAMPLE).unwrap();
        assert_eq!(
            adapter.get_string("data", "dir"),
            Some("./data/daily".to_string())
        );
        assert_eq!(
            adapter.get_string("backtest", "benchmark"),
            Some("BTCUSDT".to_string())
        );
    }

    #[test]
    fn get_string_returns_none_for_missing_key() {
        let adapter = FileConfigAdapter::from_string(SAMPLE).unwrap();
        assert_eq!(adapter.get_string("backtest", "missing"), None);
        assert_eq!(adapter.get_string("missing_section", "key"), None);
    }

    #[test]
    fn get_int_returns_value() {
        let adapter = FileConfigAdapter::from_string(SAMPLE).unwrap();
        assert_eq!(adapter.get_int("backtest", "rebalance_every", 1), 5);
    }

    #[test]
    fn get_int_returns_default_for_missing() {
        let adapter = FileConfigAdapter::from_string("[portfolio]\n").unwrap();
        assert_eq!(adapter.get_int("portfolio", "max_per_side", 0), 0);
    }

    #[test]
    fn get_int_returns_default_for_non_numeric() {
        let adapter =
            FileConfigAdapter::from_string("[portfolio]\nmax_per_side = many\n").unwrap();
        assert_eq!(adapter.get_int("portfolio", "max_per_side", 3), 3);
    }

    #[test]
    fn get_double_returns_value() {
        let adapter = FileConfigAdapter::from_string(SAMPLE).unwrap();
        assert_eq!(
            adapter.get_double("backtest", "transaction_cost", 0.0),
            0.0005
        );
        assert_eq!(adapter.get_double("portfolio", "gross_exposure", 1.0), 2.0);
    }

    #[test]
    fn get_double_returns_default_for_missing() {
        let adapter = FileConfigAdapter::from_string(SAMPLE).unwrap();
        assert_eq!(adapter.get_double("backtest", "periods_per_year", 365.0), 365.0);
    }

    #[test]
    fn get_double_returns_default_for_non_numeric() {
        let adapter =
            FileConfigAdapter::from_string("[backtest]\nrisk_free_rate = low\n").unwrap();
        assert_eq!(adapter.get_double("backtest", "risk_free_rate", 0.01), 0.01);
    }

    #[test]
    fn get_list_splits_and_trims() {
        let adapter = FileConfigAdapter::from_string(SAMPLE).unwrap();
        assert_eq!(
            adapter.get_list("signals", "momentum_windows"),
            Some(vec!["60".to_string(), "120".to_string(), "252".to_string()])
        );
        assert_eq!(
            adapter.get_list("backtest", "assets").map(|v| v.len()),
            Some(3)
        );
    }

    #[test]
    fn get_list_empty_value_is_empty_list() {
        let adapter = FileConfigAdapter::from_string(SAMPLE).unwrap();
        assert_eq!(adapter.get_list("signals", "reversal_windows"), Some(vec![]));
        assert_eq!(adapter.get_list("signals", "missing"), None);
    }

    #[test]
    fn from_file_reads_config() {
        let file = create_temp_config("[report]\noutput_dir = /tmp/results\n");
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(
            adapter.get_string("report", "output_dir"),
            Some("/tmp/results".to_string())
        );
    }

    #[test]
    fn from_file_returns_error_for_missing_file() {
        let result = FileConfigAdapter::from_file("/nonexistent/path/config.ini");
        assert!(result.is_err());
    }
}
