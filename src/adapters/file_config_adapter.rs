//! INI file configuration adapter.

use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

#[derive(Debug)]
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
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = r#"
[data]
source = csv
csv_dir = ./prices
price_column = adj_close

[analysis]
start_date = 2015-01-01
end_date = 2019-12-31
assets = MSFT, AAPL
factors = market , risk_free,
window = 60
periods_per_year = 252.0

[factor.market]
code = ^GSPC
"#;

    #[test]
    fn reads_strings_by_section() {
        let adapter = FileConfigAdapter::from_string(SAMPLE).unwrap();
        assert_eq!(adapter.get_string("data", "csv_dir"), Some("./prices".to_string()));
        assert_eq!(
            adapter.get_string("factor.market", "code"),
            Some("^GSPC".to_string())
        );
        assert_eq!(adapter.get_string("data", "missing"), None);
        assert_eq!(adapter.get_string("nope", "source"), None);
    }

    #[test]
    fn int_getter_falls_back_to_default() {
        let adapter = FileConfigAdapter::from_string(SAMPLE).unwrap();
        assert_eq!(adapter.get_int("analysis", "window", 0), 60);
        assert_eq!(adapter.get_int("analysis", "missing", 42), 42);
        assert_eq!(adapter.get_int("data", "source", 7), 7);
    }

    #[test]
    fn list_getter_trims_and_drops_empty_entries() {
        let adapter = FileConfigAdapter::from_string(SAMPLE).unwrap();
        assert_eq!(adapter.get_list("analysis", "assets"), vec!["MSFT", "AAPL"]);
        assert_eq!(
            adapter.get_list("analysis", "factors"),
            vec!["market", "risk_free"]
        );
        assert!(adapter.get_list("analysis", "missing").is_empty());
    }

    #[test]
    fn from_file_reads_config() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "[report]\ntemplate_path = /tmp/custom.typ\n").unwrap();
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(
            adapter.get_string("report", "template_path"),
            Some("/tmp/custom.typ".to_string())
        );
    }

    #[test]
    fn from_file_missing_is_error() {
        assert!(FileConfigAdapter::from_file("/nonexistent/aptfit.ini").is_err());
    }
}
