//! INI file configuration adapter.

use crate::domain::error::TwscanError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

#[derive(Debug)]
pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, TwscanError> {
        let path = path.as_ref();
        let mut config = Ini::new();
        config
            .load(path)
            .map_err(|reason| TwscanError::ConfigParse {
                file: path.display().to_string(),
                reason,
            })?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, String> {
        let mut config = Ini::new();
        config.read(content.to_string())?;
        Ok(Self { config })
    }

    fn parse_bool(value: &str) -> Option<bool> {
        match value.trim().to_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        }
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

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.config
            .get(section, key)
            .as_deref()
            .and_then(Self::parse_bool)
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

    #[test]
    fn from_string_parses_sections() {
        let content = r#"
[indicators]
ema_period = 60

[entry]
adx_min = 30.5

[run]
data_dir = ./prices
market = TWO
"#;
        let adapter = FileConfigAdapter::from_string(content).unwrap();
        assert_eq!(adapter.get_int("indicators", "ema_period", 0), 60);
        assert_eq!(adapter.get_double("entry", "adx_min", 0.0), 30.5);
        assert_eq!(
            adapter.get_string("run", "data_dir"),
            Some("./prices".to_string())
        );
        assert_eq!(adapter.get_string("run", "market"), Some("TWO".to_string()));
    }

    #[test]
    fn get_string_returns_none_for_missing_key() {
        let adapter = FileConfigAdapter::from_string("[entry]\nkmin = 20\n").unwrap();
        assert_eq!(adapter.get_string("entry", "missing"), None);
        assert_eq!(adapter.get_string("missing_section", "key"), None);
    }

    #[test]
    fn get_int_returns_default_for_missing_or_non_numeric() {
        let adapter = FileConfigAdapter::from_string("[exit]\nema_break_bars = abc\n").unwrap();
        assert_eq!(adapter.get_int("exit", "ema_break_bars", 2), 2);
        assert_eq!(adapter.get_int("exit", "missing", 42), 42);
    }

    #[test]
    fn get_double_returns_default_for_non_numeric() {
        let adapter =
            FileConfigAdapter::from_string("[backtest]\ninitial_capital = lots\n").unwrap();
        assert_eq!(
            adapter.get_double("backtest", "initial_capital", 99.9),
            99.9
        );
    }

    #[test]
    fn get_bool_accepts_common_spellings() {
        let adapter = FileConfigAdapter::from_string(
            "[exit]\na = true\nb = Yes\nc = 1\nd = false\ne = no\nf = 0\n",
        )
        .unwrap();
        assert!(adapter.get_bool("exit", "a", false));
        assert!(adapter.get_bool("exit", "b", false));
        assert!(adapter.get_bool("exit", "c", false));
        assert!(!adapter.get_bool("exit", "d", true));
        assert!(!adapter.get_bool("exit", "e", true));
        assert!(!adapter.get_bool("exit", "f", true));
        assert!(adapter.get_bool("exit", "missing", true));
    }

    #[test]
    fn from_file_reads_config() {
        let file = create_temp_config("[notify]\nlocale = zh-TW\n");
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(
            adapter.get_string("notify", "locale"),
            Some("zh-TW".to_string())
        );
    }

    #[test]
    fn from_file_missing_is_config_parse_error() {
        let result = FileConfigAdapter::from_file("/nonexistent/path/twscan.ini");
        assert!(matches!(result, Err(TwscanError::ConfigParse { .. })));
    }
}
