//! INI file configuration adapter.

use configparser::ini::Ini;
use std::path::Path;

use crate::ports::config_port::ConfigPort;

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

    fn parse_bool(value: &str) -> Option<bool> {
        match value.to_lowercase().as_str() {
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

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.config
            .get(section, key)
            .as_ref()
            .and_then(|value| Self::parse_bool(value))
            .unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn from_string_parses_import_settings() {
        let content = r#"
[import]
timezone = America/New_York
algorithm = zero-crossing
partition_by_day = no

[report]
output = trades.csv
"#;
        let adapter = FileConfigAdapter::from_string(content).unwrap();
        assert_eq!(
            adapter.get_string("import", "timezone"),
            Some("America/New_York".to_string())
        );
        assert_eq!(
            adapter.get_string("import", "algorithm"),
            Some("zero-crossing".to_string())
        );
        assert!(!adapter.get_bool("import", "partition_by_day", true));
        assert_eq!(
            adapter.get_string("report", "output"),
            Some("trades.csv".to_string())
        );
    }

    #[test]
    fn get_string_returns_none_for_missing_key() {
        let adapter = FileConfigAdapter::from_string("[import]\ntimezone = UTC\n").unwrap();
        assert_eq!(adapter.get_string("import", "missing"), None);
        assert_eq!(adapter.get_string("missing_section", "key"), None);
    }

    #[test]
    fn get_bool_accepts_the_usual_spellings() {
        let adapter =
            FileConfigAdapter::from_string("[import]\na = true\nb = yes\nc = 1\nd = false\n")
                .unwrap();
        assert!(adapter.get_bool("import", "a", false));
        assert!(adapter.get_bool("import", "b", false));
        assert!(adapter.get_bool("import", "c", false));
        assert!(!adapter.get_bool("import", "d", true));
    }

    #[test]
    fn get_bool_returns_default_for_missing_or_invalid() {
        let adapter = FileConfigAdapter::from_string("[import]\na = maybe\n").unwrap();
        assert!(adapter.get_bool("import", "a", true));
        assert!(adapter.get_bool("import", "missing", true));
        assert!(!adapter.get_bool("import", "missing", false));
    }

    #[test]
    fn from_file_reads_config() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "[report]\noutput = /tmp/out.csv\n").unwrap();
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(
            adapter.get_string("report", "output"),
            Some("/tmp/out.csv".to_string())
        );
    }

    #[test]
    fn from_file_returns_error_for_missing_file() {
        let result = FileConfigAdapter::from_file("/nonexistent/path/config.ini");
        assert!(result.is_err());
    }
}
