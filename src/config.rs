use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cleaning::CleanerConfig;
use crate::constants;
use crate::error::{Result, SalesError};
use crate::reports::{Format, ReportParams};

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub input: InputConfig,
    pub store: StoreConfig,
    pub cleaning: CleanerConfig,
    pub reports: ReportsConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
    /// Environment variables that overrode file values, reported once
    /// logging is up
    #[serde(skip)]
    pub env_overrides: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub path: Option<String>,
    /// Single-byte field delimiter
    pub delimiter: char,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            path: None,
            delimiter: ',',
        }
    }
}

impl InputConfig {
    pub fn delimiter_byte(&self) -> Result<u8> {
        u8::try_from(self.delimiter)
            .ok()
            .filter(|b| b.is_ascii())
            .ok_or_else(|| {
                SalesError::Config(format!(
                    "delimiter '{}' must be a single ASCII character",
                    self.delimiter
                ))
            })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite database file, or `:memory:`
    pub path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: "sales.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportsConfig {
    pub previous_year: i32,
    pub current_year: i32,
    pub top_k: u32,
    pub limit: u32,
    pub format: Format,
}

impl Default for ReportsConfig {
    fn default() -> Self {
        Self {
            previous_year: constants::DEFAULT_PREVIOUS_YEAR,
            current_year: constants::DEFAULT_CURRENT_YEAR,
            top_k: constants::DEFAULT_TOP_K,
            limit: constants::DEFAULT_LIMIT,
            format: Format::Table,
        }
    }
}

impl ReportsConfig {
    pub fn params(&self) -> ReportParams {
        ReportParams {
            previous_year: self.previous_year,
            current_year: self.current_year,
            top_k: self.top_k,
            limit: self.limit,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: "output".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub dir: String,
    pub file_prefix: String,
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: "logs".to_string(),
            file_prefix: "sales_analytics.log".to_string(),
            filter: "sales_analytics=info".to_string(),
        }
    }
}

impl Config {
    /// Parse a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            SalesError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    /// Load `path` if given (it must exist), otherwise `config.toml` if present,
    /// otherwise defaults. Environment overrides are applied last.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::load_from(p)?,
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Self::load_from(DEFAULT_CONFIG_PATH)?
            }
            None => {
                debug!("No config file found, using defaults");
                Self::default()
            }
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Apply `SALES_*` environment overrides
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from `lookup`, recording which variables were used
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let targets: [(&str, &mut String); 3] = [
            ("SALES_DB_PATH", &mut self.store.path),
            ("SALES_OUTPUT_DIR", &mut self.output.dir),
            ("SALES_LOG_DIR", &mut self.logging.dir),
        ];
        for (key, slot) in targets {
            if let Some(v) = lookup(key).filter(|v| !v.trim().is_empty()) {
                *slot = v;
                self.env_overrides.push(key.to_string());
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.input.delimiter_byte()?;
        if self.cleaning.date_formats.is_empty() {
            return Err(SalesError::Config("cleaning.date_formats is empty".to_string()));
        }
        if self.cleaning.time_formats.is_empty() {
            return Err(SalesError::Config("cleaning.time_formats is empty".to_string()));
        }
        if self.reports.previous_year == self.reports.current_year {
            return Err(SalesError::Config(
                "reports.previous_year and reports.current_year must differ".to_string(),
            ));
        }
        if self.reports.top_k == 0 {
            return Err(SalesError::Config("reports.top_k must be at least 1".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.store.path, "sales.db");
        assert_eq!(config.reports.previous_year, 2022);
        assert_eq!(config.reports.current_year, 2023);
        assert_eq!(config.input.delimiter_byte().unwrap(), b',');
        assert!(!config.cleaning.date_formats.is_empty());
    }

    #[test]
    fn test_partial_sections_merge_with_defaults() {
        let config = Config::from_toml_str(
            r#"
            [reports]
            previous_year = 2019
            current_year = 2020
            format = "json"

            [input]
            delimiter = ";"
            "#,
        )
        .unwrap();
        assert_eq!(config.reports.previous_year, 2019);
        assert_eq!(config.reports.top_k, 3);
        assert_eq!(config.reports.format, Format::Json);
        assert_eq!(config.input.delimiter_byte().unwrap(), b';');
    }

    #[test]
    fn test_same_years_are_rejected() {
        let err = Config::from_toml_str(
            r#"
            [reports]
            previous_year = 2023
            current_year = 2023
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, SalesError::Config(_)));
    }

    #[test]
    fn test_env_overrides_are_applied_and_recorded() {
        let mut config = Config::default();
        config.apply_overrides(|key| match key {
            "SALES_DB_PATH" => Some("/tmp/other.db".to_string()),
            "SALES_LOG_DIR" => Some("  ".to_string()),
            _ => None,
        });
        assert_eq!(config.store.path, "/tmp/other.db");
        assert_eq!(config.logging.dir, LoggingConfig::default().dir);
        assert_eq!(config.env_overrides, vec!["SALES_DB_PATH"]);
    }

    #[test]
    fn test_non_ascii_delimiter_is_rejected() {
        let err = Config::from_toml_str("[input]\ndelimiter = \"→\"\n").unwrap_err();
        assert!(matches!(err, SalesError::Config(_)));
    }
}
