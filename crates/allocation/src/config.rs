//! Engine configuration.

use std::collections::BTreeSet;
use std::path::Path;

use chrono::NaiveDate;
use resman_core::WorkingDays;
use serde::{Deserialize, Serialize};

use crate::calendar::BusinessCalendar;

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// I/O error
    #[error("failed to read config {path}: {source}")]
    Io {
        /// File that could not be read
        path: String,
        /// Underlying error
        source: std::io::Error,
    },

    /// Malformed JSON
    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Well-formed but unusable values
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Configuration for the allocation engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Weekdays counted towards task duration (0 = Sunday .. 6 = Saturday)
    pub business_days: WorkingDays,
    /// Dates never counted towards task duration
    pub holidays: BTreeSet<NaiveDate>,
    /// Log data-quality findings on each computation
    pub log_diagnostics: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            business_days: WorkingDays::WEEKDAYS,
            holidays: BTreeSet::new(),
            log_diagnostics: true,
        }
    }
}

impl EngineConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set business weekdays.
    pub fn with_business_days(mut self, days: WorkingDays) -> Self {
        self.business_days = days;
        self
    }

    /// Add holidays.
    pub fn with_holidays(mut self, holidays: impl IntoIterator<Item = NaiveDate>) -> Self {
        self.holidays.extend(holidays);
        self
    }

    /// Enable or disable diagnostic logging.
    pub fn with_log_diagnostics(mut self, enabled: bool) -> Self {
        self.log_diagnostics = enabled;
        self
    }

    /// Parse and validate a JSON document. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Load from a JSON file if it exists, otherwise use defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Reject configurations that cannot produce a duration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.business_days.is_empty() {
            return Err(ConfigError::Invalid("businessDays must not be empty".into()));
        }
        Ok(())
    }

    /// Build the business calendar.
    pub fn calendar(&self) -> BusinessCalendar {
        BusinessCalendar::new()
            .with_business_days(self.business_days)
            .with_holidays(self.holidays.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_document() {
        let config = EngineConfig::from_json("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.business_days, WorkingDays::WEEKDAYS);
        assert!(config.log_diagnostics);
    }

    #[test]
    fn test_parse_full_document() {
        let config = EngineConfig::from_json(
            r#"{"businessDays": [0, 1, 2, 3, 4], "holidays": ["2024-12-25"], "logDiagnostics": false}"#,
        )
        .unwrap();
        assert_eq!(config.business_days.codes(), vec![0, 1, 2, 3, 4]);
        assert!(config.holidays.contains(&NaiveDate::from_ymd_opt(2024, 12, 25).unwrap()));
        assert!(!config.log_diagnostics);

        let cal = config.calendar();
        assert!(!cal.is_business_day(NaiveDate::from_ymd_opt(2024, 12, 25).unwrap()));
    }

    #[test]
    fn test_rejects_empty_business_days() {
        assert!(matches!(
            EngineConfig::from_json(r#"{"businessDays": []}"#),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = EngineConfig::load_or_default("/nonexistent/resman/config.json").unwrap();
        assert_eq!(config, EngineConfig::default());
    }
}
