//! Engine configuration.
//!
//! Defaults suit local runs; `from_env` reads `DEPOTSCORE_*` variables and
//! `from_json_str` loads the same shape from a JSON document.

use serde::{Deserialize, Serialize};

pub const AUTO_SETTLE_VAR: &str = "DEPOTSCORE_AUTO_SETTLE";
pub const LOG_FORMAT_VAR: &str = "DEPOTSCORE_LOG_FORMAT";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

impl core::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            other => Err(format!("unknown log format: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Settle the previous quarter when a depot records its first invoice of
    /// a quarter-opening month.
    pub auto_settle: bool,
    pub log_format: LogFormat,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            auto_settle: true,
            log_format: LogFormat::Json,
        }
    }
}

impl EngineConfig {
    /// Read configuration from the process environment.
    ///
    /// Unparsable values fall back to the default with a warning.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(raw) = lookup(AUTO_SETTLE_VAR) {
            match raw.trim().parse::<bool>() {
                Ok(value) => config.auto_settle = value,
                Err(_) => tracing::warn!(
                    "{AUTO_SETTLE_VAR}={raw:?} is not a bool; keeping {}",
                    config.auto_settle
                ),
            }
        }

        if let Some(raw) = lookup(LOG_FORMAT_VAR) {
            match raw.parse::<LogFormat>() {
                Ok(format) => config.log_format = format,
                Err(e) => tracing::warn!("{LOG_FORMAT_VAR}: {e}; keeping {:?}", config.log_format),
            }
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_enable_auto_settlement() {
        let config = EngineConfig::from_lookup(lookup(&[]));
        assert_eq!(config, EngineConfig::default());
        assert!(config.auto_settle);
    }

    #[test]
    fn env_values_override_defaults() {
        let config = EngineConfig::from_lookup(lookup(&[
            (AUTO_SETTLE_VAR, "false"),
            (LOG_FORMAT_VAR, "Pretty"),
        ]));
        assert!(!config.auto_settle);
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn bad_values_keep_defaults() {
        let config = EngineConfig::from_lookup(lookup(&[
            (AUTO_SETTLE_VAR, "sometimes"),
            (LOG_FORMAT_VAR, "xml"),
        ]));
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn json_fills_missing_fields_with_defaults() {
        let config = EngineConfig::from_json_str(r#"{ "log_format": "pretty" }"#).unwrap();
        assert!(config.auto_settle);
        assert_eq!(config.log_format, LogFormat::Pretty);
    }
}
