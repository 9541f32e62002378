// =============================================================================
// config.rs: THE CONFIGURATION OBJECT
// =============================================================================
//
// Two layers:
//
// * `EngineConfig` holds the tunables (similarity threshold, worker count,
//   log format). Defaults live here, a `.env` file or `PHISH_GUARD_*`
//   environment variables can override them, and command-line flags
//   override those.
//
// * `CheckConfig` is everything one `check` run needs: the three input
//   paths, the optional outputs, and the engine tunables. It is built once
//   at startup and passed down explicitly. Nothing reads global state.
//
// Validation happens before any file is loaded, so a typo in a path fails
// in milliseconds instead of after the model is warmed up.
// =============================================================================

use std::env;
use std::path::PathBuf;

use crate::error::ConfigError;
use crate::matcher::DEFAULT_THRESHOLD;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Engine tunables.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Similarity a key word must exceed to count as an alias match.
    /// Default: 0.59
    pub threshold: f64,

    /// Worker threads for the batch driver. Default: 1 (sequential).
    pub workers: usize,

    /// Default: pretty
    pub log_format: LogFormat,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            workers: 1,
            log_format: LogFormat::Pretty,
        }
    }
}

impl EngineConfig {
    /// Load from the process environment (and `.env`, if present).
    ///
    /// * `PHISH_GUARD_THRESHOLD`  - float in [0, 1]
    /// * `PHISH_GUARD_WORKERS`    - integer >= 1
    /// * `PHISH_GUARD_LOG_FORMAT` - `pretty` or `json`
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let threshold = match lookup("PHISH_GUARD_THRESHOLD") {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: "PHISH_GUARD_THRESHOLD",
                value: raw,
            })?,
            None => defaults.threshold,
        };

        let workers = match lookup("PHISH_GUARD_WORKERS") {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: "PHISH_GUARD_WORKERS",
                value: raw,
            })?,
            None => defaults.workers,
        };

        let log_format = match lookup("PHISH_GUARD_LOG_FORMAT") {
            Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
                "pretty" | "text" => LogFormat::Pretty,
                "json" => LogFormat::Json,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: "PHISH_GUARD_LOG_FORMAT",
                        value: raw,
                    })
                }
            },
            None => defaults.log_format,
        };

        let config = Self {
            threshold,
            workers,
            log_format,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(ConfigError::ThresholdOutOfRange(self.threshold));
        }
        if self.workers == 0 {
            return Err(ConfigError::NoWorkers);
        }
        Ok(())
    }
}

/// Everything a `check` run needs.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckConfig {
    pub white_list: PathBuf,
    pub model_path: PathBuf,
    pub to_test: PathBuf,
    pub output_file: Option<PathBuf>,
    pub report_file: Option<PathBuf>,
    /// Only emit entities with these labels. Empty = all labels.
    pub labels: Vec<String>,
    pub engine: EngineConfig,
}

impl CheckConfig {
    /// Fail fast on missing inputs or out-of-range tunables.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.engine.validate()?;

        let inputs = [
            ("whitelist", &self.white_list),
            ("entity model", &self.model_path),
            ("input dataset", &self.to_test),
        ];
        for (what, path) in inputs {
            if !path.exists() {
                return Err(ConfigError::MissingPath {
                    what,
                    path: path.clone(),
                });
            }
        }
        Ok(())
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
    fn test_defaults() {
        let config = EngineConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.threshold, 0.59);
        assert_eq!(config.workers, 1);
    }

    #[test]
    fn test_overrides() {
        let config = EngineConfig::from_lookup(lookup(&[
            ("PHISH_GUARD_THRESHOLD", "0.75"),
            ("PHISH_GUARD_WORKERS", " 8 "),
            ("PHISH_GUARD_LOG_FORMAT", "JSON"),
        ]))
        .unwrap();
        assert_eq!(config.threshold, 0.75);
        assert_eq!(config.workers, 8);
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(matches!(
            EngineConfig::from_lookup(lookup(&[("PHISH_GUARD_THRESHOLD", "high")])),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            EngineConfig::from_lookup(lookup(&[("PHISH_GUARD_THRESHOLD", "1.5")])),
            Err(ConfigError::ThresholdOutOfRange(_))
        ));
        assert!(matches!(
            EngineConfig::from_lookup(lookup(&[("PHISH_GUARD_WORKERS", "0")])),
            Err(ConfigError::NoWorkers)
        ));
        assert!(matches!(
            EngineConfig::from_lookup(lookup(&[("PHISH_GUARD_LOG_FORMAT", "xml")])),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_check_config_reports_missing_paths() {
        let dir = tempfile::tempdir().unwrap();
        let white_list = dir.path().join("white_list.json");
        std::fs::write(&white_list, "[]").unwrap();

        let config = CheckConfig {
            white_list,
            model_path: dir.path().join("no_model"),
            to_test: dir.path().join("to_test.json"),
            output_file: None,
            report_file: None,
            labels: Vec::new(),
            engine: EngineConfig::default(),
        };

        match config.validate() {
            Err(ConfigError::MissingPath { what, .. }) => assert_eq!(what, "entity model"),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
