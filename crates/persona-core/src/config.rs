//! Persona Configuration Management
//!
//! A TOML file supplies the base settings, `PERSONA_*` environment
//! variables override them. Every section falls back to its defaults, so
//! an empty file is a valid configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub analysis: AnalysisConfig,
    pub resources: ResourceConfig,
}

impl AppConfig {
    /// Defaults overridden by the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env_override()
    }

    /// Read and validate a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        config.analysis.validate()?;
        Ok(config)
    }

    /// Apply the `PERSONA_*` variables that are set; unset ones keep the
    /// current value
    pub fn with_env_override(self) -> Result<Self, ConfigError> {
        self.apply_env(|key| std::env::var(key).ok())
    }

    fn apply_env(mut self, var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        if let Some(level) = var("PERSONA_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(v) = var("PERSONA_LOG_JSON") {
            self.logging.json_format = parse_flag("PERSONA_LOG_JSON", v)?;
        }
        if let Some(v) = var("PERSONA_MAX_DEPTH") {
            self.analysis.max_depth = parse_value("PERSONA_MAX_DEPTH", v)?;
        }
        if let Some(v) = var("PERSONA_MIN_COEF") {
            self.analysis.min_coef = parse_value("PERSONA_MIN_COEF", v)?;
        }
        if let Some(v) = var("PERSONA_NOMINATIVE_ALWAYS") {
            self.analysis.nominative_case_always = parse_flag("PERSONA_NOMINATIVE_ALWAYS", v)?;
        }
        if let Some(p) = var("PERSONA_LEXICON") {
            self.resources.lexicon_path = Some(PathBuf::from(p));
        }
        if let Some(p) = var("PERSONA_TERMINOLOGY_DIR") {
            self.resources.terminology_dir = Some(PathBuf::from(p));
        }
        self.analysis.validate()?;
        Ok(self)
    }
}

fn parse_value<T: FromStr>(key: &str, value: String) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value,
    })
}

fn parse_flag(key: &str, value: String) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value,
        }),
    }
}

/// Recognition parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Nesting limit for attribute and name resolution calling each other
    pub max_depth: usize,

    /// Every name is in the nominative (registers, reference lists)
    pub nominative_case_always: bool,

    /// Three-word names are written surname first
    pub text_starts_with_lastname_firstname_middlename: bool,

    pub max_list_items: usize,

    /// Known persons above this count disable item-level lookups
    pub ontology_limit: usize,

    /// Lowest score of a name reading accepted without an attribute
    pub min_coef: f64,
}

impl AnalysisConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        let bad = |key: &str, value: String| {
            Err(ConfigError::InvalidValue {
                key: format!("analysis.{key}"),
                value,
            })
        };
        if self.max_depth == 0 {
            return bad("max_depth", "0".to_string());
        }
        // surname, name and middle name at least
        if self.max_list_items < 3 {
            return bad("max_list_items", self.max_list_items.to_string());
        }
        if !self.min_coef.is_finite() || self.min_coef < 0.0 {
            return bad("min_coef", self.min_coef.to_string());
        }
        Ok(())
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_depth: 4,
            nominative_case_always: false,
            text_starts_with_lastname_firstname_middlename: false,
            max_list_items: 10,
            ontology_limit: 1000,
            min_coef: 2.0,
        }
    }
}

/// Replacement resources; the embedded ones are used when unset
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ResourceConfig {
    /// Lexicon TOML file
    pub lexicon_path: Option<PathBuf>,

    /// Directory holding attr_ru.xml, attr_ua.xml and attr_en.xml
    pub terminology_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter level when RUST_LOG is unset
    pub level: String,

    pub json_format: bool,

    /// Add source file and line to every event
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            include_location: false,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed config {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn with_vars(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        AppConfig::default().apply_env(|k| vars.get(k).cloned())
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.analysis.max_depth, 4);
        assert_eq!(config.analysis.ontology_limit, 1000);
        assert!((config.analysis.min_coef - 2.0).abs() < f64::EPSILON);
        assert_eq!(config.logging.level, "info");
        assert!(config.resources.lexicon_path.is_none());
    }

    #[test]
    fn test_partial_toml() {
        let config: AppConfig = toml::from_str(
            r#"
            [analysis]
            nominative_case_always = true

            [resources]
            terminology_dir = "/opt/persona/terms"
            "#,
        )
        .unwrap();
        assert!(config.analysis.nominative_case_always);
        assert_eq!(config.analysis.max_depth, 4);
        assert_eq!(config.resources.terminology_dir, Some(PathBuf::from("/opt/persona/terms")));
    }

    #[test]
    fn test_env_overrides_only_set_values() {
        let config = with_vars(&[
            ("PERSONA_LOG_LEVEL", "debug"),
            ("PERSONA_MIN_COEF", " 1.5"),
            ("PERSONA_NOMINATIVE_ALWAYS", "yes"),
        ])
        .unwrap();
        assert_eq!(config.logging.level, "debug");
        assert!((config.analysis.min_coef - 1.5).abs() < f64::EPSILON);
        assert!(config.analysis.nominative_case_always);
        assert_eq!(config.analysis.max_depth, 4);
        assert!(!config.logging.json_format);
    }

    #[test]
    fn test_env_rejects_bad_values() {
        let err = with_vars(&[("PERSONA_MAX_DEPTH", "deep")]).unwrap_err();
        assert_eq!(err.to_string(), "Invalid value for PERSONA_MAX_DEPTH: deep");
        assert!(with_vars(&[("PERSONA_MAX_DEPTH", "0")]).is_err());
        assert!(with_vars(&[("PERSONA_LOG_JSON", "maybe")]).is_err());
    }

    #[test]
    fn test_validate() {
        let bad = AnalysisConfig {
            max_list_items: 2,
            ..AnalysisConfig::default()
        };
        assert!(bad.validate().is_err());
        let bad = AnalysisConfig {
            min_coef: f64::NAN,
            ..AnalysisConfig::default()
        };
        assert!(bad.validate().is_err());
        assert!(AnalysisConfig::default().validate().is_ok());
    }

    #[test]
    fn test_missing_file() {
        let err = AppConfig::from_file("/nonexistent/persona.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
