//! TOML-based configuration for calcsql.
//!
//! Supports a config file (calcsql.toml) with environment variable expansion
//! in the catalog path.
//!
//! Example configuration:
//! ```toml
//! [preview]
//! dialect = "postgres"
//! sample_deal_numbers = [101, 102, 103]
//! sample_tranche_ids = ["A", "B"]
//! sample_cycle = 202404
//!
//! [validator]
//! max_sql_length = 50000
//! max_placeholders = 100
//! strict_parse = false
//!
//! [catalog]
//! path = "${CALCSQL_HOME}/catalog.toml"
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::generator::PreviewOptions;
use crate::sql::Dialect;
use crate::validation::{ValidatorOptions, DEFAULT_MAX_PLACEHOLDERS, DEFAULT_MAX_SQL_LENGTH};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "CALCSQL_CONFIG";

/// Config file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "calcsql.toml";

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Preview query rendering.
    pub preview: PreviewSettings,

    /// System SQL validator limits.
    pub validator: ValidatorSettings,

    /// Schema catalog location.
    pub catalog: CatalogSettings,
}

/// Preview query settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PreviewSettings {
    /// Output dialect (postgres, duckdb, tsql).
    pub dialect: Dialect,

    /// Deal numbers used in the illustrative WHERE clause.
    pub sample_deal_numbers: Vec<i64>,

    /// Tranche ids used when tranche is joined.
    pub sample_tranche_ids: Vec<String>,

    /// Cycle code used when tranche balances are joined.
    pub sample_cycle: Option<i64>,
}

impl Default for PreviewSettings {
    fn default() -> Self {
        let options = PreviewOptions::default();
        Self {
            dialect: options.dialect,
            sample_deal_numbers: options.sample_deal_numbers,
            sample_tranche_ids: options.sample_tranche_ids,
            sample_cycle: options.sample_cycle,
        }
    }
}

impl PreviewSettings {
    pub fn to_options(&self) -> PreviewOptions {
        PreviewOptions {
            dialect: self.dialect,
            sample_deal_numbers: self.sample_deal_numbers.clone(),
            sample_tranche_ids: self.sample_tranche_ids.clone(),
            sample_cycle: self.sample_cycle,
        }
    }
}

/// Validator settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ValidatorSettings {
    /// SQL longer than this many characters is rejected outright.
    pub max_sql_length: usize,

    /// Placeholder occurrences allowed before name checks are skipped.
    pub max_placeholders: usize,

    /// Also parse System SQL with sqlparser.
    pub strict_parse: bool,
}

impl Default for ValidatorSettings {
    fn default() -> Self {
        Self {
            max_sql_length: DEFAULT_MAX_SQL_LENGTH,
            max_placeholders: DEFAULT_MAX_PLACEHOLDERS,
            strict_parse: false,
        }
    }
}

impl ValidatorSettings {
    /// Validator options; the strict parser follows the preview dialect.
    pub fn to_options(&self, dialect: Dialect) -> ValidatorOptions {
        ValidatorOptions {
            max_sql_length: self.max_sql_length,
            max_placeholders: self.max_placeholders,
            strict_parse: self.strict_parse,
            dialect,
        }
    }
}

/// Catalog settings.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CatalogSettings {
    /// Catalog TOML file (supports ${ENV_VAR} expansion). The built-in
    /// catalog is used when unset.
    pub path: Option<String>,
}

impl CatalogSettings {
    /// Get the catalog path with environment variables expanded.
    pub fn resolved_path(&self) -> Result<Option<PathBuf>, SettingsError> {
        self.path
            .as_deref()
            .map(|p| expand_env_vars(p).map(PathBuf::from))
            .transpose()
    }
}

impl Settings {
    /// Parse settings from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, SettingsError> {
        let settings: Settings = toml::from_str(content)?;
        settings.check()?;
        Ok(settings)
    }

    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `CALCSQL_CONFIG`
    /// 2. `./calcsql.toml`
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var(CONFIG_ENV_VAR) {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from(CONFIG_FILE_NAME);
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        tracing::debug!("no config file found, using defaults");
        Ok(Settings::default())
    }

    fn check(&self) -> Result<(), SettingsError> {
        if self.validator.max_sql_length == 0 {
            return Err(SettingsError::InvalidConfig(
                "validator.max_sql_length must be greater than zero".into(),
            ));
        }
        if let Some(cycle) = self.preview.sample_cycle {
            let month = cycle % 100;
            if cycle < 100 || !(1..=12).contains(&month) {
                return Err(SettingsError::InvalidConfig(format!(
                    "preview.sample_cycle {} is not a YYYYMM cycle code",
                    cycle
                )));
            }
        }
        Ok(())
    }

    pub fn preview_options(&self) -> PreviewOptions {
        self.preview.to_options()
    }

    pub fn validator_options(&self) -> ValidatorOptions {
        self.validator.to_options(self.preview.dialect)
    }
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax.
pub fn expand_env_vars(s: &str) -> Result<String, SettingsError> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            result.push(c);
            continue;
        }

        let mut var_name = String::new();
        if chars.peek() == Some(&'{') {
            chars.next();
            for ch in chars.by_ref() {
                if ch == '}' {
                    break;
                }
                var_name.push(ch);
            }
        } else {
            while let Some(ch) = chars.next_if(|ch| ch.is_alphanumeric() || *ch == '_') {
                var_name.push(ch);
            }
            if var_name.is_empty() {
                // lone $
                result.push('$');
                continue;
            }
        }

        let value =
            env::var(&var_name).map_err(|_| SettingsError::MissingEnvVar(var_name.clone()))?;
        result.push_str(&value);
    }

    Ok(result)
}
