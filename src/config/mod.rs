//! Configuration module for calcsql.
//!
//! Handles the optional `calcsql.toml` file and environment variable expansion.

mod settings;

pub use settings::{
    expand_env_vars, CatalogSettings, PreviewSettings, Settings, SettingsError, ValidatorSettings,
    CONFIG_ENV_VAR, CONFIG_FILE_NAME,
};
