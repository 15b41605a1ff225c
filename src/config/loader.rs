//! Configuration loading
//!
//! Handles loading configuration from embedded defaults, files, and environment.

use super::AppConfig;
use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};

/// Embedded default configuration (compiled into binary)
pub const DEFAULT_CONFIG: &str = include_str!("../../config/default.toml");

/// Load configuration from files and the process environment
pub fn load_config() -> Result<AppConfig> {
    load_with_env(Environment::with_prefix("STEVEDORE"))
}

/// Load configuration using `env` as the highest-priority source
pub(crate) fn load_with_env(env: Environment) -> Result<AppConfig> {
    let profile = std::env::var("STEVEDORE_ENV").unwrap_or_else(|_| "development".to_string());

    let config = Config::builder()
        // 1. Embedded defaults (always available)
        .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
        // 2. External overrides (optional)
        .add_source(File::with_name("config/default").required(false))
        .add_source(File::with_name(&format!("config/{}", profile)).required(false))
        .add_source(File::with_name("config/local").required(false))
        // 3. Environment variables (highest priority)
        // STEVEDORE_DOCKER__ENDPOINT: single `_` after the prefix, `__` between keys
        .add_source(
            env.prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    config
        .try_deserialize()
        .context("Failed to deserialize configuration")
}
