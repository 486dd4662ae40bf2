//! `lume-config`: Lume runtime configuration.
//!
//! Provides:
//! - Typed config schema with resolved accessors
//! - YAML loading from `~/.lume/config.yaml`
//! - `${ENV_VAR}` substitution and environment overrides
//! - Default value application
//! - Validation and redaction for display

pub mod defaults;
pub mod env;
pub mod io;
pub mod redact;
pub mod schema;
pub mod validation;

// Re-export most-used types at crate root.
pub use defaults::apply_all_defaults;
pub use env::{apply_env_overrides, apply_env_overrides_with, resolve_env_vars, resolve_env_vars_with, MissingEnvVarError};
pub use io::{config_dir, config_file_path, load_raw_config};
pub use redact::redact;
pub use schema::LumeConfig;
pub use validation::{validate, ConfigValidationError, ValidationReport};

use anyhow::{Context, Result};
use std::path::Path;

/// Load, substitute env vars, apply env overrides and defaults, and log
/// validation findings.
///
/// This is the main entry point for loading a config at runtime.
pub async fn load_and_prepare(path: &Path) -> Result<LumeConfig> {
    let raw = load_raw_config(path).await?;

    // Substitute ${VAR} env vars before typing, so numbers can come from env too.
    let value = resolve_env_vars(&raw).context("Failed to resolve env vars in config")?;

    let config: LumeConfig = serde_json::from_value(value)
        .with_context(|| format!("Invalid config structure in {}", path.display()))?;

    let config = apply_env_overrides(config)?;
    let config = apply_all_defaults(config);

    let report = validate(&config);
    for warning in &report.warnings {
        tracing::warn!(path = %warning.path, message = %warning.message, "Config warning");
    }
    for error in &report.errors {
        tracing::error!(path = %error.path, message = %error.message, "Config error");
    }

    Ok(config)
}
