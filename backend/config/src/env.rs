//! Environment variables in config: `${VAR}` substitution and overrides.
//!
//! Substitution matches uppercase `[A-Z_][A-Z0-9_]*` names in string values;
//! `$${VAR}` escapes to a literal `${VAR}`.

use std::collections::HashMap;

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;

use crate::schema::{DiscordConfig, LlmConfig, LoggingConfig, LumeConfig, MemoryConfig};

/// `$${NAME}` (escaped) or `${NAME}`.
static ENV_REF: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$(\$?)\{([A-Z_][A-Z0-9_]*)\}").unwrap());

#[derive(Debug, thiserror::Error)]
#[error("Missing env var \"{var_name}\" referenced at config path: {config_path}")]
pub struct MissingEnvVarError {
    pub var_name: String,
    pub config_path: String,
}

/// Substitute `${VAR}` references from the process environment.
pub fn resolve_env_vars(value: &Value) -> Result<Value> {
    resolve_env_vars_with(value, &std::env::vars().collect())
}

/// Substitute env vars using a provided map (useful for testing).
pub fn resolve_env_vars_with(value: &Value, env: &HashMap<String, String>) -> Result<Value> {
    Ok(substitute_value(value, env, "")?)
}

fn substitute_value(value: &Value, env: &HashMap<String, String>, path: &str) -> Result<Value, MissingEnvVarError> {
    match value {
        Value::String(s) => substitute_string(s, env, path).map(Value::String),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, v)| substitute_value(v, env, &format!("{path}[{i}]")))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Value::Object(map) => {
            let mut result = serde_json::Map::new();
            for (key, v) in map {
                let child_path = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{path}.{key}")
                };
                result.insert(key.clone(), substitute_value(v, env, &child_path)?);
            }
            Ok(Value::Object(result))
        }
        other => Ok(other.clone()),
    }
}

fn substitute_string(s: &str, env: &HashMap<String, String>, path: &str) -> Result<String, MissingEnvVarError> {
    if !s.contains('$') {
        return Ok(s.to_string());
    }

    let mut missing = None;
    let substituted = ENV_REF.replace_all(s, |caps: &Captures| {
        let name = &caps[2];
        if !caps[1].is_empty() {
            return format!("${{{name}}}");
        }
        match env.get(name) {
            Some(val) if !val.is_empty() => val.clone(),
            _ => {
                missing.get_or_insert_with(|| MissingEnvVarError {
                    var_name: name.to_string(),
                    config_path: path.to_string(),
                });
                String::new()
            }
        }
    });

    match missing {
        Some(err) => Err(err),
        None => Ok(substituted.into_owned()),
    }
}

// ---------------------------------------------------------------------------
// Overrides
// ---------------------------------------------------------------------------

pub const DISCORD_TOKEN_VAR: &str = "DISCORD_TOKEN";
pub const OPENAI_API_KEY_VAR: &str = "OPENAI_API_KEY";
pub const MODEL_VAR: &str = "LUME_MODEL";
pub const MEMORY_TURNS_VAR: &str = "LUME_MEMORY_TURNS";
pub const LOG_VAR: &str = "LUME_LOG";

/// Apply overrides from the process environment.
pub fn apply_env_overrides(config: LumeConfig) -> Result<LumeConfig> {
    apply_env_overrides_with(config, &std::env::vars().collect())
}

/// Environment values win over file values; empty values are ignored.
pub fn apply_env_overrides_with(mut config: LumeConfig, env: &HashMap<String, String>) -> Result<LumeConfig> {
    let get = |name: &str| env.get(name).map(|v| v.trim()).filter(|v| !v.is_empty());

    if let Some(token) = get(DISCORD_TOKEN_VAR) {
        config.discord.get_or_insert_with(DiscordConfig::default).token = Some(token.to_string());
    }
    if let Some(key) = get(OPENAI_API_KEY_VAR) {
        let llm = config.llm.get_or_insert_with(LlmConfig::default);
        // Only fills the gap; an explicit apiKey in the file is kept.
        if llm.api_key.as_deref().map_or(true, str::is_empty) {
            llm.api_key = Some(key.to_string());
        }
    }
    if let Some(model) = get(MODEL_VAR) {
        config.llm.get_or_insert_with(LlmConfig::default).model = Some(model.to_string());
    }
    if let Some(turns) = get(MEMORY_TURNS_VAR) {
        let turns: usize = turns
            .parse()
            .with_context(|| format!("{MEMORY_TURNS_VAR} must be a positive integer, got '{turns}'"))?;
        config.memory.get_or_insert_with(MemoryConfig::default).window_turns = Some(turns);
    }
    if let Some(level) = get(LOG_VAR) {
        config.logging.get_or_insert_with(LoggingConfig::default).level = Some(level.to_string());
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn substitutes_simple_var() {
        let v = json!({"llm": {"apiKey": "${OPENAI_API_KEY}"}});
        let result = resolve_env_vars_with(&v, &env(&[("OPENAI_API_KEY", "sk-abc123")])).unwrap();
        assert_eq!(result["llm"]["apiKey"], "sk-abc123");
    }

    #[test]
    fn error_names_var_and_path() {
        let v = json!({"discord": {"token": "${MISSING_VAR}"}});
        let err = resolve_env_vars_with(&v, &HashMap::new()).unwrap_err().to_string();
        assert!(err.contains("MISSING_VAR"));
        assert!(err.contains("discord.token"));
    }

    #[test]
    fn escaped_reference_is_kept_literally() {
        let v = json!({"a": "$${NOT_A_VAR} and ${REAL}"});
        let result = resolve_env_vars_with(&v, &env(&[("REAL", "x")])).unwrap();
        assert_eq!(result["a"], "${NOT_A_VAR} and x");
    }

    #[test]
    fn array_paths_are_indexed() {
        let v = json!({"llm": {"fallbacks": ["openai", "${GONE}"]}});
        let err = resolve_env_vars_with(&v, &HashMap::new()).unwrap_err().to_string();
        assert!(err.contains("llm.fallbacks[1]"));
    }

    #[test]
    fn passthrough_non_var_strings_and_numbers() {
        let v = json!({"key": "plain-string", "n": 3, "lower": "${lower}"});
        let result = resolve_env_vars_with(&v, &HashMap::new()).unwrap();
        assert_eq!(result, v);
    }

    #[test]
    fn overrides_win_over_file_values() {
        let config = LumeConfig {
            llm: Some(LlmConfig {
                model: Some("gpt-4o".into()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let config = apply_env_overrides_with(
            config,
            &env(&[
                ("LUME_MODEL", "llama3"),
                ("LUME_MEMORY_TURNS", "4"),
                ("DISCORD_TOKEN", "tok"),
                ("LUME_LOG", " "),
            ]),
        )
        .unwrap();
        assert_eq!(config.model(), "llama3");
        assert_eq!(config.window_turns(), 4);
        assert_eq!(config.discord_token(), Some("tok"));
        assert_eq!(config.log_level(), "info");
    }

    #[test]
    fn api_key_env_only_fills_gap() {
        let config = LumeConfig {
            llm: Some(LlmConfig {
                api_key: Some("from-file".into()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let config = apply_env_overrides_with(config, &env(&[("OPENAI_API_KEY", "from-env")])).unwrap();
        assert_eq!(config.api_key(), Some("from-file"));

        let config = apply_env_overrides_with(LumeConfig::default(), &env(&[("OPENAI_API_KEY", "from-env")])).unwrap();
        assert_eq!(config.api_key(), Some("from-env"));
    }

    #[test]
    fn bad_memory_turns_is_an_error() {
        let err = apply_env_overrides_with(LumeConfig::default(), &env(&[("LUME_MEMORY_TURNS", "ten")])).unwrap_err();
        assert!(err.to_string().contains("LUME_MEMORY_TURNS"));
    }
}
