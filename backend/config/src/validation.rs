//! Config validation with user-friendly error messages.

use crate::schema::LumeConfig;
use thiserror::Error;

const KNOWN_PROVIDERS: &[&str] = &["openai", "openrouter", "ollama", "scripted"];

/// A config validation error with field path and message.
#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

/// A collection of validation errors found in one pass.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Validate the config and return a report of all errors and warnings.
pub fn validate(config: &LumeConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_llm(config, &mut report);
    validate_memory(config, &mut report);
    validate_discord(config, &mut report);
    report
}

fn validate_llm(config: &LumeConfig, report: &mut ValidationReport) {
    for (i, name) in config.provider_chain().iter().enumerate() {
        if !KNOWN_PROVIDERS.contains(&name.as_str()) {
            let path = if i == 0 {
                "llm.provider".to_string()
            } else {
                "llm.fallbacks".to_string()
            };
            report.error(
                path,
                format!("Unknown provider '{name}' (expected one of: {})", KNOWN_PROVIDERS.join(", ")),
            );
        }
    }

    let temperature = config.temperature();
    if !(0.0..=2.0).contains(&temperature) {
        report.error("llm.temperature", format!("Temperature {temperature} must be within 0.0..=2.0"));
    }
    if config.max_tokens() == 0 {
        report.error("llm.maxTokens", "maxTokens must be > 0");
    }

    let needs_key = config
        .provider_chain()
        .iter()
        .any(|p| p == "openai" || p == "openrouter");
    if needs_key && config.api_key().is_none() {
        report.warn("llm.apiKey", "No API key configured; completion calls will fail");
    }
}

fn validate_memory(config: &LumeConfig, report: &mut ValidationReport) {
    let Some(memory) = &config.memory else { return };
    if memory.window_turns == Some(0) {
        report.error("memory.windowTurns", "windowTurns must be >= 1");
    }
    if memory.context_turns == Some(0) {
        report.error("memory.contextTurns", "contextTurns must be >= 1");
    }
    if let (Some(window), Some(context)) = (memory.window_turns, memory.context_turns) {
        if context > window {
            report.error(
                "memory.contextTurns",
                format!("contextTurns ({context}) cannot exceed windowTurns ({window})"),
            );
        }
    }
}

fn validate_discord(config: &LumeConfig, report: &mut ValidationReport) {
    if config.discord_token().is_none() {
        report.warn("discord.token", "Discord token is not set; `lume run` will not start");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::apply_all_defaults;
    use crate::schema::{DiscordConfig, LlmConfig, MemoryConfig};

    fn valid() -> LumeConfig {
        apply_all_defaults(LumeConfig {
            llm: Some(LlmConfig {
                api_key: Some("sk-test".into()),
                ..Default::default()
            }),
            discord: Some(DiscordConfig { token: Some("tok".into()) }),
            ..Default::default()
        })
    }

    #[test]
    fn defaults_with_credentials_are_clean() {
        let report = validate(&valid());
        assert!(report.is_valid());
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn missing_credentials_are_warnings() {
        let report = validate(&apply_all_defaults(LumeConfig::default()));
        assert!(report.is_valid());
        let paths: Vec<&str> = report.warnings.iter().map(|w| w.path.as_str()).collect();
        assert_eq!(paths, vec!["llm.apiKey", "discord.token"]);
    }

    #[test]
    fn memory_bounds() {
        let mut config = valid();
        config.memory = Some(MemoryConfig {
            window_turns: Some(0),
            context_turns: Some(3),
        });
        let report = validate(&config);
        let paths: Vec<&str> = report.errors.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["memory.windowTurns", "memory.contextTurns"]);
    }

    #[test]
    fn temperature_and_provider_checked() {
        let mut config = valid();
        let llm = config.llm.as_mut().unwrap();
        llm.temperature = Some(3.5);
        llm.fallbacks = vec!["bard".into()];
        let report = validate(&config);
        assert!(report.errors.iter().any(|e| e.path == "llm.temperature"));
        assert!(report.errors.iter().any(|e| e.path == "llm.fallbacks"));
    }

    #[test]
    fn ollama_needs_no_key() {
        let mut config = valid();
        let llm = config.llm.as_mut().unwrap();
        llm.provider = Some("ollama".into());
        llm.api_key = None;
        assert!(validate(&config).warnings.is_empty());
    }
}
