//! Lume runtime configuration schema.
//!
//! Every section is optional in the file; `defaults::apply_all_defaults`
//! fills the gaps, and the accessors on `LumeConfig` fall back to the same
//! defaults for configs built in code.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::defaults::{
    DEFAULT_ASSISTANT_NAME, DEFAULT_LANGUAGE, DEFAULT_LOG_LEVEL, DEFAULT_MAX_TOKENS, DEFAULT_MODEL, DEFAULT_PROVIDER,
    DEFAULT_TEMPERATURE, DEFAULT_WINDOW_TURNS,
};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LumeConfig {
    /// How the assistant presents itself
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assistant: Option<AssistantConfig>,

    /// Text-completion provider and model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm: Option<LlmConfig>,

    /// Conversation memory sizing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<MemoryConfig>,

    /// Discord bot credentials
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discord: Option<DiscordConfig>,

    /// Logging configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Language the assistant answers in (e.g. "es").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmConfig {
    /// "openai", "openrouter", "ollama" or "scripted".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Override for OpenAI-compatible or Ollama endpoints.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Providers tried after the primary one, in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fallbacks: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryConfig {
    /// Turns kept per conversation (K).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_turns: Option<usize>,
    /// Turns sent to the model per request; at most `windowTurns`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_turns: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscordConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    /// Filter directive, e.g. "info" or "info,lume_agent=debug".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    /// Directory for rolling JSON log files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json: Option<bool>,
}

// ---------------------------------------------------------------------------
// Resolved accessors
// ---------------------------------------------------------------------------

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|s| !s.trim().is_empty())
}

impl LumeConfig {
    pub fn assistant_name(&self) -> &str {
        non_empty(self.assistant.as_ref().and_then(|a| a.name.as_ref())).unwrap_or(DEFAULT_ASSISTANT_NAME)
    }

    pub fn language(&self) -> &str {
        non_empty(self.assistant.as_ref().and_then(|a| a.language.as_ref())).unwrap_or(DEFAULT_LANGUAGE)
    }

    pub fn provider(&self) -> &str {
        non_empty(self.llm.as_ref().and_then(|l| l.provider.as_ref())).unwrap_or(DEFAULT_PROVIDER)
    }

    pub fn model(&self) -> &str {
        non_empty(self.llm.as_ref().and_then(|l| l.model.as_ref())).unwrap_or(DEFAULT_MODEL)
    }

    pub fn temperature(&self) -> f32 {
        self.llm
            .as_ref()
            .and_then(|l| l.temperature)
            .unwrap_or(DEFAULT_TEMPERATURE)
    }

    pub fn max_tokens(&self) -> u32 {
        self.llm
            .as_ref()
            .and_then(|l| l.max_tokens)
            .unwrap_or(DEFAULT_MAX_TOKENS)
    }

    pub fn api_key(&self) -> Option<&str> {
        non_empty(self.llm.as_ref().and_then(|l| l.api_key.as_ref()))
    }

    pub fn base_url(&self) -> Option<&str> {
        non_empty(self.llm.as_ref().and_then(|l| l.base_url.as_ref()))
    }

    /// Primary provider followed by the fallbacks, without duplicates.
    pub fn provider_chain(&self) -> Vec<String> {
        let mut chain = vec![self.provider().to_string()];
        if let Some(llm) = &self.llm {
            for name in &llm.fallbacks {
                if !chain.contains(name) {
                    chain.push(name.clone());
                }
            }
        }
        chain
    }

    pub fn window_turns(&self) -> usize {
        self.memory
            .as_ref()
            .and_then(|m| m.window_turns)
            .unwrap_or(DEFAULT_WINDOW_TURNS)
    }

    /// Never larger than the window.
    pub fn context_turns(&self) -> usize {
        let window = self.window_turns();
        self.memory
            .as_ref()
            .and_then(|m| m.context_turns)
            .unwrap_or(window)
            .min(window)
    }

    pub fn discord_token(&self) -> Option<&str> {
        non_empty(self.discord.as_ref().and_then(|d| d.token.as_ref()))
    }

    pub fn log_level(&self) -> &str {
        non_empty(self.logging.as_ref().and_then(|l| l.level.as_ref())).unwrap_or(DEFAULT_LOG_LEVEL)
    }

    pub fn log_dir(&self) -> Option<PathBuf> {
        self.logging.as_ref().and_then(|l| l.dir.clone())
    }

    pub fn log_json(&self) -> bool {
        self.logging.as_ref().and_then(|l| l.json).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config = LumeConfig::default();
        assert_eq!(config.assistant_name(), "Lume");
        assert_eq!(config.model(), "gpt-4-turbo");
        assert_eq!(config.window_turns(), 10);
        assert_eq!(config.context_turns(), 10);
        assert_eq!(config.max_tokens(), 512);
        assert!(config.api_key().is_none());
        assert_eq!(config.provider_chain(), vec!["openai".to_string()]);
    }

    #[test]
    fn parses_camel_case_yaml() {
        let yaml = r#"
assistant:
  name: Nova
llm:
  provider: ollama
  maxTokens: 256
  fallbacks: [openai, ollama]
memory:
  windowTurns: 6
  contextTurns: 20
discord:
  token: abc
"#;
        let config: LumeConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.assistant_name(), "Nova");
        assert_eq!(config.max_tokens(), 256);
        assert_eq!(config.provider_chain(), vec!["ollama".to_string(), "openai".to_string()]);
        assert_eq!(config.window_turns(), 6);
        assert_eq!(config.context_turns(), 6);
        assert_eq!(config.discord_token(), Some("abc"));
    }

    #[test]
    fn blank_strings_count_as_unset() {
        let config = LumeConfig {
            discord: Some(DiscordConfig { token: Some("  ".into()) }),
            ..Default::default()
        };
        assert!(config.discord_token().is_none());
    }
}
