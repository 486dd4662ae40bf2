//! Config defaults: applies sensible default values to parsed config.

use crate::schema::{AssistantConfig, LlmConfig, LoggingConfig, LumeConfig, MemoryConfig};

pub const DEFAULT_ASSISTANT_NAME: &str = "Lume";
pub const DEFAULT_LANGUAGE: &str = "es";
pub const DEFAULT_PROVIDER: &str = "openai";
pub const DEFAULT_MODEL: &str = "gpt-4-turbo";
pub const DEFAULT_TEMPERATURE: f32 = 0.3;
pub const DEFAULT_MAX_TOKENS: u32 = 512;

/// Turns kept per conversation (K).
pub const DEFAULT_WINDOW_TURNS: usize = 10;

pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Apply all defaults to a freshly loaded config.
pub fn apply_all_defaults(config: LumeConfig) -> LumeConfig {
    let config = apply_assistant_defaults(config);
    let config = apply_llm_defaults(config);
    let config = apply_memory_defaults(config);
    apply_logging_defaults(config)
}

fn apply_assistant_defaults(mut config: LumeConfig) -> LumeConfig {
    let assistant = config.assistant.get_or_insert_with(AssistantConfig::default);
    assistant.name.get_or_insert_with(|| DEFAULT_ASSISTANT_NAME.to_string());
    assistant.language.get_or_insert_with(|| DEFAULT_LANGUAGE.to_string());
    config
}

fn apply_llm_defaults(mut config: LumeConfig) -> LumeConfig {
    let llm = config.llm.get_or_insert_with(LlmConfig::default);
    llm.provider.get_or_insert_with(|| DEFAULT_PROVIDER.to_string());
    llm.model.get_or_insert_with(|| DEFAULT_MODEL.to_string());
    llm.temperature.get_or_insert(DEFAULT_TEMPERATURE);
    llm.max_tokens.get_or_insert(DEFAULT_MAX_TOKENS);
    config
}

/// Context turns default to the window size.
fn apply_memory_defaults(mut config: LumeConfig) -> LumeConfig {
    let memory = config.memory.get_or_insert_with(MemoryConfig::default);
    let window = *memory.window_turns.get_or_insert(DEFAULT_WINDOW_TURNS);
    memory.context_turns.get_or_insert(window);
    config
}

fn apply_logging_defaults(mut config: LumeConfig) -> LumeConfig {
    let logging = config.logging.get_or_insert_with(LoggingConfig::default);
    logging.level.get_or_insert_with(|| DEFAULT_LOG_LEVEL.to_string());
    logging.json.get_or_insert(false);
    config
}
