use thiserror::Error;

/// Top-level error type for the Lume runtime.
#[derive(Debug, Error)]
pub enum LumeError {
    #[error("LLM provider error ({provider}): {message}")]
    LlmError { provider: String, message: String },

    #[error("all LLM providers failed")]
    AllProvidersFailed,

    #[error("channel closed: {0}")]
    ChannelClosed(String),

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl LumeError {
    pub fn llm(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::LlmError {
            provider: provider.into(),
            message: message.into(),
        }
    }
}
