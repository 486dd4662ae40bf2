pub mod ollama;
pub mod openai;
pub mod scripted;

pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;
pub use scripted::ScriptedProvider;

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use lume_core::{LlmProvider, LlmRequest};

/// Registry of LLM providers, looked up by name.
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn LlmProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self {
            providers: HashMap::new(),
        }
    }

    /// Register a provider under its own name.
    pub fn register(&mut self, provider: Arc<dyn LlmProvider>) {
        self.providers.insert(provider.name().to_string(), provider);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn LlmProvider>> {
        self.providers.get(name).cloned()
    }

    /// Get providers matching the given names (in order).
    /// Unknown names are silently skipped.
    pub fn get_providers(&self, names: &[String]) -> Vec<Arc<dyn LlmProvider>> {
        names
            .iter()
            .filter_map(|name| self.providers.get(name).cloned())
            .collect()
    }

    /// Registered provider names, sorted.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.providers.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Role/content pair in the chat format both HTTP providers speak.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// System prompt first (when set), then the conversation turns oldest first.
pub(crate) fn chat_messages(request: &LlmRequest) -> Vec<ChatMessage> {
    let system = (!request.system_prompt.is_empty()).then(|| ChatMessage {
        role: "system".to_string(),
        content: request.system_prompt.clone(),
    });
    system
        .into_iter()
        .chain(request.turns.iter().map(|turn| ChatMessage {
            role: turn.role().as_str().to_string(),
            content: turn.text().to_string(),
        }))
        .collect()
}
