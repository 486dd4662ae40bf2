use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use lume_core::{LlmProvider, LlmRequest, LlmResponse, LumeError, Turn};
use lume_logging::redact_sensitive_data;

use crate::providers::ProviderRegistry;

/// Model parameters shared by every request.
#[derive(Debug, Clone)]
pub struct CompletionSettings {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4-turbo".to_string(),
            max_tokens: 512,
            temperature: 0.3,
        }
    }
}

/// The text-completion collaborator: a primary provider plus fallbacks,
/// tried one after another until one answers.
pub struct CompletionClient {
    providers: Vec<Arc<dyn LlmProvider>>,
    settings: CompletionSettings,
}

impl CompletionClient {
    pub fn new(providers: Vec<Arc<dyn LlmProvider>>, settings: CompletionSettings) -> Self {
        Self { providers, settings }
    }

    /// Build from registry names in priority order; unknown names are skipped.
    pub fn from_registry(registry: &ProviderRegistry, chain: &[String], settings: CompletionSettings) -> Self {
        let providers = registry.get_providers(chain);
        if providers.len() < chain.len() {
            warn!(
                requested = chain.len(),
                available = providers.len(),
                "Some configured providers are not registered"
            );
        }
        Self::new(providers, settings)
    }

    pub fn provider_names(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.name().to_string()).collect()
    }

    pub fn settings(&self) -> &CompletionSettings {
        &self.settings
    }

    /// Complete and return only the (trimmed) text.
    pub async fn complete(&self, system_prompt: &str, turns: &[Turn]) -> Result<String, LumeError> {
        self.complete_response(system_prompt, turns)
            .await
            .map(|response| response.content)
    }

    /// Complete and return the full provider response, content trimmed.
    pub async fn complete_response(&self, system_prompt: &str, turns: &[Turn]) -> Result<LlmResponse, LumeError> {
        if self.providers.is_empty() {
            return Err(LumeError::AllProvidersFailed);
        }

        let request = LlmRequest {
            model: self.settings.model.clone(),
            system_prompt: system_prompt.to_string(),
            turns: turns.to_vec(),
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
        };

        let start = Instant::now();
        let mut last_error = None;

        for provider in &self.providers {
            let name = provider.name().to_string();
            debug!(provider = %name, model = %request.model, turns = turns.len(), "Calling provider");

            match provider.complete(&request).await {
                Ok(mut response) => {
                    response.content = response.content.trim().to_string();
                    info!(
                        provider = %name,
                        tokens = response.tokens_used,
                        latency_ms = response.latency_ms,
                        total_latency_ms = start.elapsed().as_millis() as u64,
                        "Provider responded"
                    );
                    return Ok(response);
                }
                Err(e) => {
                    let message = redact_sensitive_data(&format!("{e:#}"));
                    warn!(provider = %name, error = %message, "Provider failed");
                    last_error = Some(LumeError::llm(name, message));
                }
            }
        }

        match last_error {
            Some(err) if self.providers.len() == 1 => Err(err),
            _ => Err(LumeError::AllProvidersFailed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::ScriptedProvider;

    fn client(providers: Vec<Arc<ScriptedProvider>>) -> CompletionClient {
        let providers = providers
            .into_iter()
            .map(|p| p as Arc<dyn LlmProvider>)
            .collect();
        CompletionClient::new(providers, CompletionSettings::default())
    }

    #[tokio::test]
    async fn primary_answers_and_output_is_trimmed() {
        let primary = Arc::new(ScriptedProvider::new("primary").then_reply("  hola \n"));
        let fallback = Arc::new(ScriptedProvider::new("fallback").with_response("no"));
        let client = client(vec![primary.clone(), fallback.clone()]);

        let text = client.complete("sys", &[Turn::user("hey")]).await.unwrap();
        assert_eq!(text, "hola");
        assert_eq!(fallback.call_count(), 0);

        let request = &primary.requests()[0];
        assert_eq!(request.system_prompt, "sys");
        assert_eq!(request.model, "gpt-4-turbo");
        assert_eq!(request.turns, vec![Turn::user("hey")]);
    }

    #[tokio::test]
    async fn falls_back_in_order() {
        let primary = Arc::new(ScriptedProvider::new("primary").then_fail("quota exceeded"));
        let fallback = Arc::new(ScriptedProvider::new("fallback").then_reply("desde respaldo"));
        let client = client(vec![primary, fallback]);

        let response = client.complete_response("", &[Turn::user("hey")]).await.unwrap();
        assert_eq!(response.content, "desde respaldo");
        assert_eq!(response.provider, "fallback");
    }

    #[tokio::test]
    async fn all_failing_is_all_providers_failed() {
        let client = client(vec![
            Arc::new(ScriptedProvider::new("a").then_fail("x")),
            Arc::new(ScriptedProvider::new("b").then_fail("y")),
        ]);
        let err = client.complete("", &[]).await.unwrap_err();
        assert!(matches!(err, LumeError::AllProvidersFailed));
    }

    #[tokio::test]
    async fn single_provider_failure_names_it_and_redacts() {
        let client = client(vec![Arc::new(
            ScriptedProvider::new("openai").then_fail("bad key sk-abcdefghijklmnopqrstuvwxyz123456"),
        )]);
        let err = client.complete("", &[]).await.unwrap_err();
        match err {
            LumeError::LlmError { provider, message } => {
                assert_eq!(provider, "openai");
                assert!(!message.contains("sk-abcdefghijklmnopqrstuvwxyz123456"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn no_providers_fails_fast() {
        let client = CompletionClient::new(Vec::new(), CompletionSettings::default());
        assert!(matches!(
            client.complete("", &[]).await,
            Err(LumeError::AllProvidersFailed)
        ));
    }

    #[test]
    fn from_registry_keeps_chain_order() {
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(ScriptedProvider::new("openai")));
        registry.register(Arc::new(ScriptedProvider::new("ollama")));
        let client = CompletionClient::from_registry(
            &registry,
            &["ollama".into(), "missing".into(), "openai".into()],
            CompletionSettings::default(),
        );
        assert_eq!(client.provider_names(), vec!["ollama".to_string(), "openai".to_string()]);
    }
}
