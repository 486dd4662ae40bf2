//! Wiring: turn a loaded `LumeConfig` into providers, a completion client
//! and an agent runner bound to a chat server.

use std::sync::Arc;

use anyhow::{bail, Result};
use tracing::{info, warn};

use lume_agent::{AgentRunner, AgentSettings, AssistantIdentity};
use lume_channels::console::CONSOLE_SERVER;
use lume_commands::{build_default_dispatcher, InMemoryServer, ServerOps};
use lume_config::LumeConfig;
use lume_core::LlmProvider;
use lume_logging::LogOptions;
use lume_memory::ConversationMemory;
use lume_planner::{CompletionClient, CompletionSettings, OllamaProvider, OpenAiProvider, ProviderRegistry, ScriptedProvider};

pub fn log_options(config: &LumeConfig) -> LogOptions {
    LogOptions {
        level: config.log_level().to_string(),
        dir: config.log_dir(),
        json: config.log_json(),
    }
}

/// Build one provider by name. `primary` providers honour the configured
/// base URL override.
pub fn build_provider(name: &str, config: &LumeConfig, primary: bool) -> Result<Arc<dyn LlmProvider>> {
    let base_url = if primary { config.base_url() } else { None };
    let provider: Arc<dyn LlmProvider> = match name {
        "openai" | "openrouter" => {
            let Some(key) = config.api_key() else {
                bail!("provider '{name}' needs llm.apiKey or OPENAI_API_KEY");
            };
            let mut provider = if name == "openai" {
                OpenAiProvider::new(key)
            } else {
                OpenAiProvider::openrouter(key)
            };
            if let Some(url) = base_url {
                provider = provider.with_base_url(url);
            }
            Arc::new(provider)
        }
        "ollama" => {
            let mut provider = OllamaProvider::new();
            if let Some(url) = base_url {
                provider = provider.with_base_url(url);
            }
            Arc::new(provider)
        }
        "scripted" => Arc::new(ScriptedProvider::new("scripted").echoing()),
        other => bail!("unknown provider '{other}'"),
    };
    Ok(provider)
}

/// Register every usable provider in the configured chain and build the
/// completion client over them. Unusable fallbacks are skipped with a
/// warning; an unusable chain is an error.
pub fn build_completion(config: &LumeConfig) -> Result<CompletionClient> {
    let chain = config.provider_chain();
    let mut registry = ProviderRegistry::new();
    for (i, name) in chain.iter().enumerate() {
        match build_provider(name, config, i == 0) {
            Ok(provider) => registry.register(provider),
            Err(e) => warn!(provider = %name, error = %e, "Skipping text-completion provider"),
        }
    }
    if registry.list().is_empty() {
        bail!("no usable text-completion provider in [{}]", chain.join(", "));
    }

    let settings = CompletionSettings {
        model: config.model().to_string(),
        max_tokens: config.max_tokens(),
        temperature: config.temperature(),
    };
    let client = CompletionClient::from_registry(&registry, &chain, settings);
    info!(providers = ?client.provider_names(), model = %config.model(), "Text-completion client ready");
    Ok(client)
}

pub fn build_runner(config: &LumeConfig, server: Arc<dyn ServerOps>) -> Result<Arc<AgentRunner>> {
    let completion = build_completion(config)?;
    let dispatcher = build_default_dispatcher(server);
    let memory = ConversationMemory::new(config.window_turns());
    let identity = AssistantIdentity::new(config.assistant_name(), config.language());
    let settings = AgentSettings {
        context_turns: config.context_turns(),
    };

    Ok(Arc::new(AgentRunner::new(
        Arc::new(dispatcher),
        Arc::new(completion),
        Arc::new(memory),
        &identity,
        settings,
    )))
}

/// In-memory server for terminal chat, with the console author already a
/// member so member actions can target them.
pub async fn console_server(user: &str) -> Arc<InMemoryServer> {
    let server = Arc::new(InMemoryServer::new());
    server.seed_member(CONSOLE_SERVER, user).await;
    server
}

#[cfg(test)]
mod tests {
    use super::*;
    use lume_config::schema::{LlmConfig, MemoryConfig};

    fn config_with(llm: LlmConfig) -> LumeConfig {
        LumeConfig {
            llm: Some(llm),
            ..Default::default()
        }
    }

    #[test]
    fn openai_without_key_is_rejected() {
        let config = config_with(LlmConfig {
            provider: Some("openai".into()),
            ..Default::default()
        });
        assert!(build_provider("openai", &config, true).is_err());
    }

    #[test]
    fn provider_names_follow_the_chain() {
        let config = config_with(LlmConfig {
            provider: Some("openrouter".into()),
            api_key: Some("sk-test".into()),
            fallbacks: vec!["ollama".into(), "scripted".into()],
            ..Default::default()
        });
        let client = build_completion(&config).unwrap();
        assert_eq!(client.provider_names(), vec!["openrouter", "ollama", "scripted"]);
        assert_eq!(client.settings().model, config.model());
    }

    #[test]
    fn unusable_fallbacks_are_skipped() {
        let config = config_with(LlmConfig {
            provider: Some("scripted".into()),
            fallbacks: vec!["openai".into()],
            ..Default::default()
        });
        let client = build_completion(&config).unwrap();
        assert_eq!(client.provider_names(), vec!["scripted"]);
    }

    #[test]
    fn unknown_only_provider_fails() {
        let config = config_with(LlmConfig {
            provider: Some("gemini".into()),
            ..Default::default()
        });
        assert!(build_completion(&config).is_err());
    }

    #[tokio::test]
    async fn offline_runner_executes_typed_action_json() {
        let config = LumeConfig {
            llm: Some(LlmConfig {
                provider: Some("scripted".into()),
                ..Default::default()
            }),
            memory: Some(MemoryConfig {
                window_turns: Some(4),
                context_turns: None,
            }),
            ..Default::default()
        };
        let server = Arc::new(lume_commands::InMemoryServer::new());
        let runner = build_runner(&config, server.clone()).unwrap();

        let msg = lume_core::InboundMessage::new("c1", "ana", r#"{"action":"crear_rol","params":{"nombre":"mod"}}"#)
            .in_server("g1");
        let outcome = runner.process(&msg).await.unwrap();
        assert_eq!(outcome.message, "🎭 Rol creado: mod");
        assert_eq!(server.mutation_count().await, 1);
    }

    #[tokio::test]
    async fn console_author_is_a_member() {
        let server = console_server("ana").await;
        let member = server.find_member(CONSOLE_SERVER, "ana").await.unwrap();
        assert_eq!(member.map(|m| m.name).as_deref(), Some("ana"));
        assert_eq!(server.find_member(CONSOLE_SERVER, "beto").await.unwrap(), None);
        assert_eq!(server.mutation_count().await, 0);
    }
}
