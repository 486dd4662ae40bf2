pub mod completion;
pub mod providers;

pub use completion::{CompletionClient, CompletionSettings};
pub use providers::{OllamaProvider, OpenAiProvider, ProviderRegistry, ScriptedProvider};
