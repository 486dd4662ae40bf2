//! Lume Agent Runner
//!
//! The per-message pipeline (memory, prompt, completion, dispatch, reply),
//! per-conversation ordering, and deferred follow-ups.

pub mod agent_loop;
pub mod assistant_identity;
pub mod context_window;
pub mod router;
pub mod system_prompt;

pub use agent_loop::{AgentRunner, AgentSettings};
pub use assistant_identity::AssistantIdentity;
pub use context_window::ContextWindow;
pub use router::ConversationRouter;
pub use system_prompt::PromptBuilder;
