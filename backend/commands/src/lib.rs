pub mod args;
pub mod detection;
pub mod dispatch;
pub mod handlers;
pub mod registry;
pub mod resolver;
pub mod sandbox;
pub mod server;
pub mod types;

pub use args::ActionArgs;
pub use detection::extract_command;
pub use dispatch::{DispatchOutcome, Dispatcher, OutcomeKind, EMPTY_RESPONSE_FALLBACK, INTERNAL_ERROR_MESSAGE};
pub use handlers::{ActionContext, ActionHandler, ActionReply, FollowUp, HandlerError, ServerActions};
pub use registry::{builtin_actions, ActionRegistry};
pub use resolver::{resolve_params, ResolveError, ResolvedParams};
pub use sandbox::InMemoryServer;
pub use server::{MemberRef, PlatformError, PlatformResult, ResourceRef, ServerOps};
pub use types::{ActionDescriptor, ActionKind, ExtractedCommand, ParamKind, ParamSpec, ParamValue};

use std::sync::Arc;

/// Build a dispatcher wired to the built-in actions over `server`.
pub fn build_default_dispatcher(server: Arc<dyn ServerOps>) -> Dispatcher {
    Dispatcher::new(Arc::new(ActionRegistry::new()), Arc::new(ServerActions::new(server)))
}
