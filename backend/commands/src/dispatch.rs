/// Command dispatch: turn one model response into exactly one outcome.
///
/// Extract → resolve action → resolve params → build typed args → handle.
/// Every failure along the way ends as a `DispatchOutcome`; nothing here
/// returns an error to the caller.
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::args::ActionArgs;
use crate::detection::extract_command;
use crate::handlers::{ActionContext, ActionHandler, FollowUp, HandlerError};
use crate::registry::ActionRegistry;
use crate::resolver::{resolve_params, ResolveError};

/// Reply used when the model returned nothing and no command was found.
pub const EMPTY_RESPONSE_FALLBACK: &str = "🤔 No tengo una respuesta para eso. ¿Puedes reformularlo?";

/// Reply used for upstream and unexpected internal failures.
pub const INTERNAL_ERROR_MESSAGE: &str = "⚠️ Hubo un error interno. Intenta de nuevo.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum OutcomeKind {
    Executed,
    NeedsInput,
    NoCommand,
    Error,
}

/// The single result of one dispatch cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub kind: OutcomeKind,
    pub message: String,
    /// Deferred second reply, only set by reminders.
    pub follow_up: Option<FollowUp>,
}

impl DispatchOutcome {
    fn new(kind: OutcomeKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            follow_up: None,
        }
    }

    /// Outcome for a failed completion call.
    pub fn upstream_failure() -> Self {
        Self::new(OutcomeKind::Error, INTERNAL_ERROR_MESSAGE)
    }

    fn no_command(raw: &str) -> Self {
        let text = raw.trim();
        if text.is_empty() {
            Self::new(OutcomeKind::NoCommand, EMPTY_RESPONSE_FALLBACK)
        } else {
            Self::new(OutcomeKind::NoCommand, text)
        }
    }

    fn unknown_action(action: &str) -> Self {
        Self::new(OutcomeKind::Error, format!("⚠️ Comando no reconocido: {action}"))
    }

    fn needs_input(err: &ResolveError) -> Self {
        let message = match err {
            ResolveError::Missing { param, description } => {
                format!("❓ Me falta el parámetro '{param}' ({description}). ¿Cuál es?")
            }
            ResolveError::Malformed {
                param,
                description,
                value,
            } => format!("❓ El valor '{value}' no sirve para '{param}' ({description}). ¿Puedes corregirlo?"),
        };
        Self::new(OutcomeKind::NeedsInput, message)
    }

    fn handler_failure(err: &HandlerError) -> Self {
        let kind = match err {
            // The requested state already holds; reported, not failed.
            HandlerError::AlreadyExists { .. } => OutcomeKind::Executed,
            HandlerError::NotFound { .. } | HandlerError::OutsideServer | HandlerError::Platform(_) => {
                OutcomeKind::Error
            }
        };
        Self::new(kind, err.to_string())
    }
}

pub struct Dispatcher {
    registry: Arc<ActionRegistry>,
    handler: Arc<dyn ActionHandler>,
}

impl Dispatcher {
    pub fn new(registry: Arc<ActionRegistry>, handler: Arc<dyn ActionHandler>) -> Self {
        Self { registry, handler }
    }

    pub fn registry(&self) -> &ActionRegistry {
        &self.registry
    }

    pub async fn dispatch(&self, ctx: &ActionContext, model_output: &str) -> DispatchOutcome {
        let outcome = self.run(ctx, model_output).await;
        info!(
            conversation_id = %ctx.conversation_id,
            outcome = ?outcome.kind,
            "Dispatch finished"
        );
        outcome
    }

    async fn run(&self, ctx: &ActionContext, model_output: &str) -> DispatchOutcome {
        let Some(command) = extract_command(model_output) else {
            debug!(conversation_id = %ctx.conversation_id, "No command in model output");
            return DispatchOutcome::no_command(model_output);
        };

        debug!(action = %command.action, params = command.params.len(), "Resolving command");
        let Some(descriptor) = self.registry.resolve(&command.action) else {
            info!(action = %command.action, "Unknown action");
            return DispatchOutcome::unknown_action(&command.action);
        };

        let args = match resolve_params(&command.params, &descriptor.params)
            .and_then(|params| ActionArgs::build(descriptor, &params))
        {
            Ok(args) => args,
            Err(err) => {
                debug!(action = %descriptor.name, %err, "Awaiting parameter");
                return DispatchOutcome::needs_input(&err);
            }
        };

        debug!(action = %descriptor.name, "Executing");
        match self.handler.handle(ctx, args).await {
            Ok(reply) => DispatchOutcome {
                kind: OutcomeKind::Executed,
                message: reply.text,
                follow_up: reply.follow_up,
            },
            Err(err) => {
                if let HandlerError::Platform(platform) = &err {
                    warn!(action = %descriptor.name, error = %platform, "Platform rejected action");
                }
                DispatchOutcome::handler_failure(&err)
            }
        }
    }
}
