//! System prompt builder.
//!
//! The action catalogue is generated from the registry so the prompt never
//! drifts from what the dispatcher accepts.

use std::fmt::Write;

use lume_commands::{ActionDescriptor, ActionRegistry, ParamKind};

use crate::assistant_identity::AssistantIdentity;

const COMMAND_FORMAT: &str = r#"Si el usuario da una orden clara relacionada con el servidor, responde únicamente con un objeto JSON con este formato:
{
  "action": "nombre_accion",
  "params": {
    "parametro": "valor"
  }
}
Si no es una orden o no estás seguro, responde normalmente como asistente conversacional, sin JSON."#;

pub struct PromptBuilder;

impl PromptBuilder {
    /// Builds the system prompt that configures the assistant's behavior.
    pub fn build(identity: &AssistantIdentity, registry: &ActionRegistry) -> String {
        let mut prompt = identity.compile();
        prompt.push(' ');
        prompt.push_str(COMMAND_FORMAT);
        prompt.push_str("\n\nAcciones disponibles:\n");
        for action in registry.all() {
            prompt.push_str(&Self::describe(action));
            prompt.push('\n');
        }
        prompt
    }

    fn describe(action: &ActionDescriptor) -> String {
        let mut line = format!("- {}: {}", action.name, action.description);
        if action.params.is_empty() {
            return line;
        }
        line.push_str(" Parámetros: ");
        let params: Vec<String> = action
            .params
            .iter()
            .map(|p| {
                let mut s = p.name.clone();
                if matches!(p.kind, ParamKind::Number) {
                    s.push_str(" (número)");
                }
                if !p.required {
                    s.push_str(" (opcional)");
                }
                s
            })
            .collect();
        let _ = write!(line, "{}.", params.join(", "));
        line
    }
}
