/// Action registry: the built-in server actions and their synonyms.
///
/// Lookup is case-sensitive and exact against a canonical name or any alias.
use std::collections::HashMap;

use anyhow::{bail, Result};
use tracing::error;

use crate::types::{ActionDescriptor, ActionKind, ParamKind, ParamSpec};

fn param(name: &str, aliases: &[&str], kind: ParamKind, required: bool, description: &str) -> ParamSpec {
    ParamSpec {
        name: name.to_string(),
        aliases: aliases.iter().map(|s| s.to_string()).collect(),
        required,
        kind,
        description: description.to_string(),
    }
}

fn required_text(name: &str, aliases: &[&str], description: &str) -> ParamSpec {
    param(name, aliases, ParamKind::Text, true, description)
}

fn optional_text(name: &str, aliases: &[&str], description: &str) -> ParamSpec {
    param(name, aliases, ParamKind::Text, false, description)
}

fn optional_number(name: &str, aliases: &[&str], description: &str) -> ParamSpec {
    param(name, aliases, ParamKind::Number, false, description)
}

fn action(
    kind: ActionKind,
    name: &str,
    aliases: &[&str],
    description: &str,
    params: Vec<ParamSpec>,
) -> ActionDescriptor {
    ActionDescriptor {
        kind,
        name: name.to_string(),
        aliases: aliases.iter().map(|s| s.to_string()).collect(),
        description: description.to_string(),
        params,
    }
}

const CHANNEL_NAME_KEYS: &[&str] = &["name", "canal", "channel", "nombre_canal", "channel_name"];
const TARGET_CHANNEL_KEYS: &[&str] = &["channel", "nombre", "channel_name", "nombre_canal"];
const CONTENT_KEYS: &[&str] = &["mensaje", "texto", "content", "message", "text"];
const USER_KEYS: &[&str] = &["miembro", "user", "member", "username", "nombre_usuario"];
const ROLE_KEYS: &[&str] = &["role", "nombre_rol", "role_name"];

/// Build the full built-in action list.
pub fn builtin_actions() -> Vec<ActionDescriptor> {
    vec![
        // Channels
        action(
            ActionKind::CreateChannel,
            "crear_canal",
            &["create_channel", "create_text_channel"],
            "Crea un canal de texto.",
            vec![
                required_text("nombre", CHANNEL_NAME_KEYS, "el nombre del canal"),
                optional_text("categoria", &["categoría", "category", "category_name"], "la categoría donde crearlo"),
            ],
        ),
        action(
            ActionKind::DeleteChannel,
            "eliminar_canal",
            &["delete_channel", "borrar_canal", "remove_channel"],
            "Elimina un canal de texto.",
            vec![required_text("nombre", CHANNEL_NAME_KEYS, "el nombre del canal a eliminar")],
        ),
        action(
            ActionKind::RenameChannel,
            "renombrar_canal",
            &["rename_channel"],
            "Cambia el nombre de un canal de texto.",
            vec![
                required_text("nombre", &["nombre_actual", "name", "canal", "channel", "old_name"], "el nombre actual del canal"),
                required_text("nuevo_nombre", &["nombre_nuevo", "new_name"], "el nuevo nombre del canal"),
            ],
        ),
        // Messages
        action(
            ActionKind::SendMessage,
            "enviar_mensaje",
            &["send_message"],
            "Envía un mensaje a un canal.",
            vec![
                required_text("canal", TARGET_CHANNEL_KEYS, "el canal de destino"),
                required_text("contenido", CONTENT_KEYS, "el texto del mensaje"),
            ],
        ),
        action(
            ActionKind::PinMessage,
            "fijar_mensaje",
            &["pin_message", "anclar_mensaje"],
            "Publica un mensaje en un canal y lo fija.",
            vec![
                required_text("canal", TARGET_CHANNEL_KEYS, "el canal donde fijar el mensaje"),
                required_text("contenido", CONTENT_KEYS, "el texto del mensaje a fijar"),
            ],
        ),
        // Categories
        action(
            ActionKind::CreateCategory,
            "crear_categoria",
            &["create_category", "crear_categoría"],
            "Crea una categoría de canales.",
            vec![required_text("nombre", &["name", "categoria", "category"], "el nombre de la categoría")],
        ),
        action(
            ActionKind::DeleteCategory,
            "eliminar_categoria",
            &["delete_category", "borrar_categoria"],
            "Elimina una categoría de canales.",
            vec![required_text("nombre", &["name", "categoria", "category"], "el nombre de la categoría a eliminar")],
        ),
        // Roles
        action(
            ActionKind::CreateRole,
            "crear_rol",
            &["create_role"],
            "Crea un rol.",
            vec![required_text("nombre", &["name", "rol", "role"], "el nombre del rol")],
        ),
        action(
            ActionKind::DeleteRole,
            "eliminar_rol",
            &["delete_role", "borrar_rol"],
            "Elimina un rol.",
            vec![required_text("nombre", &["name", "rol", "role"], "el nombre del rol a eliminar")],
        ),
        action(
            ActionKind::AssignRole,
            "asignar_rol",
            &["assign_role", "dar_rol", "add_role"],
            "Asigna un rol a un miembro.",
            vec![
                required_text("usuario", USER_KEYS, "el usuario que recibirá el rol"),
                required_text("rol", ROLE_KEYS, "el rol a asignar"),
            ],
        ),
        action(
            ActionKind::RemoveRole,
            "quitar_rol",
            &["remove_role", "revoke_role"],
            "Quita un rol a un miembro.",
            vec![
                required_text("usuario", USER_KEYS, "el usuario al que quitar el rol"),
                required_text("rol", ROLE_KEYS, "el rol a quitar"),
            ],
        ),
        // Reminders
        action(
            ActionKind::Reminder,
            "recordatorio",
            &["reminder", "remind", "programar_recordatorio"],
            "Programa un recordatorio en esta conversación.",
            vec![
                required_text("contenido", &["mensaje", "texto", "content", "message", "text"], "qué debo recordarte"),
                optional_number("segundos", &["seconds", "delay", "tiempo"], "en cuántos segundos recordarlo"),
            ],
        ),
    ]
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Read-only after construction: maps every canonical name and alias to its descriptor.
pub struct ActionRegistry {
    actions: Vec<ActionDescriptor>,
    by_name: HashMap<String, usize>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::with_actions(builtin_actions())
    }

    /// Register `descriptors` in order. A descriptor whose name clashes with
    /// an earlier one is logged and skipped.
    pub fn with_actions(descriptors: impl IntoIterator<Item = ActionDescriptor>) -> Self {
        let mut registry = Self::empty();
        for descriptor in descriptors {
            let name = descriptor.name.clone();
            if let Err(e) = registry.register(descriptor) {
                error!(action = %name, error = %e, "Skipping action with a clashing name");
            }
        }
        registry
    }

    pub fn empty() -> Self {
        Self {
            actions: Vec::new(),
            by_name: HashMap::new(),
        }
    }

    /// Register an additional action. Fails if any of its names is already taken.
    pub fn register(&mut self, descriptor: ActionDescriptor) -> Result<()> {
        if let Some(taken) = descriptor.names().find(|n| self.by_name.contains_key(*n)) {
            bail!("action name '{}' is already registered", taken);
        }
        let index = self.actions.len();
        for name in descriptor.names() {
            self.by_name.insert(name.to_string(), index);
        }
        self.actions.push(descriptor);
        Ok(())
    }

    pub fn all(&self) -> &[ActionDescriptor] {
        &self.actions
    }

    /// Resolve a canonical name or alias to its descriptor.
    pub fn resolve(&self, name: &str) -> Option<&ActionDescriptor> {
        self.by_name.get(name).map(|&i| &self.actions[i])
    }

    pub fn find_by_kind(&self, kind: ActionKind) -> Option<&ActionDescriptor> {
        self.actions.iter().find(|a| a.kind == kind)
    }
}

impl Default for ActionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_builtin_is_registered() {
        let registry = ActionRegistry::new();
        assert_eq!(registry.all().len(), builtin_actions().len());
    }

    #[test]
    fn aliases_resolve_to_same_descriptor() {
        let registry = ActionRegistry::new();
        for descriptor in registry.all() {
            for name in descriptor.names() {
                let resolved = registry.resolve(name).expect("alias should resolve");
                assert_eq!(resolved.kind, descriptor.kind, "alias {name}");
                assert_eq!(resolved.name, descriptor.name);
            }
        }
    }

    #[test]
    fn every_action_has_a_secondary_language_alias() {
        for descriptor in builtin_actions() {
            assert!(!descriptor.aliases.is_empty(), "{} has no alias", descriptor.name);
        }
        let registry = ActionRegistry::new();
        assert_eq!(
            registry.resolve("create_channel").map(|a| a.kind),
            registry.resolve("crear_canal").map(|a| a.kind)
        );
    }

    #[test]
    fn lookup_is_case_sensitive_and_exact() {
        let registry = ActionRegistry::new();
        assert!(registry.resolve("Crear_Canal").is_none());
        assert!(registry.resolve("crear_canal ").is_none());
        assert!(registry.resolve("volar").is_none());
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut registry = ActionRegistry::new();
        let mut clash = builtin_actions().remove(0);
        clash.name = "nuevo".into();
        clash.aliases = vec!["create_channel".into()];
        assert!(registry.register(clash).is_err());
        assert!(registry.resolve("nuevo").is_none());
    }

    #[test]
    fn clashing_descriptor_is_skipped() {
        let actions = builtin_actions();
        let mut clash = actions[1].clone();
        clash.aliases.push(actions[0].name.clone());
        let registry = ActionRegistry::with_actions(vec![actions[0].clone(), clash.clone()]);
        assert_eq!(registry.all().len(), 1);
        assert!(registry.resolve(&clash.name).is_none());
    }

    #[test]
    fn params_declare_unique_keys() {
        for descriptor in builtin_actions() {
            let mut seen = std::collections::HashSet::new();
            for spec in &descriptor.params {
                assert!(seen.insert(spec.name.as_str()), "{}: duplicate {}", descriptor.name, spec.name);
            }
        }
    }
}
