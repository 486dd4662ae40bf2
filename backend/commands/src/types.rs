/// Action and parameter types shared by the extractor, registry and resolver.
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Extracted command
// ---------------------------------------------------------------------------

/// A scalar parameter value as written by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Text(String),
    Number(serde_json::Number),
}

impl ParamValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn number(value: u64) -> Self {
        Self::Number(value.into())
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Text(s) => f.write_str(s),
            ParamValue::Number(n) => write!(f, "{n}"),
        }
    }
}

/// A structured command carved out of a model response.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedCommand {
    pub action: String,
    pub params: BTreeMap<String, ParamValue>,
}

// ---------------------------------------------------------------------------
// Parameter spec
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    Text,
    /// Non-negative integer.
    Number,
}

/// One expected parameter of an action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamSpec {
    /// Canonical key, tried first.
    pub name: String,
    /// Synonym keys, tried in this order after the canonical key.
    pub aliases: Vec<String>,
    pub required: bool,
    pub kind: ParamKind,
    /// Human description used in clarifying questions and the system prompt.
    pub description: String,
}

impl ParamSpec {
    /// Every accepted key in lookup priority order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }
}

// ---------------------------------------------------------------------------
// Action descriptor
// ---------------------------------------------------------------------------

/// The fixed set of actions the assistant can perform on a server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    CreateChannel,
    DeleteChannel,
    RenameChannel,
    SendMessage,
    PinMessage,
    CreateCategory,
    DeleteCategory,
    CreateRole,
    DeleteRole,
    AssignRole,
    RemoveRole,
    Reminder,
}

/// A registered action: its names, its parameters, and which handler arm runs it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionDescriptor {
    pub kind: ActionKind,
    /// Canonical action identifier (e.g. "crear_canal").
    pub name: String,
    /// Alternate identifiers, including other-language names (e.g. "create_channel").
    pub aliases: Vec<String>,
    pub description: String,
    pub params: Vec<ParamSpec>,
}

impl ActionDescriptor {
    /// Canonical name followed by every alias.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }

    pub fn param(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn param_keys_start_with_canonical_name() {
        let spec = ParamSpec {
            name: "nombre".into(),
            aliases: vec!["name".into(), "canal".into()],
            required: true,
            kind: ParamKind::Text,
            description: "nombre del canal".into(),
        };
        let keys: Vec<&str> = spec.keys().collect();
        assert_eq!(keys, vec!["nombre", "name", "canal"]);
    }

    #[test]
    fn param_value_deserializes_untagged() {
        let text: ParamValue = serde_json::from_str(r#""soporte""#).unwrap();
        let number: ParamValue = serde_json::from_str("30").unwrap();
        assert_eq!(text, ParamValue::text("soporte"));
        assert_eq!(number, ParamValue::number(30));
        assert_eq!(number.to_string(), "30");
    }
}
