//! Assistant identity: who the assistant says it is.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssistantIdentity {
    pub name: String,
    /// Language code the assistant answers in.
    pub language: String,
}

impl Default for AssistantIdentity {
    fn default() -> Self {
        Self {
            name: "Lume".into(),
            language: "es".into(),
        }
    }
}

impl AssistantIdentity {
    pub fn new(name: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            language: language.into(),
        }
    }

    /// Compile the identity into the opening paragraph of the system prompt.
    pub fn compile(&self) -> String {
        let mut out = format!(
            "Eres {}, un asistente virtual con permisos administrativos en este servidor.",
            self.name
        );
        if self.language != "es" {
            out.push_str(&format!(" Responde siempre en el idioma '{}'.", self.language));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_name_into_intro() {
        let intro = AssistantIdentity::new("Nova", "es").compile();
        assert!(intro.starts_with("Eres Nova,"));
        assert!(!intro.contains("idioma"));
    }

    #[test]
    fn non_spanish_language_is_mentioned() {
        let intro = AssistantIdentity::new("Lume", "en").compile();
        assert!(intro.contains("'en'"));
    }
}
