//! Config redaction: produce safe-to-share config snapshots by masking secrets.

use serde_json::Value;

/// Keys whose values are secrets.
static SECRET_KEYS: &[&str] = &["apiKey", "api_key", "token", "botToken", "secret", "password"];

const MASK: &str = "***";

/// Redact a config JSON value, replacing all secret fields with `"***"`.
pub fn redact(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, v)| {
                    let masked = match v {
                        Value::String(s) if is_secret_key(key) && !s.is_empty() => Value::String(MASK.to_string()),
                        other => redact(other),
                    };
                    (key.clone(), masked)
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(redact).collect()),
        other => other.clone(),
    }
}

fn is_secret_key(key: &str) -> bool {
    SECRET_KEYS.iter().any(|k| k.eq_ignore_ascii_case(key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn masks_nested_secrets_only() {
        let value = json!({
            "llm": {"apiKey": "sk-live", "model": "gpt-4-turbo"},
            "discord": {"token": "abc"},
        });
        let redacted = redact(&value);
        assert_eq!(redacted["llm"]["apiKey"], "***");
        assert_eq!(redacted["llm"]["model"], "gpt-4-turbo");
        assert_eq!(redacted["discord"]["token"], "***");
    }

    #[test]
    fn empty_secret_stays_empty() {
        let redacted = redact(&json!({"token": ""}));
        assert_eq!(redacted["token"], "");
    }
}
