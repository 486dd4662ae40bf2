//! Log Redaction Layer
//!
//! Scrubs API keys, bearer tokens and Discord bot tokens from strings prior to logging.

use regex::Regex;
use std::sync::LazyLock;

static API_KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(sk-[a-zA-Z0-9_\-]{20,})|(Bearer\s+[a-zA-Z0-9\-\._~+/]+=*)").unwrap());

// Discord bot tokens: base64 user id, timestamp, HMAC.
static DISCORD_TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[MNO][a-zA-Z\d_\-]{23,27}\.[a-zA-Z\d_\-]{6}\.[a-zA-Z\d_\-]{27,}").unwrap());

/// Redacts sensitive patterns in a string.
pub fn redact_sensitive_data(input: &str) -> String {
    let redacted = API_KEY_RE.replace_all(input, "[REDACTED_TOKEN]");
    DISCORD_TOKEN_RE
        .replace_all(&redacted, "[REDACTED_TOKEN]")
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redaction() {
        let raw = "401 from upstream: Bearer eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9 key sk-abcdefghijklmnopqrstuvwxyz123456";
        let clean = redact_sensitive_data(raw);
        assert!(!clean.contains("eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9"));
        assert!(!clean.contains("sk-abcdefghijklmnopqrstuvwxyz123456"));
        assert!(clean.starts_with("401 from upstream:"));
    }

    #[test]
    fn redacts_discord_tokens() {
        let token = "MTIzNDU2Nzg5MDEyMzQ1Njc4.GhIjKl.abcdefghijklmnopqrstuvwxyz0123456789";
        let clean = redact_sensitive_data(&format!("login failed for {token}"));
        assert_eq!(clean, "login failed for [REDACTED_TOKEN]");
    }

    #[test]
    fn leaves_ordinary_text_alone() {
        let text = "✅ Canal creado: #soporte";
        assert_eq!(redact_sensitive_data(text), text);
    }
}
