//! Turn Event Logger
//!
//! One structured record per step of a conversational turn, emitted through
//! `tracing` under the `turn_events` target so file logs can be filtered on it.

use serde::Serialize;
use tracing::info;

use crate::redact::redact_sensitive_data;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnEvent {
    Inbound { author_id: String, text: String },
    Completion { provider: String, latency_ms: u64 },
    Outcome { kind: String, message: String },
    UpstreamError { error: String },
}

impl TurnEvent {
    fn redacted(self) -> Self {
        match self {
            TurnEvent::Inbound { author_id, text } => TurnEvent::Inbound {
                author_id,
                text: redact_sensitive_data(&text),
            },
            TurnEvent::Outcome { kind, message } => TurnEvent::Outcome {
                kind,
                message: redact_sensitive_data(&message),
            },
            TurnEvent::UpstreamError { error } => TurnEvent::UpstreamError {
                error: redact_sensitive_data(&error),
            },
            event @ TurnEvent::Completion { .. } => event,
        }
    }
}

pub struct TurnEventLogger;

impl TurnEventLogger {
    /// Redact and emit `event` for `conversation_id`.
    pub fn log_event(conversation_id: &str, event: TurnEvent) {
        let event = event.redacted();
        let payload = serde_json::to_string(&event).unwrap_or_default();
        info!(target: "turn_events", conversation_id, event = %payload, "Turn event");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_text_fields() {
        let event = TurnEvent::UpstreamError {
            error: "bad key sk-abcdefghijklmnopqrstuvwxyz123456".into(),
        }
        .redacted();
        match event {
            TurnEvent::UpstreamError { error } => assert_eq!(error, "bad key [REDACTED_TOKEN]"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn serializes_with_type_tag() {
        let json = serde_json::to_value(TurnEvent::Completion {
            provider: "openai".into(),
            latency_ms: 12,
        })
        .unwrap();
        assert_eq!(json["type"], "completion");
        assert_eq!(json["latency_ms"], 12);
    }

    #[test]
    fn log_event_without_subscriber_is_a_no_op() {
        TurnEventLogger::log_event(
            "general",
            TurnEvent::Inbound {
                author_id: "1".into(),
                text: "hola".into(),
            },
        );
    }
}
