//! Logging for Lume.
//!
//! Console and rolling-file subscribers, secret redaction, and structured
//! per-turn events.

pub mod event_logger;
pub mod logger;
pub mod redact;

pub use event_logger::{TurnEvent, TurnEventLogger};
pub use logger::{init_logger, LogOptions};
pub use redact::redact_sensitive_data;
