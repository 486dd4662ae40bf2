//! Short-term conversation memory.
//!
//! Each conversation keeps an ordered window of its most recent turns,
//! capped at a fixed number of turns with strict FIFO eviction. State lives
//! for the lifetime of the process; nothing is persisted.

pub mod conversation;

pub use conversation::{ConversationMemory, DEFAULT_WINDOW_TURNS};
