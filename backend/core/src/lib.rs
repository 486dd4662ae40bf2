pub mod channel;
pub mod error;
pub mod message;
pub mod traits;
pub mod types;

pub use channel::LumeBus;
pub use error::LumeError;
pub use message::{InboundMessage, OutboundReply};
pub use traits::{LlmProvider, LlmRequest, LlmResponse};
pub use types::{ConversationId, Role, Turn};
