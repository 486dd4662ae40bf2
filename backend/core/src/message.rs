use serde::{Deserialize, Serialize};

use crate::types::ConversationId;

/// One human-authored message observed on a chat platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    pub conversation_id: ConversationId,
    /// Server (guild) the conversation belongs to; `None` for direct messages.
    pub server_id: Option<String>,
    pub author_id: String,
    pub author_name: String,
    /// True when the assistant itself authored the message.
    #[serde(default)]
    pub from_self: bool,
    pub text: String,
}

impl InboundMessage {
    pub fn new(
        conversation_id: impl Into<ConversationId>,
        author_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        let author_id = author_id.into();
        Self {
            conversation_id: conversation_id.into(),
            server_id: None,
            author_name: author_id.clone(),
            author_id,
            from_self: false,
            text: text.into(),
        }
    }

    pub fn in_server(mut self, server_id: impl Into<String>) -> Self {
        self.server_id = Some(server_id.into());
        self
    }

    pub fn authored_by_self(mut self) -> Self {
        self.from_self = true;
        self
    }
}

/// A reply to emit back into the originating conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundReply {
    pub conversation_id: ConversationId,
    pub text: String,
}

impl OutboundReply {
    pub fn new(conversation_id: ConversationId, text: impl Into<String>) -> Self {
        Self {
            conversation_id,
            text: text.into(),
        }
    }
}
