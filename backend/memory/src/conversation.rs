use std::collections::{HashMap, VecDeque};

use lume_core::{ConversationId, Turn};
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Default number of turns retained per conversation.
pub const DEFAULT_WINDOW_TURNS: usize = 10;

/// Bounded, per-conversation log of turns.
///
/// `append` is the only mutator. After it returns, the conversation holds
/// at most `capacity` turns: the new turn is pushed first and the oldest
/// turns are dropped from the front until the window fits.
pub struct ConversationMemory {
    capacity: usize,
    conversations: RwLock<HashMap<ConversationId, VecDeque<Turn>>>,
}

impl ConversationMemory {
    /// Create a memory retaining `capacity` turns per conversation.
    /// A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        if capacity == 0 {
            warn!("Conversation memory capacity 0 is not usable; using 1");
        }
        Self {
            capacity: capacity.max(1),
            conversations: RwLock::new(HashMap::new()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append a turn to a conversation, creating the conversation lazily.
    pub async fn append(&self, conversation_id: &ConversationId, turn: Turn) {
        let mut conversations = self.conversations.write().await;
        let window = conversations
            .entry(conversation_id.clone())
            .or_insert_with(|| VecDeque::with_capacity(self.capacity + 1));

        window.push_back(turn);
        let mut evicted = 0usize;
        while window.len() > self.capacity {
            window.pop_front();
            evicted += 1;
        }

        debug!(
            conversation_id = %conversation_id,
            len = window.len(),
            evicted,
            "Appended turn"
        );
    }

    /// Snapshot of a conversation's turns, oldest first.
    /// Unknown conversations yield an empty window.
    pub async fn window(&self, conversation_id: &ConversationId) -> Vec<Turn> {
        self.conversations
            .read()
            .await
            .get(conversation_id)
            .map(|turns| turns.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub async fn len(&self, conversation_id: &ConversationId) -> usize {
        self.conversations
            .read()
            .await
            .get(conversation_id)
            .map(VecDeque::len)
            .unwrap_or(0)
    }

    pub async fn conversation_count(&self) -> usize {
        self.conversations.read().await.len()
    }
}

impl Default for ConversationMemory {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_TURNS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lume_core::Role;

    fn conv(id: &str) -> ConversationId {
        ConversationId::from(id)
    }

    #[tokio::test]
    async fn window_is_min_of_appends_and_capacity() {
        for appends in 0..12usize {
            let memory = ConversationMemory::new(5);
            let id = conv("c");
            for i in 0..appends {
                memory.append(&id, Turn::user(format!("m{i}"))).await;
            }
            let window = memory.window(&id).await;
            assert_eq!(window.len(), appends.min(5));

            let expected: Vec<String> = (appends.saturating_sub(5)..appends)
                .map(|i| format!("m{i}"))
                .collect();
            let actual: Vec<&str> = window.iter().map(Turn::text).collect();
            assert_eq!(actual, expected);
        }
    }

    #[tokio::test]
    async fn triggering_append_is_retained_when_full() {
        let memory = ConversationMemory::new(2);
        let id = conv("c");
        memory.append(&id, Turn::user("a")).await;
        memory.append(&id, Turn::assistant("b")).await;
        memory.append(&id, Turn::user("c")).await;

        let window = memory.window(&id).await;
        assert_eq!(window, vec![Turn::assistant("b"), Turn::user("c")]);
        assert_eq!(window[0].role(), Role::Assistant);
    }

    #[tokio::test]
    async fn conversations_are_isolated() {
        let memory = ConversationMemory::new(3);
        memory.append(&conv("a"), Turn::user("hola")).await;
        memory.append(&conv("b"), Turn::user("hello")).await;
        memory.append(&conv("b"), Turn::assistant("hi")).await;

        assert_eq!(memory.len(&conv("a")).await, 1);
        assert_eq!(memory.len(&conv("b")).await, 2);
        assert_eq!(memory.conversation_count().await, 2);
        assert!(memory.window(&conv("missing")).await.is_empty());
    }

    #[tokio::test]
    async fn window_is_a_snapshot() {
        let memory = ConversationMemory::new(4);
        let id = conv("c");
        memory.append(&id, Turn::user("first")).await;
        let snapshot = memory.window(&id).await;
        memory.append(&id, Turn::user("second")).await;

        assert_eq!(snapshot.len(), 1);
        assert_eq!(memory.len(&id).await, 2);
    }

    #[tokio::test]
    async fn zero_capacity_is_raised_to_one() {
        let memory = ConversationMemory::new(0);
        let id = conv("c");
        memory.append(&id, Turn::user("a")).await;
        memory.append(&id, Turn::user("b")).await;
        assert_eq!(memory.capacity(), 1);
        assert_eq!(memory.window(&id).await, vec![Turn::user("b")]);
    }
}
