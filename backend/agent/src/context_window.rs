//! Context window: the slice of conversation memory sent to the model.

use lume_core::Turn;

pub struct ContextWindow {
    pub turns: Vec<Turn>,
}

impl ContextWindow {
    /// Keep the most recent `max_turns` turns, oldest first.
    /// A zero limit still keeps the latest turn so the model sees the message.
    pub fn build(window: Vec<Turn>, max_turns: usize) -> Self {
        let keep = max_turns.max(1);
        let skip = window.len().saturating_sub(keep);
        Self {
            turns: window.into_iter().skip(skip).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}
