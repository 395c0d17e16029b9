//! Conversation memory
//!
//! A fixed-capacity rolling window of question/answer turns. The oldest turn
//! is evicted first; rendering walks the window oldest-first.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::config::MemoryConfig;
use crate::types::DialogueTurn;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationMemory {
    window: usize,
    turns: VecDeque<DialogueTurn>,
}

impl Default for ConversationMemory {
    fn default() -> Self {
        Self::new(MemoryConfig::default())
    }
}

impl ConversationMemory {
    pub fn new(config: MemoryConfig) -> Self {
        Self {
            window: config.window,
            turns: VecDeque::with_capacity(config.window + 1),
        }
    }

    /// Record a turn, evicting from the front once the window is exceeded.
    pub fn append(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        self.turns.push_back(DialogueTurn::new(question, answer));
        while self.turns.len() > self.window {
            self.turns.pop_front();
        }
    }

    /// `"Q: ...\nA: ..."` per retained turn, oldest first.
    ///
    /// Nothing is rendered until the iterator is advanced; cloning it
    /// restarts from the oldest turn.
    pub fn blocks(&self) -> impl Iterator<Item = String> + Clone + '_ {
        self.turns
            .iter()
            .map(|turn| format!("Q: {}\nA: {}", turn.question, turn.answer))
    }

    /// All blocks joined by newlines; empty memory renders as `""`.
    pub fn format(&self) -> String {
        self.blocks().collect::<Vec<_>>().join("\n")
    }

    pub fn turns(&self) -> impl Iterator<Item = &DialogueTurn> {
        self.turns.iter()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retains_last_three_in_order() {
        let mut memory = ConversationMemory::default();
        for i in 1..=5 {
            memory.append(format!("q{}", i), format!("a{}", i));
        }

        assert_eq!(memory.len(), 3);
        let questions: Vec<_> = memory.turns().map(|t| t.question.as_str()).collect();
        assert_eq!(questions, vec!["q3", "q4", "q5"]);
        assert_eq!(memory.format(), "Q: q3\nA: a3\nQ: q4\nA: a4\nQ: q5\nA: a5");
    }

    #[test]
    fn test_empty_formats_as_empty_string() {
        let memory = ConversationMemory::default();
        assert!(memory.is_empty());
        assert_eq!(memory.format(), "");
        assert_eq!(memory.blocks().count(), 0);
    }

    #[test]
    fn test_blocks_are_restartable() {
        let mut memory = ConversationMemory::default();
        memory.append("hi", "Hello");
        memory.append("John 3:16", "For God so loved the world");

        let blocks = memory.blocks();
        let first_pass: Vec<_> = blocks.clone().collect();
        let second_pass: Vec<_> = blocks.collect();
        assert_eq!(first_pass, second_pass);
        assert_eq!(first_pass[0], "Q: hi\nA: Hello");
    }

    #[test]
    fn test_custom_window_and_clear() {
        let mut memory = ConversationMemory::new(MemoryConfig { window: 1 });
        memory.append("a", "1");
        memory.append("b", "2");
        assert_eq!(memory.format(), "Q: b\nA: 2");

        memory.clear();
        assert!(memory.is_empty());
        assert_eq!(memory.window(), 1);
    }
}
