//! Short-term memory - sliding window of the live conversation
//!
//! Keeps the most recent user/assistant messages in a bounded buffer that is
//! shared by every task serving a chat. Eviction always drops the two oldest
//! messages together so a window fed in pairs keeps its role alternation.
//!
//! # Example
//!
//! ```
//! use vayuu_ai::memory::ShortTermMemory;
//! use vayuu_ai::llm::Role;
//!
//! let memory = ShortTermMemory::new(4);
//! memory.add(Role::User, "Hello");
//! memory.add(Role::Assistant, "Hi there!");
//!
//! assert_eq!(memory.len(), 2);
//! let history = memory.history();
//! ```

use std::collections::VecDeque;

use parking_lot::RwLock;

use crate::llm::{Message, Role};

/// Default number of messages kept in short-term memory
pub const DEFAULT_STM_CAPACITY: usize = 20;

/// Thread-safe sliding window; writers take the lock exclusively, readers share it.
#[derive(Debug)]
pub struct ShortTermMemory {
    messages: RwLock<VecDeque<Message>>,
    capacity: usize,
}

impl Default for ShortTermMemory {
    fn default() -> Self {
        Self::new(DEFAULT_STM_CAPACITY)
    }
}

impl ShortTermMemory {
    pub fn new(capacity: usize) -> Self {
        Self {
            messages: RwLock::new(VecDeque::with_capacity(capacity + 2)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append a message, then evict the oldest pair while over capacity.
    pub fn add(&self, role: Role, content: impl Into<String>) {
        self.add_message(Message::new(role, content));
    }

    pub fn add_message(&self, message: Message) {
        let mut messages = self.messages.write();
        messages.push_back(message);
        while messages.len() > self.capacity {
            messages.pop_front();
            messages.pop_front();
        }
    }

    /// Append a completed user/assistant exchange under a single lock.
    pub fn add_exchange(&self, user: impl Into<String>, assistant: impl Into<String>) {
        let mut messages = self.messages.write();
        messages.push_back(Message::user(user));
        messages.push_back(Message::assistant(assistant));
        while messages.len() > self.capacity {
            messages.pop_front();
            messages.pop_front();
        }
    }

    /// Owned copy of the window, oldest first.
    pub fn history(&self) -> Vec<Message> {
        self.messages.read().iter().cloned().collect()
    }

    pub fn clear(&self) {
        self.messages.write().clear();
    }

    pub fn len(&self) -> usize {
        self.messages.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_new_memory_is_empty() {
        let memory = ShortTermMemory::default();
        assert!(memory.is_empty());
        assert_eq!(memory.capacity(), DEFAULT_STM_CAPACITY);
    }

    #[test]
    fn test_add_keeps_order() {
        let memory = ShortTermMemory::new(10);
        memory.add(Role::User, "one");
        memory.add(Role::Assistant, "two");

        let history = memory.history();
        assert_eq!(history[0].content, "one");
        assert_eq!(history[0].role, Role::User);
        assert_eq!(history[1].content, "two");
    }

    #[test]
    fn test_pair_eviction_never_odd() {
        let memory = ShortTermMemory::new(4);
        for i in 0..25 {
            memory.add(Role::User, format!("u{i}"));
            memory.add(Role::Assistant, format!("a{i}"));
            let len = memory.len();
            assert!(len <= 4);
            assert_eq!(len % 2, 0);
        }

        let history = memory.history();
        assert_eq!(history[0].content, "u23");
        assert_eq!(history[0].role, Role::User);
        assert_eq!(history[3].content, "a24");
    }

    #[test]
    fn test_overflow_by_one_drops_two() {
        let memory = ShortTermMemory::new(3);
        memory.add(Role::User, "u1");
        memory.add(Role::Assistant, "a1");
        memory.add(Role::User, "u2");
        memory.add(Role::Assistant, "a2");

        let contents: Vec<String> = memory.history().into_iter().map(|m| m.content).collect();
        assert_eq!(contents, vec!["u2", "a2"]);
    }

    #[test]
    fn test_history_is_a_copy() {
        let memory = ShortTermMemory::new(4);
        memory.add_exchange("question", "answer");

        let mut copy = memory.history();
        copy[0].content = "tampered".to_string();
        copy.clear();

        let history = memory.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].content, "question");
    }

    #[test]
    fn test_clear() {
        let memory = ShortTermMemory::new(4);
        memory.add_exchange("q", "a");
        memory.clear();
        assert!(memory.is_empty());
    }

    #[test]
    fn test_concurrent_pairs_stay_bounded() {
        let memory = Arc::new(ShortTermMemory::new(6));
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let memory = Arc::clone(&memory);
                std::thread::spawn(move || {
                    for i in 0..50 {
                        memory.add_exchange(format!("u{t}-{i}"), format!("a{t}-{i}"));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let history = memory.history();
        assert_eq!(history.len(), 6);
        for pair in history.chunks(2) {
            assert_eq!(pair[0].role, Role::User);
            assert_eq!(pair[1].role, Role::Assistant);
        }
    }
}
