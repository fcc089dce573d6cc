//! Session memory — the rolling chat transcript behind one conversation.
//!
//! The system prompt is pinned; user and assistant turns beyond the
//! window are dropped oldest-first so long conversations keep a bounded
//! request size.

use serde::{Deserialize, Serialize};

use crate::client::ChatMessage;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    system: ChatMessage,
    turns: Vec<ChatMessage>,
    window: usize,
}

impl Session {
    pub fn new(system_prompt: impl Into<String>, window: usize) -> Self {
        Self {
            system: ChatMessage::system(system_prompt),
            turns: Vec::new(),
            window: window.max(2),
        }
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.push(ChatMessage::user(content));
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.push(ChatMessage::assistant(content));
    }

    fn push(&mut self, message: ChatMessage) {
        self.turns.push(message);
        if self.turns.len() > self.window {
            let overflow = self.turns.len() - self.window;
            self.turns.drain(..overflow);
        }
    }

    /// Full transcript for the next request: system prompt first, then
    /// the retained turns in order.
    pub fn messages(&self) -> Vec<ChatMessage> {
        let mut out = Vec::with_capacity(self.turns.len() + 1);
        out.push(self.system.clone());
        out.extend(self.turns.iter().cloned());
        out
    }

    pub fn turn_count(&self) -> usize {
        self.turns.len()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }
}
