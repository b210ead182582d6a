//! Chat session with the farming assistant

use crate::advisor::AdvisoryEngine;
use crate::weather::WeatherSnapshot;
use chrono::{DateTime, Local};
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

pub const GREETING: &str = "Hello! I'm your farming assistant. Ask me anything about planting, weather conditions, or crop management.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Local>,
}

impl ChatMessage {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Local::now(),
        }
    }
}

/// Conversation history plus the engine answering it
pub struct ChatSession<R = StdRng> {
    advisor: AdvisoryEngine<R>,
    messages: Vec<ChatMessage>,
}

impl ChatSession<StdRng> {
    pub fn new() -> Self {
        Self::with_advisor(AdvisoryEngine::new())
    }
}

impl Default for ChatSession<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> ChatSession<R> {
    pub fn with_advisor(advisor: AdvisoryEngine<R>) -> Self {
        Self {
            advisor,
            messages: vec![ChatMessage::new(Role::Assistant, GREETING)],
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Record the question and the reply; blank input is ignored
    pub fn send(&mut self, input: &str, snapshot: Option<&WeatherSnapshot>) -> Option<&ChatMessage> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }

        self.messages.push(ChatMessage::new(Role::User, input));
        let reply = self.advisor.respond(input, snapshot);
        self.messages.push(ChatMessage::new(Role::Assistant, reply));
        self.messages.last()
    }
}
