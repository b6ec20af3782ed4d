//! In-memory conversation log with tentative appends

use crate::events::ConversationRole;
use serde::{Deserialize, Serialize};

/// Synthetic assistant message every conversation starts with
pub const GREETING: &str = "Fresh start! Share a few ingredients, pick the vibe if you like, and I will craft a recipe you can trust.";

/// Message in conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: ConversationRole,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ConversationRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ConversationRole::Assistant,
            content: content.into(),
        }
    }
}

/// Ordered log of exchanged messages.
///
/// A user message is appended tentatively by [`Conversation::begin`] and then
/// either paired with a reply by [`Conversation::commit`] or removed again by
/// [`Conversation::compensate`]. Outside of an open exchange the log strictly
/// alternates assistant/user, starting with the greeting.
#[derive(Debug, Clone)]
pub struct Conversation {
    messages: Vec<Message>,
    tentative: Option<usize>,
}

impl Conversation {
    /// Create a conversation seeded with the greeting.
    pub fn new() -> Self {
        Self {
            messages: vec![Message::assistant(GREETING)],
            tentative: None,
        }
    }

    /// Tentatively append a user message. Returns `false` if an exchange is
    /// already open.
    pub fn begin(&mut self, content: impl Into<String>) -> bool {
        if self.tentative.is_some() {
            return false;
        }
        self.messages.push(Message::user(content));
        self.tentative = Some(self.messages.len() - 1);
        true
    }

    /// Pair the open user message with the assistant reply.
    pub fn commit(&mut self, reply: impl Into<String>) -> bool {
        if self.tentative.take().is_none() {
            return false;
        }
        self.messages.push(Message::assistant(reply));
        true
    }

    /// Drop the open user message.
    pub fn compensate(&mut self) -> Option<Message> {
        let index = self.tentative.take()?;
        if index < self.messages.len() {
            Some(self.messages.remove(index))
        } else {
            None
        }
    }

    /// Discard everything and re-seed the greeting.
    pub fn reset(&mut self) {
        self.messages.clear();
        self.messages.push(Message::assistant(GREETING));
        self.tentative = None;
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_open(&self) -> bool {
        self.tentative.is_some()
    }

    /// Whether the log alternates assistant/user starting from the greeting.
    pub fn is_alternating(&self) -> bool {
        let settled = if self.is_open() {
            &self.messages[..self.messages.len() - 1]
        } else {
            &self.messages[..]
        };

        settled.iter().enumerate().all(|(i, message)| {
            let expected = if i % 2 == 0 {
                ConversationRole::Assistant
            } else {
                ConversationRole::User
            };
            message.role == expected
        }) && settled.len() % 2 == 1
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}
