//! Conversation history.
//!
//! The transcript is the ordered list of messages sent with every chat
//! request. It only grows by whole exchanges, and shrinks either by undoing
//! the last exchange or by truncating back to a recorded length.

use serde::{Deserialize, Serialize};

/// Role of a message author.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// User role.
    User,

    /// Assistant role.
    Assistant,
}

/// A single message in the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// The content of the message.
    pub content: String,

    /// The role of the message.
    pub role: Role,
}

impl Message {
    /// Create a new `Message` with the given content and role.
    pub fn new(content: impl Into<String>, role: Role) -> Self {
        Self {
            content: content.into(),
            role,
        }
    }

    /// Create a new user `Message`.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(content, Role::User)
    }

    /// Create a new assistant `Message`.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(content, Role::Assistant)
    }
}

/// Ordered conversation history, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    /// Creates an empty transcript.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a user message.
    pub fn push_user(&mut self, content: impl Into<String>) {
        self.messages.push(Message::user(content));
    }

    /// Appends an assistant message.
    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.messages.push(Message::assistant(content));
    }

    /// Removes the last exchange if at least two messages are present.
    ///
    /// Returns true if anything was removed.
    pub fn undo_exchange(&mut self) -> bool {
        if self.messages.len() >= 2 {
            self.messages.truncate(self.messages.len() - 2);
            true
        } else {
            false
        }
    }

    /// Drops every message past `len`.
    pub fn truncate(&mut self, len: usize) {
        self.messages.truncate(len);
    }

    /// Returns the number of messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns true if there are no messages.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Returns the messages, oldest first.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Returns the most recent message, if any.
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Iterates over the messages, oldest first.
    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.messages.iter()
    }
}

impl<'a> IntoIterator for &'a Transcript {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn message_serialization() {
        let message = Message::user("Hello");
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value, json!({"content": "Hello", "role": "user"}));
    }

    #[test]
    fn transcript_serializes_as_array() {
        let mut transcript = Transcript::new();
        transcript.push_user("Hi");
        transcript.push_assistant("Hello!");
        let value = serde_json::to_value(&transcript).unwrap();
        assert_eq!(
            value,
            json!([
                {"content": "Hi", "role": "user"},
                {"content": "Hello!", "role": "assistant"},
            ])
        );
    }

    #[test]
    fn undo_removes_last_exchange() {
        let mut transcript = Transcript::new();
        transcript.push_user("one");
        transcript.push_assistant("1");
        transcript.push_user("two");
        transcript.push_assistant("2");

        assert!(transcript.undo_exchange());
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript.last(), Some(&Message::assistant("1")));
    }

    #[test]
    fn undo_below_two_is_noop() {
        let mut transcript = Transcript::new();
        assert!(!transcript.undo_exchange());

        transcript.push_user("dangling");
        assert!(!transcript.undo_exchange());
        assert_eq!(transcript.len(), 1);
    }

    #[test]
    fn truncate_restores_length() {
        let mut transcript = Transcript::new();
        transcript.push_user("one");
        let mark = transcript.len();
        transcript.push_user("two");
        transcript.truncate(mark);
        assert_eq!(transcript.messages(), &[Message::user("one")]);
    }
}
