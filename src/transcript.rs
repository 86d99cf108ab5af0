//! The conversation transcript of one chat session.
//!
//! A [`Transcript`] only ever grows: messages are appended in conversation
//! order and never edited or removed.

use serde::{Deserialize, Serialize};

use crate::types::ContentRole;

/// Who wrote a message.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The person chatting.
    User,

    /// The model.
    Model,
}

/// How a role is labelled on screen.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum DisplayRole {
    /// Shown as the user.
    User,

    /// Shown as the assistant.
    Assistant,
}

impl Role {
    /// The API role for this message role.
    pub fn content_role(self) -> ContentRole {
        match self {
            Role::User => ContentRole::User,
            Role::Model => ContentRole::Model,
        }
    }

    /// The on-screen role for this message role.
    pub fn display_role(self) -> DisplayRole {
        match self {
            Role::User => DisplayRole::User,
            Role::Model => DisplayRole::Assistant,
        }
    }
}

impl From<Role> for ContentRole {
    fn from(role: Role) -> Self {
        role.content_role()
    }
}

impl DisplayRole {
    /// Label printed in front of a message.
    pub fn label(self) -> &'static str {
        match self {
            DisplayRole::User => "You",
            DisplayRole::Assistant => "Planner",
        }
    }
}

/// One message of the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Who wrote the message.
    pub role: Role,

    /// The message text.
    pub content: String,
}

impl Message {
    /// Create a new message.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create a model message.
    pub fn model(content: impl Into<String>) -> Self {
        Self::new(Role::Model, content)
    }
}

/// Ordered, append-only list of messages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    /// Create an empty transcript.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message.
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Number of messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// True if nothing has been said yet.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// The most recent message.
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Iterate in conversation order.
    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.messages.iter()
    }

    /// The messages in conversation order.
    pub fn as_slice(&self) -> &[Message] {
        &self.messages
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

    #[test]
    fn role_mapping_is_one_to_one() {
        assert_eq!(Role::User.content_role(), ContentRole::User);
        assert_eq!(Role::Model.content_role(), ContentRole::Model);
        assert_eq!(Role::User.display_role(), DisplayRole::User);
        assert_eq!(Role::Model.display_role(), DisplayRole::Assistant);
    }

    #[test]
    fn transcript_keeps_order() {
        let mut transcript = Transcript::new();
        assert!(transcript.is_empty());
        transcript.push(Message::user("first"));
        transcript.push(Message::model("second"));
        transcript.push(Message::user("third"));

        let contents: Vec<&str> = transcript.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "second", "third"]);
        assert_eq!(transcript.len(), 3);
        assert_eq!(transcript.last(), Some(&Message::user("third")));
    }

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Model).unwrap(), r#""model""#);
        let message: Message =
            serde_json::from_str(r#"{"role":"user","content":"hello"}"#).unwrap();
        assert_eq!(message, Message::user("hello"));
    }
}
