//! Message domain types.
//!
//! These are the value objects that flow from the website's chat widget,
//! through the assistant, to the provider:
//! visitor sends a [`ChatTurn`] history → assistant builds [`Message`]s → provider answers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The site visitor
    User,
    /// The assistant
    Assistant,
    /// System instructions (organization facts, tone rules)
    System,
}

impl Role {
    /// Coerce a free-form role label coming from a client into a chat role.
    ///
    /// Only `"assistant"` maps to [`Role::Assistant`]; anything else is
    /// treated as the visitor speaking. Clients never get to inject system turns.
    pub fn coerce(label: &str) -> Self {
        if label.trim().eq_ignore_ascii_case("assistant") {
            Role::Assistant
        } else {
            Role::User
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

/// A single message in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID
    pub id: String,

    /// Who sent this message
    pub role: Role,

    /// The text content
    pub content: String,

    /// Timestamp
    pub timestamp: DateTime<Utc>,
}

impl Message {
    fn with_role(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(Role::User, content)
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(Role::Assistant, content)
    }

    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(Role::System, content)
    }
}

/// A prior conversation turn as supplied by the inbound caller.
///
/// The role is kept as the raw label the client sent; it is coerced with
/// [`Role::coerce`] when the turn is converted into a [`Message`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: String,
    pub content: String,
}

impl ChatTurn {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    /// Convert into a provider message, coercing the role.
    pub fn to_message(&self) -> Message {
        Message::with_role(Role::coerce(&self.role), self.content.clone())
    }
}
