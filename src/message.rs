//! Conversation messages and transcripts.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// The role of a message participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instructions
    System,
    /// Human/application input
    Human,
    /// Model output
    Ai,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::Human => write!(f, "human"),
            Role::Ai => write!(f, "ai"),
        }
    }
}

/// A role-tagged unit of conversation content.
///
/// Equality is structural: two messages are equal when role and content match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message sender
    pub role: Role,
    /// Content of the message
    pub content: String,
}

/// Ordered conversation history. Order is semantically meaningful.
pub type Transcript = Vec<Message>;

impl Message {
    /// Create a new message with role and content.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Create a human message.
    pub fn human(content: impl Into<String>) -> Self {
        Self::new(Role::Human, content)
    }

    /// Create an AI message.
    pub fn ai(content: impl Into<String>) -> Self {
        Self::new(Role::Ai, content)
    }

    /// True for model replies.
    pub fn is_ai(&self) -> bool {
        self.role == Role::Ai
    }

    /// True for human prompts, including continue prompts.
    pub fn is_human(&self) -> bool {
        self.role == Role::Human
    }
}

/// Join runs of consecutive same-role messages into one, separated by a blank line.
///
/// Some providers reject two consecutive turns from the same role.
pub fn collapse_consecutive_roles(messages: &[Message]) -> Vec<Message> {
    let mut collapsed: Vec<Message> = Vec::with_capacity(messages.len());

    for message in messages {
        match collapsed.last_mut() {
            Some(last) if last.role == message.role => {
                last.content.push_str("\n\n");
                last.content.push_str(&message.content);
            }
            _ => collapsed.push(message.clone()),
        }
    }

    collapsed
}

/// Serialize messages to a JSON array.
pub fn serialize_messages(messages: &[Message]) -> Result<String> {
    Ok(serde_json::to_string(messages)?)
}

/// Deserialize messages from a JSON array produced by [`serialize_messages`].
pub fn deserialize_messages(json: &str) -> Result<Transcript> {
    Ok(serde_json::from_str(json)?)
}
