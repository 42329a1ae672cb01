//! Conversation identity and chat turn types.
//!
//! A [`ConversationKey`] names one chat session (app, user, session); a
//! [`ChatTurn`] is one message of that session as handed to the context
//! assembler by the history layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Owning conversation of an uploaded artifact or a chat turn.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationKey {
    pub app_name: String,
    pub user_id: String,
    pub session_id: String,
}

impl ConversationKey {
    pub fn new(
        app_name: impl Into<String>,
        user_id: impl Into<String>,
        session_id: impl Into<String>,
    ) -> Self {
        Self {
            app_name: app_name.into(),
            user_id: user_id.into(),
            session_id: session_id.into(),
        }
    }
}

impl std::fmt::Display for ConversationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.app_name, self.user_id, self.session_id)
    }
}

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user
    User,
    /// The orchestrator model
    Assistant,
    /// System instructions
    System,
}

/// A single chat message in the recent-history slice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl ChatTurn {
    pub fn new(role: Role, content: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            role,
            content: content.into(),
            created_at,
        }
    }

    /// A user turn stamped now.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content, Utc::now())
    }

    /// An assistant turn stamped now.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content, Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversation_key_display() {
        let key = ConversationKey::new("SanskaraAI", "user-1", "sess-9");
        assert_eq!(key.to_string(), "SanskaraAI/user-1/sess-9");
    }

    #[test]
    fn conversation_keys_compare_by_all_parts() {
        let a = ConversationKey::new("app", "u", "s1");
        let b = ConversationKey::new("app", "u", "s2");
        assert_ne!(a, b);
        assert_eq!(a, ConversationKey::new("app", "u", "s1"));
    }

    #[test]
    fn chat_turn_serializes_lowercase_role() {
        let turn = ChatTurn::user("Can we move the sangeet?");
        let json = serde_json::to_string(&turn).unwrap();
        assert!(json.contains("\"role\":\"user\""));
        assert!(json.contains("sangeet"));
    }
}
