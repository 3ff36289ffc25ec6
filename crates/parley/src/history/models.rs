//! Chat message data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

/// Role of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// A chat message stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Message {
    /// Auto-incrementing ID, the authoritative ordering key
    pub id: i64,
    /// Who wrote the message
    pub role: MessageRole,
    /// Message text, never empty
    pub content: String,
    /// When the row was inserted (assigned by the database)
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_display_pads() {
        assert_eq!(MessageRole::Assistant.to_string(), "assistant");
        assert_eq!(format!("{:<6}|", MessageRole::User), "user  |");
    }

    #[test]
    fn test_message_serializes_lowercase_role() {
        let message = Message {
            id: 7,
            role: MessageRole::User,
            content: "Hello".to_string(),
            timestamp: "2025-01-04T10:00:00.123Z".parse().unwrap(),
        };

        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["role"], "user");
        assert_eq!(json["content"], "Hello");
        assert_eq!(json["timestamp"], "2025-01-04T10:00:00.123Z");
    }
}
