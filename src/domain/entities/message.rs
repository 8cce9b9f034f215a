//! Message entity and repository trait.
//!
//! Maps to the `messages` table in the database schema.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::error::AppError;

/// Maximum message text length in characters (the persisted column width).
pub const MAX_TEXT_LENGTH: usize = 792;

/// Sentinel written over the text of a soft-deleted message.
pub const DELETED_TEXT: &str = "deleted";

/// Represents a chat message.
///
/// Maps to the `messages` table:
/// - id: BIGSERIAL PRIMARY KEY
/// - chat_id: BIGINT NOT NULL REFERENCES chats(id) ON DELETE CASCADE
/// - user_id: BIGINT NULL REFERENCES users(id) ON DELETE SET NULL
/// - text: VARCHAR(792)
/// - is_deleted: BOOLEAN NOT NULL DEFAULT FALSE
/// - created_at: TIMESTAMPTZ NOT NULL DEFAULT NOW()
///
/// Deletion is logical: `is_deleted` is set and the text is overwritten with
/// the `DELETED_TEXT` sentinel. The row is never removed, and a soft-deleted
/// message can never be edited or un-deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,

    /// Chat this message belongs to
    pub chat_id: i64,

    /// Author; None once the author account is removed
    pub user_id: Option<i64>,

    /// Message text (up to 792 characters)
    pub text: String,

    /// Soft-delete flag
    pub is_deleted: bool,

    /// Timestamp when the message was sent
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Check whether the given user authored this message.
    ///
    /// A message whose author account was removed has no author, so
    /// nobody passes this check.
    pub fn is_authored_by(&self, user_id: i64) -> bool {
        self.user_id == Some(user_id)
    }
}

/// A message row waiting to be persisted.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub chat_id: i64,
    pub user_id: i64,
    pub text: String,
    /// File ids linked to the message in the same transaction
    pub attachment_ids: Vec<i64>,
}

/// Repository trait for Message data access operations.
#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Find a message by id.
    async fn find_by_id(&self, id: i64) -> Result<Option<Message>, AppError>;

    /// Persist a new message together with its attachment links.
    async fn create(&self, message: NewMessage) -> Result<Message, AppError>;

    /// Replace the text of a live message.
    ///
    /// Returns false when no non-deleted row matched: the message is gone
    /// or was soft-deleted concurrently. The statement itself carries the
    /// guard, so a racing delete can never be overwritten.
    async fn update_text(&self, id: i64, new_text: &str) -> Result<bool, AppError>;

    /// Soft-delete: set the flag and overwrite the text with the sentinel.
    async fn soft_delete(&self, id: i64) -> Result<(), AppError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorship_requires_a_surviving_author() {
        let msg = Message {
            id: 1,
            chat_id: 7,
            user_id: Some(3),
            text: "hi".into(),
            is_deleted: false,
            created_at: Utc::now(),
        };
        assert!(msg.is_authored_by(3));
        assert!(!msg.is_authored_by(4));

        let orphaned = Message {
            user_id: None,
            ..msg
        };
        assert!(!orphaned.is_authored_by(3));
    }
}
