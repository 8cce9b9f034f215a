//! Chat entity and repository trait.
//!
//! Maps to the `chats` table in the database schema.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::error::AppError;

/// Represents a chat room within a thematic room.
///
/// Maps to the `chats` table:
/// - id: BIGSERIAL PRIMARY KEY
/// - title: VARCHAR(50) NOT NULL
/// - room: VARCHAR(50) NOT NULL, UNIQUE (room, title)
/// - user_id: BIGINT NULL REFERENCES users(id) (the owner)
/// - description: TEXT NOT NULL
/// - img: TEXT NULL (image reference)
/// - created_at: TIMESTAMPTZ NOT NULL DEFAULT NOW()
///
/// Deleting a chat is a hard delete; the database cascades to its messages,
/// likes, reactions and presence records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chat {
    pub id: i64,
    pub title: String,
    pub room: String,

    /// Owner; None once the owner account is removed
    pub user_id: Option<i64>,

    pub description: String,

    /// Image reference
    pub img: Option<String>,

    pub created_at: DateTime<Utc>,
}

impl Chat {
    /// Check whether the given user owns this chat.
    pub fn is_owned_by(&self, user_id: i64) -> bool {
        self.user_id == Some(user_id)
    }
}

/// Repository trait for Chat data access operations.
#[async_trait]
pub trait ChatRepository: Send + Sync {
    /// Find a chat by id.
    async fn find_by_id(&self, id: i64) -> Result<Option<Chat>, AppError>;

    /// Hard-delete a chat. Cascades are the database's job.
    async fn delete(&self, id: i64) -> Result<(), AppError>;
}
