//! Presence record entity and repository trait.
//!
//! Maps to the `online_users` table in the database schema.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::shared::error::AppError;

/// Ephemeral marker that a user is currently viewing a chat.
///
/// One row per `(chat, user)` pair (UNIQUE constraint). Created when the
/// connection is accepted, deleted when it closes. "Viewing", not "online":
/// a user with two chats open holds two independent records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceRecord {
    pub id: i64,
    pub chat_id: i64,
    pub user_id: i64,
}

/// Repository trait for presence records.
#[async_trait]
pub trait PresenceRepository: Send + Sync {
    /// Idempotent get-or-create of the `(user, chat)` record.
    async fn join(&self, user_id: i64, chat_id: i64) -> Result<(), AppError>;

    /// Idempotent delete; an absent record is a no-op.
    async fn leave(&self, user_id: i64, chat_id: i64) -> Result<(), AppError>;

    /// All presence records for a chat except the given user's.
    async fn list_for_chat(
        &self,
        chat_id: i64,
        excluding_user: i64,
    ) -> Result<Vec<PresenceRecord>, AppError>;
}
