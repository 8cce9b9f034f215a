//! Chat Like entity and repository trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::shared::error::AppError;

/// A chat like. Toggle entity scoped to `(chat, user)`, UNIQUE in the
/// `chat_likes` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatLike {
    pub id: i64,
    pub chat_id: i64,
    pub user_id: i64,
}

/// Outcome of a like toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeToggle {
    Liked,
    Unliked,
}

/// Repository trait for chat likes.
#[async_trait]
pub trait LikeRepository: Send + Sync {
    /// Toggle the `(chat, user)` like row atomically.
    async fn toggle(&self, chat_id: i64, user_id: i64) -> Result<LikeToggle, AppError>;
}
