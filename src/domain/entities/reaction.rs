//! Message Reaction entity and repository trait.
//!
//! Maps to the `reactions` table in the database schema.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::error::AppError;

/// Represents a reaction on a message.
///
/// Maps to the `reactions` table:
/// - id: BIGSERIAL PRIMARY KEY
/// - message_id: BIGINT NOT NULL REFERENCES messages(id) ON DELETE CASCADE
/// - user_id: BIGINT NULL REFERENCES users(id) ON DELETE SET NULL
/// - reaction: VARCHAR(8) NOT NULL (the glyph)
/// - created_at: TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// - UNIQUE (message_id, user_id)
///
/// A toggle entity: the row's existence means "this user reacted to this
/// message". The UNIQUE constraint holds each user to at most one reaction
/// row per message, and any glyph toggles an existing row off.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reaction {
    pub id: i64,
    pub message_id: i64,
    pub user_id: Option<i64>,

    /// Reaction glyph
    pub reaction: String,

    pub created_at: DateTime<Utc>,
}

/// Outcome of a reaction toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionToggle {
    /// No row existed; one was inserted
    Posted,
    /// A row existed (any glyph); it was deleted
    Deleted,
}

/// Repository trait for Reaction data access operations.
#[async_trait]
pub trait ReactionRepository: Send + Sync {
    /// Toggle the `(message, user)` reaction row.
    ///
    /// Must be atomic at the row level: delete-if-exists, otherwise insert,
    /// with the UNIQUE constraint absorbing concurrent inserts.
    async fn toggle(
        &self,
        message_id: i64,
        user_id: i64,
        reaction: &str,
    ) -> Result<ReactionToggle, AppError>;

    /// All reactions currently on a message, oldest first.
    async fn list_for_message(&self, message_id: i64) -> Result<Vec<Reaction>, AppError>;
}
