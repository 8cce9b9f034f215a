//! Presence Tracker
//!
//! Ephemeral "user X is viewing chat Y" records. The records live in
//! storage; this service adds the identity resolution the wire format
//! needs (display name, avatar).

use std::sync::Arc;

use crate::domain::entities::presence::PresenceRepository;
use crate::domain::entities::user::UserRepository;
use crate::shared::error::GatewayError;

use super::events::UserSummary;

/// Tracks which users are viewing which chats.
pub struct PresenceTracker {
    presence: Arc<dyn PresenceRepository>,
    users: Arc<dyn UserRepository>,
}

impl PresenceTracker {
    pub fn new(presence: Arc<dyn PresenceRepository>, users: Arc<dyn UserRepository>) -> Self {
        Self { presence, users }
    }

    /// Mark the user as viewing the chat. Idempotent get-or-create.
    pub async fn join(&self, user_id: i64, chat_id: i64) -> Result<(), GatewayError> {
        self.presence.join(user_id, chat_id).await?;
        tracing::debug!(user_id, chat_id, "Presence record created");
        Ok(())
    }

    /// Remove the user's record for the chat. A leave with no record is a
    /// no-op, not an error.
    pub async fn leave(&self, user_id: i64, chat_id: i64) -> Result<(), GatewayError> {
        self.presence.leave(user_id, chat_id).await?;
        tracing::debug!(user_id, chat_id, "Presence record removed");
        Ok(())
    }

    /// Everyone else currently viewing the chat, resolved to display data.
    ///
    /// A record whose user row vanished between listing and resolution is
    /// skipped rather than failing the whole list.
    pub async fn list(
        &self,
        chat_id: i64,
        excluding_user: i64,
    ) -> Result<Vec<UserSummary>, GatewayError> {
        let records = self.presence.list_for_chat(chat_id, excluding_user).await?;

        let mut online = Vec::with_capacity(records.len());
        for record in records {
            if let Some(user) = self.users.find_by_id(record.user_id).await? {
                online.push(UserSummary {
                    id: user.id,
                    username: user.username,
                    avatar: user.avatar_url,
                });
            }
        }
        Ok(online)
    }
}
