//! Presence Repository Implementation
//!
//! PostgreSQL implementation of the ephemeral "user is viewing chat"
//! records. Both operations are idempotent single statements.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::entities::presence::{PresenceRecord, PresenceRepository};
use crate::shared::error::AppError;

/// PostgreSQL implementation of the PresenceRepository.
pub struct PgPresenceRepository {
    pool: PgPool,
}

impl PgPresenceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct PresenceRow {
    id: i64,
    chat_id: i64,
    user_id: i64,
}

#[async_trait]
impl PresenceRepository for PgPresenceRepository {
    /// Get-or-create: ON CONFLICT DO NOTHING keeps a double join (or a
    /// concurrent one) from ever creating a duplicate row.
    async fn join(&self, user_id: i64, chat_id: i64) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO online_users (chat_id, user_id)
            VALUES ($1, $2)
            ON CONFLICT (chat_id, user_id) DO NOTHING
            "#,
        )
        .bind(chat_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn leave(&self, user_id: i64, chat_id: i64) -> Result<(), AppError> {
        sqlx::query(
            r#"
            DELETE FROM online_users
            WHERE chat_id = $1 AND user_id = $2
            "#,
        )
        .bind(chat_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_for_chat(
        &self,
        chat_id: i64,
        excluding_user: i64,
    ) -> Result<Vec<PresenceRecord>, AppError> {
        let rows = sqlx::query_as::<_, PresenceRow>(
            r#"
            SELECT id, chat_id, user_id
            FROM online_users
            WHERE chat_id = $1 AND user_id <> $2
            "#,
        )
        .bind(chat_id)
        .bind(excluding_user)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| PresenceRecord {
                id: r.id,
                chat_id: r.chat_id,
                user_id: r.user_id,
            })
            .collect())
    }
}
