//! Reaction Repository Implementation
//!
//! PostgreSQL implementation of the reaction toggle. The UNIQUE constraint
//! on (message_id, user_id) is what makes the toggle safe under concurrent
//! requests from the same user.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::entities::reaction::{Reaction, ReactionRepository, ReactionToggle};
use crate::shared::error::AppError;

/// PostgreSQL implementation of the ReactionRepository.
pub struct PgReactionRepository {
    pool: PgPool,
}

impl PgReactionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ReactionRow {
    id: i64,
    message_id: i64,
    user_id: Option<i64>,
    reaction: String,
    created_at: chrono::DateTime<chrono::Utc>,
}

#[async_trait]
impl ReactionRepository for PgReactionRepository {
    /// Delete-if-exists, otherwise insert. Both arms are single statements;
    /// there is no check-then-act window. An existing row is removed no
    /// matter which glyph it holds.
    async fn toggle(
        &self,
        message_id: i64,
        user_id: i64,
        reaction: &str,
    ) -> Result<ReactionToggle, AppError> {
        let deleted = sqlx::query(
            r#"
            DELETE FROM reactions
            WHERE message_id = $1 AND user_id = $2
            "#,
        )
        .bind(message_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        if deleted.rows_affected() > 0 {
            return Ok(ReactionToggle::Deleted);
        }

        // A concurrent insert losing the conflict still reports Posted: the
        // row exists either way, which is what the broadcast announces.
        sqlx::query(
            r#"
            INSERT INTO reactions (message_id, user_id, reaction)
            VALUES ($1, $2, $3)
            ON CONFLICT (message_id, user_id) DO NOTHING
            "#,
        )
        .bind(message_id)
        .bind(user_id)
        .bind(reaction)
        .execute(&self.pool)
        .await?;

        Ok(ReactionToggle::Posted)
    }

    async fn list_for_message(&self, message_id: i64) -> Result<Vec<Reaction>, AppError> {
        let rows = sqlx::query_as::<_, ReactionRow>(
            r#"
            SELECT id, message_id, user_id, reaction, created_at
            FROM reactions
            WHERE message_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(message_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| Reaction {
                id: r.id,
                message_id: r.message_id,
                user_id: r.user_id,
                reaction: r.reaction,
                created_at: r.created_at,
            })
            .collect())
    }
}
