//! Like Repository Implementation
//!
//! PostgreSQL implementation of the chat like toggle, same shape as the
//! reaction toggle but keyed on (chat_id, user_id).

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::entities::like::{LikeRepository, LikeToggle};
use crate::shared::error::AppError;

/// PostgreSQL implementation of the LikeRepository.
pub struct PgLikeRepository {
    pool: PgPool,
}

impl PgLikeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LikeRepository for PgLikeRepository {
    async fn toggle(&self, chat_id: i64, user_id: i64) -> Result<LikeToggle, AppError> {
        let deleted = sqlx::query(
            r#"
            DELETE FROM chat_likes
            WHERE chat_id = $1 AND user_id = $2
            "#,
        )
        .bind(chat_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        if deleted.rows_affected() > 0 {
            return Ok(LikeToggle::Unliked);
        }

        sqlx::query(
            r#"
            INSERT INTO chat_likes (chat_id, user_id)
            VALUES ($1, $2)
            ON CONFLICT (chat_id, user_id) DO NOTHING
            "#,
        )
        .bind(chat_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(LikeToggle::Liked)
    }
}
