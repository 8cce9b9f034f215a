//! Chat Repository Implementation

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::entities::chat::{Chat, ChatRepository};
use crate::shared::error::AppError;

/// PostgreSQL implementation of the ChatRepository.
pub struct PgChatRepository {
    pool: PgPool,
}

impl PgChatRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ChatRow {
    id: i64,
    title: String,
    room: String,
    user_id: Option<i64>,
    description: String,
    img: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
}

#[async_trait]
impl ChatRepository for PgChatRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<Chat>, AppError> {
        let row = sqlx::query_as::<_, ChatRow>(
            r#"
            SELECT id, title, room, user_id, description, img, created_at
            FROM chats
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| Chat {
            id: r.id,
            title: r.title,
            room: r.room,
            user_id: r.user_id,
            description: r.description,
            img: r.img,
            created_at: r.created_at,
        }))
    }

    /// Hard delete; messages, likes, reactions and presence rows go with it
    /// through ON DELETE CASCADE.
    async fn delete(&self, id: i64) -> Result<(), AppError> {
        sqlx::query(
            r#"
            DELETE FROM chats
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
