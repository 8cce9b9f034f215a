//! Message Repository Implementation
//!
//! PostgreSQL implementation of message operations, including the
//! soft-delete that overwrites text with the sentinel.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::entities::message::{
    Message, MessageRepository, NewMessage, DELETED_TEXT,
};
use crate::shared::error::AppError;

/// PostgreSQL implementation of the MessageRepository.
pub struct PgMessageRepository {
    pool: PgPool,
}

impl PgMessageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct MessageRow {
    id: i64,
    chat_id: i64,
    user_id: Option<i64>,
    text: Option<String>,
    is_deleted: bool,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl From<MessageRow> for Message {
    fn from(row: MessageRow) -> Self {
        Message {
            id: row.id,
            chat_id: row.chat_id,
            user_id: row.user_id,
            text: row.text.unwrap_or_default(),
            is_deleted: row.is_deleted,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl MessageRepository for PgMessageRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<Message>, AppError> {
        let row = sqlx::query_as::<_, MessageRow>(
            r#"
            SELECT id, chat_id, user_id, text, is_deleted, created_at
            FROM messages
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Message::from))
    }

    /// Insert the message row and its attachment links in one transaction,
    /// so a failed link never leaves a half-attached message behind.
    async fn create(&self, message: NewMessage) -> Result<Message, AppError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, MessageRow>(
            r#"
            INSERT INTO messages (chat_id, user_id, text)
            VALUES ($1, $2, $3)
            RETURNING id, chat_id, user_id, text, is_deleted, created_at
            "#,
        )
        .bind(message.chat_id)
        .bind(message.user_id)
        .bind(&message.text)
        .fetch_one(&mut *tx)
        .await?;

        for file_id in &message.attachment_ids {
            sqlx::query(
                r#"
                INSERT INTO message_attachments (message_id, file_id)
                VALUES ($1, $2)
                "#,
            )
            .bind(row.id)
            .bind(file_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(row.into())
    }

    /// The is_deleted guard lives in the statement: an edit racing a
    /// soft-delete matches zero rows instead of resurrecting the message.
    async fn update_text(&self, id: i64, new_text: &str) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE messages
            SET text = $2
            WHERE id = $1 AND is_deleted = FALSE
            "#,
        )
        .bind(id)
        .bind(new_text)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn soft_delete(&self, id: i64) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE messages
            SET is_deleted = TRUE, text = $2
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(DELETED_TEXT)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
