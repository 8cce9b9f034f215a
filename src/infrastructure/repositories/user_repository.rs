//! User Repository Implementation

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::entities::user::{User, UserRepository};
use crate::shared::error::AppError;

/// PostgreSQL implementation of the UserRepository.
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    username: String,
    avatar_url: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, AppError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, username, avatar_url, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| User {
            id: r.id,
            username: r.username,
            avatar_url: r.avatar_url,
            created_at: r.created_at,
        }))
    }
}
