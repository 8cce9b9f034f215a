//! File Repository Implementation
//!
//! Persists decoded attachment bytes to the uploads directory and records
//! the file row. Stored names are randomized; the original name survives in
//! the row for display.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::entities::file::{FileRepository, NewFile, StoredFile};
use crate::shared::error::AppError;

/// Filesystem-plus-PostgreSQL implementation of the FileRepository.
pub struct PgFileRepository {
    pool: PgPool,
    uploads_dir: PathBuf,
}

impl PgFileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            uploads_dir: PathBuf::from("uploads"),
        }
    }

    /// Random stored name keeping the original extension.
    fn generate_file_name(original: &str) -> String {
        let stem = Uuid::new_v4().simple().to_string();
        match Path::new(original).extension() {
            Some(ext) => format!("{}.{}", stem, ext.to_string_lossy()),
            None => stem,
        }
    }
}

#[derive(sqlx::FromRow)]
struct FileRow {
    id: i64,
    file_name: String,
    content_type: Option<String>,
    size: i64,
    url: String,
    uploader_id: Option<i64>,
    uploaded_at: chrono::DateTime<chrono::Utc>,
}

#[async_trait]
impl FileRepository for PgFileRepository {
    async fn create(&self, file: NewFile) -> Result<StoredFile, AppError> {
        let stored_name = Self::generate_file_name(&file.file_name);
        let path = self.uploads_dir.join(&stored_name);

        tokio::fs::create_dir_all(&self.uploads_dir)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to create uploads dir: {}", e)))?;
        tokio::fs::write(&path, &file.content)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to write file: {}", e)))?;

        let url = format!("/media/uploads/{}", stored_name);

        let row = sqlx::query_as::<_, FileRow>(
            r#"
            INSERT INTO files (file_name, content_type, size, url, uploader_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, file_name, content_type, size, url, uploader_id, uploaded_at
            "#,
        )
        .bind(&file.file_name)
        .bind(&file.content_type)
        .bind(file.content.len() as i64)
        .bind(&url)
        .bind(file.uploader_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(StoredFile {
            id: row.id,
            file_name: row.file_name,
            content_type: row.content_type,
            size: row.size,
            url: row.url,
            uploader_id: row.uploader_id,
            uploaded_at: row.uploaded_at,
        })
    }
}
