//! Stored file entity and repository trait.
//!
//! The file-service collaborator's record. The gateway hands it decoded
//! attachment bytes and gets back a reference it can embed in a message.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::error::AppError;

/// A persisted file.
///
/// Maps to the `files` table:
/// - id: BIGSERIAL PRIMARY KEY
/// - file_name: VARCHAR(255) NOT NULL
/// - content_type: VARCHAR(100) NULL (MIME type)
/// - size: BIGINT NOT NULL (decoded bytes)
/// - url: TEXT NOT NULL
/// - uploader_id: BIGINT NULL REFERENCES users(id)
/// - uploaded_at: TIMESTAMPTZ NOT NULL DEFAULT NOW()
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredFile {
    pub id: i64,
    pub file_name: String,
    pub content_type: Option<String>,
    pub size: i64,
    pub url: String,
    pub uploader_id: Option<i64>,
    pub uploaded_at: DateTime<Utc>,
}

/// A decoded attachment ready to be persisted.
#[derive(Debug, Clone)]
pub struct NewFile {
    pub file_name: String,
    pub content_type: String,
    pub content: Vec<u8>,
    pub uploader_id: i64,
}

/// Repository trait for the file-service collaborator.
#[async_trait]
pub trait FileRepository: Send + Sync {
    /// Persist decoded bytes and return the stored reference.
    async fn create(&self, file: NewFile) -> Result<StoredFile, AppError>;
}
