//! Attachment Ingest
//!
//! Decodes the inline base64 attachments bundled in a `chat_message`
//! envelope, enforces the size ceiling, and hands the bytes to the file
//! collaborator. Runs before the message row is created; one bad
//! attachment fails the whole event.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use crate::domain::entities::file::{FileRepository, NewFile, StoredFile};
use crate::shared::error::GatewayError;

use super::events::AttachmentPayload;

/// A decoded `data:<mime>;base64,<payload>` body.
#[derive(Debug, PartialEq)]
pub struct DecodedContent {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Split and decode a data-URI-style content string.
pub fn decode_data_uri(content: &str) -> Result<DecodedContent, GatewayError> {
    let (prefix, payload) = content
        .split_once(',')
        .ok_or_else(|| GatewayError::AttachmentInvalid("content is not a data URI".into()))?;

    // e.g. "data:image/png;base64"
    let content_type = prefix
        .strip_prefix("data:")
        .and_then(|rest| rest.split(';').next())
        .filter(|mime| !mime.is_empty())
        .ok_or_else(|| GatewayError::AttachmentInvalid("content has no MIME prefix".into()))?
        .to_string();

    let bytes = BASE64
        .decode(payload)
        .map_err(|e| GatewayError::AttachmentInvalid(format!("base64 decode failed: {}", e)))?;

    Ok(DecodedContent {
        content_type,
        bytes,
    })
}

/// Ingests inline attachments for the connection gateway.
pub struct AttachmentIngest {
    files: Arc<dyn FileRepository>,
    max_bytes: usize,
}

impl AttachmentIngest {
    pub fn new(files: Arc<dyn FileRepository>, max_bytes: usize) -> Self {
        Self { files, max_bytes }
    }

    /// Decode and persist one attachment.
    pub async fn ingest(
        &self,
        uploader_id: i64,
        attachment: &AttachmentPayload,
    ) -> Result<StoredFile, GatewayError> {
        let name = attachment
            .name
            .as_deref()
            .ok_or_else(|| GatewayError::AttachmentInvalid("name is required".into()))?;
        let content = attachment
            .content
            .as_deref()
            .ok_or_else(|| GatewayError::AttachmentInvalid("content is required".into()))?;

        tracing::debug!(name, encoded_len = content.len(), "Processing attachment");

        let decoded = decode_data_uri(content)?;

        if decoded.bytes.len() > self.max_bytes {
            return Err(GatewayError::AttachmentTooLarge {
                size_mb: mb_ceil(decoded.bytes.len()),
                limit_mb: (self.max_bytes / (1024 * 1024)) as u64,
            });
        }

        let stored = self
            .files
            .create(NewFile {
                file_name: name.to_string(),
                content_type: decoded.content_type,
                content: decoded.bytes,
                uploader_id,
            })
            .await?;

        tracing::info!(name, file_id = stored.id, size = stored.size, "Attachment stored");
        Ok(stored)
    }

    /// Decode and persist all attachments of a message, in order.
    ///
    /// All-or-nothing from the caller's point of view: the first failure
    /// aborts the event before any message row exists. Files persisted for
    /// earlier attachments stay behind as orphans for the reaper, the same
    /// trade-off the original made.
    pub async fn ingest_all(
        &self,
        uploader_id: i64,
        attachments: &[AttachmentPayload],
    ) -> Result<Vec<StoredFile>, GatewayError> {
        let mut stored = Vec::with_capacity(attachments.len());
        for attachment in attachments {
            stored.push(self.ingest(uploader_id, attachment).await?);
        }
        Ok(stored)
    }
}

/// Size in whole megabytes, rounded up, for error messages.
fn mb_ceil(bytes: usize) -> u64 {
    ((bytes + (1024 * 1024) - 1) / (1024 * 1024)) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn decodes_a_png_data_uri() {
        // "hello" in base64
        let decoded = decode_data_uri("data:image/png;base64,aGVsbG8=").unwrap();
        assert_eq!(decoded.content_type, "image/png");
        assert_eq!(decoded.bytes, b"hello");
    }

    #[test]
    fn rejects_content_without_comma() {
        let err = decode_data_uri("data:image/png;base64").unwrap_err();
        assert!(matches!(err, GatewayError::AttachmentInvalid(_)));
    }

    #[test]
    fn rejects_content_without_mime_prefix() {
        let err = decode_data_uri("image/png;base64,aGVsbG8=").unwrap_err();
        assert!(matches!(err, GatewayError::AttachmentInvalid(_)));
    }

    #[test]
    fn rejects_bad_base64() {
        let err = decode_data_uri("data:image/png;base64,!!!").unwrap_err();
        assert!(matches!(err, GatewayError::AttachmentInvalid(_)));
    }

    #[test]
    fn mb_ceil_rounds_up() {
        assert_eq!(mb_ceil(1), 1);
        assert_eq!(mb_ceil(1024 * 1024), 1);
        assert_eq!(mb_ceil(1024 * 1024 + 1), 2);
    }
}
