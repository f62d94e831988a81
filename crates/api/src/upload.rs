//! Multipart upload staging.
//!
//! Uploaded clips are streamed to disk under a request-scoped [`TempDir`]
//! that is removed when the handler returns.

use std::path::PathBuf;

use axum::extract::multipart::{Field, Multipart};
use tempfile::TempDir;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, AppResult};

const UPLOAD_DIR_PREFIX: &str = "clipgrid-upload-";

/// One uploaded file on disk.
#[derive(Debug, Clone)]
pub struct SavedUpload {
    pub path: PathBuf,
    /// Client-side file name with any directory part removed.
    pub original_name: String,
    pub size: u64,
}

pub struct UploadDir {
    dir: TempDir,
}

impl UploadDir {
    pub fn new() -> AppResult<Self> {
        let dir = tempfile::Builder::new()
            .prefix(UPLOAD_DIR_PREFIX)
            .tempdir()
            .map_err(|e| AppError::InternalError(format!("Failed to create upload dir: {e}")))?;
        Ok(Self { dir })
    }

    /// Stream a file field to disk. The stored name never comes from the
    /// client.
    pub async fn save(&self, mut field: Field<'_>, index: usize) -> AppResult<SavedUpload> {
        let original_name = field
            .file_name()
            .map(base_name)
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| format!("clip-{index}"));
        let path = self.dir.path().join(format!("upload-{index:03}"));

        let mut file = tokio::fs::File::create(&path)
            .await
            .map_err(|e| AppError::InternalError(format!("Failed to stage upload: {e}")))?;
        let mut size = 0u64;
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?
        {
            size += chunk.len() as u64;
            file.write_all(&chunk)
                .await
                .map_err(|e| AppError::InternalError(format!("Failed to stage upload: {e}")))?;
        }
        file.flush()
            .await
            .map_err(|e| AppError::InternalError(format!("Failed to stage upload: {e}")))?;

        tracing::debug!(index, name = %original_name, size, "Staged upload");
        Ok(SavedUpload {
            path,
            original_name,
            size,
        })
    }
}

/// Next multipart field, with transport errors mapped to 400.
pub async fn next_field(multipart: &mut Multipart) -> AppResult<Option<Field<'_>>> {
    multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))
}

fn base_name(name: &str) -> String {
    name.rsplit(['/', '\\']).next().unwrap_or(name).trim().to_string()
}
