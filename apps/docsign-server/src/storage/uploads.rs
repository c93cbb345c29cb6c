//! Multipart upload staging
//!
//! Writes an uploaded file into its customer directory under the
//! deterministic name, creating the directory on demand.

use std::path::{Path, PathBuf};

use super::naming::{customer_dir, dotted_extension, make_filename, sanitize_customer_id};
use super::StorageError;

/// An uploaded file as written to disk
#[derive(Debug, Clone)]
pub struct StagedUpload {
    pub path: PathBuf,
    /// Name on disk
    pub filename: String,
    /// Name the client sent
    pub original_name: String,
    pub mime_type: String,
    /// Sanitized customer id, also the directory name
    pub customer_id: String,
}

impl StagedUpload {
    /// Lowercased extension (with dot) of the client's name
    pub fn extension(&self) -> String {
        dotted_extension(&self.original_name)
    }

    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }

    pub fn is_pdf(&self) -> bool {
        self.extension() == ".pdf"
    }
}

/// Naming inputs for a staged file
#[derive(Debug, Clone)]
pub struct UploadMeta<'a> {
    pub customer_id: &'a str,
    pub terms: &'a str,
    pub original_name: &'a str,
    pub mime_type: &'a str,
}

/// Documents keep the client's extension, if any
pub fn document_extension(original_name: &str) -> String {
    dotted_extension(original_name)
}

/// Photos keep the client's extension, else `.png` for PNG, else `.jpg`
pub fn photo_extension(original_name: &str, mime_type: &str) -> String {
    let ext = dotted_extension(original_name);
    if !ext.is_empty() {
        return ext;
    }
    match mime_type {
        "image/png" => ".png".to_string(),
        _ => ".jpg".to_string(),
    }
}

/// Write `bytes` to `<base>/<customer>/<make_filename(..., ext)>`
pub async fn stage_upload(
    upload_base_dir: &Path,
    meta: &UploadMeta<'_>,
    stamp: &str,
    ext: &str,
    bytes: &[u8],
) -> Result<StagedUpload, StorageError> {
    let dir = customer_dir(upload_base_dir, meta.customer_id);
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|source| StorageError::CreateDir {
            path: dir.clone(),
            source,
        })?;

    let filename = make_filename(meta.customer_id, meta.terms, stamp, ext);
    let path = dir.join(&filename);
    tokio::fs::write(&path, bytes)
        .await
        .map_err(|source| StorageError::Write {
            path: path.clone(),
            source,
        })?;

    tracing::info!(path = %path.display(), bytes = bytes.len(), original = meta.original_name, "Staged upload");

    Ok(StagedUpload {
        path,
        filename,
        original_name: meta.original_name.to_string(),
        mime_type: meta.mime_type.to_string(),
        customer_id: sanitize_customer_id(meta.customer_id),
    })
}
