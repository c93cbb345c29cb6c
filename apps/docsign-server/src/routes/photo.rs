//! `POST /save-photo`
//!
//! Stores a field photo as uploaded, plus a `<filename>.meta.json` sidecar.

use std::path::Path;

use axum::extract::{Multipart, State};
use axum::Json;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use crate::error::{AppError, Result};
use crate::state::AppState;
use crate::storage::{photo_extension, sanitize_terms, stage_upload, timestamp_now, UploadMeta};

use super::form::UploadForm;
use super::save::SaveResponse;

/// Sidecar written next to each photo
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoMeta {
    pub customer_id: String,
    pub terms: String,
    pub extra: String,
    pub filename: String,
    pub saved_at: String,
}

pub async fn save_photo(State(state): State<AppState>, multipart: Multipart) -> Result<Json<SaveResponse>> {
    let mut form = UploadForm::read(multipart).await?;
    let Some(file) = form.take_file("photo") else {
        return Err(AppError::BadRequest("No photo uploaded".to_string()));
    };

    let terms = form.first_field(&["terms", "termsRaw"]);
    let meta = UploadMeta {
        customer_id: form.field("customerId"),
        terms,
        original_name: &file.file_name,
        mime_type: &file.content_type,
    };
    let ext = photo_extension(&file.file_name, &file.content_type);
    let staged = stage_upload(state.upload_base_dir(), &meta, &timestamp_now(), &ext, &file.bytes).await?;

    let sidecar = PhotoMeta {
        customer_id: staged.customer_id.clone(),
        terms: sanitize_terms(terms),
        extra: form.field("extra").to_string(),
        filename: staged.filename.clone(),
        saved_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    };
    write_sidecar(&staged.path, &sidecar).await;

    Ok(Json(SaveResponse::saved(&staged.path)))
}

/// Best effort: a failed sidecar never fails the upload
async fn write_sidecar(photo: &Path, meta: &PhotoMeta) {
    let mut name = photo.as_os_str().to_owned();
    name.push(".meta.json");
    let path = std::path::PathBuf::from(name);

    let result = match serde_json::to_vec_pretty(meta) {
        Ok(bytes) => tokio::fs::write(&path, bytes).await.map_err(|e| e.to_string()),
        Err(e) => Err(e.to_string()),
    };
    if let Err(e) = result {
        tracing::warn!(path = %path.display(), error = %e, "Photo metadata write failed");
    }
}
