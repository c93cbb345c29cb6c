//! `POST /save-doc`
//!
//! Two request shapes share the route:
//! - multipart with a `doc` file: PDFs are rasterized (page 1), images are
//!   re-encoded, both to JPEG at quality 90 under the staged name
//! - JSON (or multipart without a file) carrying the final composition as
//!   a data URL, re-encoded to JPEG at quality 95 under a fresh name, after
//!   which the uploaded PDF and its previews are cleaned up

use std::path::Path;

use axum::extract::{FromRequest, Multipart, Request, State};
use axum::http::{header, HeaderMap};
use axum::Json;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::convert::{
    normalize::jpg_sibling, reencode_file, transcode_to_jpeg, ConversionJob, ConvertError,
    COMPOSITION_JPEG_QUALITY, UPLOAD_JPEG_QUALITY,
};
use crate::error::{AppError, Result};
use crate::state::AppState;
use crate::storage::{
    customer_dir, document_extension, make_filename, sanitize_customer_id, stage_upload,
    timestamp_now, CleanupManager, CleanupReport, StagedUpload, UploadMeta,
};

use super::form::{FilePart, UploadForm};

/// Standard alphabet, padding optional
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// JSON body carrying the final composition
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveDocRequest {
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub terms: Option<String>,
    #[serde(default)]
    pub image_data: Option<String>,
    #[serde(default)]
    pub original_uploaded_filename: Option<String>,
}

impl SaveDocRequest {
    fn from_form(form: &UploadForm) -> Self {
        Self {
            customer_id: form.optional_field("customerId"),
            terms: form.optional_field("terms"),
            image_data: form.optional_field("imageData"),
            original_uploaded_filename: form.optional_field("originalUploadedFilename"),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SaveResponse {
    pub success: bool,
    pub filename: String,
    pub path: String,
}

impl SaveResponse {
    pub fn saved(path: &Path) -> Self {
        Self {
            success: true,
            filename: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            path: path.display().to_string(),
        }
    }
}

fn is_multipart(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_ascii_lowercase().starts_with("multipart/form-data"))
        .unwrap_or(false)
}

pub async fn save_doc(State(state): State<AppState>, request: Request) -> Result<Json<SaveResponse>> {
    if is_multipart(request.headers()) {
        let multipart = Multipart::from_request(request, &state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        let mut form = UploadForm::read(multipart).await?;

        if let Some(file) = form.take_file("doc") {
            return save_uploaded_document(&state, &form, file).await.map(Json);
        }
        return save_composition(&state, SaveDocRequest::from_form(&form))
            .await
            .map(Json);
    }

    let Json(body) = Json::<SaveDocRequest>::from_request(request, &state)
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?;
    save_composition(&state, body).await.map(Json)
}

/// Raw document upload: normalize to `<staged base>.jpg`
async fn save_uploaded_document(state: &AppState, form: &UploadForm, file: FilePart) -> Result<SaveResponse> {
    let ext = document_extension(&file.file_name);
    let meta = UploadMeta {
        customer_id: form.field("customerId"),
        terms: form.field("terms"),
        original_name: &file.file_name,
        mime_type: &file.content_type,
    };
    let staged = stage_upload(state.upload_base_dir(), &meta, &timestamp_now(), &ext, &file.bytes).await?;
    let cleanup = CleanupManager::new(staged.dir());
    let mut report = CleanupReport::default();
    let jpg_path = jpg_sibling(&staged.path);

    match ext.as_str() {
        ".pdf" => {
            let job = ConversionJob::for_pdf(&staged.path)
                .ok_or_else(|| AppError::Internal(format!("unusable upload path {}", staged.path.display())))?;
            let (raw, converter) = state.pipeline().rasterize_first_page(&job).await?;
            reencode_file(&raw, &jpg_path, UPLOAD_JPEG_QUALITY).await?;
            tracing::info!(converter, saved = %jpg_path.display(), "Saved first page of uploaded PDF");

            cleanup.remove_file(&staged.path, &mut report).await;
            if raw != jpg_path {
                cleanup.remove_file(&raw, &mut report).await;
            }
        }
        ".png" | ".jpg" | ".jpeg" => {
            if let Err(e) = reencode_file(&staged.path, &jpg_path, UPLOAD_JPEG_QUALITY).await {
                cleanup.remove_file(&staged.path, &mut report).await;
                return Err(invalid_image(e));
            }
            tracing::info!(saved = %jpg_path.display(), "Saved uploaded image");
            if staged.path != jpg_path {
                cleanup.remove_file(&staged.path, &mut report).await;
            }
        }
        _ => {
            discard(&cleanup, &staged, &mut report).await;
            return Err(AppError::BadRequest("Unsupported file type".to_string()));
        }
    }

    Ok(SaveResponse::saved(&jpg_path))
}

async fn discard(cleanup: &CleanupManager, staged: &StagedUpload, report: &mut CleanupReport) {
    tracing::warn!(path = %staged.path.display(), mime = %staged.mime_type, "Discarding unsupported upload");
    cleanup.remove_file(&staged.path, report).await;
}

/// Final composition as a data URL
async fn save_composition(state: &AppState, body: SaveDocRequest) -> Result<SaveResponse> {
    let (Some(image_data), Some(customer_id)) = (
        body.image_data.filter(|d| !d.is_empty()),
        body.customer_id.filter(|c| !c.is_empty()),
    ) else {
        return Err(AppError::BadRequest("Missing imageData or customerId".to_string()));
    };

    let customer_id = sanitize_customer_id(&customer_id);
    let filename = make_filename(
        &customer_id,
        body.terms.as_deref().unwrap_or(""),
        &timestamp_now(),
        ".jpg",
    );

    // Bad input must be rejected before anything lands on disk
    let bytes = decode_data_url(&image_data)?;
    let (jpeg, (width, height)) = transcode_to_jpeg(bytes, COMPOSITION_JPEG_QUALITY)
        .await
        .map_err(invalid_image)?;

    let dir = customer_dir(state.upload_base_dir(), &customer_id);
    tokio::fs::create_dir_all(&dir).await?;
    let full_path = dir.join(&filename);
    tokio::fs::write(&full_path, jpeg).await?;
    tracing::info!(path = %full_path.display(), width, height, "Saved signed document");

    if let Some(uploaded) = body.original_uploaded_filename.as_deref() {
        let report = CleanupManager::new(&dir).after_save(uploaded, &full_path).await;
        tracing::debug!(removed = report.removed.len(), failed = report.failed.len(), "Post-save cleanup done");
    }

    Ok(SaveResponse::saved(&full_path))
}

/// Undecodable image bytes are the client's fault
fn invalid_image(e: ConvertError) -> AppError {
    match e {
        ConvertError::Image(e) => AppError::BadRequest(format!("Invalid image data: {}", e)),
        other => other.into(),
    }
}

/// Strip a `data:...;base64,` prefix and decode the rest.
///
/// `data:image/jpeg` and `data:image/png` are expected; any other
/// `data:*;base64,` prefix is stripped too, and a bare base64 string is
/// accepted as-is.
pub fn decode_data_url(data: &str) -> Result<Vec<u8>> {
    let payload = strip_data_url_prefix(data);
    let cleaned: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    LENIENT_BASE64
        .decode(cleaned)
        .map_err(|e| AppError::BadRequest(format!("Malformed image data: {}", e)))
}

fn strip_data_url_prefix(data: &str) -> &str {
    for prefix in ["data:image/jpeg;base64,", "data:image/png;base64,"] {
        if let Some(rest) = data.strip_prefix(prefix) {
            return rest;
        }
    }
    if data.starts_with("data:") {
        if let Some(idx) = data.rfind(";base64,") {
            return &data[idx + ";base64,".len()..];
        }
    }
    data
}
