//! `POST /convert-pdf`
//!
//! Stages the upload under its customer directory. PDFs get a first-page
//! preview through the conversion pipeline; anything else is handed back
//! as-is. The uploaded PDF stays on disk until the final save cleans it up.

use axum::extract::{Multipart, State};
use axum::Json;
use serde::Serialize;

use crate::convert::ConversionJob;
use crate::error::{AppError, Result};
use crate::state::AppState;
use crate::storage::{document_extension, stage_upload, timestamp_now, web_path, web_path_for, UploadMeta};

use super::form::UploadForm;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertResponse {
    pub success: bool,
    pub image_path: String,
    pub filename: String,
    pub full_path: String,
    /// Name of the staged upload, echoed back on save for cleanup
    pub uploaded_filename: String,
}

pub async fn convert_pdf(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ConvertResponse>> {
    let mut form = UploadForm::read(multipart).await?;
    let Some(file) = form.take_file("doc") else {
        tracing::warn!("convert-pdf request without a file");
        return Err(AppError::BadRequest("No file uploaded".to_string()));
    };

    let meta = UploadMeta {
        customer_id: form.field("customerId"),
        terms: form.field("terms"),
        original_name: &file.file_name,
        mime_type: &file.content_type,
    };
    let staged = stage_upload(
        state.upload_base_dir(),
        &meta,
        &timestamp_now(),
        &document_extension(&file.file_name),
        &file.bytes,
    )
    .await?;

    if !staged.is_pdf() {
        tracing::info!(path = %staged.path.display(), "Non-PDF upload, returning as preview");
        return Ok(Json(ConvertResponse {
            success: true,
            image_path: web_path(&staged.customer_id, &staged.filename),
            filename: staged.filename.clone(),
            full_path: staged.path.display().to_string(),
            uploaded_filename: staged.filename,
        }));
    }

    let job = ConversionJob::for_pdf(&staged.path)
        .ok_or_else(|| AppError::Internal(format!("unusable upload path {}", staged.path.display())))?;
    tracing::info!(out_dir = %job.out_dir.display(), base = %job.base_name, "Converting first page");

    let preview = state.pipeline().produce_preview(&job).await?;
    let filename = job.preview_name();
    let image_path = web_path_for(&preview.path).unwrap_or_else(|| web_path(&staged.customer_id, &filename));

    tracing::info!(
        preview = %preview.path.display(),
        converter = preview.converter,
        normalized = preview.normalized,
        web_path = %image_path,
        "Preview ready"
    );

    Ok(Json(ConvertResponse {
        success: true,
        image_path,
        filename,
        full_path: preview.path.display().to_string(),
        uploaded_filename: staged.filename,
    }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::http::StatusCode;
    use tower::ServiceExt;

    use crate::convert::fakes::{WritesNothing, WritesRaster};
    use crate::convert::{ConversionPipeline, Converter};
    use crate::test_support::{multipart_request, response_json, test_state, FileSpec};

    #[tokio::test]
    async fn test_pdf_gets_preview() {
        let dir = tempfile::TempDir::new().unwrap();
        let stages: Vec<Arc<dyn Converter>> =
            vec![Arc::new(WritesNothing::new()), Arc::new(WritesRaster::new("-1"))];
        let state = test_state(&dir, ConversionPipeline::new(stages, Duration::from_secs(5)));

        let request = multipart_request(
            "/convert-pdf",
            &[("customerId", "00123"), ("terms", "PAN-Peri")],
            Some(FileSpec::new("doc", "scan.pdf", "application/pdf", b"%PDF-1.4")),
        );
        let response = crate::routes::router(state).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = response_json(response).await;
        assert_eq!(json["success"], true);
        let uploaded = json["uploadedFilename"].as_str().unwrap();
        assert!(uploaded.starts_with("00123-PAN-Peri-") && uploaded.ends_with(".pdf"));

        let filename = json["filename"].as_str().unwrap();
        assert_eq!(filename, format!("{}-preview.jpg", uploaded.trim_end_matches(".pdf")));
        assert_eq!(json["imagePath"], format!("/uploads/00123/{}", filename));

        let customer_dir = dir.path().join("00123");
        assert!(customer_dir.join(uploaded).exists());
        assert!(customer_dir.join(filename).exists());
    }

    #[tokio::test]
    async fn test_non_pdf_passthrough() {
        let dir = tempfile::TempDir::new().unwrap();
        let state = test_state(&dir, ConversionPipeline::new(Vec::new(), Duration::from_secs(1)));

        let request = multipart_request(
            "/convert-pdf",
            &[("customerId", "7")],
            Some(FileSpec::new("doc", "photo.PNG", "image/png", b"png")),
        );
        let response = crate::routes::router(state).oneshot(request).await.unwrap();
        let json = response_json(response).await;

        let filename = json["filename"].as_str().unwrap();
        assert!(filename.starts_with("7-") && filename.ends_with(".png"));
        assert_eq!(json["uploadedFilename"], filename);
        assert_eq!(json["imagePath"], format!("/uploads/7/{}", filename));
    }

    #[tokio::test]
    async fn test_missing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let state = test_state(&dir, ConversionPipeline::new(Vec::new(), Duration::from_secs(1)));

        let request = multipart_request("/convert-pdf", &[("customerId", "7")], None);
        let response = crate::routes::router(state).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = response_json(response).await;
        assert_eq!(json["error"], "No file uploaded");
    }

    #[tokio::test]
    async fn test_conversion_failure_lists_directory() {
        let dir = tempfile::TempDir::new().unwrap();
        let stages: Vec<Arc<dyn Converter>> = vec![Arc::new(WritesNothing::new())];
        let state = test_state(&dir, ConversionPipeline::new(stages, Duration::from_secs(5)));

        let request = multipart_request(
            "/convert-pdf",
            &[("customerId", "55")],
            Some(FileSpec::new("doc", "a.pdf", "application/pdf", b"%PDF")),
        );
        let response = crate::routes::router(state).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let json = response_json(response).await;
        assert_eq!(json["success"], false);
        let listing = json["dirListing"].as_array().unwrap();
        assert_eq!(listing.len(), 1);
        assert!(listing[0].as_str().unwrap().ends_with(".pdf"));
    }
}
