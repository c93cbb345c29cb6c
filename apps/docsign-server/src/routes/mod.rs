//! HTTP routes

pub mod convert;
mod form;
pub mod health;
pub mod photo;
pub mod save;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Full application router
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let uploads = ServeDir::new(state.upload_base_dir());
    let body_limit = state.config().server.body_limit_bytes();

    Router::new()
        .route("/health", get(health::health_check))
        .route("/convert-pdf", post(convert::convert_pdf))
        .route("/save-doc", post(save::save_doc))
        .route("/save-photo", post(photo::save_photo))
        .nest_service("/uploads", uploads)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use super::*;
    use crate::convert::ConversionPipeline;
    use crate::test_support::{response_json, test_state};

    #[tokio::test]
    async fn test_health() {
        let dir = tempfile::TempDir::new().unwrap();
        let app = router(test_state(&dir, ConversionPipeline::new(Vec::new(), Duration::from_secs(1))));
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response_json(response).await["status"], "healthy");
    }

    #[tokio::test]
    async fn test_uploads_served_statically() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("123")).unwrap();
        std::fs::write(dir.path().join("123").join("a b-preview.jpg"), b"jpeg").unwrap();

        let app = router(test_state(&dir, ConversionPipeline::new(Vec::new(), Duration::from_secs(1))));
        let response = app
            .oneshot(
                Request::get("/uploads/123/a%20b-preview.jpg")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"jpeg");
    }
}
