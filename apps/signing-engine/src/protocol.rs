//! Wire types shared with the DocSign server

use serde::{Deserialize, Serialize};

/// Response of `POST /convert-pdf`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertResponse {
    pub success: bool,
    #[serde(default)]
    pub image_path: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub full_path: Option<String>,
    #[serde(default)]
    pub uploaded_filename: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// JSON body of `POST /save-doc`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavePayload {
    pub customer_id: String,
    pub terms: String,
    pub image_data: String,
    pub original_uploaded_filename: Option<String>,
}

/// Work out where to fetch the preview raster from.
///
/// Prefers `imagePath`; otherwise rebuilds `/uploads/<customer>/<file>` from
/// the filename (or the last component of `fullPath`). Relative paths are
/// joined onto `origin`.
pub fn resolve_preview_url(
    response: &ConvertResponse,
    customer_id: &str,
    origin: &str,
) -> Option<String> {
    if let Some(path) = response.image_path.as_deref().filter(|p| !p.is_empty()) {
        return Some(absolute(origin, path));
    }
    if customer_id.is_empty() {
        return None;
    }

    let from_full_path = response
        .full_path
        .as_deref()
        .and_then(|p| p.rsplit(['/', '\\']).next())
        .filter(|f| !f.is_empty());
    let filename = response
        .filename
        .as_deref()
        .filter(|f| !f.is_empty())
        .or(from_full_path)?;

    Some(format!(
        "{}/uploads/{}/{}",
        origin.trim_end_matches('/'),
        urlencoding::encode(customer_id),
        urlencoding::encode(filename)
    ))
}

fn absolute(origin: &str, path: &str) -> String {
    if path.starts_with('/') {
        format!("{}{}", origin.trim_end_matches('/'), path)
    } else {
        path.to_string()
    }
}
