//! Multipart form collection
//!
//! Reads every part up front so text fields are available regardless of
//! whether the client sent them before or after the file.

use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::Multipart;

use crate::error::{AppError, Result};

/// One uploaded file part
#[derive(Debug, Clone)]
pub struct FilePart {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

/// Text fields plus file parts, keyed by field name
#[derive(Debug, Default)]
pub struct UploadForm {
    fields: HashMap<String, String>,
    files: HashMap<String, FilePart>,
}

impl UploadForm {
    pub async fn read(mut multipart: Multipart) -> Result<Self> {
        let mut form = UploadForm::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::BadRequest(format!("Failed to read upload: {}", e)))?
        {
            let name = field.name().unwrap_or("").to_string();
            let file_name = field.file_name().map(str::to_string);
            let content_type = field.content_type().map(str::to_string);

            match file_name {
                Some(file_name) => {
                    let content_type = content_type.unwrap_or_else(|| {
                        mime_guess::from_path(&file_name)
                            .first_or_octet_stream()
                            .to_string()
                    });
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|e| AppError::BadRequest(format!("Failed to read file data: {}", e)))?;
                    // Browsers send an empty nameless part for an unset file input
                    if file_name.is_empty() && bytes.is_empty() {
                        continue;
                    }
                    tracing::debug!(field = %name, file_name = %file_name, content_type = %content_type, bytes = bytes.len(), "Received file part");
                    form.files.insert(
                        name,
                        FilePart {
                            file_name,
                            content_type,
                            bytes,
                        },
                    );
                }
                None => {
                    let value = field
                        .text()
                        .await
                        .map_err(|e| AppError::BadRequest(format!("Failed to read field {}: {}", name, e)))?;
                    form.fields.insert(name, value);
                }
            }
        }

        Ok(form)
    }

    /// Text field value, empty when absent
    pub fn field(&self, name: &str) -> &str {
        self.fields.get(name).map(String::as_str).unwrap_or("")
    }

    /// First non-empty of several alternative field names
    pub fn first_field(&self, names: &[&str]) -> &str {
        names
            .iter()
            .map(|n| self.field(n))
            .find(|v| !v.is_empty())
            .unwrap_or("")
    }

    pub fn optional_field(&self, name: &str) -> Option<String> {
        Some(self.field(name)).filter(|v| !v.is_empty()).map(str::to_string)
    }

    /// Remove and return the file sent under `name`
    pub fn take_file(&mut self, name: &str) -> Option<FilePart> {
        self.files.remove(name)
    }
}
