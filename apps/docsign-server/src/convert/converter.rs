//! Converter strategy trait

use std::path::PathBuf;

use async_trait::async_trait;

use super::types::{ConversionJob, ConvertError};

/// One way of rasterizing the first page of a PDF.
///
/// Implementations write somewhere under `job.out_dir` and return the path
/// they discovered; they never retry.
#[async_trait]
pub trait Converter: Send + Sync {
    /// Short name for logs and error messages
    fn name(&self) -> &'static str;

    /// Rasterize page 1 of `job.pdf_path`
    async fn attempt_convert(&self, job: &ConversionJob) -> Result<PathBuf, ConvertError>;
}
