//! Conversion pipeline
//!
//! Runs converters strictly in order, one attempt each, each bounded by the
//! configured timeout. Attempts never overlap: every stage discovers its
//! output by filename prefix, so concurrent stages would see each other's
//! files.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::config::ConvertConfig;

use super::converter::Converter;
use super::locate::list_dir;
use super::mupdf::MupdfConverter;
use super::normalize::normalize_preview;
use super::pdftoppm::{LocalPdftoppm, PathPdftoppm};
use super::types::{ConversionJob, ConvertError, Preview};

/// Ordered list of converter strategies
#[derive(Clone)]
pub struct ConversionPipeline {
    converters: Vec<Arc<dyn Converter>>,
    timeout: Duration,
}

impl ConversionPipeline {
    pub fn new(converters: Vec<Arc<dyn Converter>>, timeout: Duration) -> Self {
        Self {
            converters,
            timeout,
        }
    }

    /// MuPDF, then bundled pdftoppm, then pdftoppm from `PATH`
    pub fn standard(config: &ConvertConfig) -> Self {
        let converters: Vec<Arc<dyn Converter>> = vec![
            Arc::new(MupdfConverter::new()),
            Arc::new(LocalPdftoppm::new(&config.app_root)),
            Arc::new(PathPdftoppm::new(&config.app_root)),
        ];
        Self::new(converters, config.timeout())
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.converters.iter().map(|c| c.name()).collect()
    }

    /// Rasterize page 1, returning the first stage's discovered output.
    ///
    /// Fails with [`ConvertError::Exhausted`] carrying the output directory
    /// listing when every stage fails.
    pub async fn rasterize_first_page(&self, job: &ConversionJob) -> Result<(PathBuf, &'static str), ConvertError> {
        for converter in &self.converters {
            let name = converter.name();
            tracing::debug!(converter = name, pdf = %job.pdf_path.display(), "Trying converter");

            let outcome = match tokio::time::timeout(self.timeout, converter.attempt_convert(job)).await {
                Ok(result) => result,
                Err(_) => Err(ConvertError::TimedOut {
                    converter: name,
                    secs: self.timeout.as_secs(),
                }),
            };

            match outcome {
                Ok(path) => {
                    tracing::info!(converter = name, output = %path.display(), "Converter produced output");
                    return Ok((path, name));
                }
                Err(e) if e.is_stage_failure() => {
                    tracing::warn!(converter = name, error = %e, "Converter failed, continuing to fallback");
                }
                Err(e) => {
                    tracing::error!(converter = name, error = %e, "Converter errored, continuing to fallback");
                }
            }
        }

        let dir_listing = list_dir(&job.out_dir).await;
        tracing::error!(
            out_dir = %job.out_dir.display(),
            listing = ?dir_listing,
            "Conversion failed, no stage produced output"
        );
        Err(ConvertError::Exhausted { dir_listing })
    }

    /// Rasterize page 1 and write the canonical `<base>-preview.jpg`
    pub async fn produce_preview(&self, job: &ConversionJob) -> Result<Preview, ConvertError> {
        let (raw_path, converter) = self.rasterize_first_page(job).await?;
        let path = job.preview_path();
        let normalized = normalize_preview(&raw_path, &path).await?;

        Ok(Preview {
            path,
            raw_path,
            converter,
            normalized,
        })
    }
}
