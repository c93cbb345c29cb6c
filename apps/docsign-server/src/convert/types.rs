//! Conversion pipeline types

use std::path::{Path, PathBuf};

use super::locate::locate_newest_match;

/// Extension every converter is asked to produce
pub const RASTER_EXT: &str = "jpg";

/// Errors from the conversion pipeline and preview normalization
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("{converter} unavailable: {reason}")]
    Unavailable {
        converter: &'static str,
        reason: String,
    },

    #[error("{converter} failed: {reason}")]
    Failed {
        converter: &'static str,
        reason: String,
    },

    #[error("{converter} produced no .{ext} output in {}", dir.display())]
    NoOutput {
        converter: &'static str,
        ext: &'static str,
        dir: PathBuf,
    },

    #[error("{converter} timed out after {secs}s")]
    TimedOut { converter: &'static str, secs: u64 },

    /// Every stage failed; carries the output directory listing
    #[error("Conversion failed: no JPG produced")]
    Exhausted { dir_listing: Vec<String> },

    #[error("Normalization failed and converted file missing")]
    RawMissing(PathBuf),

    #[error("Failed to create final preview file: {0}")]
    FinalCopy(std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Task join error: {0}")]
    Join(String),
}

impl ConvertError {
    /// Stage-local failures that the pipeline absorbs before trying the next stage
    pub fn is_stage_failure(&self) -> bool {
        matches!(
            self,
            ConvertError::Unavailable { .. }
                | ConvertError::Failed { .. }
                | ConvertError::NoOutput { .. }
                | ConvertError::TimedOut { .. }
        )
    }
}

/// One first-page rasterization request
#[derive(Debug, Clone)]
pub struct ConversionJob {
    pub pdf_path: PathBuf,
    pub out_dir: PathBuf,
    pub base_name: String,
}

impl ConversionJob {
    pub fn new(pdf_path: impl Into<PathBuf>, out_dir: impl Into<PathBuf>, base_name: impl Into<String>) -> Self {
        Self {
            pdf_path: pdf_path.into(),
            out_dir: out_dir.into(),
            base_name: base_name.into(),
        }
    }

    /// Job for a staged PDF: output next to it, named after its stem
    pub fn for_pdf(pdf_path: &Path) -> Option<Self> {
        let out_dir = pdf_path.parent()?.to_path_buf();
        let base_name = pdf_path.file_stem()?.to_str()?.to_string();
        Some(Self::new(pdf_path, out_dir, base_name))
    }

    /// `<base>-preview.jpg`
    pub fn preview_name(&self) -> String {
        format!("{}-preview.{}", self.base_name, RASTER_EXT)
    }

    pub fn preview_path(&self) -> PathBuf {
        self.out_dir.join(self.preview_name())
    }

    /// Output prefix handed to external tools (`<out_dir>/<base>`)
    pub fn out_prefix(&self) -> PathBuf {
        self.out_dir.join(&self.base_name)
    }

    /// Find what a converter just wrote: newest `<base>*.jpg`, ignoring an
    /// earlier canonical preview
    pub async fn discover_output(&self, converter: &'static str) -> Result<PathBuf, ConvertError> {
        let preview = self.preview_name();
        locate_newest_match(&self.out_dir, &self.base_name, RASTER_EXT, &[preview.as_str()])
            .await?
            .ok_or_else(|| ConvertError::NoOutput {
                converter,
                ext: RASTER_EXT,
                dir: self.out_dir.clone(),
            })
    }
}

/// A successful pipeline run
#[derive(Debug, Clone)]
pub struct Preview {
    /// Canonical `<base>-preview.jpg`
    pub path: PathBuf,
    /// Converter output the preview was made from
    pub raw_path: PathBuf,
    pub converter: &'static str,
    /// False when the raw output was copied because re-encoding failed
    pub normalized: bool,
}
