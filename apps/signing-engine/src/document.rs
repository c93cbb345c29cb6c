//! The source document raster

use image::RgbaImage;

use crate::error::{EngineError, Result};

/// Decoded document asset at its natural resolution. Immutable once loaded;
/// a retake replaces it wholesale.
#[derive(Debug, Clone)]
pub struct Document {
    image: RgbaImage,
}

impl Document {
    /// Decode a preview (JPEG or PNG) fetched from the server or picked locally
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let image = image::load_from_memory(bytes)
            .map_err(|e| EngineError::Decode(e.to_string()))?
            .to_rgba8();
        Self::from_image(image)
    }

    pub fn from_image(image: RgbaImage) -> Result<Self> {
        if image.width() == 0 || image.height() == 0 {
            return Err(EngineError::InvalidDimensions {
                width: image.width() as f64,
                height: image.height() as f64,
            });
        }
        Ok(Self { image })
    }

    pub fn natural_width(&self) -> u32 {
        self.image.width()
    }

    pub fn natural_height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }
}
