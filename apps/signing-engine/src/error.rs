//! Engine error types

use thiserror::Error;

/// Errors surfaced by the signing engine
#[derive(Debug, Error)]
pub enum EngineError {
    /// No document has been loaded into the session yet
    #[error("document not ready")]
    DocumentNotReady,

    /// The preview raster could not be decoded
    #[error("failed to load preview image: {0}")]
    Decode(String),

    /// Width or height was zero, negative or not finite
    #[error("invalid dimensions: {width}x{height}")]
    InvalidDimensions { width: f64, height: f64 },

    /// The composed raster could not be encoded
    #[error("failed to encode composition: {0}")]
    Encode(String),

    /// Operation requires the session to be in signing mode
    #[error("signature pad is not active")]
    NotSigning,

    /// Customer id must be 1 to 8 digits
    #[error("customer id must be 1 to 8 digits: {0:?}")]
    InvalidCustomerId(String),

    /// Nothing has been composed yet
    #[error("nothing to save")]
    NothingToSave,
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

impl From<image::ImageError> for EngineError {
    fn from(err: image::ImageError) -> Self {
        EngineError::Encode(err.to_string())
    }
}
