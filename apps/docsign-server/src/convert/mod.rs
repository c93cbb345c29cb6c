//! First-page PDF rasterization
//!
//! An ordered chain of [`Converter`] strategies tried one at a time:
//! in-process MuPDF, a bundled `pdftoppm`, then `pdftoppm` from `PATH`.
//! Whichever succeeds first is normalized into `<base>-preview.jpg`.

mod converter;
pub mod locate;
pub mod mupdf;
pub mod normalize;
pub mod pdftoppm;
mod pipeline;
mod types;

pub use converter::Converter;
pub use locate::{list_dir, locate_newest_match, pick_newest, Candidate};
pub use normalize::{
    normalize_preview, reencode_file, transcode_to_jpeg, COMPOSITION_JPEG_QUALITY,
    PREVIEW_JPEG_QUALITY, UPLOAD_JPEG_QUALITY,
};
pub use pipeline::ConversionPipeline;
pub use types::{ConversionJob, ConvertError, Preview, RASTER_EXT};

#[cfg(test)]
pub(crate) use pipeline::fakes;
