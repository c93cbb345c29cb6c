//! Artifact normalization
//!
//! Re-encodes rasters to JPEG at fixed qualities. A failed re-encode of a
//! converter output degrades to copying the raw file under the canonical
//! name.

use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, Rgba, RgbaImage};

use super::types::ConvertError;

/// Canonical `-preview.jpg` quality
pub const PREVIEW_JPEG_QUALITY: u8 = 95;

/// Final composition received as a data URL
pub const COMPOSITION_JPEG_QUALITY: u8 = 95;

/// Raw multipart uploads saved through `/save-doc`
pub const UPLOAD_JPEG_QUALITY: u8 = 90;

/// Flatten onto white and drop alpha; JPEG has no transparency
fn flatten(img: DynamicImage) -> image::RgbImage {
    if !img.color().has_alpha() {
        return img.into_rgb8();
    }
    let rgba = img.into_rgba8();
    let mut canvas = RgbaImage::from_pixel(rgba.width(), rgba.height(), Rgba([255, 255, 255, 255]));
    image::imageops::overlay(&mut canvas, &rgba, 0, 0);
    DynamicImage::ImageRgba8(canvas).into_rgb8()
}

fn encode_jpeg<W: Write>(img: DynamicImage, writer: W, quality: u8) -> image::ImageResult<()> {
    let rgb = flatten(img);
    JpegEncoder::new_with_quality(writer, quality).encode_image(&rgb)
}

/// Encode `img` as JPEG at `quality` into `dst`
pub fn write_jpeg(img: DynamicImage, dst: &Path, quality: u8) -> image::ImageResult<()> {
    let file = std::fs::File::create(dst)?;
    encode_jpeg(img, BufWriter::new(file), quality)
}

/// Decode any supported raster from memory and re-encode it as JPEG bytes,
/// returning them with the image size. Nothing touches the filesystem.
pub async fn transcode_to_jpeg(bytes: Vec<u8>, quality: u8) -> Result<(Vec<u8>, (u32, u32)), ConvertError> {
    tokio::task::spawn_blocking(move || -> Result<(Vec<u8>, (u32, u32)), ConvertError> {
        let img = image::load_from_memory(&bytes)?;
        let size = (img.width(), img.height());
        let mut jpeg = Vec::new();
        encode_jpeg(img, &mut jpeg, quality)?;
        Ok((jpeg, size))
    })
    .await
    .map_err(|e| ConvertError::Join(e.to_string()))?
}

/// Decode any supported raster from memory and write it as JPEG
pub async fn encode_bytes_to_jpeg(bytes: Vec<u8>, dst: &Path, quality: u8) -> Result<(u32, u32), ConvertError> {
    let dst = dst.to_path_buf();
    tokio::task::spawn_blocking(move || -> Result<(u32, u32), ConvertError> {
        let img = image::load_from_memory(&bytes)?;
        let size = (img.width(), img.height());
        write_jpeg(img, &dst, quality)?;
        Ok(size)
    })
    .await
    .map_err(|e| ConvertError::Join(e.to_string()))?
}

/// Re-encode the file at `src` to JPEG at `dst`. `src == dst` is allowed.
pub async fn reencode_file(src: &Path, dst: &Path, quality: u8) -> Result<(u32, u32), ConvertError> {
    let bytes = tokio::fs::read(src).await?;
    encode_bytes_to_jpeg(bytes, dst, quality).await
}

/// Write the canonical preview from a converter output.
///
/// Returns `true` when re-encoded, `false` when the raw file was copied.
pub async fn normalize_preview(raw: &Path, preview: &Path) -> Result<bool, ConvertError> {
    match reencode_file(raw, preview, PREVIEW_JPEG_QUALITY).await {
        Ok((width, height)) => {
            tracing::debug!(width, height, preview = %preview.display(), "Normalized preview");
            Ok(true)
        }
        Err(e) => {
            tracing::warn!(raw = %raw.display(), error = %e, "Preview normalization failed, copying raw output");
            if !tokio::fs::try_exists(raw).await.unwrap_or(false) {
                return Err(ConvertError::RawMissing(raw.to_path_buf()));
            }
            tokio::fs::copy(raw, preview)
                .await
                .map_err(ConvertError::FinalCopy)?;
            Ok(false)
        }
    }
}

/// `path` with its extension replaced by `.jpg`
pub fn jpg_sibling(path: &Path) -> PathBuf {
    path.with_extension("jpg")
}
