//! Compositor
//!
//! Produces the final signed raster. The base document is always resampled
//! from its natural size to `natural * export_scale`, so output resolution
//! never depends on the on-screen zoom. The signature overlay is placed by
//! mapping the display-space signature region through the inverse of the
//! viewport captured when signing began, then scaling by `export_scale`.

use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgba, RgbaImage};

use crate::document::Document;
use crate::error::{EngineError, Result};
use crate::geometry::{PixelRect, Rect};
use crate::viewport::Viewport;

/// Multiplier applied to the document's natural size for the export
pub const EXPORT_SCALE: f64 = 3.0;

/// JPEG quality of the composed artifact
pub const EXPORT_JPEG_QUALITY: u8 = 92;

/// The encoded artifact plus the geometry used to build it
#[derive(Debug, Clone)]
pub struct Composition {
    pub width: u32,
    pub height: u32,
    /// Where the overlay landed, in output pixels
    pub placement: PixelRect,
    pub jpeg: Vec<u8>,
}

impl Composition {
    /// `data:image/jpeg;base64,...` for the JSON save payload
    pub fn to_data_url(&self) -> String {
        format!(
            "data:image/jpeg;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(&self.jpeg)
        )
    }
}

/// Output raster size for a document at `export_scale`
pub fn export_size(natural_width: u32, natural_height: u32, export_scale: f64) -> (u32, u32) {
    let w = (natural_width as f64 * export_scale).round().max(1.0) as u32;
    let h = (natural_height as f64 * export_scale).round().max(1.0) as u32;
    (w, h)
}

/// Destination rectangle of the signature overlay in the output raster
pub fn signature_placement(viewport: &Viewport, region: &Rect, export_scale: f64) -> PixelRect {
    let image_rect = viewport.rect_to_image(region);
    PixelRect {
        x: (image_rect.x * export_scale).round() as i64,
        y: (image_rect.y * export_scale).round() as i64,
        width: (image_rect.width * export_scale).round().max(0.0) as u32,
        height: (image_rect.height * export_scale).round().max(0.0) as u32,
    }
}

/// Compose document + signature overlay into one JPEG.
///
/// Fails with [`EngineError::DocumentNotReady`] when no document is loaded.
/// A blank overlay is fine; an unsigned document is still a valid output.
pub fn compose(
    document: Option<&Document>,
    overlay: &RgbaImage,
    viewport_at_lock: &Viewport,
    signature_region: &Rect,
    export_scale: f64,
) -> Result<Composition> {
    let document = document.ok_or(EngineError::DocumentNotReady)?;
    if !export_scale.is_finite() || export_scale <= 0.0 {
        return Err(EngineError::InvalidDimensions {
            width: export_scale,
            height: export_scale,
        });
    }

    let (width, height) = export_size(
        document.natural_width(),
        document.natural_height(),
        export_scale,
    );

    let mut canvas = RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255]));
    let base = imageops::resize(document.image(), width, height, FilterType::CatmullRom);
    imageops::overlay(&mut canvas, &base, 0, 0);

    let placement = signature_placement(viewport_at_lock, signature_region, export_scale);
    if placement.width > 0 && placement.height > 0 && overlay.width() > 0 && overlay.height() > 0
    {
        let ink = imageops::resize(overlay, placement.width, placement.height, FilterType::Triangle);
        imageops::overlay(&mut canvas, &ink, placement.x, placement.y);
    }

    let rgb = DynamicImage::ImageRgba8(canvas).into_rgb8();
    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, EXPORT_JPEG_QUALITY).encode_image(&rgb)?;

    log::info!(
        "composed {}x{} export, signature at {:?}, {} bytes",
        width,
        height,
        placement,
        jpeg.len()
    );

    Ok(Composition {
        width,
        height,
        placement,
        jpeg,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::StageLayout;

    fn white_document(w: u32, h: u32) -> Document {
        Document::from_image(RgbaImage::from_pixel(w, h, Rgba([255, 255, 255, 255]))).unwrap()
    }

    fn fitted(doc_w: f64, doc_h: f64, stage: &StageLayout) -> Viewport {
        let mut vp = Viewport::default();
        vp.fit_to_stage(doc_w, doc_h, stage.width, stage.height).unwrap();
        vp
    }

    #[test]
    fn test_output_size_ignores_zoom() {
        let stage = StageLayout::from_host_width(800.0);
        let doc = white_document(20, 28);
        let overlay = RgbaImage::new(10, 4);

        let plain = fitted(20.0, 28.0, &stage);
        let mut zoomed = plain;
        zoomed.zoom_around(4.0, 100.0, 300.0);
        zoomed.pan(-35.0, 12.0);

        for vp in [plain, zoomed] {
            let out = compose(Some(&doc), &overlay, &vp, &stage.signature_region, EXPORT_SCALE)
                .unwrap();
            assert_eq!((out.width, out.height), (60, 84));
            let decoded = image::load_from_memory(&out.jpeg).unwrap();
            assert_eq!((decoded.width(), decoded.height()), (60, 84));
        }
    }

    #[test]
    fn test_placement_from_frozen_viewport() {
        // 1000x1400 document, export scale 3, region on the bottom 39% of 800x512
        let stage = StageLayout::from_host_width(800.0);
        let vp = fitted(1000.0, 1400.0, &stage);
        let region = stage.signature_region;

        let s = 512.0 / 1400.0;
        let offset_x = ((800.0 - 1000.0 * s) / 2.0_f64).floor();
        let expected = PixelRect {
            x: ((region.x - offset_x) / s * 3.0).round() as i64,
            y: (region.y / s * 3.0).round() as i64,
            width: (region.width / s * 3.0).round() as u32,
            height: (region.height / s * 3.0).round() as u32,
        };

        let placement = signature_placement(&vp, &region, EXPORT_SCALE);
        assert_eq!(placement, expected);
        assert_eq!(placement, signature_placement(&vp, &region, EXPORT_SCALE));
    }

    #[test]
    fn test_ink_lands_in_placement() {
        let stage = StageLayout::from_host_width(800.0);
        let doc = white_document(100, 140);
        let vp = fitted(100.0, 140.0, &stage);
        let overlay = RgbaImage::from_pixel(720, 199, Rgba([0, 0, 0, 255]));

        let out = compose(Some(&doc), &overlay, &vp, &stage.signature_region, EXPORT_SCALE)
            .unwrap();
        let p = out.placement;
        assert!(p.y > 0 && (p.y as u32) < out.height);

        let decoded = image::load_from_memory(&out.jpeg).unwrap().to_rgb8();
        let inside_y = ((p.y as u32) + out.height) / 2;
        assert!(decoded.get_pixel(out.width / 2, inside_y).0[0] < 40);
        assert!(decoded.get_pixel(out.width / 2, 10).0[0] > 215);
    }

    #[test]
    fn test_blank_overlay_still_composes() {
        let stage = StageLayout::from_host_width(800.0);
        let doc = white_document(10, 10);
        let vp = fitted(10.0, 10.0, &stage);
        let overlay = RgbaImage::new(720, 199);

        let out = compose(Some(&doc), &overlay, &vp, &stage.signature_region, EXPORT_SCALE);
        assert!(out.is_ok());
    }

    #[test]
    fn test_missing_document() {
        let overlay = RgbaImage::new(1, 1);
        let result = compose(
            None,
            &overlay,
            &Viewport::default(),
            &Rect::new(0.0, 0.0, 1.0, 1.0),
            EXPORT_SCALE,
        );
        assert!(matches!(result, Err(EngineError::DocumentNotReady)));
    }

    #[test]
    fn test_data_url_prefix() {
        let c = Composition {
            width: 1,
            height: 1,
            placement: PixelRect { x: 0, y: 0, width: 0, height: 0 },
            jpeg: vec![0xff, 0xd8],
        };
        assert_eq!(c.to_data_url(), "data:image/jpeg;base64,/9g=");
    }
}
