//! Signature Capture
//!
//! Freehand strokes recorded in the overlay's own pixel space. The overlay
//! covers the signature region and is sized to the region's on-screen size
//! times the device pixel ratio, so ink stays sharp regardless of how far the
//! document happens to be zoomed underneath it.

use image::RgbaImage;
use serde::{Deserialize, Serialize};
use tiny_skia::{LineCap, LineJoin, Paint, PathBuilder, Pixmap, Transform};

use crate::error::{EngineError, Result};
use crate::geometry::{Point, Rect};
use crate::gesture::StrokeAction;

/// Pen presets offered on the signing toolbar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PenWidth {
    Thin,
    #[default]
    Medium,
    Thick,
}

impl PenWidth {
    /// Toolbar index (1, 2, 3) to preset; anything else falls back to medium
    pub fn from_index(index: u8) -> Self {
        match index {
            1 => PenWidth::Thin,
            3 => PenWidth::Thick,
            _ => PenWidth::Medium,
        }
    }

    /// Width in CSS pixels
    pub fn css_px(&self) -> f64 {
        match self {
            PenWidth::Thin => 2.0,
            PenWidth::Medium => 4.0,
            PenWidth::Thick => 6.0,
        }
    }

    /// Width in overlay pixels for the given device pixel ratio
    pub fn device_px(&self, device_pixel_ratio: f64) -> f32 {
        (self.css_px() * device_pixel_ratio).round().max(1.0) as f32
    }
}

/// One polyline, in overlay pixels
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stroke {
    pub width: f32,
    pub points: Vec<Point>,
}

#[derive(Debug, Clone)]
pub struct SignatureCapture {
    region: Rect,
    device_pixel_ratio: f64,
    width: u32,
    height: u32,
    pen: PenWidth,
    strokes: Vec<Stroke>,
    drawing: bool,
}

impl SignatureCapture {
    /// Create a blank overlay covering `region` (stage coordinates)
    pub fn new(region: Rect, device_pixel_ratio: f64, pen: PenWidth) -> Result<Self> {
        if !(region.width > 0.0 && region.height > 0.0) {
            return Err(EngineError::InvalidDimensions {
                width: region.width,
                height: region.height,
            });
        }
        let dpr = sanitize_dpr(device_pixel_ratio);
        let width = ((region.width * dpr).round() as u32).max(1);
        let height = ((region.height * dpr).round() as u32).max(1);

        log::debug!("signature overlay {}x{} (dpr {})", width, height, dpr);

        Ok(Self {
            region,
            device_pixel_ratio: dpr,
            width,
            height,
            pen,
            strokes: Vec::new(),
            drawing: false,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn region(&self) -> Rect {
        self.region
    }

    pub fn pen(&self) -> PenWidth {
        self.pen
    }

    /// Applies to strokes started after the change
    pub fn set_pen(&mut self, pen: PenWidth) {
        self.pen = pen;
    }

    pub fn strokes(&self) -> &[Stroke] {
        &self.strokes
    }

    /// True when nothing visible has been drawn
    pub fn is_blank(&self) -> bool {
        self.strokes.iter().all(|s| s.points.len() < 2)
    }

    /// Stage coordinates -> overlay pixels
    pub fn to_overlay(&self, stage_point: Point) -> Point {
        Point::new(
            (stage_point.x - self.region.x) * self.device_pixel_ratio,
            (stage_point.y - self.region.y) * self.device_pixel_ratio,
        )
    }

    pub fn apply(&mut self, action: StrokeAction) {
        match action {
            StrokeAction::Begin(p) => self.begin_stroke(p),
            StrokeAction::Extend(p) => self.extend_stroke(p),
            StrokeAction::End => self.end_stroke(),
        }
    }

    pub fn begin_stroke(&mut self, stage_point: Point) {
        let p = self.to_overlay(stage_point);
        self.strokes.push(Stroke {
            width: self.pen.device_px(self.device_pixel_ratio),
            points: vec![p],
        });
        self.drawing = true;
    }

    pub fn extend_stroke(&mut self, stage_point: Point) {
        if !self.drawing {
            return;
        }
        let p = self.to_overlay(stage_point);
        if let Some(stroke) = self.strokes.last_mut() {
            stroke.points.push(p);
        }
    }

    pub fn end_stroke(&mut self) {
        self.drawing = false;
    }

    /// Remove all ink. The viewport is not affected.
    pub fn clear(&mut self) {
        self.strokes.clear();
        self.drawing = false;
    }

    /// Rasterise the strokes onto a transparent overlay
    pub fn render(&self) -> Result<RgbaImage> {
        let mut pixmap = Pixmap::new(self.width, self.height).ok_or(
            EngineError::InvalidDimensions {
                width: self.width as f64,
                height: self.height as f64,
            },
        )?;

        let mut paint = Paint::default();
        paint.set_color_rgba8(0, 0, 0, 255);
        paint.anti_alias = true;

        for stroke in &self.strokes {
            let Some((first, rest)) = stroke.points.split_first() else {
                continue;
            };
            if rest.is_empty() {
                continue;
            }

            let mut pb = PathBuilder::new();
            pb.move_to(first.x as f32, first.y as f32);
            for p in rest {
                pb.line_to(p.x as f32, p.y as f32);
            }
            let Some(path) = pb.finish() else {
                continue;
            };

            let mut sk_stroke = tiny_skia::Stroke::default();
            sk_stroke.width = stroke.width;
            sk_stroke.line_cap = LineCap::Round;
            sk_stroke.line_join = LineJoin::Round;
            pixmap.stroke_path(&path, &paint, &sk_stroke, Transform::identity(), None);
        }

        Ok(pixmap_to_rgba(&pixmap))
    }
}

fn sanitize_dpr(dpr: f64) -> f64 {
    if dpr.is_finite() && dpr > 0.0 {
        dpr
    } else {
        1.0
    }
}

/// tiny-skia stores premultiplied pixels; `image` wants straight alpha
fn pixmap_to_rgba(pixmap: &Pixmap) -> RgbaImage {
    let mut out = RgbaImage::new(pixmap.width(), pixmap.height());
    for (dst, src) in out.pixels_mut().zip(pixmap.pixels()) {
        let c = src.demultiply();
        *dst = image::Rgba([c.red(), c.green(), c.blue(), c.alpha()]);
    }
    out
}
