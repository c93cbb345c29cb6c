//! Viewport
//!
//! Pan/zoom state for the document canvas and the affine map between
//! image space (natural document pixels) and display space (stage pixels):
//!
//! ```text
//! display = image * scale + offset
//! image   = (display - offset) / scale
//! ```
//!
//! The map is uniform scale plus translation only. Rotation and shear are
//! never introduced.

use serde::Serialize;

use crate::error::{EngineError, Result};
use crate::geometry::{Point, Rect};

/// Lower zoom bound relative to the fitted scale
pub const MIN_SCALE_RATIO: f64 = 0.35;

/// Upper zoom bound relative to the fitted scale
pub const MAX_SCALE_RATIO: f64 = 6.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Viewport {
    scale: f64,
    offset_x: f64,
    offset_y: f64,
    min_scale: f64,
    max_scale: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            scale: 1.0,
            offset_x: 0.0,
            offset_y: 0.0,
            min_scale: 0.2,
            max_scale: 6.0,
        }
    }
}

impl Viewport {
    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn offset(&self) -> Point {
        Point::new(self.offset_x, self.offset_y)
    }

    pub fn min_scale(&self) -> f64 {
        self.min_scale
    }

    pub fn max_scale(&self) -> f64 {
        self.max_scale
    }

    /// Fit the whole image inside the stage and center it.
    ///
    /// Also rebases the zoom bounds on the fitted scale. Offsets are floored
    /// to whole pixels so repeated fits never drift.
    pub fn fit_to_stage(
        &mut self,
        image_w: f64,
        image_h: f64,
        stage_w: f64,
        stage_h: f64,
    ) -> Result<()> {
        check_dimensions(image_w, image_h)?;
        check_dimensions(stage_w, stage_h)?;

        let scale = (stage_w / image_w).min(stage_h / image_h);
        self.scale = scale;
        self.offset_x = ((stage_w - image_w * scale) / 2.0).floor();
        self.offset_y = ((stage_h - image_h * scale) / 2.0).floor();
        self.min_scale = scale * MIN_SCALE_RATIO;
        self.max_scale = scale * MAX_SCALE_RATIO;
        Ok(())
    }

    /// Zoom by `factor`, keeping the image point under the display-space
    /// pivot fixed. The resulting scale is clamped into `[min_scale, max_scale]`.
    pub fn zoom_around(&mut self, factor: f64, pivot_x: f64, pivot_y: f64) {
        if !factor.is_finite() || factor <= 0.0 {
            return;
        }
        let new_scale = (self.scale * factor).clamp(self.min_scale, self.max_scale);
        let k = new_scale / self.scale;
        self.offset_x = pivot_x - k * (pivot_x - self.offset_x);
        self.offset_y = pivot_y - k * (pivot_y - self.offset_y);
        self.scale = new_scale;
    }

    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.offset_x += dx;
        self.offset_y += dy;
    }

    /// Image space -> display space
    pub fn to_display(&self, p: Point) -> Point {
        Point::new(
            p.x * self.scale + self.offset_x,
            p.y * self.scale + self.offset_y,
        )
    }

    /// Display space -> image space
    pub fn to_image(&self, p: Point) -> Point {
        Point::new(
            (p.x - self.offset_x) / self.scale,
            (p.y - self.offset_y) / self.scale,
        )
    }

    /// Map a display-space rectangle into image space
    pub fn rect_to_image(&self, r: &Rect) -> Rect {
        let origin = self.to_image(r.origin());
        Rect::new(origin.x, origin.y, r.width / self.scale, r.height / self.scale)
    }
}

fn check_dimensions(width: f64, height: f64) -> Result<()> {
    if width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0 {
        Ok(())
    } else {
        Err(EngineError::InvalidDimensions { width, height })
    }
}
