//! Stage layout
//!
//! The stage is the on-screen area hosting the document canvas. The
//! signature region is a fixed rectangle in stage coordinates; it is
//! recomputed on every resize and never pans or zooms with the document.

use serde::Serialize;

use crate::geometry::{Point, Rect};

pub const MIN_STAGE_WIDTH: f64 = 320.0;
pub const MIN_STAGE_HEIGHT: f64 = 360.0;

/// Stage height as a fraction of the host width
pub const STAGE_ASPECT: f64 = 0.64;

/// Signature region width as a fraction of the stage width
pub const REGION_WIDTH_RATIO: f64 = 0.9;

/// Signature region height as a fraction of the stage height
pub const REGION_HEIGHT_RATIO: f64 = 0.39;

/// Gap between the region's bottom edge and the stage bottom
pub const REGION_BOTTOM_MARGIN: f64 = 16.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageLayout {
    pub width: f64,
    pub height: f64,
    pub signature_region: Rect,
}

impl StageLayout {
    /// Derive the stage and its signature region from the host element width
    pub fn from_host_width(host_width: f64) -> Self {
        let host_width = if host_width.is_finite() { host_width } else { 0.0 };
        let width = host_width.floor().max(MIN_STAGE_WIDTH);
        let height = (host_width * STAGE_ASPECT).floor().max(MIN_STAGE_HEIGHT);
        Self::with_size(width, height)
    }

    /// Lay out a stage of an explicit size
    pub fn with_size(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            signature_region: signature_region(width, height),
        }
    }

    pub fn center(&self) -> Point {
        Point::new(self.width / 2.0, self.height / 2.0)
    }
}

/// Signature region for a stage: horizontally centered, hugging the bottom
pub fn signature_region(stage_w: f64, stage_h: f64) -> Rect {
    let width = (stage_w * REGION_WIDTH_RATIO).floor();
    let height = (stage_h * REGION_HEIGHT_RATIO).floor();
    let x = ((stage_w - width) / 2.0).floor();
    let y = (stage_h - height - REGION_BOTTOM_MARGIN).floor();
    Rect::new(x, y, width, height)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_for_800_wide_host() {
        let stage = StageLayout::from_host_width(800.0);
        assert_eq!(stage.width, 800.0);
        assert_eq!(stage.height, 512.0);
        assert_eq!(stage.signature_region, Rect::new(40.0, 297.0, 720.0, 199.0));
    }

    #[test]
    fn test_layout_enforces_minimums() {
        let stage = StageLayout::from_host_width(200.0);
        assert_eq!(stage.width, MIN_STAGE_WIDTH);
        assert_eq!(stage.height, MIN_STAGE_HEIGHT);
    }

    #[test]
    fn test_region_stays_inside_stage() {
        for w in [320.0, 411.0, 768.0, 1024.0, 1920.0] {
            let stage = StageLayout::from_host_width(w);
            let r = stage.signature_region;
            assert!(r.x >= 0.0 && r.y >= 0.0);
            assert!(r.x + r.width <= stage.width);
            assert!(r.y + r.height <= stage.height);
        }
    }
}
