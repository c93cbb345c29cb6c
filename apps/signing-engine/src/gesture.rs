//! Gesture Controller
//!
//! Classifies raw pointer and wheel input into viewport gestures (pan,
//! pinch-zoom, wheel-zoom) or signature strokes, depending on the session
//! mode. The controller never mutates the viewport itself; it returns a
//! [`GestureAction`] that the session applies.
//!
//! Mode transitions are one-directional: `Aligning -> Signing` through
//! [`GestureController::lock`]. The only way back is a fresh controller.

use serde::{Deserialize, Serialize};

use crate::geometry::Point;
use crate::layout::StageLayout;

/// Pinch distance change (px) that doubles the scale
pub const PINCH_SENSITIVITY: f64 = 300.0;

/// Wheel zoom factors
pub const WHEEL_ZOOM_IN: f64 = 1.08;
pub const WHEEL_ZOOM_OUT: f64 = 0.92;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerKind {
    Mouse,
    Touch,
    Pen,
}

/// Raw input, in stage-relative display coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Down {
        id: i32,
        position: Point,
        kind: PointerKind,
        button: i16,
    },
    Move {
        id: i32,
        position: Point,
    },
    Up {
        id: i32,
    },
    Cancel,
    Wheel {
        delta_y: f64,
        position: Point,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Document can be panned and zoomed
    #[default]
    Aligning,
    /// Viewport frozen, input goes to the signature pad
    Signing,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StrokeAction {
    Begin(Point),
    Extend(Point),
    End,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureAction {
    Idle,
    Pan { dx: f64, dy: f64 },
    Zoom { factor: f64, pivot: Point },
    Stroke(StrokeAction),
}

#[derive(Debug, Clone, Default)]
pub struct GestureController {
    mode: Mode,
    /// Active pointers in press order
    pointers: Vec<(i32, Point)>,
    last_pan: Option<Point>,
    last_distance: Option<f64>,
    drawing: Option<i32>,
}

impl GestureController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn is_locked(&self) -> bool {
        self.mode == Mode::Signing
    }

    pub fn active_pointers(&self) -> usize {
        self.pointers.len()
    }

    /// Switch to signing. Any in-flight pan or pinch is dropped.
    pub fn lock(&mut self) {
        self.mode = Mode::Signing;
        self.pointers.clear();
        self.last_pan = None;
        self.last_distance = None;
    }

    pub fn handle(&mut self, event: PointerEvent, stage: &StageLayout) -> GestureAction {
        match self.mode {
            Mode::Aligning => self.handle_aligning(event, stage),
            Mode::Signing => self.handle_signing(event, stage),
        }
    }

    fn handle_aligning(&mut self, event: PointerEvent, stage: &StageLayout) -> GestureAction {
        match event {
            PointerEvent::Down { id, position, .. } => {
                self.pointers.retain(|(pid, _)| *pid != id);
                self.pointers.push((id, position));
                self.last_pan = if self.pointers.len() == 1 {
                    Some(position)
                } else {
                    None
                };
                GestureAction::Idle
            }
            PointerEvent::Move { id, position } => {
                let Some(slot) = self.pointers.iter_mut().find(|(pid, _)| *pid == id) else {
                    return GestureAction::Idle;
                };
                slot.1 = position;

                match self.pointers.len() {
                    1 => {
                        let last = self.last_pan.replace(position).unwrap_or(position);
                        GestureAction::Pan {
                            dx: position.x - last.x,
                            dy: position.y - last.y,
                        }
                    }
                    2 => {
                        let distance = self.pointers[0].1.distance(&self.pointers[1].1);
                        match self.last_distance.replace(distance) {
                            None => GestureAction::Idle,
                            Some(last) => GestureAction::Zoom {
                                factor: 1.0 + (distance - last) / PINCH_SENSITIVITY,
                                pivot: stage.center(),
                            },
                        }
                    }
                    _ => GestureAction::Idle,
                }
            }
            PointerEvent::Up { id } => {
                self.pointers.retain(|(pid, _)| *pid != id);
                if self.pointers.len() < 2 {
                    self.last_distance = None;
                }
                // Resume panning from where the remaining finger is now
                self.last_pan = self.pointers.first().map(|(_, p)| *p);
                GestureAction::Idle
            }
            PointerEvent::Cancel => {
                self.pointers.clear();
                self.last_pan = None;
                self.last_distance = None;
                GestureAction::Idle
            }
            PointerEvent::Wheel { delta_y, position } => {
                if delta_y == 0.0 || !delta_y.is_finite() {
                    return GestureAction::Idle;
                }
                let factor = if delta_y < 0.0 {
                    WHEEL_ZOOM_IN
                } else {
                    WHEEL_ZOOM_OUT
                };
                GestureAction::Zoom {
                    factor,
                    pivot: position,
                }
            }
        }
    }

    fn handle_signing(&mut self, event: PointerEvent, stage: &StageLayout) -> GestureAction {
        match event {
            PointerEvent::Down {
                id,
                position,
                kind,
                button,
            } => {
                if kind == PointerKind::Mouse && button != 0 {
                    return GestureAction::Idle;
                }
                if self.drawing.is_some() || !stage.signature_region.contains(position) {
                    return GestureAction::Idle;
                }
                self.drawing = Some(id);
                GestureAction::Stroke(StrokeAction::Begin(position))
            }
            PointerEvent::Move { id, position } if self.drawing == Some(id) => {
                GestureAction::Stroke(StrokeAction::Extend(position))
            }
            PointerEvent::Up { id } if self.drawing == Some(id) => {
                self.drawing = None;
                GestureAction::Stroke(StrokeAction::End)
            }
            PointerEvent::Cancel if self.drawing.is_some() => {
                self.drawing = None;
                GestureAction::Stroke(StrokeAction::End)
            }
            _ => GestureAction::Idle,
        }
    }
}
