//! Signing Engine for DocSign
//!
//! Client half of the document signing flow, compiled to WASM for the
//! capture page:
//! - Viewport pan/zoom with an exact image <-> display mapping
//! - Gesture disambiguation (pan, pinch-zoom, wheel, signature strokes)
//! - Signature capture on a DPR-scaled overlay
//! - High-resolution compositing of document + signature into one JPEG
//!
//! The core modules are plain Rust. [`SigningEngine`] is the only type that
//! knows about JS.

use std::io::Cursor;

use wasm_bindgen::prelude::*;

pub mod compositor;
pub mod document;
pub mod error;
pub mod geometry;
pub mod gesture;
pub mod layout;
pub mod protocol;
pub mod session;
pub mod signature;
pub mod viewport;

// Re-export common types
pub use compositor::{compose, Composition, EXPORT_SCALE};
pub use document::Document;
pub use error::EngineError;
pub use geometry::{PixelRect, Point, Rect};
pub use gesture::{GestureAction, GestureController, Mode, PointerEvent, PointerKind};
pub use layout::StageLayout;
pub use session::{apply_gesture, SigningSession, Step};
pub use signature::{PenWidth, SignatureCapture};
pub use viewport::Viewport;

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();

    // A second init (hot reload) just keeps the first logger
    let _ = console_log::init_with_level(log::Level::Debug);
}

fn js_err(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn pointer_kind(pointer_type: &str) -> PointerKind {
    match pointer_type {
        "mouse" => PointerKind::Mouse,
        "pen" => PointerKind::Pen,
        _ => PointerKind::Touch,
    }
}

fn action_name(action: GestureAction) -> String {
    match action {
        GestureAction::Idle => "idle",
        GestureAction::Pan { .. } => "pan",
        GestureAction::Zoom { .. } => "zoom",
        GestureAction::Stroke(_) => "stroke",
    }
    .to_string()
}

/// Signing Engine - one per capture page
#[wasm_bindgen]
pub struct SigningEngine {
    session: SigningSession,
}

#[wasm_bindgen]
impl SigningEngine {
    /// `host_width` is the stage container's CSS width
    #[wasm_bindgen(constructor)]
    pub fn new(host_width: f64, device_pixel_ratio: f64) -> Self {
        Self {
            session: SigningSession::new(host_width, device_pixel_ratio),
        }
    }

    /// Preset term chips for the details step
    #[wasm_bindgen(js_name = "termPresets")]
    pub fn term_presets() -> Vec<String> {
        session::TERM_PRESETS.iter().map(|t| t.to_string()).collect()
    }

    #[wasm_bindgen(js_name = "submitDetails")]
    pub fn submit_details(
        &mut self,
        customer_id: &str,
        terms: Vec<String>,
        other_term: &str,
    ) -> Result<(), JsValue> {
        self.session
            .submit_details(customer_id, &terms, other_term)
            .map_err(js_err)
    }

    pub fn resize(&mut self, host_width: f64) {
        self.session.resize(host_width);
    }

    /// Load preview bytes. `uploaded_filename` is the server-side PDF name
    /// from `/convert-pdf`, if the document came from a PDF.
    #[wasm_bindgen(js_name = "loadDocument")]
    pub fn load_document(
        &mut self,
        bytes: &[u8],
        uploaded_filename: Option<String>,
    ) -> Result<(), JsValue> {
        self.session
            .load_document(bytes, uploaded_filename)
            .map_err(js_err)
    }

    /// Resolve the preview URL from a `/convert-pdf` JSON response
    #[wasm_bindgen(js_name = "resolvePreviewUrl")]
    pub fn resolve_preview_url(
        &self,
        response: JsValue,
        origin: &str,
    ) -> Result<Option<String>, JsValue> {
        let response: protocol::ConvertResponse =
            serde_wasm_bindgen::from_value(response).map_err(js_err)?;
        let customer_id = self
            .session
            .details()
            .map(|d| d.customer_id.as_str())
            .unwrap_or_default();
        Ok(protocol::resolve_preview_url(&response, customer_id, origin))
    }

    #[wasm_bindgen(js_name = "pointerDown")]
    pub fn pointer_down(
        &mut self,
        id: i32,
        x: f64,
        y: f64,
        pointer_type: &str,
        button: i16,
    ) -> String {
        action_name(self.session.handle_event(PointerEvent::Down {
            id,
            position: Point::new(x, y),
            kind: pointer_kind(pointer_type),
            button,
        }))
    }

    #[wasm_bindgen(js_name = "pointerMove")]
    pub fn pointer_move(&mut self, id: i32, x: f64, y: f64) -> String {
        action_name(self.session.handle_event(PointerEvent::Move {
            id,
            position: Point::new(x, y),
        }))
    }

    #[wasm_bindgen(js_name = "pointerUp")]
    pub fn pointer_up(&mut self, id: i32) -> String {
        action_name(self.session.handle_event(PointerEvent::Up { id }))
    }

    #[wasm_bindgen(js_name = "pointerCancel")]
    pub fn pointer_cancel(&mut self) -> String {
        action_name(self.session.handle_event(PointerEvent::Cancel))
    }

    pub fn wheel(&mut self, delta_y: f64, x: f64, y: f64) -> String {
        action_name(self.session.handle_event(PointerEvent::Wheel {
            delta_y,
            position: Point::new(x, y),
        }))
    }

    #[wasm_bindgen(js_name = "zoomIn")]
    pub fn zoom_in(&mut self) {
        self.session.zoom_in();
    }

    #[wasm_bindgen(js_name = "zoomOut")]
    pub fn zoom_out(&mut self) {
        self.session.zoom_out();
    }

    #[wasm_bindgen(js_name = "resetView")]
    pub fn reset_view(&mut self) {
        self.session.reset_view();
    }

    /// 1 = thin, 2 = medium, 3 = thick
    #[wasm_bindgen(js_name = "setPen")]
    pub fn set_pen(&mut self, index: u8) {
        self.session.set_pen(PenWidth::from_index(index));
    }

    #[wasm_bindgen(js_name = "lockAndSign")]
    pub fn lock_and_sign(&mut self) -> Result<(), JsValue> {
        self.session.lock().map_err(js_err)
    }

    /// Current signature ink as a transparent PNG, for redrawing the pad
    #[wasm_bindgen(js_name = "overlayPng")]
    pub fn overlay_png(&self) -> Result<Vec<u8>, JsValue> {
        let capture = self
            .session
            .capture()
            .ok_or_else(|| js_err(EngineError::NotSigning))?;
        let overlay = capture.render().map_err(js_err)?;
        let mut bytes = Vec::new();
        overlay
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .map_err(js_err)?;
        Ok(bytes)
    }

    /// Compose the export and return it as a JPEG data URL
    #[wasm_bindgen(js_name = "buildPreview")]
    pub fn build_preview(&mut self) -> Result<String, JsValue> {
        self.session
            .build_preview()
            .map(|c| c.to_data_url())
            .map_err(js_err)
    }

    #[wasm_bindgen(js_name = "backToSign")]
    pub fn back_to_sign(&mut self) {
        self.session.back_to_sign();
    }

    /// JSON body for `POST /save-doc`
    #[wasm_bindgen(js_name = "savePayload")]
    pub fn save_payload(&self) -> Result<JsValue, JsValue> {
        let payload = self.session.save_payload().map_err(js_err)?;
        serde_wasm_bindgen::to_value(&payload).map_err(js_err)
    }

    /// Step, mode, stage, viewport and region for rendering
    #[wasm_bindgen(js_name = "viewState")]
    pub fn view_state(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&self.session.view_state()).map_err(js_err)
    }

    /// Discard document, viewport and ink; keep the customer details
    pub fn retake(&mut self) {
        self.session.retake();
    }
}
