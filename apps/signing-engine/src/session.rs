//! Signing Session
//!
//! One operator, one document. The session owns every piece of client state
//! (customer details, stage layout, document, viewport, gesture controller,
//! signature overlay and the last composition) and is passed explicitly to
//! each handler.
//!
//! Lifecycle:
//! ```text
//! Details --submit_details--> Align(Aligning) --lock--> Align(Signing)
//!     ^                                                   |
//!     |                                             build_preview
//!     +------------------- retake --------------------  Preview
//! ```
//! `lock` is one-directional: once signing starts the viewport is frozen and
//! only `retake` (or loading a new document) starts over.

use serde::Serialize;

use crate::compositor::{self, Composition, EXPORT_SCALE};
use crate::document::Document;
use crate::error::{EngineError, Result};
use crate::gesture::{GestureAction, GestureController, Mode, PointerEvent};
use crate::layout::StageLayout;
use crate::protocol::SavePayload;
use crate::signature::{PenWidth, SignatureCapture};
use crate::viewport::Viewport;

/// Term chips offered on the details step
pub const TERM_PRESETS: [&str; 9] = [
    "PAN", "Peri", "FI", "Núcleo", "Coroa", "Inicial", "Final", "PIX", "ONF",
];

/// Toolbar zoom factors (pivot at the stage center)
pub const BUTTON_ZOOM_IN: f64 = 1.12;
pub const BUTTON_ZOOM_OUT: f64 = 0.9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Step {
    #[default]
    Details,
    Align,
    Preview,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDetails {
    pub customer_id: String,
    pub terms: Vec<String>,
}

impl CustomerDetails {
    /// Validate the customer id (1 to 8 digits) and collect the selected
    /// terms plus the free-text one, without duplicates.
    pub fn new(customer_id: &str, selected_terms: &[String], other_term: &str) -> Result<Self> {
        let customer_id = customer_id.trim();
        let valid = (1..=8).contains(&customer_id.chars().count())
            && customer_id.chars().all(|c| c.is_ascii_digit());
        if !valid {
            return Err(EngineError::InvalidCustomerId(customer_id.to_string()));
        }

        let mut terms: Vec<String> = Vec::new();
        let other = other_term.trim();
        let extra = (!other.is_empty()).then_some(other);
        for term in selected_terms.iter().map(String::as_str).chain(extra) {
            if !terms.iter().any(|t| t == term) {
                terms.push(term.to_string());
            }
        }

        Ok(Self {
            customer_id: customer_id.to_string(),
            terms,
        })
    }

    /// Terms as sent to the server
    pub fn joined_terms(&self) -> String {
        self.terms.join("-")
    }
}

/// Snapshot of what the page needs to draw
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewState {
    pub step: Step,
    pub mode: Mode,
    pub stage: StageLayout,
    pub viewport: Viewport,
    pub has_document: bool,
    pub has_signature: bool,
    pub pen: PenWidth,
}

#[derive(Debug, Clone)]
pub struct SigningSession {
    step: Step,
    details: Option<CustomerDetails>,
    stage: StageLayout,
    device_pixel_ratio: f64,
    document: Option<Document>,
    viewport: Viewport,
    controller: GestureController,
    capture: Option<SignatureCapture>,
    viewport_at_lock: Option<Viewport>,
    pen: PenWidth,
    uploaded_pdf_filename: Option<String>,
    composition: Option<Composition>,
}

impl SigningSession {
    pub fn new(host_width: f64, device_pixel_ratio: f64) -> Self {
        Self {
            step: Step::Details,
            details: None,
            stage: StageLayout::from_host_width(host_width),
            device_pixel_ratio,
            document: None,
            viewport: Viewport::default(),
            controller: GestureController::new(),
            capture: None,
            viewport_at_lock: None,
            pen: PenWidth::default(),
            uploaded_pdf_filename: None,
            composition: None,
        }
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn mode(&self) -> Mode {
        self.controller.mode()
    }

    pub fn details(&self) -> Option<&CustomerDetails> {
        self.details.as_ref()
    }

    pub fn stage(&self) -> &StageLayout {
        &self.stage
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn document(&self) -> Option<&Document> {
        self.document.as_ref()
    }

    pub fn capture(&self) -> Option<&SignatureCapture> {
        self.capture.as_ref()
    }

    pub fn composition(&self) -> Option<&Composition> {
        self.composition.as_ref()
    }

    pub fn uploaded_pdf_filename(&self) -> Option<&str> {
        self.uploaded_pdf_filename.as_deref()
    }

    pub fn view_state(&self) -> ViewState {
        ViewState {
            step: self.step,
            mode: self.mode(),
            stage: self.stage,
            viewport: self.viewport,
            has_document: self.document.is_some(),
            has_signature: self.capture.as_ref().is_some_and(|c| !c.is_blank()),
            pen: self.pen,
        }
    }

    pub fn submit_details(
        &mut self,
        customer_id: &str,
        selected_terms: &[String],
        other_term: &str,
    ) -> Result<()> {
        let details = CustomerDetails::new(customer_id, selected_terms, other_term)?;
        log::info!(
            "details accepted for customer {} ({} terms)",
            details.customer_id,
            details.terms.len()
        );
        self.details = Some(details);
        self.step = Step::Align;
        Ok(())
    }

    /// Recompute the stage after the host element changed size. While
    /// aligning the document is re-fitted; while signing the viewport and
    /// the signature pad both stay where they were at lock time.
    pub fn resize(&mut self, host_width: f64) {
        let mut stage = StageLayout::from_host_width(host_width);
        if let Some(capture) = self.capture.as_ref().filter(|_| self.controller.is_locked()) {
            stage.signature_region = capture.region();
        }
        self.stage = stage;
        if self.mode() == Mode::Aligning {
            self.fit_document();
        }
    }

    /// Replace the document. On decode failure nothing changes.
    pub fn load_document(
        &mut self,
        bytes: &[u8],
        uploaded_pdf_filename: Option<String>,
    ) -> Result<()> {
        let document = Document::decode(bytes)?;
        log::info!(
            "document loaded: {}x{}",
            document.natural_width(),
            document.natural_height()
        );

        self.document = Some(document);
        self.uploaded_pdf_filename = uploaded_pdf_filename;
        self.controller = GestureController::new();
        self.capture = None;
        self.viewport_at_lock = None;
        self.composition = None;
        self.viewport = Viewport::default();
        self.fit_document();
        Ok(())
    }

    /// Route one input event. Returns what it turned into so the page knows
    /// whether to redraw the document or the overlay.
    pub fn handle_event(&mut self, event: PointerEvent) -> GestureAction {
        let action = self.controller.handle(event, &self.stage);
        match action {
            GestureAction::Idle => {}
            GestureAction::Pan { dx, dy } => self.viewport.pan(dx, dy),
            GestureAction::Zoom { factor, pivot } => {
                self.viewport.zoom_around(factor, pivot.x, pivot.y)
            }
            GestureAction::Stroke(stroke) => {
                if let Some(capture) = self.capture.as_mut() {
                    capture.apply(stroke);
                }
            }
        }
        action
    }

    pub fn zoom_in(&mut self) {
        self.button_zoom(BUTTON_ZOOM_IN);
    }

    pub fn zoom_out(&mut self) {
        self.button_zoom(BUTTON_ZOOM_OUT);
    }

    fn button_zoom(&mut self, factor: f64) {
        if self.controller.is_locked() {
            return;
        }
        let c = self.stage.center();
        self.viewport.zoom_around(factor, c.x, c.y);
    }

    /// Re-fit while aligning; always clears the signature ink
    pub fn reset_view(&mut self) {
        if !self.controller.is_locked() {
            self.fit_document();
        }
        if let Some(capture) = self.capture.as_mut() {
            capture.clear();
        }
    }

    pub fn set_pen(&mut self, pen: PenWidth) {
        self.pen = pen;
        if let Some(capture) = self.capture.as_mut() {
            capture.set_pen(pen);
        }
    }

    /// Freeze the viewport and open the signature pad
    pub fn lock(&mut self) -> Result<()> {
        if self.document.is_none() {
            return Err(EngineError::DocumentNotReady);
        }
        if self.controller.is_locked() {
            log::debug!("signature pad already enabled");
            return Ok(());
        }

        let capture =
            SignatureCapture::new(self.stage.signature_region, self.device_pixel_ratio, self.pen)?;
        self.controller.lock();
        self.viewport_at_lock = Some(self.viewport);
        self.capture = Some(capture);
        log::info!("document locked at scale {:.4}", self.viewport.scale());
        Ok(())
    }

    /// Compose the export from the current strokes and the viewport frozen at
    /// lock time. Calling it again recomputes from the same snapshot.
    pub fn build_preview(&mut self) -> Result<&Composition> {
        let document = self.document.as_ref().ok_or(EngineError::DocumentNotReady)?;
        let (Some(capture), Some(viewport)) = (self.capture.as_ref(), self.viewport_at_lock.as_ref())
        else {
            return Err(EngineError::NotSigning);
        };

        let overlay = capture.render()?;
        let composition = compositor::compose(
            Some(document),
            &overlay,
            viewport,
            &capture.region(),
            EXPORT_SCALE,
        )?;

        self.step = Step::Preview;
        Ok(self.composition.insert(composition))
    }

    pub fn back_to_sign(&mut self) {
        self.step = Step::Align;
    }

    /// JSON body for `POST /save-doc`
    pub fn save_payload(&self) -> Result<SavePayload> {
        let composition = self.composition.as_ref().ok_or(EngineError::NothingToSave)?;
        let details = self
            .details
            .as_ref()
            .ok_or_else(|| EngineError::InvalidCustomerId(String::new()))?;

        Ok(SavePayload {
            customer_id: details.customer_id.clone(),
            terms: details.joined_terms(),
            image_data: composition.to_data_url(),
            original_uploaded_filename: self.uploaded_pdf_filename.clone(),
        })
    }

    /// Start over with a new document for the same customer
    pub fn retake(&mut self) {
        let details = self.details.take();
        let (stage, pen) = (self.stage, self.pen);
        *self = Self::new(stage.width, self.device_pixel_ratio);
        self.stage = StageLayout::with_size(stage.width, stage.height);
        self.details = details;
        self.pen = pen;
    }

    fn fit_document(&mut self) {
        let Some(doc) = self.document.as_ref() else {
            return;
        };
        if let Err(e) = self.viewport.fit_to_stage(
            doc.natural_width() as f64,
            doc.natural_height() as f64,
            self.stage.width,
            self.stage.height,
        ) {
            log::warn!("fit to stage failed: {}", e);
        }
    }
}

/// Pure form of [`SigningSession::handle_event`]
pub fn apply_gesture(mut session: SigningSession, event: PointerEvent) -> SigningSession {
    session.handle_event(event);
    session
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;
    use crate::gesture::PointerKind;
    use image::{Rgba, RgbaImage};
    use std::io::Cursor;

    fn png(w: u32, h: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(w, h, Rgba([250, 250, 250, 255]));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn ready_session() -> SigningSession {
        let mut s = SigningSession::new(800.0, 1.0);
        s.submit_details("123", &["PAN".into(), "Peri".into()], "").unwrap();
        s.load_document(&png(100, 140), Some("123-PAN-Peri-stamp.pdf".into()))
            .unwrap();
        s
    }

    fn touch_down(id: i32, p: Point) -> PointerEvent {
        PointerEvent::Down {
            id,
            position: p,
            kind: PointerKind::Touch,
            button: 0,
        }
    }

    #[test]
    fn test_customer_details_validation() {
        assert!(CustomerDetails::new("12345678", &[], "").is_ok());
        assert!(CustomerDetails::new("", &[], "").is_err());
        assert!(CustomerDetails::new("123456789", &[], "").is_err());
        assert!(CustomerDetails::new("12a", &[], "").is_err());

        let d = CustomerDetails::new(" 42 ", &["PAN".into(), "FI".into()], " extra ").unwrap();
        assert_eq!(d.customer_id, "42");
        assert_eq!(d.joined_terms(), "PAN-FI-extra");

        let d = CustomerDetails::new("42", &["PAN".into()], "PAN").unwrap();
        assert_eq!(d.terms, vec!["PAN".to_string()]);
    }

    #[test]
    fn test_load_fits_document() {
        let s = ready_session();
        assert_eq!(s.step(), Step::Align);
        assert!((s.viewport().scale() - 512.0 / 140.0).abs() < 1e-9);
    }

    #[test]
    fn test_failed_load_leaves_viewport() {
        let mut s = ready_session();
        s.zoom_in();
        let before = *s.viewport();
        assert!(s.load_document(b"nope", None).is_err());
        assert_eq!(*s.viewport(), before);
        assert!(s.document().is_some());
    }

    #[test]
    fn test_lock_requires_document() {
        let mut s = SigningSession::new(800.0, 1.0);
        assert!(matches!(s.lock(), Err(EngineError::DocumentNotReady)));
        assert!(matches!(s.build_preview(), Err(EngineError::DocumentNotReady)));
    }

    #[test]
    fn test_viewport_frozen_after_lock() {
        let mut s = ready_session();
        s.handle_event(touch_down(1, Point::new(10.0, 10.0)));
        s.handle_event(PointerEvent::Move {
            id: 1,
            position: Point::new(30.0, 10.0),
        });
        s.handle_event(PointerEvent::Up { id: 1 });
        s.lock().unwrap();
        let frozen = *s.viewport();

        s.zoom_in();
        s.zoom_out();
        s.reset_view();
        s.resize(1024.0);
        s.handle_event(PointerEvent::Wheel {
            delta_y: -1.0,
            position: Point::new(5.0, 5.0),
        });
        assert_eq!(*s.viewport(), frozen);
        assert_eq!(s.mode(), Mode::Signing);
    }

    #[test]
    fn test_sign_preview_and_payload() {
        let mut s = ready_session();
        s.lock().unwrap();

        let r = s.stage().signature_region;
        let session = apply_gesture(s, touch_down(1, Point::new(r.x + 20.0, r.y + 20.0)));
        let session = apply_gesture(
            session,
            PointerEvent::Move {
                id: 1,
                position: Point::new(r.x + 200.0, r.y + 60.0),
            },
        );
        let mut s = apply_gesture(session, PointerEvent::Up { id: 1 });
        assert!(s.view_state().has_signature);

        let (w, h, placement) = {
            let c = s.build_preview().unwrap();
            (c.width, c.height, c.placement)
        };
        assert_eq!((w, h), (300, 420));
        assert_eq!(s.step(), Step::Preview);

        // Recomputing from the same snapshot gives the same geometry
        assert_eq!(s.build_preview().unwrap().placement, placement);

        let payload = s.save_payload().unwrap();
        assert_eq!(payload.customer_id, "123");
        assert_eq!(payload.terms, "PAN-Peri");
        assert!(payload.image_data.starts_with("data:image/jpeg;base64,"));
        assert_eq!(
            payload.original_uploaded_filename.as_deref(),
            Some("123-PAN-Peri-stamp.pdf")
        );
    }

    #[test]
    fn test_preview_needs_lock() {
        let mut s = ready_session();
        assert!(matches!(s.build_preview(), Err(EngineError::NotSigning)));
        assert!(matches!(s.save_payload(), Err(EngineError::NothingToSave)));
    }

    #[test]
    fn test_retake_keeps_customer_only() {
        let mut s = ready_session();
        s.set_pen(PenWidth::Thick);
        s.lock().unwrap();
        s.retake();

        assert_eq!(s.step(), Step::Details);
        assert_eq!(s.mode(), Mode::Aligning);
        assert!(s.document().is_none());
        assert!(s.capture().is_none());
        assert!(s.uploaded_pdf_filename().is_none());
        assert_eq!(s.details().unwrap().customer_id, "123");
        assert_eq!(s.view_state().pen, PenWidth::Thick);
    }

    #[test]
    fn test_resize_while_signing_keeps_pad() {
        let mut s = ready_session();
        s.lock().unwrap();
        let frozen = s.stage().signature_region;

        s.resize(1024.0);
        assert_eq!(s.stage().width, 1024.0);
        assert_eq!(s.view_state().stage.signature_region, frozen);

        // Inside the region a fresh 1024px layout would use, below the pad
        let fresh = StageLayout::from_host_width(1024.0).signature_region;
        let outside = Point::new(fresh.x + 100.0, fresh.y + fresh.height - 20.0);
        assert!(fresh.contains(outside) && !frozen.contains(outside));
        assert_eq!(s.handle_event(touch_down(1, outside)), GestureAction::Idle);

        // Ink inside the pad is kept and lands on the overlay
        let inside = Point::new(frozen.x + 20.0, frozen.y + 20.0);
        s.handle_event(touch_down(2, inside));
        s.handle_event(PointerEvent::Move {
            id: 2,
            position: Point::new(inside.x + 150.0, inside.y + 40.0),
        });
        s.handle_event(PointerEvent::Up { id: 2 });
        assert!(s.view_state().has_signature);

        let overlay = s.capture().unwrap().render().unwrap();
        assert!(overlay.pixels().any(|p| p.0[3] > 0));
    }

    #[test]
    fn test_retake_restores_live_pad() {
        let mut s = ready_session();
        s.lock().unwrap();
        s.resize(1024.0);
        s.retake();
        assert_eq!(
            s.stage().signature_region,
            StageLayout::from_host_width(1024.0).signature_region
        );
    }
}
