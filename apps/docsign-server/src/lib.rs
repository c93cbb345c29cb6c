//! DocSign Server
//!
//! Server half of the document signing flow:
//! - `/convert-pdf` rasterizes the first page of an uploaded PDF through an
//!   ordered chain of converters and normalizes it to a canonical preview
//! - `/save-doc` stores the final signed composition (or a raw upload)
//! - `/save-photo` stores field photos with a metadata sidecar
//! - `/uploads` serves everything above as static files

pub mod config;
pub mod convert;
pub mod error;
pub mod routes;
pub mod state;
pub mod storage;

pub use config::Config;
pub use error::{AppError, Result};
pub use state::AppState;
