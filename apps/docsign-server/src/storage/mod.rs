//! Upload directory storage: naming, staging and cleanup

use std::path::PathBuf;

mod cleanup;
pub mod naming;
mod uploads;

pub use cleanup::{CleanupManager, CleanupReport};
pub use naming::{
    customer_dir, make_filename, sanitize_customer_id, sanitize_terms, timestamp_now, web_path,
    web_path_for,
};
pub use uploads::{document_extension, photo_extension, stage_upload, StagedUpload, UploadMeta};

/// Storage-specific errors
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("failed to create {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}
