//! Post-save cleanup
//!
//! Once a final composition is on disk, the uploaded PDF and every preview
//! or intermediate raster sharing its base name are removed. Each deletion
//! stands alone; failures are logged and never reach the caller.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// What a cleanup pass did
#[derive(Debug, Default, Clone)]
pub struct CleanupReport {
    pub removed: Vec<PathBuf>,
    pub failed: Vec<PathBuf>,
}

/// Removes leftovers inside one customer directory
#[derive(Debug, Clone)]
pub struct CleanupManager {
    dir: PathBuf,
}

impl CleanupManager {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Delete one file, logging the outcome. Missing files count as done.
    pub async fn remove_file(&self, path: &Path, report: &mut CleanupReport) {
        match tokio::fs::remove_file(path).await {
            Ok(()) => {
                tracing::info!(path = %path.display(), "Removed leftover file");
                report.removed.push(path.to_path_buf());
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Cleanup failed");
                report.failed.push(path.to_path_buf());
            }
        }
    }

    /// Remove the uploaded file and `<base>*.jpg` leftovers, never `keep`.
    ///
    /// `uploaded_filename` comes from the client; only its final component
    /// is used, so it cannot reach outside this directory.
    pub async fn after_save(&self, uploaded_filename: &str, keep: &Path) -> CleanupReport {
        let mut report = CleanupReport::default();

        let Some(name) = Path::new(uploaded_filename)
            .file_name()
            .and_then(|n| n.to_str())
            .filter(|n| !n.is_empty())
        else {
            return report;
        };
        let keep_name = keep.file_name();

        if keep_name != Some(OsStr::new(name)) {
            self.remove_file(&self.dir.join(name), &mut report).await;
        }

        let base = Path::new(name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default();
        // An empty base would match every raster in the directory
        if base.is_empty() {
            return report;
        }

        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(dir = %self.dir.display(), error = %e, "Cleanup could not list directory");
                return report;
            }
        };

        let mut leftovers = Vec::new();
        loop {
            match entries.next_entry().await {
                Ok(Some(entry)) => {
                    let file_name = entry.file_name();
                    let Some(entry_name) = file_name.to_str() else {
                        continue;
                    };
                    if !entry_name.starts_with(base) || !entry_name.to_ascii_lowercase().ends_with(".jpg") {
                        continue;
                    }
                    if keep_name == Some(file_name.as_os_str()) {
                        continue;
                    }
                    leftovers.push(entry.path());
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(dir = %self.dir.display(), error = %e, "Cleanup listing interrupted");
                    break;
                }
            }
        }

        for path in leftovers {
            self.remove_file(&path, &mut report).await;
        }
        report
    }
}
