//! Poppler `pdftoppm` converters
//!
//! Two stages share one invocation: a binary bundled under the app root, and
//! one resolved from `PATH` (only consulted when nothing is bundled).

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;

use super::converter::Converter;
use super::types::{ConversionJob, ConvertError};

/// Render resolution passed to `-r`
pub const PDFTOPPM_DPI: u32 = 300;

fn binary_name() -> &'static str {
    if cfg!(windows) {
        "pdftoppm.exe"
    } else {
        "pdftoppm"
    }
}

/// Places a bundled binary may live, in lookup order
pub fn local_candidates(app_root: &Path) -> Vec<PathBuf> {
    let exe = binary_name();
    vec![
        app_root.join("bin").join(exe),
        app_root.join("poppler").join("bin").join(exe),
        app_root.join("poppler").join(exe),
        app_root.join(exe),
    ]
}

/// First bundled binary that exists
pub fn find_local_binary(app_root: &Path) -> Option<PathBuf> {
    local_candidates(app_root).into_iter().find(|p| p.is_file())
}

/// Ask `which` (or `where` on Windows) for `pdftoppm`
pub async fn resolve_on_path() -> Option<PathBuf> {
    let lookup = if cfg!(windows) { "where" } else { "which" };
    let output = Command::new(lookup)
        .arg("pdftoppm")
        .kill_on_drop(true)
        .output()
        .await
        .ok()?;
    if !output.status.success() {
        return None;
    }
    first_line(&String::from_utf8_lossy(&output.stdout)).map(PathBuf::from)
}

fn first_line(stdout: &str) -> Option<&str> {
    stdout.lines().next().map(str::trim).filter(|l| !l.is_empty())
}

/// `-r 300 -jpeg -singlefile -f 1 -l 1 <pdf> <out_dir>/<base>`
pub fn pdftoppm_args(job: &ConversionJob) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["-r".into(), PDFTOPPM_DPI.to_string().into()];
    args.extend(
        ["-jpeg", "-singlefile", "-f", "1", "-l", "1"]
            .into_iter()
            .map(OsString::from),
    );
    args.push(job.pdf_path.clone().into_os_string());
    args.push(job.out_prefix().into_os_string());
    args
}

async fn run_pdftoppm(
    converter: &'static str,
    binary: &Path,
    job: &ConversionJob,
) -> Result<PathBuf, ConvertError> {
    tracing::debug!(converter, binary = %binary.display(), pdf = %job.pdf_path.display(), "Running pdftoppm");

    let output = Command::new(binary)
        .args(pdftoppm_args(job))
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| ConvertError::Failed {
            converter,
            reason: format!("spawn {}: {}", binary.display(), e),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ConvertError::Failed {
            converter,
            reason: format!("{}: {}", output.status, stderr.trim().chars().take(300).collect::<String>()),
        });
    }

    job.discover_output(converter).await
}

/// Binary bundled next to the server
pub struct LocalPdftoppm {
    app_root: PathBuf,
}

impl LocalPdftoppm {
    pub fn new(app_root: impl Into<PathBuf>) -> Self {
        Self {
            app_root: app_root.into(),
        }
    }
}

#[async_trait]
impl Converter for LocalPdftoppm {
    fn name(&self) -> &'static str {
        "local pdftoppm"
    }

    async fn attempt_convert(&self, job: &ConversionJob) -> Result<PathBuf, ConvertError> {
        let binary = find_local_binary(&self.app_root).ok_or_else(|| ConvertError::Unavailable {
            converter: self.name(),
            reason: format!("no bundled binary under {}", self.app_root.display()),
        })?;
        tracing::info!(binary = %binary.display(), "Found bundled pdftoppm");
        run_pdftoppm(self.name(), &binary, job).await
    }
}

/// Binary resolved from `PATH`
pub struct PathPdftoppm {
    app_root: PathBuf,
}

impl PathPdftoppm {
    pub fn new(app_root: impl Into<PathBuf>) -> Self {
        Self {
            app_root: app_root.into(),
        }
    }
}

#[async_trait]
impl Converter for PathPdftoppm {
    fn name(&self) -> &'static str {
        "PATH pdftoppm"
    }

    async fn attempt_convert(&self, job: &ConversionJob) -> Result<PathBuf, ConvertError> {
        if let Some(bundled) = find_local_binary(&self.app_root) {
            return Err(ConvertError::Unavailable {
                converter: self.name(),
                reason: format!("bundled binary {} takes precedence", bundled.display()),
            });
        }
        let binary = resolve_on_path().await.ok_or_else(|| ConvertError::Unavailable {
            converter: self.name(),
            reason: "pdftoppm not found in PATH".to_string(),
        })?;
        run_pdftoppm(self.name(), &binary, job).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_order() {
        let root = Path::new("/app");
        let candidates = local_candidates(root);
        assert_eq!(candidates.len(), 4);
        assert!(candidates[0].starts_with("/app/bin"));
        assert!(candidates[1].starts_with("/app/poppler/bin"));
        assert_eq!(candidates[3].parent(), Some(root));
    }

    #[test]
    fn test_args() {
        let job = ConversionJob::new("/u/1/doc.pdf", "/u/1", "doc");
        let args: Vec<String> = pdftoppm_args(&job)
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            vec!["-r", "300", "-jpeg", "-singlefile", "-f", "1", "-l", "1", "/u/1/doc.pdf", "/u/1/doc"]
        );
    }

    #[test]
    fn test_first_line() {
        assert_eq!(first_line("/usr/bin/pdftoppm\n"), Some("/usr/bin/pdftoppm"));
        assert_eq!(first_line("C:\\p\\pdftoppm.exe\r\nC:\\q\\pdftoppm.exe\r\n"), Some("C:\\p\\pdftoppm.exe"));
        assert_eq!(first_line("\n"), None);
        assert_eq!(first_line(""), None);
    }

    #[tokio::test]
    async fn test_local_unavailable_without_binary() {
        let root = tempfile::TempDir::new().unwrap();
        let job = ConversionJob::new(root.path().join("a.pdf"), root.path(), "a");
        let result = LocalPdftoppm::new(root.path()).attempt_convert(&job).await;
        assert!(matches!(result, Err(ConvertError::Unavailable { .. })));
    }

    #[tokio::test]
    async fn test_path_stage_skipped_when_bundled() {
        let root = tempfile::TempDir::new().unwrap();
        std::fs::create_dir(root.path().join("bin")).unwrap();
        std::fs::write(root.path().join("bin").join(binary_name()), b"").unwrap();
        assert!(find_local_binary(root.path()).is_some());

        let job = ConversionJob::new(root.path().join("a.pdf"), root.path(), "a");
        let result = PathPdftoppm::new(root.path()).attempt_convert(&job).await;
        assert!(matches!(result, Err(ConvertError::Unavailable { .. })));
    }
}
