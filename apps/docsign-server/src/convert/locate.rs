//! Output discovery
//!
//! External converters append suffixes we don't control (`-1`, `-01`, none
//! with `-singlefile`), so their output is found by scanning the directory
//! for the newest file matching a prefix and extension.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// A file that matched the prefix/extension filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub name: String,
    pub modified: SystemTime,
}

/// `name` starts with `prefix` and ends with `.ext` (extension case-insensitive)
pub fn matches(name: &str, prefix: &str, ext: &str) -> bool {
    if !name.starts_with(prefix) {
        return false;
    }
    let suffix = format!(".{}", ext.to_ascii_lowercase());
    name.to_ascii_lowercase().ends_with(&suffix)
}

/// Most recently modified candidate; ties go to the lexicographically smallest name
pub fn pick_newest(candidates: impl IntoIterator<Item = Candidate>) -> Option<Candidate> {
    candidates.into_iter().min_by(|a, b| match b.modified.cmp(&a.modified) {
        Ordering::Equal => a.name.cmp(&b.name),
        other => other,
    })
}

/// Regular files in `dir` matching `prefix` / `.ext`
pub async fn scan_matches(dir: &Path, prefix: &str, ext: &str) -> std::io::Result<Vec<Candidate>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut found = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        if !matches(&name, prefix, ext) {
            continue;
        }
        let metadata = entry.metadata().await?;
        if !metadata.is_file() {
            continue;
        }
        found.push(Candidate {
            name,
            modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
        });
    }

    Ok(found)
}

/// Newest file in `dir` named `<prefix>*.<ext>`, if any. Names in `skip`
/// never match.
pub async fn locate_newest_match(
    dir: &Path,
    prefix: &str,
    ext: &str,
    skip: &[&str],
) -> std::io::Result<Option<PathBuf>> {
    let mut candidates = scan_matches(dir, prefix, ext).await?;
    candidates.retain(|c| !skip.contains(&c.name.as_str()));
    Ok(pick_newest(candidates).map(|c| dir.join(c.name)))
}

/// Sorted file names in `dir`, for failure diagnostics
pub async fn list_dir(dir: &Path) -> Vec<String> {
    let mut names = Vec::new();
    if let Ok(mut entries) = tokio::fs::read_dir(dir).await {
        while let Ok(Some(entry)) = entries.next_entry().await {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    names
}
