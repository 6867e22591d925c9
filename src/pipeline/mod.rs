//! Batch pipelines over one directory.

pub mod attach;
pub mod rewrite;

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use walkdir::WalkDir;

pub use attach::{attach_directory, AttachOptions, GroupOutcome};
pub use rewrite::{rewrite_directory, RewriteOptions, RewriteOutcome};

/// How one file or group ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemStatus {
    Changed,
    Unchanged,
    Skipped,
    Failed,
}

/// Counts printed at the end of a run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub processed: usize,
    pub changed: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl RunSummary {
    pub fn record(&mut self, status: ItemStatus) {
        self.processed += 1;
        match status {
            ItemStatus::Changed => self.changed += 1,
            ItemStatus::Unchanged => self.unchanged += 1,
            ItemStatus::Skipped => self.skipped += 1,
            ItemStatus::Failed => self.failed += 1,
        }
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} processed: {} changed, {} unchanged, {} skipped, {} failed",
            self.processed, self.changed, self.unchanged, self.skipped, self.failed
        )
    }
}

/// Lists the regular files directly inside `dir` that satisfy `keep`, sorted by name.
pub fn list_files<F>(dir: &Path, keep: F) -> io::Result<Vec<PathBuf>>
where
    F: Fn(&Path) -> bool,
{
    let mut files = Vec::new();

    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(io::Error::from)?;
        if entry.file_type().is_file() && keep(entry.path()) {
            files.push(entry.into_path());
        }
    }

    Ok(files)
}

/// Returns true if `path` has the extension `ext`, ignoring case.
pub fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case(ext))
        .unwrap_or(false)
}

/// Final path component for status lines.
pub(crate) fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
