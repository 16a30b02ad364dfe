//! Document loaders: one chunk per PDF page, one chunk per HTML file.

use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use kb_core::error::Error;
use kb_core::types::Chunk;

pub mod html;
pub mod pdf;

pub use html::load_html;
pub use pdf::load_pdf;

/// Outcome of loading a directory tree.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub chunks: Vec<Chunk>,
    /// Files that loaded, including those that produced no chunks.
    pub loaded: usize,
    /// Files with an unsupported extension.
    pub skipped: usize,
    pub failed: Vec<(PathBuf, String)>,
}

pub(crate) fn ensure_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(Error::NotFound(format!("File not found: {}", path.display())).into());
    }
    Ok(())
}

pub fn is_supported(path: &Path) -> bool {
    matches!(extension(path).as_deref(), Some("pdf" | "html" | "htm"))
}

fn extension(path: &Path) -> Option<String> {
    path.extension().map(|e| e.to_string_lossy().to_lowercase())
}

/// Load one file by extension. Unsupported files yield no chunks.
pub fn load_document(path: &Path) -> Result<Vec<Chunk>> {
    match extension(path).as_deref() {
        Some("pdf") => load_pdf(path),
        Some("html" | "htm") => load_html(path),
        _ => {
            debug!(file = %path.display(), "unsupported file type");
            Ok(Vec::new())
        }
    }
}

/// Load every supported file under `dir`, in path order. A file that fails
/// to load is recorded in [`LoadReport::failed`] and the walk continues.
pub fn load_directory(dir: &Path) -> Result<LoadReport> {
    if !dir.is_dir() {
        return Err(Error::NotFound(format!("Data directory not found: {}", dir.display())).into());
    }

    let mut report = LoadReport::default();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| dir.to_path_buf());
                warn!(file = %path.display(), error = %e, "cannot read directory entry");
                report.failed.push((path, e.to_string()));
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if !is_supported(path) {
            report.skipped += 1;
            continue;
        }
        match load_document(path) {
            Ok(chunks) => {
                debug!(file = %path.display(), chunks = chunks.len(), "loaded");
                report.loaded += 1;
                report.chunks.extend(chunks);
            }
            Err(e) => {
                warn!(file = %path.display(), error = %e, "failed to load document");
                report.failed.push((path.to_path_buf(), format!("{e:#}")));
            }
        }
    }

    info!(
        dir = %dir.display(),
        loaded = report.loaded,
        skipped = report.skipped,
        failed = report.failed.len(),
        chunks = report.chunks.len(),
        "loaded documents"
    );
    Ok(report)
}
