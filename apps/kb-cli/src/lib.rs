//! Shared start-up for the `kb-*` binaries.

use anyhow::Result;
use std::path::Path;
use tracing::debug;

use kb_core::config::{Config, Settings};
use kb_core::logging;
use kb_core::types::Chunk;

/// Load and validate configuration, anchor relative paths at the working
/// directory and install logging.
pub fn bootstrap() -> Result<Settings> {
    let config = Config::load().map_err(|e| {
        eprintln!("Error loading config: {e:#}");
        e
    })?;
    let mut settings = config.settings()?;
    settings.resolve_paths(&std::env::current_dir()?);
    logging::init(&settings.logging.level);
    debug!(index_dir = %settings.data.index_dir, model = %settings.llm.model, "configuration loaded");
    Ok(settings)
}

/// `file.pdf (Page 3, Chunk 1)` style location for display.
pub fn describe_location(chunk: &Chunk) -> String {
    let meta = &chunk.metadata;
    let name = meta.file_name.as_deref().unwrap_or_else(|| meta.source_basename());
    let mut parts = Vec::new();
    if let Some(page) = meta.page_number {
        parts.push(format!("Page {page}"));
    }
    if let Some(idx) = meta.chunk_index {
        parts.push(format!("Chunk {idx}"));
    }
    if parts.is_empty() {
        name.to_string()
    } else {
        format!("{name} ({})", parts.join(", "))
    }
}

/// At most `max_chars` characters, with an ellipsis when cut.
pub fn preview(text: &str, max_chars: usize) -> String {
    let trimmed = text.trim();
    match trimmed.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}

pub fn index_dir_or_default<'a>(flag: Option<&'a Path>, settings: &'a Settings) -> &'a Path {
    flag.unwrap_or_else(|| Path::new(&settings.data.index_dir))
}
