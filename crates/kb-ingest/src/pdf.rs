use anyhow::{anyhow, Result};
use std::path::Path;
use tracing::debug;

use kb_core::types::{Chunk, ChunkMetadata};

use crate::ensure_exists;

/// One chunk per non-blank page, whitespace collapsed to single spaces.
pub fn load_pdf(path: &Path) -> Result<Vec<Chunk>> {
    ensure_exists(path)?;
    // pdf-extract panics on some malformed inputs; treat that as a load error.
    let pages = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| pdf_extract::extract_text_by_pages(path)))
        .map_err(|payload| {
            let msg = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            anyhow!("PDF parser panicked on {}: {}", path.display(), msg)
        })?
        .map_err(|e| anyhow!("Failed to extract text from {}: {}", path.display(), e))?;

    let chunks = pages_to_chunks(path, &pages);
    debug!(file = %path.display(), pages = pages.len(), kept = chunks.len(), "loaded pdf");
    Ok(chunks)
}

pub fn pages_to_chunks(path: &Path, pages: &[String]) -> Vec<Chunk> {
    let total_pages = u32::try_from(pages.len()).unwrap_or(u32::MAX);
    pages
        .iter()
        .enumerate()
        .filter_map(|(i, text)| {
            let cleaned = text.split_whitespace().collect::<Vec<_>>().join(" ");
            if cleaned.is_empty() {
                return None;
            }
            let mut metadata = ChunkMetadata::for_file(path);
            metadata.page_number = Some(u32::try_from(i + 1).unwrap_or(u32::MAX));
            metadata.total_pages = Some(total_pages);
            Some(Chunk::new(cleaned, metadata))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_pages_are_skipped_but_numbering_is_kept() {
        let pages = vec![
            "  First   page\ntext ".to_string(),
            " \n\t ".to_string(),
            "Third page".to_string(),
        ];
        let chunks = pages_to_chunks(Path::new("/docs/manual.pdf"), &pages);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].content, "First page text");
        assert_eq!(chunks[0].metadata.page_number, Some(1));
        assert_eq!(chunks[1].metadata.page_number, Some(3));
        assert_eq!(chunks[1].metadata.total_pages, Some(3));
        assert_eq!(chunks[1].metadata.file_name.as_deref(), Some("manual.pdf"));
        assert_eq!(chunks[1].metadata.source, "/docs/manual.pdf");
    }
}
