use anyhow::{anyhow, Result};
use scraper::{ElementRef, Html, Selector};
use std::fs;
use std::path::Path;

use kb_core::types::{Chunk, ChunkMetadata};

use crate::ensure_exists;

const SKIPPED_ELEMENTS: [&str; 4] = ["script", "style", "nav", "footer"];
const NO_TITLE: &str = "No Title";

/// One chunk for the whole document, or none when it has no visible text.
pub fn load_html(path: &Path) -> Result<Vec<Chunk>> {
    ensure_exists(path)?;
    let raw = fs::read(path)?;
    let html = Html::parse_document(&String::from_utf8_lossy(&raw));

    let mut text = String::new();
    collect_text(html.root_element(), &mut text);
    let content = clean_text(&text);
    if content.is_empty() {
        return Ok(Vec::new());
    }

    let mut metadata = ChunkMetadata::for_file(path);
    metadata.title = Some(title(&html)?);
    Ok(vec![Chunk::new(content, metadata)])
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        if let Some(el) = ElementRef::wrap(child) {
            if !SKIPPED_ELEMENTS.contains(&el.value().name()) {
                collect_text(el, out);
            }
        } else if let Some(text) = child.value().as_text() {
            out.push_str(text);
            out.push('\n');
        }
    }
}

/// Trim every line, break lines further on double spaces, drop empties.
fn clean_text(text: &str) -> String {
    text.lines()
        .flat_map(|line| line.trim().split("  "))
        .map(str::trim)
        .filter(|phrase| !phrase.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn title(html: &Html) -> Result<String> {
    let selector = Selector::parse("title").map_err(|e| anyhow!("invalid selector: {e}"))?;
    let title = html
        .select(&selector)
        .next()
        .map(|t| t.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty());
    Ok(title.unwrap_or_else(|| NO_TITLE.to_string()))
}
