//! Domain types shared by the ingestion, index and query paths.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

pub const UNKNOWN_SOURCE: &str = "unknown";

fn default_source() -> String {
    UNKNOWN_SOURCE.to_string()
}

/// Provenance attached to every [`Chunk`].
///
/// Well-known keys are typed fields; anything else a loader or caller wants
/// to carry along goes into `extra` and is flattened next to them when
/// serialized, so the on-disk form is a single flat JSON object.
///
/// - `source`: path of the originating file (`"unknown"` when absent)
/// - `file_name`: basename of `source`
/// - `page_number`/`total_pages`: 1-based page position for paged formats
/// - `title`: document title for HTML
/// - `chunk_index`/`chunk_id`: position within the parent, set by the chunker
/// - `rerank_score`: cross-encoder score, set by the reranker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    #[serde(default = "default_source")]
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_pages: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rerank_score: Option<f32>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Default for ChunkMetadata {
    fn default() -> Self {
        Self {
            source: default_source(),
            file_name: None,
            page_number: None,
            total_pages: None,
            title: None,
            chunk_index: None,
            chunk_id: None,
            rerank_score: None,
            extra: BTreeMap::new(),
        }
    }
}

impl ChunkMetadata {
    pub fn new(source: impl Into<String>) -> Self {
        Self { source: source.into(), ..Self::default() }
    }

    /// Metadata for a file on disk: `source` is the path as given and
    /// `file_name` its basename.
    pub fn for_file(path: &Path) -> Self {
        let file_name = path.file_name().map(|n| n.to_string_lossy().into_owned());
        Self { source: path.to_string_lossy().into_owned(), file_name, ..Self::default() }
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Basename of `source`, used for file-scoped filtering.
    pub fn source_basename(&self) -> &str {
        Path::new(&self.source)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&self.source)
    }

    /// Names of every key that currently carries a value.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys = vec!["source"];
        let typed = [
            ("file_name", self.file_name.is_some()),
            ("page_number", self.page_number.is_some()),
            ("total_pages", self.total_pages.is_some()),
            ("title", self.title.is_some()),
            ("chunk_index", self.chunk_index.is_some()),
            ("chunk_id", self.chunk_id.is_some()),
            ("rerank_score", self.rerank_score.is_some()),
        ];
        keys.extend(typed.iter().filter(|(_, present)| *present).map(|(k, _)| *k));
        keys.extend(self.extra.keys().map(String::as_str));
        keys
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.keys().contains(&key)
    }
}

/// A bounded unit of document text with its provenance; the atomic unit of
/// indexing and retrieval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub content: String,
    #[serde(default)]
    pub metadata: ChunkMetadata,
}

impl Chunk {
    pub fn new(content: impl Into<String>, metadata: ChunkMetadata) -> Self {
        Self { content: content.into(), metadata }
    }

    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }
}

/// A chunk returned by a vector search together with its similarity.
///
/// `score` is the inner product with the query; higher is always better.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub chunk: Chunk,
    pub score: f32,
}
