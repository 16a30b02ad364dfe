use anyhow::Result;
use std::collections::HashSet;
use tracing::{debug, info};

use kb_core::config::RetrievalSettings;
use kb_core::traits::{Embedder, VectorSearch};
use kb_core::types::Chunk;

use crate::reranker::Reranker;

/// Candidates fetched per requested result when a file filter is active;
/// the index cannot filter, so matches are picked out after recall.
pub const FILTER_OVERFETCH_FACTOR: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalParams {
    /// Recall depth.
    pub top_k: usize,
    /// Final result count.
    pub top_n: usize,
    pub use_rerank: bool,
    /// Accepted source basenames. `Some` of an empty set matches nothing.
    pub file_filters: Option<HashSet<String>>,
}

impl Default for RetrievalParams {
    fn default() -> Self {
        Self { top_k: 10, top_n: 3, use_rerank: true, file_filters: None }
    }
}

impl From<&RetrievalSettings> for RetrievalParams {
    fn from(s: &RetrievalSettings) -> Self {
        Self { top_k: s.top_k, top_n: s.top_n, ..Self::default() }
    }
}

impl RetrievalParams {
    pub fn with_files<I, S>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.file_filters = Some(files.into_iter().map(Into::into).collect());
        self
    }
}

/// Query embedding, vector recall, optional file filter, optional rerank.
pub struct Retriever<V: VectorSearch> {
    embedder: Box<dyn Embedder>,
    index: V,
    reranker: Option<Reranker>,
}

impl<V: VectorSearch> Retriever<V> {
    pub fn new(embedder: Box<dyn Embedder>, index: V, reranker: Option<Reranker>) -> Self {
        Self { embedder, index, reranker }
    }

    pub fn index(&self) -> &V {
        &self.index
    }

    pub fn has_reranker(&self) -> bool {
        self.reranker.is_some()
    }

    pub fn retrieve(&self, query: &str, params: &RetrievalParams) -> Result<Vec<Chunk>> {
        let search_k = match params.file_filters {
            Some(_) => params.top_k.saturating_mul(FILTER_OVERFETCH_FACTOR),
            None => params.top_k,
        };

        let query_vec = self.embedder.embed_query(query)?;
        let mut candidates = self.index.search(&query_vec, search_k)?;
        debug!(search_k, recalled = candidates.len(), "vector recall");

        if let Some(files) = &params.file_filters {
            candidates.retain(|c| files.contains(c.metadata.source_basename()));
            candidates.truncate(params.top_k);
            debug!(kept = candidates.len(), filters = files.len(), "applied file filter");
        }

        let reranker = match &self.reranker {
            Some(r) if params.use_rerank && !candidates.is_empty() => r,
            _ => {
                candidates.truncate(params.top_n);
                return Ok(candidates);
            }
        };

        let results = reranker.rerank(query, candidates, params.top_n)?;
        info!(results = results.len(), "retrieved with rerank");
        Ok(results)
    }
}
