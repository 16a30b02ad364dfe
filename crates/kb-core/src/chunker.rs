//! Recursive, token-aware text splitting with overlap.
//!
//! Text is split on the coarsest separator it contains, oversized fragments
//! are split again with the finer separators that follow, and the resulting
//! fragments are greedily merged back into chunks of at most `chunk_size`
//! tokens. Consecutive chunks of the same parent share up to
//! `chunk_overlap` tokens of trailing fragments.

use std::collections::VecDeque;

use tracing::{debug, warn};

use crate::config::ChunkingSettings;
use crate::error::{Error, Result};
use crate::tokens::{HeuristicTokenCounter, TokenCounter};
use crate::types::{Chunk, UNKNOWN_SOURCE};

/// Paragraph break, line break, word break, then single characters.
pub const DEFAULT_SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

#[derive(Debug, Clone)]
pub struct ChunkerConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    /// Coarsest first. The empty string means character-level splitting.
    pub separators: Vec<String>,
    pub max_chunk_chars: Option<usize>,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            chunk_size: 800,
            chunk_overlap: 100,
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
            max_chunk_chars: None,
        }
    }
}

impl From<&ChunkingSettings> for ChunkerConfig {
    fn from(s: &ChunkingSettings) -> Self {
        Self {
            chunk_size: s.chunk_size,
            chunk_overlap: s.chunk_overlap,
            max_chunk_chars: s.max_chunk_chars,
            ..Self::default()
        }
    }
}

pub struct Chunker {
    config: ChunkerConfig,
    counter: Box<dyn TokenCounter>,
}

impl Chunker {
    pub fn new(config: ChunkerConfig, counter: Box<dyn TokenCounter>) -> Result<Self> {
        if config.chunk_size == 0 {
            return Err(Error::InvalidConfig("chunk_size must be positive".into()));
        }
        if config.chunk_overlap >= config.chunk_size {
            return Err(Error::InvalidConfig(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                config.chunk_overlap, config.chunk_size
            )));
        }
        if config.max_chunk_chars == Some(0) {
            return Err(Error::InvalidConfig("max_chunk_chars must be positive".into()));
        }
        Ok(Self { config, counter })
    }

    pub fn with_heuristic(config: ChunkerConfig) -> Result<Self> {
        Self::new(config, Box::new(HeuristicTokenCounter))
    }

    pub fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    fn len(&self, text: &str) -> usize {
        self.counter.count(text)
    }

    /// Split every document into child chunks. Children copy the parent's
    /// metadata and gain `chunk_index` (position among the emitted children)
    /// and `chunk_id`.
    pub fn split_documents(&self, documents: &[Chunk]) -> Vec<Chunk> {
        let mut chunked = Vec::new();
        for doc in documents {
            for (i, piece) in self.split_text(&doc.content).into_iter().enumerate() {
                let mut metadata = doc.metadata.clone();
                metadata.chunk_id = Some(format!(
                    "{}_{}_{}",
                    metadata.file_name.as_deref().unwrap_or(UNKNOWN_SOURCE),
                    metadata.page_number.unwrap_or(0),
                    i
                ));
                metadata.chunk_index = Some(i);
                chunked.push(Chunk::new(piece, metadata));
            }
        }
        debug!(documents = documents.len(), chunks = chunked.len(), "split documents");
        chunked
    }

    /// Split one text. Blank pieces never appear in the output.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        let pieces = if self.len(text) <= self.config.chunk_size {
            vec![text.to_string()]
        } else {
            self.recursive_split(text, &self.config.separators)
        };
        match self.config.max_chunk_chars {
            Some(limit) => pieces.into_iter().flat_map(|p| hard_split(p, limit)).collect(),
            None => pieces,
        }
    }

    fn recursive_split(&self, text: &str, separators: &[String]) -> Vec<String> {
        let (index, separator) = separators
            .iter()
            .enumerate()
            .find(|(_, sep)| sep.is_empty() || text.contains(sep.as_str()))
            .map(|(i, sep)| (i, sep.as_str()))
            .unwrap_or((separators.len(), ""));

        let splits: Vec<String> = if separator.is_empty() {
            text.chars().map(String::from).collect()
        } else {
            text.split(separator).map(str::to_string).collect()
        };

        let finer = separators.get(index + 1..).unwrap_or(&[]);
        let mut fragments = Vec::with_capacity(splits.len());
        for split in splits {
            if self.len(&split) <= self.config.chunk_size {
                fragments.push(split);
            } else if finer.is_empty() {
                warn!(
                    tokens = self.len(&split),
                    chunk_size = self.config.chunk_size,
                    "no finer separator left, keeping oversized fragment"
                );
                fragments.push(split);
            } else {
                fragments.extend(self.recursive_split(&split, finer));
            }
        }

        self.merge_splits(fragments, separator)
    }

    fn merge_splits(&self, splits: Vec<String>, separator: &str) -> Vec<String> {
        let chunk_size = self.config.chunk_size;
        let overlap = self.config.chunk_overlap;
        let separator_len = self.len(separator);

        let mut chunks = Vec::new();
        let mut current: VecDeque<(String, usize)> = VecDeque::new();
        let mut total = 0usize;

        for split in splits {
            let len = self.len(&split);
            let joint = |current: &VecDeque<(String, usize)>| if current.is_empty() { 0 } else { separator_len };

            if !current.is_empty() && total + len + joint(&current) > chunk_size {
                push_joined(&mut chunks, &current, separator);
                // Slide the window: keep at most `overlap` tokens, and no more
                // than still leaves room for the incoming fragment.
                while let Some((_, front_len)) = current.front() {
                    let overflows = total + len + separator_len > chunk_size;
                    if total <= overlap && !overflows {
                        break;
                    }
                    let front_len = *front_len;
                    current.pop_front();
                    total = total.saturating_sub(front_len + joint(&current));
                }
            }

            total += len + joint(&current);
            current.push_back((split, len));
        }

        push_joined(&mut chunks, &current, separator);
        chunks
    }
}

fn push_joined(chunks: &mut Vec<String>, current: &VecDeque<(String, usize)>, separator: &str) {
    if current.is_empty() {
        return;
    }
    let joined = current.iter().map(|(s, _)| s.as_str()).collect::<Vec<_>>().join(separator);
    if !joined.trim().is_empty() {
        chunks.push(joined);
    }
}

/// Cut `text` into pieces of at most `limit` characters on char boundaries,
/// dropping pieces that are pure whitespace.
fn hard_split(text: String, limit: usize) -> Vec<String> {
    if text.chars().count() <= limit {
        return vec![text];
    }
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(limit)
        .map(|c| c.iter().collect::<String>())
        .filter(|p| !p.trim().is_empty())
        .collect()
}
