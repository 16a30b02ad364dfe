use std::fs;
use std::path::{Path, PathBuf};

use kb_core::error::{Error, Result};
use kb_core::traits::VectorSearch;
use kb_core::types::{Chunk, SearchHit};
use tracing::{debug, info};

use crate::format::{self, INDEX_FILE, METADATA_FILE};

/// Exact inner-product index with the chunk list it was built from.
///
/// Row `i` of `vectors` always belongs to `chunks[i]`; [`VectorStore::add`]
/// is the only way in and appends to both or to neither.
#[derive(Debug)]
pub struct VectorStore {
    dir: PathBuf,
    dim: Option<usize>,
    vectors: Vec<f32>,
    chunks: Vec<Chunk>,
}

impl VectorStore {
    /// Open the index under `dir`, creating the directory if needed. Both
    /// artifacts present loads them, neither present starts empty, and only
    /// one of them is an error.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        let mut store = Self::empty(dir);
        store.load()?;
        Ok(store)
    }

    fn empty(dir: PathBuf) -> Self {
        Self { dir, dim: None, vectors: Vec::new(), chunks: Vec::new() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn index_path(&self) -> PathBuf {
        self.dir.join(INDEX_FILE)
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.dir.join(METADATA_FILE)
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Dimensionality, fixed by the first non-empty `add`.
    pub fn dim(&self) -> Option<usize> {
        self.dim
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Replace the in-memory state with what is on disk.
    pub fn load(&mut self) -> Result<()> {
        let index_path = self.index_path();
        let metadata_path = self.metadata_path();
        match (index_path.exists(), metadata_path.exists()) {
            (false, false) => {
                debug!(dir = %self.dir.display(), "no index on disk, starting empty");
                self.reset();
                return Ok(());
            }
            (true, false) => return Err(Error::PartialIndex { present: index_path, missing: metadata_path }),
            (false, true) => return Err(Error::PartialIndex { present: metadata_path, missing: index_path }),
            (true, true) => {}
        }

        let raw = format::decode_index(&fs::read(&index_path)?)?;
        let chunks = format::read_metadata(&metadata_path)?;
        if raw.count != chunks.len() {
            return Err(Error::CorruptIndex(format!(
                "{} vectors but {} chunks in {}",
                raw.count,
                chunks.len(),
                METADATA_FILE
            )));
        }

        self.dim = if raw.count == 0 { None } else { Some(raw.dim) };
        self.vectors = raw.vectors;
        self.chunks = chunks;
        info!(dir = %self.dir.display(), entries = self.chunks.len(), dim = raw.dim, "loaded index");
        Ok(())
    }

    /// Write both artifacts. The index file goes first; a crash in between
    /// leaves a pair that `load` rejects.
    pub fn save(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let index = format::encode_index(self.dim.unwrap_or(0), &self.vectors)?;
        format::write_atomic(&self.index_path(), &index)?;
        let metadata = serde_json::to_vec_pretty(&self.chunks)?;
        format::write_atomic(&self.metadata_path(), &metadata)?;
        info!(dir = %self.dir.display(), entries = self.chunks.len(), "saved index");
        Ok(())
    }

    /// Append positionally aligned chunks and vectors. Nothing is appended
    /// if any vector has the wrong width.
    pub fn add(&mut self, chunks: Vec<Chunk>, vectors: Vec<Vec<f32>>) -> Result<()> {
        if chunks.len() != vectors.len() {
            return Err(Error::Misaligned { chunks: chunks.len(), vectors: vectors.len() });
        }
        let Some(first) = vectors.first() else {
            return Ok(());
        };
        let dim = self.dim.unwrap_or(first.len());
        if dim == 0 {
            return Err(Error::Operation("cannot index zero-dimensional vectors".into()));
        }
        if let Some(bad) = vectors.iter().find(|v| v.len() != dim) {
            return Err(Error::DimensionMismatch { expected: dim, got: bad.len() });
        }

        self.dim = Some(dim);
        self.vectors.reserve(dim * vectors.len());
        for v in &vectors {
            self.vectors.extend_from_slice(v);
        }
        self.chunks.extend(chunks);
        debug!(added = vectors.len(), total = self.chunks.len(), "added vectors");
        Ok(())
    }

    /// Drop every entry. Disk is untouched until the next `save`.
    pub fn reset(&mut self) {
        self.dim = None;
        self.vectors.clear();
        self.chunks.clear();
    }

    /// The `k` best entries by inner product, best first. Ties keep
    /// insertion order.
    pub fn search_scored(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        let Some(dim) = self.dim else {
            return Ok(Vec::new());
        };
        if k == 0 || self.chunks.is_empty() {
            return Ok(Vec::new());
        }
        if query.len() != dim {
            return Err(Error::DimensionMismatch { expected: dim, got: query.len() });
        }

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .chunks_exact(dim)
            .map(|row| row.iter().zip(query).map(|(a, b)| a * b).sum::<f32>())
            .enumerate()
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(i, score)| SearchHit { chunk: self.chunks[i].clone(), score })
            .collect())
    }

    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Chunk>> {
        Ok(self.search_scored(query, k)?.into_iter().map(|hit| hit.chunk).collect())
    }
}

impl VectorSearch for VectorStore {
    fn search(&self, query_vec: &[f32], k: usize) -> anyhow::Result<Vec<Chunk>> {
        Ok(VectorStore::search(self, query_vec, k)?)
    }
}
