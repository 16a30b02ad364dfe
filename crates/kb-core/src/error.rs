use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Operation failed: {0}")]
    Operation(String),

    #[error("Vector dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Chunks and vectors are misaligned: {chunks} chunks vs {vectors} vectors")]
    Misaligned { chunks: usize, vectors: usize },

    #[error("Partial index: {} exists but {} is missing", present.display(), missing.display())]
    PartialIndex { present: PathBuf, missing: PathBuf },

    #[error("Corrupt index: {0}")]
    CorruptIndex(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
