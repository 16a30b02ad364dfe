//! Persisted flat inner-product index over chunk embeddings.
//!
//! Vectors and their chunks live in one [`VectorStore`] so the two arrays
//! can only grow together; on disk they are the `index.bin` /
//! `metadata.json` pair under the index directory.

pub mod format;
pub mod store;

pub use format::{INDEX_FILE, METADATA_FILE};
pub use store::VectorStore;
