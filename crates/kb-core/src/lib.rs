#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

pub mod chunker;
pub mod config;
pub mod error;
pub mod logging;
pub mod tokens;
pub mod traits;
pub mod types;

pub use chunker::{Chunker, ChunkerConfig};
pub use error::{Error, Result};
pub use types::{Chunk, ChunkMetadata, SearchHit};
