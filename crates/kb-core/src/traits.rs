use crate::types::Chunk;

/// Converts text into fixed-dimension, L2-normalized vectors so that inner
/// product equals cosine similarity.
pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    fn max_len(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;

    fn embed_query(&self, query: &str) -> anyhow::Result<Vec<f32>> {
        self.embed_batch(&[query.to_string()])?
            .pop()
            .ok_or_else(|| anyhow::anyhow!("embedder returned no vector for query"))
    }
}

/// Nearest-neighbour recall by inner product, best match first.
pub trait VectorSearch {
    fn search(&self, query_vec: &[f32], k: usize) -> anyhow::Result<Vec<Chunk>>;
}

/// Scores each (query, passage) pair independently; one score per passage,
/// higher is more relevant.
pub trait PairScorer: Send + Sync {
    fn score(&self, query: &str, passages: &[&str]) -> anyhow::Result<Vec<f32>>;
}

/// An opaque text generator behind the answer engine.
pub trait Generator: Send + Sync {
    fn generate(&self, system_prompt: &str, prompt: &str) -> anyhow::Result<String>;
}
