use anyhow::{ensure, Result};
use tracing::debug;

use kb_core::traits::PairScorer;
use kb_core::types::Chunk;

/// Second-stage precision ranking over a small candidate set.
pub struct Reranker {
    scorer: Box<dyn PairScorer>,
}

impl Reranker {
    pub fn new(scorer: Box<dyn PairScorer>) -> Self {
        Self { scorer }
    }

    /// The `top_n` best candidates by pair score, best first, each carrying
    /// its score in `rerank_score`. Equal scores keep their input order.
    pub fn rerank(&self, query: &str, candidates: Vec<Chunk>, top_n: usize) -> Result<Vec<Chunk>> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }
        let passages: Vec<&str> = candidates.iter().map(|c| c.content.as_str()).collect();
        let scores = self.scorer.score(query, &passages)?;
        ensure!(
            scores.len() == candidates.len(),
            "scorer returned {} scores for {} candidates",
            scores.len(),
            candidates.len()
        );

        let mut scored: Vec<(Chunk, f32)> = candidates.into_iter().zip(scores).collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(top_n);
        debug!(kept = scored.len(), best = scored.first().map(|(_, s)| *s), "reranked");

        Ok(scored
            .into_iter()
            .map(|(mut chunk, score)| {
                chunk.metadata.rerank_score = Some(score);
                chunk
            })
            .collect())
    }
}

/// Fraction of the query's words that occur in the passage, case-insensitive.
#[derive(Debug, Clone, Copy, Default)]
pub struct LexicalOverlapScorer;

impl PairScorer for LexicalOverlapScorer {
    fn score(&self, query: &str, passages: &[&str]) -> Result<Vec<f32>> {
        let query_words: Vec<String> = query.split_whitespace().map(str::to_lowercase).collect();
        if query_words.is_empty() {
            return Ok(vec![0.0; passages.len()]);
        }
        Ok(passages
            .iter()
            .map(|p| {
                let content = p.to_lowercase();
                let hits = query_words.iter().filter(|w| content.contains(w.as_str())).count();
                hits as f32 / query_words.len() as f32
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kb_core::types::ChunkMetadata;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct FixedScores {
        scores: Vec<f32>,
        calls: Arc<AtomicUsize>,
    }

    impl PairScorer for FixedScores {
        fn score(&self, _query: &str, passages: &[&str]) -> Result<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.scores[..passages.len()].to_vec())
        }
    }

    fn docs() -> Vec<Chunk> {
        ["A", "B", "C"]
            .iter()
            .map(|id| Chunk::new(format!("Doc {id}"), ChunkMetadata::default().with_extra("id", *id)))
            .collect()
    }

    fn id(chunk: &Chunk) -> &str {
        chunk.metadata.extra["id"].as_str().unwrap_or_default()
    }

    fn reranker(scores: Vec<f32>) -> (Reranker, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (Reranker::new(Box::new(FixedScores { scores, calls: calls.clone() })), calls)
    }

    #[test]
    fn orders_by_score_and_records_it() {
        let (r, _) = reranker(vec![0.1, 0.05, 0.9]);
        let out = r.rerank("fish", docs(), 2).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(id(&out[0]), "C");
        assert_eq!(out[0].metadata.rerank_score, Some(0.9));
        assert_eq!(id(&out[1]), "A");
        assert_eq!(out[1].metadata.rerank_score, Some(0.1));
    }

    #[test]
    fn ties_keep_input_order() {
        let (r, _) = reranker(vec![0.5, 0.7, 0.5]);
        let out = r.rerank("q", docs(), 10).unwrap();
        let ids: Vec<&str> = out.iter().map(id).collect();
        assert_eq!(ids, vec!["B", "A", "C"]);
    }

    #[test]
    fn empty_input_skips_the_scorer() {
        let (r, calls) = reranker(vec![]);
        assert!(r.rerank("q", Vec::new(), 3).unwrap().is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn score_count_must_match() {
        let (r, _) = reranker(vec![0.1, 0.2, 0.3]);
        struct Short;
        impl PairScorer for Short {
            fn score(&self, _: &str, _: &[&str]) -> Result<Vec<f32>> {
                Ok(vec![1.0])
            }
        }
        assert!(r.rerank("q", docs(), 3).is_ok());
        assert!(Reranker::new(Box::new(Short)).rerank("q", docs(), 3).is_err());
    }

    #[test]
    fn lexical_overlap_counts_query_words() {
        let scores = LexicalOverlapScorer
            .score("Water PUMP seal", &["replace the pump seal", "nothing relevant", "WATER pump SEAL kit"])
            .unwrap();
        assert!((scores[0] - 2.0 / 3.0).abs() < 1e-6);
        assert_eq!(scores[1], 0.0);
        assert_eq!(scores[2], 1.0);
        assert_eq!(LexicalOverlapScorer.score("  ", &["x"]).unwrap(), vec![0.0]);
    }
}
