use std::cell::Cell;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use tempfile::TempDir;

use kb_core::traits::{Embedder, Generator, PairScorer, VectorSearch};
use kb_core::types::{Chunk, ChunkMetadata};
use kb_embed::FakeEmbedder;
use kb_rag::{AnswerEngine, Reranker, RetrievalParams, Retriever, FILTER_OVERFETCH_FACTOR, NO_DOCUMENTS_ANSWER};
use kb_vector::VectorStore;

/// Returns its documents in fixed order and remembers the requested depth.
struct CannedIndex {
    docs: Vec<Chunk>,
    last_k: Cell<usize>,
}

impl CannedIndex {
    fn new(docs: Vec<Chunk>) -> Self {
        Self { docs, last_k: Cell::new(0) }
    }
}

impl VectorSearch for CannedIndex {
    fn search(&self, _query_vec: &[f32], k: usize) -> Result<Vec<Chunk>> {
        self.last_k.set(k);
        Ok(self.docs.iter().take(k).cloned().collect())
    }
}

struct FixedScores {
    scores: Vec<f32>,
    calls: Arc<AtomicUsize>,
}

impl PairScorer for FixedScores {
    fn score(&self, _query: &str, passages: &[&str]) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.scores.iter().copied().take(passages.len()).collect())
    }
}

struct RecordingGenerator {
    prompts: Arc<Mutex<Vec<String>>>,
    fail: bool,
}

impl Generator for RecordingGenerator {
    fn generate(&self, _system_prompt: &str, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if self.fail {
            Err(anyhow!("connection refused"))
        } else {
            Ok("The pump needs a new seal. [Source: manual.pdf, Page: 2]".to_string())
        }
    }
}

fn abc() -> Vec<Chunk> {
    [("A", "cats"), ("B", "dogs"), ("C", "fish")]
        .iter()
        .map(|(id, topic)| Chunk::new(format!("Doc {id}: About {topic}."), ChunkMetadata::new(format!("/data/{id}.pdf"))))
        .collect()
}

fn retriever_with(docs: Vec<Chunk>, scores: Vec<f32>) -> (Retriever<CannedIndex>, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let reranker = Reranker::new(Box::new(FixedScores { scores, calls: calls.clone() }));
    let embedder: Box<dyn Embedder> = Box::new(FakeEmbedder::new(16));
    (Retriever::new(embedder, CannedIndex::new(docs), Some(reranker)), calls)
}

fn contents(chunks: &[Chunk]) -> Vec<&str> {
    chunks.iter().map(|c| c.content.as_str()).collect()
}

#[test]
fn rerank_path_recalls_top_k_and_returns_top_n() {
    let (retriever, calls) = retriever_with(abc(), vec![0.1, 0.05, 0.9]);
    let params = RetrievalParams { top_k: 3, top_n: 1, ..RetrievalParams::default() };
    let results = retriever.retrieve("test", &params).unwrap();

    assert_eq!(retriever.index().last_k.get(), 3);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(contents(&results), vec!["Doc C: About fish."]);
    assert_eq!(results[0].metadata.rerank_score, Some(0.9));
}

#[test]
fn without_rerank_recall_order_is_kept() {
    let (retriever, calls) = retriever_with(abc(), vec![0.1, 0.05, 0.9]);
    let params = RetrievalParams { top_k: 3, top_n: 2, use_rerank: false, file_filters: None };
    let results = retriever.retrieve("test", &params).unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(contents(&results), vec!["Doc A: About cats.", "Doc B: About dogs."]);
    assert!(results.iter().all(|c| c.metadata.rerank_score.is_none()));
}

#[test]
fn file_filter_overfetches_and_keeps_only_members() {
    let docs: Vec<Chunk> = (0..30)
        .map(|i| Chunk::new(format!("chunk {i}"), ChunkMetadata::new(format!("/data/raw/file{}.pdf", i % 3))))
        .collect();
    let (retriever, _) = retriever_with(docs, vec![]);
    let params = RetrievalParams { top_k: 4, top_n: 4, use_rerank: false, file_filters: None }.with_files(["file1.pdf"]);
    let results = retriever.retrieve("anything", &params).unwrap();

    assert_eq!(retriever.index().last_k.get(), 4 * FILTER_OVERFETCH_FACTOR);
    assert_eq!(results.len(), 4);
    assert!(results.iter().all(|c| c.metadata.source_basename() == "file1.pdf"));
    assert_eq!(results[0].content, "chunk 1");
}

#[test]
fn empty_filter_set_matches_nothing_and_skips_generation() {
    let (retriever, calls) = retriever_with(abc(), vec![0.3, 0.2, 0.1]);
    let prompts = Arc::new(Mutex::new(Vec::new()));
    let engine = AnswerEngine::new(retriever, Box::new(RecordingGenerator { prompts: prompts.clone(), fail: false }));

    let params = RetrievalParams::default().with_files(Vec::<String>::new());
    let answer = engine.answer("anything?", &params).unwrap();

    assert_eq!(answer.text, NO_DOCUMENTS_ANSWER);
    assert!(answer.sources.is_empty());
    assert!(prompts.lock().unwrap().is_empty());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn answer_is_grounded_on_returned_sources() {
    let (retriever, _) = retriever_with(abc(), vec![0.1, 0.05, 0.9]);
    let prompts = Arc::new(Mutex::new(Vec::new()));
    let engine = AnswerEngine::new(retriever, Box::new(RecordingGenerator { prompts: prompts.clone(), fail: false }));

    let params = RetrievalParams { top_k: 3, top_n: 2, ..RetrievalParams::default() };
    let answer = engine.answer("Which doc is about fish?", &params).unwrap();

    assert!(answer.text.starts_with("The pump needs a new seal."));
    assert_eq!(contents(&answer.sources), vec!["Doc C: About fish.", "Doc A: About cats."]);
    let prompts = prompts.lock().unwrap();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("[Document 1] (Source: /data/C.pdf)\nDoc C: About fish."));
    assert!(prompts[0].ends_with("Query: Which doc is about fish?\n"));
}

#[test]
fn generator_failure_becomes_the_answer_text() {
    let (retriever, _) = retriever_with(abc(), vec![0.1, 0.05, 0.9]);
    let engine = AnswerEngine::new(
        retriever,
        Box::new(RecordingGenerator { prompts: Arc::new(Mutex::new(Vec::new())), fail: true }),
    );
    let answer = engine.answer("q", &RetrievalParams::default()).unwrap();
    assert_eq!(answer.text, "Error generating response: connection refused");
    assert_eq!(answer.sources.len(), 3);
}

#[test]
fn end_to_end_over_a_persisted_index() {
    let tmp = TempDir::new().unwrap();
    let embedder = FakeEmbedder::new(1024);
    let texts = [
        ("manual.pdf", "water pump seal replacement procedure"),
        ("baking.html", "banana bread recipe with walnuts"),
        ("car.pdf", "tire pressure check before long trips"),
    ];
    let chunks: Vec<Chunk> = texts
        .iter()
        .enumerate()
        .map(|(i, (file, text))| {
            let mut meta = ChunkMetadata::new(format!("/data/raw/{file}"));
            meta.chunk_index = Some(i);
            Chunk::new(*text, meta)
        })
        .collect();
    let vectors = embedder.embed_batch(&chunks.iter().map(|c| c.content.clone()).collect::<Vec<_>>()).unwrap();

    let mut store = VectorStore::open(tmp.path()).unwrap();
    store.add(chunks, vectors).unwrap();
    store.save().unwrap();

    let retriever = Retriever::new(Box::new(embedder), VectorStore::open(tmp.path()).unwrap(), None);
    let params = RetrievalParams { top_k: 3, top_n: 1, ..RetrievalParams::default() };
    let results = retriever.retrieve("water pump seal", &params).unwrap();
    assert_eq!(contents(&results), vec!["water pump seal replacement procedure"]);

    let filtered = retriever.retrieve("water pump seal", &params.clone().with_files(["car.pdf"])).unwrap();
    assert_eq!(contents(&filtered), vec!["tire pressure check before long trips"]);
}
