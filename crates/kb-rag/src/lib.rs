//! Query path: retrieval, reranking, prompt assembly and answer generation.

pub mod answer;
pub mod llm;
pub mod prompt;
pub mod reranker;
pub mod retriever;

pub use answer::{Answer, AnswerEngine, NO_DOCUMENTS_ANSWER};
pub use llm::OllamaClient;
pub use reranker::{LexicalOverlapScorer, Reranker};
pub use retriever::{RetrievalParams, Retriever, FILTER_OVERFETCH_FACTOR};
