use anyhow::Result;
use std::path::Path;
use tracing::{error, info, warn};

use kb_core::config::Settings;
use kb_core::traits::{Generator, PairScorer, VectorSearch};
use kb_core::types::Chunk;
use kb_embed::{load_embedder, CrossEncoderModel};
use kb_vector::VectorStore;

use crate::llm::OllamaClient;
use crate::prompt::{build_rag_prompt, SYSTEM_PROMPT};
use crate::reranker::{LexicalOverlapScorer, Reranker};
use crate::retriever::{RetrievalParams, Retriever};

pub const NO_DOCUMENTS_ANSWER: &str = "No relevant documents found in the knowledge base.";

/// Generated text and the chunks it was grounded on.
///
/// `text` is not always a grounded answer: it may be the not-found sentinel
/// or a generation error message.
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub text: String,
    pub sources: Vec<Chunk>,
}

pub struct AnswerEngine<V: VectorSearch> {
    retriever: Retriever<V>,
    generator: Box<dyn Generator>,
}

impl AnswerEngine<VectorStore> {
    /// Load the embedder, open the index, pick a scorer and connect the
    /// generator. Any failure here is fatal.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let embedder = load_embedder(&settings.embedding)?;
        let store = VectorStore::open(&settings.data.index_dir)?;
        if store.is_empty() {
            warn!(index_dir = %settings.data.index_dir, "index is empty; run kb-ingest first");
        }

        let reranker = if settings.rerank.enabled {
            let scorer: Box<dyn PairScorer> = match &settings.rerank.model_dir {
                Some(dir) => Box::new(CrossEncoderModel::load(Path::new(dir), settings.rerank.max_len)?),
                None => {
                    info!("no cross-encoder configured, reranking by lexical overlap");
                    Box::new(LexicalOverlapScorer)
                }
            };
            Some(Reranker::new(scorer))
        } else {
            None
        };

        let generator = OllamaClient::from_settings(&settings.llm)?;
        info!(model = %generator.model(), entries = store.len(), "answer engine ready");
        Ok(Self::new(Retriever::new(embedder, store, reranker), Box::new(generator)))
    }
}

impl<V: VectorSearch> AnswerEngine<V> {
    pub fn new(retriever: Retriever<V>, generator: Box<dyn Generator>) -> Self {
        Self { retriever, generator }
    }

    pub fn retriever(&self) -> &Retriever<V> {
        &self.retriever
    }

    /// Retrieval errors propagate. Generation errors do not: they come back
    /// as the answer text.
    pub fn answer(&self, query: &str, params: &RetrievalParams) -> Result<Answer> {
        let sources = self.retriever.retrieve(query, params)?;
        if sources.is_empty() {
            info!("no relevant documents, skipping generation");
            return Ok(Answer { text: NO_DOCUMENTS_ANSWER.to_string(), sources });
        }

        let prompt = build_rag_prompt(query, &sources);
        let text = match self.generator.generate(SYSTEM_PROMPT, &prompt) {
            Ok(text) => text,
            Err(e) => {
                error!(error = %e, "generation failed");
                format!("Error generating response: {e}")
            }
        };
        Ok(Answer { text, sources })
    }
}
