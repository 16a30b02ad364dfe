use anyhow::Result;
use std::path::Path;

use candle_core::{DType, Device};
use candle_transformers::models::xlm_roberta::XLMRobertaForSequenceClassification;
use tokenizers::Tokenizer;
use tracing::info;

use kb_core::traits::PairScorer;

use crate::{device, load_config, load_tokenizer, load_weights, tokenize};

const SCORE_BATCH: usize = 16;

/// XLM-RoBERTa cross-encoder with a single relevance logit
/// (e.g. `bge-reranker-v2-m3`). Scores are squashed with a sigmoid.
pub struct CrossEncoderModel {
    model: XLMRobertaForSequenceClassification,
    tokenizer: Tokenizer,
    device: Device,
    max_len: usize,
}

impl CrossEncoderModel {
    pub fn load(model_dir: &Path, max_len: usize) -> Result<Self> {
        let device = device::select_device();
        info!(model_dir = %model_dir.display(), "loading cross-encoder");
        let tokenizer = load_tokenizer(model_dir)?;
        let config = load_config(model_dir)?;
        let vb = load_weights(model_dir, &device)?;
        let model = XLMRobertaForSequenceClassification::new(1, &config, vb)?;
        Ok(Self { model, tokenizer, device, max_len })
    }
}

impl PairScorer for CrossEncoderModel {
    fn score(&self, query: &str, passages: &[&str]) -> Result<Vec<f32>> {
        let mut scores = Vec::with_capacity(passages.len());
        for batch in passages.chunks(SCORE_BATCH) {
            let pairs: Vec<(&str, &str)> = batch.iter().map(|p| (query, *p)).collect();
            let (ids, masks) = tokenize::encode_batch(&self.tokenizer, pairs, self.max_len)?;
            let (input_ids, attention_mask) = tokenize::to_tensors(ids, masks, &self.device)?;
            let token_type_ids = input_ids.zeros_like()?;
            let logits = self.model.forward(&input_ids, &attention_mask, &token_type_ids)?;
            let logits: Vec<f32> = logits.to_device(&Device::Cpu)?.to_dtype(DType::F32)?.flatten_all()?.to_vec1()?;
            scores.extend(logits.into_iter().map(sigmoid));
        }
        Ok(scores)
    }
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}
