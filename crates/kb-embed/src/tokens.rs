use anyhow::{anyhow, Result};
use tokenizers::Tokenizer;
use tracing::info;

use kb_core::tokens::{HeuristicTokenCounter, TokenCounter};

/// Exact token counts from a HuggingFace `tokenizer.json`, without special
/// tokens.
pub struct HfTokenCounter {
    tokenizer: Tokenizer,
}

impl HfTokenCounter {
    pub fn new(tokenizer: Tokenizer) -> Self {
        Self { tokenizer }
    }

    pub fn from_file(path: &str) -> Result<Self> {
        let tokenizer = Tokenizer::from_file(path).map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", path, e))?;
        Ok(Self::new(tokenizer))
    }
}

impl TokenCounter for HfTokenCounter {
    fn count(&self, text: &str) -> usize {
        match self.tokenizer.encode(text, false) {
            Ok(enc) => enc.len(),
            Err(_) => HeuristicTokenCounter.count(text),
        }
    }
}

/// Tokenizer-backed counter when a path is configured, heuristic otherwise.
pub fn load_token_counter(tokenizer_path: Option<&str>) -> Result<Box<dyn TokenCounter>> {
    match tokenizer_path {
        Some(path) => {
            info!(tokenizer = path, "counting chunk tokens with tokenizer");
            Ok(Box::new(HfTokenCounter::from_file(path)?))
        }
        None => Ok(Box::new(HeuristicTokenCounter)),
    }
}
