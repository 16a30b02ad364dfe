//! Lightweight configuration loader and path helpers.
//!
//! Uses Figment to merge built-in defaults + `config.toml` +
//! `config.<env>.toml` + `APP_*` env vars (`__` separates nested keys, so
//! `APP_RETRIEVAL__TOP_K=20` sets `retrieval.top_k`). Provides helpers to
//! expand `~` and `${VAR}` and to resolve relative paths against a known
//! base directory.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::Error;

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        Self::load_for_env(&env_name)
    }

    pub fn load_for_env(env_name: &str) -> anyhow::Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file("config.toml"));
        match env_name {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.settings()?;
        Ok(config)
    }

    /// Wrap an already-assembled figment, e.g. one built in a test.
    pub fn from_figment(figment: Figment) -> Self {
        Self { figment }
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// The typed, validated view of the whole configuration.
    pub fn settings(&self) -> anyhow::Result<Settings> {
        let settings: Settings = self
            .figment
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to extract settings: {}", e))?;
        settings.validate()?;
        Ok(settings)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub data: DataSettings,
    pub chunking: ChunkingSettings,
    pub embedding: EmbeddingSettings,
    pub rerank: RerankSettings,
    pub retrieval: RetrievalSettings,
    pub llm: LlmSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    pub raw_dir: String,
    pub index_dir: String,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self { raw_dir: "./data/raw".to_string(), index_dir: "./data/index".to_string() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    /// Hard character bound applied to chunks that stay oversized after the
    /// separator cascade is exhausted.
    pub max_chunk_chars: Option<usize>,
    /// A HuggingFace `tokenizer.json`; the heuristic counter is used when unset.
    pub tokenizer_path: Option<String>,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self { chunk_size: 800, chunk_overlap: 100, max_chunk_chars: None, tokenizer_path: None }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pooling {
    Cls,
    Mean,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub model_dir: Option<String>,
    pub max_len: usize,
    pub batch_size: usize,
    pub pooling: Pooling,
    pub use_fake: bool,
    pub fake_dim: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model_dir: None,
            max_len: 512,
            batch_size: 32,
            pooling: Pooling::Cls,
            use_fake: false,
            fake_dim: 1024,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RerankSettings {
    pub enabled: bool,
    /// Cross-encoder checkpoint; a lexical overlap scorer is used when unset.
    pub model_dir: Option<String>,
    pub max_len: usize,
}

impl Default for RerankSettings {
    fn default() -> Self {
        Self { enabled: true, model_dir: None, max_len: 512 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub top_k: usize,
    pub top_n: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self { top_k: 10, top_n: 3 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "qwen3:8b".to_string(),
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self { level: "info".to_string() }
    }
}

impl Settings {
    pub fn validate(&self) -> crate::error::Result<()> {
        let c = &self.chunking;
        if c.chunk_size == 0 {
            return Err(Error::InvalidConfig("chunking.chunk_size must be positive".into()));
        }
        if c.chunk_overlap >= c.chunk_size {
            return Err(Error::InvalidConfig(format!(
                "chunking.chunk_overlap ({}) must be smaller than chunking.chunk_size ({})",
                c.chunk_overlap, c.chunk_size
            )));
        }
        if c.max_chunk_chars == Some(0) {
            return Err(Error::InvalidConfig("chunking.max_chunk_chars must be positive".into()));
        }
        if self.embedding.max_len == 0 || self.embedding.batch_size == 0 {
            return Err(Error::InvalidConfig(
                "embedding.max_len and embedding.batch_size must be positive".into(),
            ));
        }
        if self.retrieval.top_k == 0 || self.retrieval.top_n == 0 {
            return Err(Error::InvalidConfig("retrieval.top_k and retrieval.top_n must be positive".into()));
        }
        Ok(())
    }

    /// Expand and anchor every configured path at `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        let resolve = |p: &mut String| *p = resolve_with_base(base, p.as_str()).to_string_lossy().into_owned();
        resolve(&mut self.data.raw_dir);
        resolve(&mut self.data.index_dir);
        for p in [
            &mut self.chunking.tokenizer_path,
            &mut self.embedding.model_dir,
            &mut self.rerank.model_dir,
        ]
        .into_iter()
        .flatten()
        {
            resolve(p);
        }
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    // Expand env vars first
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn defaults_are_valid() {
        let settings = Settings::default();
        settings.validate().unwrap();
        assert_eq!(settings.chunking.chunk_size, 800);
        assert_eq!(settings.chunking.chunk_overlap, 100);
        assert_eq!(settings.retrieval.top_k, 10);
        assert_eq!(settings.llm.model, "qwen3:8b");
    }

    #[test]
    fn toml_and_env_layers_override_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                r#"
                [retrieval]
                top_k = 20

                [embedding]
                pooling = "mean"
                "#,
            )?;
            jail.create_file("config.test.toml", "[chunking]\nchunk_size = 300\n")?;
            jail.set_env("APP_LLM__MODEL", "llama3:8b");

            let config = Config::load_for_env("test").expect("config loads");
            let settings = config.settings().expect("settings");
            assert_eq!(settings.retrieval.top_k, 20);
            assert_eq!(settings.retrieval.top_n, 3);
            assert_eq!(settings.chunking.chunk_size, 300);
            assert_eq!(settings.embedding.pooling, Pooling::Mean);
            assert_eq!(settings.llm.model, "llama3:8b");
            assert_eq!(config.get::<usize>("retrieval.top_k").expect("key"), 20);
            Ok(())
        });
    }

    #[test]
    fn overlap_not_below_size_is_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file("config.toml", "[chunking]\nchunk_size = 50\nchunk_overlap = 50\n")?;
            let err = Config::load_for_env("dev").err().expect("invalid config");
            assert!(err.to_string().contains("chunk_overlap"));
            Ok(())
        });
    }

    #[test]
    fn resolve_paths_anchors_relative_entries() {
        let mut settings = Settings::default();
        settings.embedding.model_dir = Some("models/bge-m3".into());
        settings.data.index_dir = "/abs/index".into();
        settings.resolve_paths(Path::new("/srv/kb"));
        assert_eq!(settings.data.raw_dir, "/srv/kb/./data/raw");
        assert_eq!(settings.data.index_dir, "/abs/index");
        assert_eq!(settings.embedding.model_dir.as_deref(), Some("/srv/kb/models/bge-m3"));
        assert_eq!(settings.rerank.model_dir, None);
    }
}
