use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::debug;

use kb_cli::{bootstrap, describe_location, index_dir_or_default, preview};
use kb_embed::load_embedder;
use kb_vector::VectorStore;

/// Vector search only: show the nearest chunks for a query.
#[derive(Parser, Debug)]
#[command(name = "kb-query", version)]
struct Args {
    query: String,
    #[arg(long)]
    index_path: Option<PathBuf>,
    /// Number of results (defaults to retrieval.top_k)
    #[arg(long)]
    top_k: Option<usize>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let settings = bootstrap()?;
    let index_dir = index_dir_or_default(args.index_path.as_deref(), &settings);
    let top_k = args.top_k.unwrap_or(settings.retrieval.top_k);

    let store = VectorStore::open(index_dir)?;
    let embedder = load_embedder(&settings.embedding)?;
    let query_vec = embedder.embed_query(&args.query)?;
    let hits = store.search_scored(&query_vec, top_k)?;
    debug!(top_k, hits = hits.len(), entries = store.len(), "vector search done");

    println!("🔍 Found {} results for: \"{}\"", hits.len(), args.query);
    for (i, hit) in hits.iter().enumerate() {
        println!("\n  {}. score={:.4}  {}", i + 1, hit.score, describe_location(&hit.chunk));
        println!("     {}", preview(&hit.chunk.content, 500));
    }
    Ok(())
}
