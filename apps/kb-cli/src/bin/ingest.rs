use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use tracing::{info, warn};

use kb_cli::{bootstrap, index_dir_or_default};
use kb_core::chunker::{Chunker, ChunkerConfig};
use kb_embed::{load_embedder, load_token_counter};
use kb_ingest::load_directory;
use kb_vector::VectorStore;

/// Load documents, chunk, embed and write the vector index.
#[derive(Parser, Debug)]
#[command(name = "kb-ingest", version)]
struct Args {
    /// Directory of PDF/HTML files (defaults to data.raw_dir)
    #[arg(long)]
    data_dir: Option<PathBuf>,
    /// Index directory (defaults to data.index_dir)
    #[arg(long)]
    index_path: Option<PathBuf>,
    /// Discard the existing index before adding
    #[arg(long)]
    reset: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let settings = bootstrap()?;
    let data_dir = args.data_dir.clone().unwrap_or_else(|| PathBuf::from(&settings.data.raw_dir));
    let index_dir = index_dir_or_default(args.index_path.as_deref(), &settings).to_path_buf();

    println!("Knowledge Base Ingestion\n========================");
    println!("Data directory: {}", data_dir.display());
    println!("Index directory: {}", index_dir.display());

    let report = load_directory(&data_dir)?;
    println!("📄 Loaded {} files ({} pages/documents), skipped {}", report.loaded, report.chunks.len(), report.skipped);
    info!(loaded = report.loaded, skipped = report.skipped, failed = report.failed.len(), "documents loaded");
    for (path, reason) in &report.failed {
        warn!(path = %path.display(), %reason, "document failed to load");
        println!("⚠️  Failed: {} ({})", path.display(), reason);
    }

    let counter = load_token_counter(settings.chunking.tokenizer_path.as_deref())?;
    let chunker = Chunker::new(ChunkerConfig::from(&settings.chunking), counter)?;
    let chunks = chunker.split_documents(&report.chunks);
    info!(chunks = chunks.len(), "documents chunked");
    println!("✂️  Split into {} chunks", chunks.len());

    let mut store = VectorStore::open(&index_dir)?;
    if args.reset {
        println!("🧹 Resetting index ({} entries)", store.len());
        store.reset();
    }

    if chunks.is_empty() {
        println!("No chunks to index");
        if args.reset {
            store.save()?;
        }
        return Ok(());
    }

    let embedder = load_embedder(&settings.embedding)?;
    let pb = ProgressBar::new(chunks.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({percent}%) {msg}")?
            .progress_chars("#>-"),
    );
    let mut vectors = Vec::with_capacity(chunks.len());
    for batch in chunks.chunks(settings.embedding.batch_size.max(1)) {
        let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
        vectors.extend(embedder.embed_batch(&texts)?);
        pb.inc(batch.len() as u64);
    }
    pb.finish_with_message("embedded");
    info!(vectors = vectors.len(), "chunks embedded");

    let added = chunks.len();
    store.add(chunks, vectors)?;
    store.save()?;

    println!("\n✅ Indexed {} chunks ({} total in index)", added, store.len());
    println!("💡 Ask a question with: kb-ask \"<question>\"");
    Ok(())
}
