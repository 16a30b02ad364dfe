use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::debug;

use kb_cli::{bootstrap, describe_location};
use kb_rag::{AnswerEngine, RetrievalParams};

/// Answer a question from the indexed documents.
#[derive(Parser, Debug)]
#[command(name = "kb-ask", version)]
struct Args {
    question: String,
    #[arg(long)]
    index_path: Option<PathBuf>,
    /// Recall depth (defaults to retrieval.top_k)
    #[arg(long)]
    top_k: Option<usize>,
    /// Chunks passed to the model (defaults to retrieval.top_n)
    #[arg(long)]
    top_n: Option<usize>,
    #[arg(long)]
    no_rerank: bool,
    /// Restrict to these file names; repeatable
    #[arg(long = "file")]
    files: Vec<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let mut settings = bootstrap()?;
    if let Some(dir) = &args.index_path {
        settings.data.index_dir = dir.to_string_lossy().into_owned();
    }

    let mut params = RetrievalParams::from(&settings.retrieval);
    params.top_k = args.top_k.unwrap_or(params.top_k);
    params.top_n = args.top_n.unwrap_or(params.top_n);
    params.use_rerank = !args.no_rerank;
    if !args.files.is_empty() {
        params = params.with_files(args.files.iter().cloned());
    }

    debug!(top_k = params.top_k, top_n = params.top_n, use_rerank = params.use_rerank, files = args.files.len(), "retrieval parameters");
    let engine = AnswerEngine::from_settings(&settings)?;
    let answer = engine.answer(&args.question, &params)?;

    println!("{}\n", answer.text);
    if !answer.sources.is_empty() {
        println!("📚 Sources:");
        for (i, chunk) in answer.sources.iter().enumerate() {
            match chunk.metadata.rerank_score {
                Some(score) => println!("  {}. {}  (rerank {:.3})", i + 1, describe_location(chunk), score),
                None => println!("  {}. {}", i + 1, describe_location(chunk)),
            }
        }
    }
    Ok(())
}
