use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::{Map, Value};

use ragstack_core::loader::DocumentLoader;
use ragstack_core::types::ParamsUpdate;
use ragstack_pipeline::Pipeline;

#[derive(Parser)]
#[command(name = "ragstack")]
#[command(about = "Chunk, embed, store and retrieve text documents", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Ingest every .txt file under a directory
    Ingest {
        dir: PathBuf,

        /// Stop after this many files
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Retrieve and rerank context for a question
    Ask {
        question: String,

        #[arg(short, long)]
        k: Option<usize>,
    },
    /// Ask, then generate an answer from the retrieved context
    Answer {
        question: String,

        #[arg(short, long)]
        k: Option<usize>,
    },
    /// List chunking strategies
    Strategies,
    /// Show or set the active chunking strategy
    Strategy { name: Option<String> },
    /// Show or update chunking parameters
    Params {
        /// key=value, repeatable (e.g. --set windowSize=800)
        #[arg(long, value_name = "KEY=VALUE")]
        set: Vec<String>,
    },
    /// List namespaces in the store
    Namespaces,
    /// Switch the active embedding model and namespace
    Switch { model: String, dimension: usize },
    /// Remove every chunk from the active namespace
    Clear,
    /// Show the active namespace and its size
    Stats,
}

/// Values that parse as JSON (numbers, booleans) keep their type; anything
/// else is taken as a string.
fn parse_assignments(pairs: &[String]) -> Result<ParamsUpdate> {
    let mut map = Map::new();
    for pair in pairs {
        let Some((key, raw)) = pair.split_once('=') else {
            bail!("expected KEY=VALUE, got '{pair}'");
        };
        let value = serde_json::from_str(raw.trim()).unwrap_or_else(|_| Value::String(raw.trim().to_string()));
        map.insert(key.trim().to_string(), value);
    }
    Ok(ParamsUpdate::from_json(Value::Object(map))?)
}

pub async fn ingest(pipeline: &Pipeline, dir: &Path, limit: Option<usize>) -> Result<()> {
    let mut loader = DocumentLoader::new();
    if let Some(limit) = limit {
        loader = loader.with_limit(limit);
    }
    let documents = loader.load_directory(dir).with_context(|| format!("loading {}", dir.display()))?;
    println!("Ingesting {} documents from {}", documents.len(), dir.display());

    let bar = ProgressBar::new(documents.len() as u64);
    bar.set_style(
        ProgressStyle::with_template("{bar:40} {pos}/{len} {msg}").unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    let mut chunks = 0;
    let mut failures = Vec::new();
    for document in &documents {
        bar.set_message(document.id.clone());
        let report = pipeline.ingest(std::slice::from_ref(document)).await;
        chunks += report.ingested_chunks;
        failures.extend(report.failures);
        bar.inc(1);
    }
    bar.finish_and_clear();

    println!("Stored {chunks} chunks in {}", pipeline.namespace().id);
    for failure in &failures {
        println!("  failed {}: {}", failure.doc_id, failure.error);
    }
    Ok(())
}

pub async fn ask(pipeline: &Pipeline, question: &str, k: Option<usize>) -> Result<()> {
    let result = pipeline.ask(question, k).await?;
    println!("{} results from {} in {} ms", result.retrieved.len(), result.namespace, result.latency_ms);
    for (i, hit) in result.retrieved.iter().enumerate() {
        let preview: String = hit.chunk.text.chars().take(160).collect();
        println!("\n  {}. score={:.4}  id={}", i + 1, hit.score, hit.chunk.id);
        println!("     {}", preview.replace('\n', " "));
    }
    Ok(())
}

pub async fn answer(pipeline: &Pipeline, question: &str, k: Option<usize>) -> Result<()> {
    let answer = pipeline.answer(question, k).await?;
    println!("{}\n", answer.text);
    println!("context: {}", answer.context_ids.join(", "));
    println!("latency: {} ms", answer.latency_ms);
    Ok(())
}

pub fn strategies(pipeline: &Pipeline) {
    for s in pipeline.list_strategies() {
        let marker = if s.active { "*" } else { " " };
        println!("{marker} {:<15} {}", s.name, s.description);
    }
}

pub fn strategy(pipeline: &Pipeline, name: Option<&str>) -> Result<()> {
    match name {
        Some(name) => println!("active strategy: {}", pipeline.set_strategy(name)?),
        None => println!("active strategy: {}", pipeline.active_strategy()),
    }
    Ok(())
}

pub fn params(pipeline: &Pipeline, set: &[String]) -> Result<()> {
    let params = if set.is_empty() { pipeline.params() } else { pipeline.set_params(&parse_assignments(set)?)? };
    println!("{}", serde_json::to_string_pretty(&params)?);
    Ok(())
}

pub async fn namespaces(pipeline: &Pipeline) -> Result<()> {
    for ns in pipeline.list_namespaces().await? {
        let marker = if ns.active { "*" } else { " " };
        let dim = ns.dimension.map_or_else(|| "?".to_string(), |d| d.to_string());
        println!("{marker} {}  model={}  dim={dim}  count={}", ns.id, ns.model_name, ns.count);
    }
    Ok(())
}

pub async fn switch(pipeline: &Pipeline, model: &str, dimension: usize) -> Result<()> {
    let ns = pipeline.switch_namespace(model, dimension).await?;
    println!("active namespace: {}", ns.id);
    Ok(())
}

pub async fn clear(pipeline: &Pipeline) -> Result<()> {
    pipeline.clear().await?;
    println!("cleared {}", pipeline.namespace().id);
    Ok(())
}

pub async fn stats(pipeline: &Pipeline) -> Result<()> {
    let stats = pipeline.stats().await?;
    println!("namespace: {}", stats.id);
    println!("model:     {} ({} dims)", stats.model_name, stats.dimension);
    println!("chunks:    {}", stats.count);
    Ok(())
}
