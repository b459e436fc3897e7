//! Embedding Benchmark CLI
//!
//! Ingests a folder of PDFs and evaluates embedding models on semantic search.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use embedding_benchmark::{
    config::Config,
    document::{load_documents, save_documents},
    embeddings::{HubLoader, ModelLoader},
    eval::{EvalSettings, Evaluator, QuerySet, UNKNOWN_SOURCE, truncate_words},
    ingest::PdfIngestor,
    registry::ModelRegistry,
    search::SemanticSearcher,
    store::{ChunkConfig, VectorStore},
    Document,
};
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// Embedding Benchmark - compare embedding models on PDF semantic search
#[derive(Parser)]
#[command(name = "embed-bench")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory containing the PDF documents
    #[arg(long, global = true)]
    pdf_dir: Option<PathBuf>,

    /// Directory receiving per-model result files
    #[arg(long, global = true)]
    results_dir: Option<PathBuf>,

    /// Directory receiving extracted images
    #[arg(long, global = true)]
    images_dir: Option<PathBuf>,

    /// Path of the JSON document snapshot
    #[arg(long, global = true)]
    snapshot: Option<PathBuf>,

    /// YAML file replacing the built-in model registry
    #[arg(long, global = true)]
    registry: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Args)]
struct EvalArgs {
    /// Number of results requested per query
    #[arg(short = 'k', long)]
    top_k: Option<usize>,

    /// Words kept from the matched passage
    #[arg(long)]
    truncate_words: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest the PDFs and evaluate every registry model
    Run {
        #[command(flatten)]
        eval: EvalArgs,

        /// Only evaluate these model keys (comma separated, in order)
        #[arg(short, long, value_delimiter = ',')]
        models: Vec<String>,

        /// Text file with one query per line, replacing the built-in queries
        #[arg(short, long)]
        queries: Option<PathBuf>,

        /// Persist the vector store after each refresh (.json or .bin)
        #[arg(long)]
        store: Option<PathBuf>,

        /// Save the run summary (.json or .bin)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Read documents from the snapshot instead of re-ingesting the PDFs
        #[arg(long)]
        reuse_snapshot: bool,
    },

    /// Ingest the PDFs and write the document snapshot only
    Ingest,

    /// Run a single query against one model
    Search {
        /// The search query
        query: String,

        /// Model key from the registry
        #[arg(short, long)]
        model: String,

        #[command(flatten)]
        eval: EvalArgs,

        /// Read documents from the snapshot instead of re-ingesting the PDFs
        #[arg(long)]
        reuse_snapshot: bool,
    },

    /// List the model registry
    Models,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = Config::load().context("Failed to load configuration")?;
    apply_cli_overrides(&mut config, &cli);

    match &cli.command {
        Commands::Run {
            eval,
            models,
            queries,
            store,
            output,
            reuse_snapshot,
        } => {
            apply_eval_overrides(&mut config, eval);
            if queries.is_some() {
                config.queries_file = queries.clone();
            }
            cmd_run(&config, models, store.clone(), output.clone(), *reuse_snapshot)
        }
        Commands::Ingest => cmd_ingest(&config).map(|_| ()),
        Commands::Search {
            query,
            model,
            eval,
            reuse_snapshot,
        } => {
            apply_eval_overrides(&mut config, eval);
            cmd_search(&config, query, model, *reuse_snapshot)
        }
        Commands::Models => cmd_models(&config),
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn apply_cli_overrides(config: &mut Config, cli: &Cli) {
    if let Some(dir) = &cli.pdf_dir {
        config.paths.pdf_dir = dir.clone();
    }
    if let Some(dir) = &cli.results_dir {
        config.paths.results_dir = dir.clone();
    }
    if let Some(dir) = &cli.images_dir {
        config.paths.image_dir = dir.clone();
    }
    if let Some(path) = &cli.snapshot {
        config.paths.snapshot_path = path.clone();
    }
    if let Some(path) = &cli.registry {
        config.registry_file = Some(path.clone());
    }
}

fn apply_eval_overrides(config: &mut Config, eval: &EvalArgs) {
    if let Some(top_k) = eval.top_k {
        config.eval.top_k = top_k;
    }
    if let Some(words) = eval.truncate_words {
        config.eval.truncate_words = words;
    }
}

fn load_registry(config: &Config) -> Result<ModelRegistry> {
    match &config.registry_file {
        Some(path) => ModelRegistry::load_from_file(path)
            .with_context(|| format!("Failed to load registry from {}", path.display())),
        None => Ok(ModelRegistry::builtin()),
    }
}

fn cmd_ingest(config: &Config) -> Result<Vec<Document>> {
    println!("Ingesting PDFs from: {}", config.paths.pdf_dir.display());
    let start = Instant::now();

    let ingestor = PdfIngestor::new(&config.paths.image_dir);
    let documents = ingestor
        .ingest_dir(&config.paths.pdf_dir)
        .context("Failed to ingest documents")?;

    save_documents(&documents, &config.paths.snapshot_path)
        .context("Failed to save document snapshot")?;

    let images: usize = documents.iter().map(|d| d.images.len()).sum();
    println!("  Documents: {}", documents.len());
    println!("  Images:    {} (in {})", images, config.paths.image_dir.display());
    println!("  Snapshot:  {}", config.paths.snapshot_path.display());
    println!("  Time:      {:.2?}", start.elapsed());

    Ok(documents)
}

/// Documents from the snapshot when asked and present, otherwise a fresh ingestion.
fn load_corpus(config: &Config, reuse_snapshot: bool) -> Result<Vec<Document>> {
    let snapshot = &config.paths.snapshot_path;
    if !reuse_snapshot {
        return cmd_ingest(config);
    }
    if !snapshot.is_file() {
        tracing::warn!(path = %snapshot.display(), "no snapshot to reuse, ingesting");
        return cmd_ingest(config);
    }

    let documents = load_documents(snapshot)
        .with_context(|| format!("Failed to load snapshot {}", snapshot.display()))?;
    println!(
        "Loaded {} documents from {}",
        documents.len(),
        snapshot.display()
    );
    Ok(documents)
}

fn cmd_run(
    config: &Config,
    models: &[String],
    store_path: Option<PathBuf>,
    output: Option<PathBuf>,
    reuse_snapshot: bool,
) -> Result<()> {
    config.validate().context("Invalid configuration")?;

    let registry = load_registry(config)?;
    let registry = if models.is_empty() {
        registry
    } else {
        registry.select(models).context("Invalid --models selection")?
    };

    let queries = match &config.queries_file {
        Some(path) => QuerySet::load_from_file(path).context("Failed to load queries")?,
        None => QuerySet::builtin(),
    };

    let documents = load_corpus(config, reuse_snapshot)?;

    let settings = EvalSettings {
        store_path,
        ..EvalSettings::from_config(config)
    };
    let evaluator = Evaluator::new(&HubLoader, &registry, &queries, settings);
    let summary = evaluator.run(&documents).context("Evaluation failed")?;

    summary.print_summary();

    if let Some(path) = output {
        summary.save(&path).context("Failed to save run summary")?;
        println!("Summary saved to {}", path.display());
    }

    Ok(())
}

fn cmd_search(config: &Config, query: &str, model_key: &str, reuse_snapshot: bool) -> Result<()> {
    config.validate().context("Invalid configuration")?;

    let registry = load_registry(config)?;
    let entry = registry.get(model_key)?;

    let documents = load_corpus(config, reuse_snapshot)?;

    println!("\nLoading model: {} ({})", entry.key, entry.identifier);
    let embedder = HubLoader.load(entry).context("Failed to load model")?;

    let mut store = VectorStore::new(ChunkConfig {
        chunk_size: config.eval.chunk_size,
        chunk_overlap: config.eval.chunk_overlap,
    });
    store
        .refresh(&entry.key, &documents, embedder.as_ref())
        .context("Failed to embed documents")?;

    println!("Searching for: \"{}\"", query);
    println!();

    let start = Instant::now();
    let searcher = SemanticSearcher::new(&store, embedder.as_ref());
    let hits = searcher.search(query, config.eval.top_k).context("Search failed")?;
    let search_duration = start.elapsed();

    if hits.is_empty() {
        println!("No results.");
        return Ok(());
    }

    println!("Results:");
    println!("{}", "─".repeat(60));
    for (i, hit) in hits.iter().enumerate() {
        let file_name = documents
            .iter()
            .find(|d| d.id == hit.document_id)
            .map(|d| d.file_name.as_str())
            .unwrap_or(UNKNOWN_SOURCE);
        println!("{:>2}. {:.4} | {}", i + 1, hit.score, file_name);
        println!("    {}", truncate_words(&hit.text, config.eval.truncate_words));
        println!();
    }
    println!("{}", "─".repeat(60));
    println!("Found {} results in {:.2?}", hits.len(), search_duration);

    Ok(())
}

fn cmd_models(config: &Config) -> Result<()> {
    let registry = load_registry(config)?;

    println!("Model Registry");
    println!("{}", "─".repeat(60));
    for entry in registry.iter() {
        println!("  {:<16} {}", entry.key, entry.identifier);
    }
    println!("{}", "─".repeat(60));
    println!("  {} models", registry.len());

    Ok(())
}
