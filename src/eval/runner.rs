//! The evaluation loop: every model, every query, one result file per model.

use super::queries::QuerySet;
use super::report::{QueryOutcome, ResultWriter, UNKNOWN_SOURCE, truncate_words};
use crate::config::Config;
use crate::document::{Document, find_source};
use crate::embeddings::{Embedder, ModelLoader};
use crate::error::{BenchError, Result};
use crate::persistence::save_snapshot;
use crate::registry::{ModelEntry, ModelRegistry};
use crate::search::SemanticSearcher;
use crate::store::{ChunkConfig, VectorStore};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

/// Knobs for one evaluation run.
#[derive(Debug, Clone)]
pub struct EvalSettings {
    /// Directory receiving the result files.
    pub results_dir: PathBuf,
    /// Hits requested per query.
    pub top_k: usize,
    /// Words kept from the matched passage.
    pub truncate_words: usize,
    /// Chunking used when refreshing the store.
    pub chunk_config: ChunkConfig,
    /// Where to persist the store after each refresh, if anywhere.
    pub store_path: Option<PathBuf>,
}

impl Default for EvalSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl EvalSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            results_dir: config.paths.results_dir.clone(),
            top_k: config.eval.top_k,
            truncate_words: config.eval.truncate_words,
            chunk_config: ChunkConfig {
                chunk_size: config.eval.chunk_size,
                chunk_overlap: config.eval.chunk_overlap,
            },
            store_path: None,
        }
    }
}

/// Results of one model pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelOutcome {
    pub key: String,
    pub identifier: String,
    /// Passages stored for this model.
    pub passages: usize,
    /// One entry per query that returned at least one hit.
    pub answered: Vec<QueryOutcome>,
    /// Queries that returned no hits.
    pub skipped: usize,
    /// Load + refresh + all queries, in seconds.
    pub elapsed_secs: f64,
    pub result_file: PathBuf,
}

impl ModelOutcome {
    /// Mean top-hit score over answered queries.
    pub fn mean_score(&self) -> Option<f64> {
        if self.answered.is_empty() {
            return None;
        }
        let total: f64 = self.answered.iter().map(|o| o.score as f64).sum();
        Some(total / self.answered.len() as f64)
    }

    /// Answered queries whose top hit could not be traced to a document.
    pub fn unknown_sources(&self) -> usize {
        self.answered
            .iter()
            .filter(|o| o.file_name == UNKNOWN_SOURCE)
            .count()
    }
}

/// Aggregated results for a whole run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub documents: usize,
    pub queries: usize,
    pub models: Vec<ModelOutcome>,
    pub total_time_secs: f64,
}

impl RunSummary {
    /// Print summary to stdout.
    pub fn print_summary(&self) {
        println!("\n========== Benchmark Results ==========");
        println!("Documents: {}", self.documents);
        println!("Queries:   {}", self.queries);
        println!("----------------------------------------");
        for model in &self.models {
            let mean = model
                .mean_score()
                .map(|s| format!("{:.4}", s))
                .unwrap_or_else(|| "-".to_string());
            println!(
                "{:<16} answered {:>3}/{:<3} mean {:>6}  unknown {:>2}  {:>8.2}s",
                model.key,
                model.answered.len(),
                self.queries,
                mean,
                model.unknown_sources(),
                model.elapsed_secs
            );
        }
        println!("----------------------------------------");
        println!("Total time: {:.1}s", self.total_time_secs);
        println!("========================================\n");
    }

    /// Save the summary (JSON or bincode by extension).
    pub fn save(&self, path: &Path) -> Result<()> {
        save_snapshot(self, path)
    }
}

/// Runs every registry model against the query set.
///
/// Models are evaluated strictly one after another over a single store, so
/// a search only ever sees embeddings from the model being evaluated.
pub struct Evaluator<'a> {
    loader: &'a dyn ModelLoader,
    registry: &'a ModelRegistry,
    queries: &'a QuerySet,
    settings: EvalSettings,
}

impl<'a> Evaluator<'a> {
    pub fn new(
        loader: &'a dyn ModelLoader,
        registry: &'a ModelRegistry,
        queries: &'a QuerySet,
        settings: EvalSettings,
    ) -> Self {
        Self {
            loader,
            registry,
            queries,
            settings,
        }
    }

    /// Evaluate every model. The first failing model aborts the run.
    pub fn run(&self, documents: &[Document]) -> Result<RunSummary> {
        let start = Instant::now();
        let results_dir = &self.settings.results_dir;
        std::fs::create_dir_all(results_dir).map_err(|e| BenchError::io(results_dir, e))?;

        info!(
            models = self.registry.len(),
            queries = self.queries.len(),
            documents = documents.len(),
            "starting evaluation"
        );

        let mut store = VectorStore::new(self.settings.chunk_config.clone());
        let mut models = Vec::with_capacity(self.registry.len());

        for entry in self.registry.iter() {
            models.push(self.evaluate_model(entry, documents, &mut store)?);
        }

        Ok(RunSummary {
            documents: documents.len(),
            queries: self.queries.len(),
            models,
            total_time_secs: start.elapsed().as_secs_f64(),
        })
    }

    /// Load one model, refresh the store with it, and answer every query.
    pub fn evaluate_model(
        &self,
        entry: &ModelEntry,
        documents: &[Document],
        store: &mut VectorStore,
    ) -> Result<ModelOutcome> {
        println!("\n=== Testing Model: {} ({}) ===", entry.key, entry.identifier);
        let start = Instant::now();

        let embedder = self.loader.load(entry)?;
        store.refresh(&entry.key, documents, embedder.as_ref())?;

        if let Some(path) = &self.settings.store_path {
            store.save(path)?;
            debug!(path = %path.display(), "store snapshot written");
        }

        self.answer_queries(entry, documents, store, embedder.as_ref(), start)
    }

    /// Answer every query from `store` and write the model's result file.
    ///
    /// Top hits are attributed to the first of `documents` containing them.
    /// `started` is when the model pass began; the reported time runs from it.
    pub fn answer_queries(
        &self,
        entry: &ModelEntry,
        documents: &[Document],
        store: &VectorStore,
        embedder: &dyn Embedder,
        started: Instant,
    ) -> Result<ModelOutcome> {
        let mut writer = ResultWriter::create(&self.settings.results_dir, entry)?;
        let searcher = SemanticSearcher::new(store, embedder);

        let mut answered = Vec::new();
        let mut skipped = 0;

        for (i, query) in self.queries.iter().enumerate() {
            let hits = searcher.search(query, self.settings.top_k)?;

            let Some(top) = hits.into_iter().next() else {
                debug!(model = %entry.key, query = i + 1, "no results");
                skipped += 1;
                continue;
            };

            let file_name = find_source(documents, &top.text)
                .map(|d| d.file_name.clone())
                .unwrap_or_else(|| UNKNOWN_SOURCE.to_string());

            let outcome = QueryOutcome {
                index: i + 1,
                query: query.to_string(),
                score: top.score,
                file_name,
                snippet: truncate_words(&top.text, self.settings.truncate_words),
            };

            println!("\nQuery {}: {}", outcome.index, outcome.query);
            println!("{}", outcome.score_line());

            writer.write_outcome(&outcome)?;
            answered.push(outcome);
        }

        let elapsed = started.elapsed();
        let result_file = writer.finish(elapsed)?;
        println!(
            "Results saved to {} in {:.2} seconds.",
            result_file.display(),
            elapsed.as_secs_f64()
        );

        Ok(ModelOutcome {
            key: entry.key.clone(),
            identifier: entry.identifier.clone(),
            passages: store.len(),
            answered,
            skipped,
            elapsed_secs: elapsed.as_secs_f64(),
            result_file,
        })
    }
}
