//! Embedding Benchmark - compare pretrained embedding models on semantic
//! search over a folder of PDFs.
//!
//! # Overview
//!
//! 1. Every PDF is flattened into one [`Document`] and its images are extracted
//! 2. Each model in the [`ModelRegistry`] is loaded in turn and the
//!    [`VectorStore`] is refreshed with that model's passage embeddings
//! 3. A fixed set of queries is run against the store and the top hit per
//!    query is written to `results/<model_key>_results.txt`
//!
//! # Quick Start
//!
//! ```no_run
//! use embedding_benchmark::{
//!     config::Config,
//!     document::save_documents,
//!     embeddings::HubLoader,
//!     eval::{EvalSettings, Evaluator, QuerySet},
//!     ingest::PdfIngestor,
//!     registry::ModelRegistry,
//! };
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     config.validate()?;
//!
//!     // Ingest the PDFs
//!     let ingestor = PdfIngestor::new(&config.paths.image_dir);
//!     let documents = ingestor.ingest_dir(&config.paths.pdf_dir)?;
//!     save_documents(&documents, &config.paths.snapshot_path)?;
//!
//!     // Evaluate every registry model
//!     let registry = ModelRegistry::builtin();
//!     let queries = QuerySet::builtin();
//!     let evaluator = Evaluator::new(
//!         &HubLoader,
//!         &registry,
//!         &queries,
//!         EvalSettings::from_config(&config),
//!     );
//!     let summary = evaluator.run(&documents)?;
//!     summary.print_summary();
//!
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - **PdfIngestor**: PDF text and image extraction (lopdf)
//! - **ModelRegistry**: model keys mapped to Hugging Face identifiers
//! - **Embedder**: text to vector; `BertEmbedder` runs BERT and XLM-RoBERTa models with candle
//! - **VectorStore**: one model's passage embeddings, replaced on every refresh
//! - **SemanticSearcher**: cosine-similarity ranking over the store
//! - **Evaluator**: the per-model, per-query evaluation loop

pub mod config;
pub mod document;
pub mod embeddings;
pub mod error;
pub mod eval;
pub mod ingest;
pub mod persistence;
pub mod registry;
pub mod search;
pub mod store;

// Re-export commonly used types
pub use config::Config;
pub use document::Document;
pub use embeddings::{Embedder, ModelLoader};
pub use error::{BenchError, Result};
pub use eval::{Evaluator, QuerySet, RunSummary};
pub use ingest::PdfIngestor;
pub use registry::{Architecture, ModelEntry, ModelRegistry};
pub use search::{SearchHit, SemanticSearcher};
pub use store::VectorStore;
