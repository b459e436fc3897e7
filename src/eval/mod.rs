//! Retrieval evaluation across embedding models.
//!
//! This module provides:
//! - The fixed query set (`queries`)
//! - Per-model result files and passage truncation (`report`)
//! - The model-by-model evaluation loop and run summary (`runner`)

pub mod queries;
pub mod report;
pub mod runner;

pub use queries::{DEFAULT_QUERIES, QuerySet};
pub use report::{QueryOutcome, ResultWriter, UNKNOWN_SOURCE, result_file_path, truncate_words};
pub use runner::{EvalSettings, Evaluator, ModelOutcome, RunSummary};
