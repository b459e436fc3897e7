//! The query set every model is evaluated against.

use crate::error::{BenchError, Result};
use std::path::Path;

/// Built-in retrieval queries.
pub const DEFAULT_QUERIES: [&str; 12] = [
    "Which 19th-century metallic structure faced artistic backlash during its initial years despite now being celebrated globally?",
    "What is the widely accepted identity of the person depicted, and what is the reason behind the alternative name given to the portrait?",
    "Which components in the system are responsible for semantic segmentation of document content, and how are their outputs standardized for cross-model compatibility?",
    "What was Emperor Qin Shi Huang’s strategy for defending a unified territory against outside aggression?",
    "What open-source tool allows developers to implement numerical simulations and scientific analysis with extensive third-party package support?",
    "Which Renaissance technique contributed to the subtle transitions and emotional ambiguity in the subject’s face?",
    "What methods or models are employed to detect non-linear content flows, such as tables or multi-column layouts, in complex page formats?",
    "How do novel physical properties in subatomic systems enable massively parallel problem solving in next-generation processors?",
    "What towering creation was initially built to commemorate a major revolution’s centennial through a world exhibition?",
    "Which beginner-friendly coding language has gained traction in educational curricula due to its human-readable syntax?",
    "Which ancient structure in East Asia relied on smoke and fire to transmit military messages over long distances?",
    "What scientific phenomenon allows information units to remain linked across long distances, enhancing computational accuracy?",
];

/// Ordered list of queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySet {
    queries: Vec<String>,
}

impl QuerySet {
    pub fn new(queries: Vec<String>) -> Self {
        Self { queries }
    }

    /// The built-in query list.
    pub fn builtin() -> Self {
        Self::new(DEFAULT_QUERIES.iter().map(|q| q.to_string()).collect())
    }

    /// One query per non-blank line; lines starting with `#` are comments.
    pub fn from_lines(content: &str) -> Self {
        Self::new(
            content
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty() && !l.starts_with('#'))
                .map(str::to_string)
                .collect(),
        )
    }

    /// Load a query file, rejecting files without any query.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| BenchError::io(path, e))?;
        let queries = Self::from_lines(&content);
        if queries.is_empty() {
            return Err(BenchError::Config(format!(
                "query file '{}' contains no queries",
                path.display()
            )));
        }
        Ok(queries)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.queries.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }
}

impl Default for QuerySet {
    fn default() -> Self {
        Self::builtin()
    }
}
