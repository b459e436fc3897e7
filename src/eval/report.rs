//! Per-model result files.
//!
//! A result file holds a header line, one block per answered query and a
//! trailing elapsed-time line:
//!
//! ```text
//! Model: sbert-mini (sentence-transformers/all-MiniLM-L6-v2)
//!
//! Query 1: Which 19th-century metallic structure ...
//! 0.6123 | eiffel.pdf | The Eiffel Tower was built for the 1889 World's Fair ...
//!
//!
//! ⏱ Total Time Taken: 12.34 seconds
//! ```

use crate::error::{BenchError, Result};
use crate::registry::ModelEntry;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File name reported when no document contains the matched passage.
pub const UNKNOWN_SOURCE: &str = "unknown";

/// Marker appended to truncated passages.
const ELLIPSIS: &str = " ...";

/// The top hit for one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryOutcome {
    /// 1-based position in the query list.
    pub index: usize,
    pub query: String,
    pub score: f32,
    /// Source document file name, or [`UNKNOWN_SOURCE`].
    pub file_name: String,
    /// Matched passage cut to the configured word count.
    pub snippet: String,
}

impl QueryOutcome {
    /// `"Query {i}: {query}\n{score:.4} | {file_name} | {snippet}\n\n"`
    pub fn block(&self) -> String {
        format!("Query {}: {}\n{}\n\n", self.index, self.query, self.score_line())
    }

    /// `"{score:.4} | {file_name} | {snippet}"`
    pub fn score_line(&self) -> String {
        format!("{:.4} | {} | {}", self.score, self.file_name, self.snippet)
    }
}

/// Keep the first `max_words` words of `text`.
///
/// Text within the limit is returned unchanged; longer text is re-joined
/// with single spaces and gets a `" ..."` suffix.
pub fn truncate_words(text: &str, max_words: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() > max_words {
        format!("{}{}", words[..max_words].join(" "), ELLIPSIS)
    } else {
        text.to_string()
    }
}

/// `<results_dir>/<model_key>_results.txt`
pub fn result_file_path(results_dir: &Path, model_key: &str) -> PathBuf {
    results_dir.join(format!("{}_results.txt", model_key))
}

/// Writes one model's result file, replacing any previous run's file.
pub struct ResultWriter {
    path: PathBuf,
    out: BufWriter<File>,
    blocks: usize,
}

impl ResultWriter {
    /// Create the file and write the header.
    pub fn create(results_dir: &Path, entry: &ModelEntry) -> Result<Self> {
        let path = result_file_path(results_dir, &entry.key);
        let file = File::create(&path).map_err(|e| BenchError::io(&path, e))?;

        let mut writer = Self {
            path,
            out: BufWriter::new(file),
            blocks: 0,
        };
        writer.write(&format!("Model: {} ({})\n\n", entry.key, entry.identifier))?;
        Ok(writer)
    }

    pub fn write_outcome(&mut self, outcome: &QueryOutcome) -> Result<()> {
        self.write(&outcome.block())?;
        self.blocks += 1;
        Ok(())
    }

    /// Number of query blocks written so far.
    pub fn blocks(&self) -> usize {
        self.blocks
    }

    /// Append the elapsed-time line, flush, and return the file path.
    pub fn finish(mut self, elapsed: Duration) -> Result<PathBuf> {
        self.write(&format!(
            "\n⏱ Total Time Taken: {:.2} seconds\n",
            elapsed.as_secs_f64()
        ))?;
        self.out
            .flush()
            .map_err(|e| BenchError::io(&self.path, e))?;
        Ok(self.path)
    }

    fn write(&mut self, text: &str) -> Result<()> {
        self.out
            .write_all(text.as_bytes())
            .map_err(|e| BenchError::io(&self.path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn outcome() -> QueryOutcome {
        QueryOutcome {
            index: 3,
            query: "Who built the wall?".to_string(),
            score: 0.812345,
            file_name: "wall.pdf".to_string(),
            snippet: "The Great Wall".to_string(),
        }
    }

    #[test]
    fn test_truncate_short_text_unchanged() {
        let text = "  one two   three ";
        assert_eq!(truncate_words(text, 15), text);

        let fifteen = (1..=15).map(|i| i.to_string()).collect::<Vec<_>>().join(" ");
        assert_eq!(truncate_words(&fifteen, 15), fifteen);
    }

    #[test]
    fn test_truncate_long_text() {
        let text = (1..=20).map(|i| format!("w{}", i)).collect::<Vec<_>>().join("  ");
        let truncated = truncate_words(&text, 15);
        assert_eq!(
            truncated,
            "w1 w2 w3 w4 w5 w6 w7 w8 w9 w10 w11 w12 w13 w14 w15 ..."
        );
    }

    #[test]
    fn test_truncate_counts_words_not_chars() {
        let text = "supercalifragilisticexpialidocious antidisestablishmentarianism";
        assert_eq!(truncate_words(text, 2), text);
        assert_eq!(truncate_words(text, 1), "supercalifragilisticexpialidocious ...");
    }

    #[test]
    fn test_block_format() {
        assert_eq!(
            outcome().block(),
            "Query 3: Who built the wall?\n0.8123 | wall.pdf | The Great Wall\n\n"
        );
    }

    #[test]
    fn test_result_file_layout() {
        let dir = TempDir::new().unwrap();
        let entry = ModelEntry::new("sbert-mini", "sentence-transformers/all-MiniLM-L6-v2");

        let mut writer = ResultWriter::create(dir.path(), &entry).unwrap();
        writer.write_outcome(&outcome()).unwrap();
        assert_eq!(writer.blocks(), 1);
        let path = writer.finish(Duration::from_millis(1500)).unwrap();

        assert_eq!(path, dir.path().join("sbert-mini_results.txt"));
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "Model: sbert-mini (sentence-transformers/all-MiniLM-L6-v2)\n\n\
             Query 3: Who built the wall?\n0.8123 | wall.pdf | The Great Wall\n\n\
             \n⏱ Total Time Taken: 1.50 seconds\n"
        );
    }

    #[test]
    fn test_result_file_is_overwritten() {
        let dir = TempDir::new().unwrap();
        let entry = ModelEntry::new("gte-base", "thenlper/gte-base");

        let mut first = ResultWriter::create(dir.path(), &entry).unwrap();
        first.write_outcome(&outcome()).unwrap();
        first.finish(Duration::from_secs(1)).unwrap();

        let second = ResultWriter::create(dir.path(), &entry).unwrap();
        let path = second.finish(Duration::from_secs(2)).unwrap();

        let content = std::fs::read_to_string(path).unwrap();
        assert!(!content.contains("Query"));
        assert_eq!(content.matches("Total Time Taken").count(), 1);
    }
}
