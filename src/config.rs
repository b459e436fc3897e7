//! Configuration for the benchmark harness.
//!
//! Supports both environment variables and YAML config file.
//! Environment variables take precedence over config file values,
//! and command-line flags take precedence over both.

use crate::error::{BenchError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

/// Input and output locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory scanned for `*.pdf` files.
    pub pdf_dir: PathBuf,
    /// Directory receiving one `<model_key>_results.txt` per model.
    pub results_dir: PathBuf,
    /// Directory receiving extracted images.
    pub image_dir: PathBuf,
    /// JSON snapshot of the ingested documents.
    pub snapshot_path: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            pdf_dir: PathBuf::from("./pdf_documents"),
            results_dir: PathBuf::from("./results"),
            image_dir: PathBuf::from("./extracted_images"),
            snapshot_path: PathBuf::from("sample_documents.json"),
        }
    }
}

/// Evaluation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalConfig {
    /// Number of hits requested from the store per query.
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Number of words kept when rendering the matched passage.
    #[serde(default = "default_truncate_words")]
    pub truncate_words: usize,

    /// Maximum characters per stored passage.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Overlap between consecutive passages.
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

fn default_top_k() -> usize {
    5
}

fn default_truncate_words() -> usize {
    15
}

fn default_chunk_size() -> usize {
    512
}

fn default_chunk_overlap() -> usize {
    50
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            truncate_words: default_truncate_words(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

/// Full application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Filesystem locations
    pub paths: PathsConfig,
    /// Evaluation knobs
    pub eval: EvalConfig,
    /// YAML file replacing the built-in model registry
    pub registry_file: Option<PathBuf>,
    /// Text file replacing the built-in query list
    pub queries_file: Option<PathBuf>,
}

/// Configuration file structure (YAML format).
#[derive(Debug, Deserialize)]
struct ConfigFile {
    paths: Option<PathsFileSection>,
    eval: Option<EvalFileSection>,
    registry_file: Option<PathBuf>,
    queries_file: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct PathsFileSection {
    pdf_dir: Option<PathBuf>,
    results_dir: Option<PathBuf>,
    image_dir: Option<PathBuf>,
    snapshot_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct EvalFileSection {
    top_k: Option<usize>,
    truncate_words: Option<usize>,
    chunk_size: Option<usize>,
    chunk_overlap: Option<usize>,
}

impl Config {
    /// Load configuration from environment variables and optional config file.
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (EMBED_BENCH_PDF_DIR, EMBED_BENCH_TOP_K, ...)
    /// 2. Config file (~/.config/embed-bench/config.yaml)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        let mut config = Config::default();

        if let Some(config_path) = Self::config_file_path() {
            if config_path.exists() {
                config = Self::load_from_file(&config_path)?;
            }
        }

        config.apply_env();
        Ok(config)
    }

    /// Override values with any `EMBED_BENCH_*` environment variables that are set.
    fn apply_env(&mut self) {
        if let Ok(dir) = env::var("EMBED_BENCH_PDF_DIR") {
            self.paths.pdf_dir = PathBuf::from(dir);
        }

        if let Ok(dir) = env::var("EMBED_BENCH_RESULTS_DIR") {
            self.paths.results_dir = PathBuf::from(dir);
        }

        if let Ok(dir) = env::var("EMBED_BENCH_IMAGE_DIR") {
            self.paths.image_dir = PathBuf::from(dir);
        }

        if let Ok(top_k) = env::var("EMBED_BENCH_TOP_K") {
            if let Ok(k) = top_k.parse() {
                self.eval.top_k = k;
            }
        }

        if let Ok(words) = env::var("EMBED_BENCH_TRUNCATE_WORDS") {
            if let Ok(n) = words.parse() {
                self.eval.truncate_words = n;
            }
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| BenchError::io(path, e))?;
        Self::from_yaml(&content)
    }

    fn from_yaml(content: &str) -> Result<Self> {
        let file_config: ConfigFile = serde_yaml::from_str(content)
            .map_err(|e| BenchError::Config(format!("Failed to parse config file: {}", e)))?;

        let mut config = Config::default();

        if let Some(paths) = file_config.paths {
            if let Some(dir) = paths.pdf_dir {
                config.paths.pdf_dir = dir;
            }
            if let Some(dir) = paths.results_dir {
                config.paths.results_dir = dir;
            }
            if let Some(dir) = paths.image_dir {
                config.paths.image_dir = dir;
            }
            if let Some(path) = paths.snapshot_path {
                config.paths.snapshot_path = path;
            }
        }

        if let Some(eval) = file_config.eval {
            if let Some(top_k) = eval.top_k {
                config.eval.top_k = top_k;
            }
            if let Some(words) = eval.truncate_words {
                config.eval.truncate_words = words;
            }
            if let Some(size) = eval.chunk_size {
                config.eval.chunk_size = size;
            }
            if let Some(overlap) = eval.chunk_overlap {
                config.eval.chunk_overlap = overlap;
            }
        }

        config.registry_file = file_config.registry_file;
        config.queries_file = file_config.queries_file;

        Ok(config)
    }

    /// Get the default config file path.
    pub fn config_file_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "embed-bench")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Validate that settings are usable.
    pub fn validate(&self) -> Result<()> {
        if self.eval.top_k == 0 {
            return Err(BenchError::Config("top_k must be at least 1".to_string()));
        }

        if self.eval.truncate_words == 0 {
            return Err(BenchError::Config(
                "truncate_words must be at least 1".to_string(),
            ));
        }

        if self.eval.chunk_size == 0 {
            return Err(BenchError::Config("chunk_size must be at least 1".to_string()));
        }

        if self.eval.chunk_overlap >= self.eval.chunk_size {
            return Err(BenchError::Config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.eval.chunk_overlap, self.eval.chunk_size
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.paths.pdf_dir, PathBuf::from("./pdf_documents"));
        assert_eq!(config.paths.results_dir, PathBuf::from("./results"));
        assert_eq!(config.paths.image_dir, PathBuf::from("./extracted_images"));
        assert_eq!(config.paths.snapshot_path, PathBuf::from("sample_documents.json"));
        assert_eq!(config.eval.truncate_words, 15);
        assert_eq!(config.eval.top_k, 5);
        assert!(config.registry_file.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.eval.top_k = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.eval.chunk_overlap = config.eval.chunk_size;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.eval.truncate_words = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = "paths:\n  pdf_dir: /data/pdfs\neval:\n  truncate_words: 20\n";
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.paths.pdf_dir, PathBuf::from("/data/pdfs"));
        assert_eq!(config.paths.results_dir, PathBuf::from("./results"));
        assert_eq!(config.eval.truncate_words, 20);
        assert_eq!(config.eval.chunk_size, 512);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "registry_file: models.yaml\neval:\n  top_k: 3\n").unwrap();

        let config = Config::load_from_file(&path).unwrap();
        assert_eq!(config.eval.top_k, 3);
        assert_eq!(config.registry_file, Some(PathBuf::from("models.yaml")));
    }

    #[test]
    fn test_invalid_yaml() {
        assert!(Config::from_yaml("eval: [not, a, map]").is_err());
    }
}
