//! Error types for the embedding benchmark.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our custom error.
pub type Result<T> = std::result::Result<T, BenchError>;

/// Errors that can occur while ingesting, embedding or evaluating.
#[derive(Error, Debug)]
pub enum BenchError {
    /// Error reading or writing files.
    #[error("I/O error for path '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error during serialization/deserialization.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A PDF could not be opened or one of its pages could not be read.
    #[error("Failed to read PDF '{path}': {message}")]
    Pdf { path: PathBuf, message: String },

    /// The input directory does not exist or is not a directory.
    #[error("Input path '{0}' does not exist or is not a directory")]
    InputDirNotFound(PathBuf),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A model key that is not in the registry.
    #[error("Unknown model key '{0}'")]
    UnknownModel(String),

    /// Registry file is malformed.
    #[error("Invalid model registry: {0}")]
    Registry(String),

    /// Downloading or initializing a model failed.
    #[error("Failed to load model '{model}': {message}")]
    ModelLoad { model: String, message: String },

    /// Tokenization or inference failed.
    #[error("Embedding error: {0}")]
    Embedding(String),
}

impl BenchError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a PDF error with path context.
    pub fn pdf(path: impl Into<PathBuf>, message: impl std::fmt::Display) -> Self {
        Self::Pdf {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Create a model loading error.
    pub fn model_load(model: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::ModelLoad {
            model: model.into(),
            message: message.to_string(),
        }
    }
}

impl From<serde_json::Error> for BenchError {
    fn from(err: serde_json::Error) -> Self {
        BenchError::Serialization(err.to_string())
    }
}

#[cfg(feature = "models")]
impl From<candle_core::Error> for BenchError {
    fn from(err: candle_core::Error) -> Self {
        BenchError::Embedding(err.to_string())
    }
}
