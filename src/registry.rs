//! Model registry: short keys mapped to Hugging Face model identifiers.
//!
//! The built-in table covers the BERT and XLM-RoBERTa models the harness can
//! run locally. A YAML file with the same shape replaces it entirely:
//!
//! ```yaml
//! - key: e5-base-v2
//!   identifier: intfloat/e5-base-v2
//!   query_prefix: "query: "
//!   passage_prefix: "passage: "
//! - key: bge-m3
//!   identifier: BAAI/bge-m3
//!   architecture: xlm-roberta
//!   pooling: cls
//! ```

use crate::error::{BenchError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// How token embeddings are reduced to one sentence vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pooling {
    /// Attention-masked mean over all tokens.
    #[default]
    Mean,
    /// Hidden state of the leading `[CLS]` token.
    Cls,
}

/// Encoder architecture used to load a model's weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Architecture {
    #[default]
    Bert,
    XlmRoberta,
}

/// One registry row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelEntry {
    /// Short name used in output file names.
    pub key: String,
    /// Fully-qualified Hub identifier.
    pub identifier: String,
    #[serde(default)]
    pub architecture: Architecture,
    #[serde(default)]
    pub pooling: Pooling,
    /// Prepended to every query before embedding.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_prefix: Option<String>,
    /// Prepended to every stored passage before embedding.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passage_prefix: Option<String>,
}

impl ModelEntry {
    /// Create a BERT entry with mean pooling and no prefixes.
    pub fn new(key: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            identifier: identifier.into(),
            architecture: Architecture::Bert,
            pooling: Pooling::Mean,
            query_prefix: None,
            passage_prefix: None,
        }
    }

    pub fn with_architecture(mut self, architecture: Architecture) -> Self {
        self.architecture = architecture;
        self
    }

    pub fn with_pooling(mut self, pooling: Pooling) -> Self {
        self.pooling = pooling;
        self
    }

    pub fn with_prefixes(mut self, query: Option<&str>, passage: Option<&str>) -> Self {
        self.query_prefix = query.map(str::to_string);
        self.passage_prefix = passage.map(str::to_string);
        self
    }
}

/// Ordered collection of model entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelRegistry {
    entries: Vec<ModelEntry>,
}

impl ModelRegistry {
    /// Build a registry, rejecting empty tables and duplicate keys.
    pub fn new(entries: Vec<ModelEntry>) -> Result<Self> {
        if entries.is_empty() {
            return Err(BenchError::Registry("registry has no models".to_string()));
        }

        let mut seen = HashSet::new();
        for entry in &entries {
            if entry.key.trim().is_empty() || entry.identifier.trim().is_empty() {
                return Err(BenchError::Registry(
                    "model key and identifier must not be empty".to_string(),
                ));
            }
            if !seen.insert(entry.key.as_str()) {
                return Err(BenchError::Registry(format!(
                    "duplicate model key '{}'",
                    entry.key
                )));
            }
        }

        Ok(Self { entries })
    }

    /// The built-in table.
    pub fn builtin() -> Self {
        let query_instruction = "Represent this sentence for searching relevant passages: ";

        Self {
            entries: vec![
                // BGE Series (BAAI)
                ModelEntry::new("bge-base-en", "BAAI/bge-base-en").with_pooling(Pooling::Cls),
                ModelEntry::new("bge-large-en", "BAAI/bge-large-en").with_pooling(Pooling::Cls),
                ModelEntry::new("bge-m3", "BAAI/bge-m3")
                    .with_architecture(Architecture::XlmRoberta)
                    .with_pooling(Pooling::Cls),
                // E5 Series (intfloat)
                ModelEntry::new("e5-base-v2", "intfloat/e5-base-v2")
                    .with_prefixes(Some("query: "), Some("passage: ")),
                ModelEntry::new("e5-large-v2", "intfloat/e5-large-v2")
                    .with_prefixes(Some("query: "), Some("passage: ")),
                // GTE Series (thenlper)
                ModelEntry::new("gte-base", "thenlper/gte-base"),
                ModelEntry::new("gte-large", "thenlper/gte-large"),
                // Sentence Transformers
                ModelEntry::new("sbert-mini", "sentence-transformers/all-MiniLM-L6-v2"),
                // MixedBread
                ModelEntry::new("mixedbread", "mixedbread-ai/mxbai-embed-large-v1")
                    .with_pooling(Pooling::Cls)
                    .with_prefixes(Some(query_instruction), None),
            ],
        }
    }

    /// Load a registry from a YAML list of entries.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| BenchError::io(path, e))?;
        Self::from_yaml(&content)
    }

    fn from_yaml(content: &str) -> Result<Self> {
        let entries: Vec<ModelEntry> = serde_yaml::from_str(content)
            .map_err(|e| BenchError::Registry(format!("Failed to parse registry: {}", e)))?;
        Self::new(entries)
    }

    /// Look up an entry by key.
    pub fn get(&self, key: &str) -> Result<&ModelEntry> {
        self.entries
            .iter()
            .find(|e| e.key == key)
            .ok_or_else(|| BenchError::UnknownModel(key.to_string()))
    }

    /// Restrict the registry to `keys`, in the order given.
    pub fn select<S: AsRef<str>>(&self, keys: &[S]) -> Result<Self> {
        let entries = keys
            .iter()
            .map(|k| self.get(k.as_ref()).cloned())
            .collect::<Result<Vec<_>>>()?;
        Self::new(entries)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModelEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_keys_are_unique() {
        let registry = ModelRegistry::builtin();
        assert_eq!(registry.len(), 9);
        assert!(ModelRegistry::new(registry.iter().cloned().collect()).is_ok());
    }

    #[test]
    fn test_get() {
        let registry = ModelRegistry::builtin();
        let entry = registry.get("sbert-mini").unwrap();
        assert_eq!(entry.identifier, "sentence-transformers/all-MiniLM-L6-v2");
        assert_eq!(entry.pooling, Pooling::Mean);
        assert_eq!(entry.architecture, Architecture::Bert);

        let m3 = registry.get("bge-m3").unwrap();
        assert_eq!(m3.architecture, Architecture::XlmRoberta);
        assert_eq!(m3.pooling, Pooling::Cls);

        assert!(matches!(
            registry.get("stella"),
            Err(BenchError::UnknownModel(_))
        ));
    }

    #[test]
    fn test_select_preserves_requested_order() {
        let registry = ModelRegistry::builtin();
        let selected = registry.select(&["gte-base", "bge-base-en"]).unwrap();
        let keys: Vec<_> = selected.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["gte-base", "bge-base-en"]);

        assert!(registry.select(&["nope"]).is_err());
    }

    #[test]
    fn test_from_yaml() {
        let yaml = r#"
- key: e5-small
  identifier: intfloat/e5-small-v2
  query_prefix: "query: "
  passage_prefix: "passage: "
- key: bge-small
  identifier: BAAI/bge-small-en-v1.5
  pooling: cls
- key: m3
  identifier: BAAI/bge-m3
  architecture: xlm-roberta
"#;
        let registry = ModelRegistry::from_yaml(yaml).unwrap();
        assert_eq!(registry.len(), 3);

        let e5 = registry.get("e5-small").unwrap();
        assert_eq!(e5.pooling, Pooling::Mean);
        assert_eq!(e5.query_prefix.as_deref(), Some("query: "));

        let bge = registry.get("bge-small").unwrap();
        assert_eq!(bge.pooling, Pooling::Cls);
        assert!(bge.passage_prefix.is_none());
        assert_eq!(bge.architecture, Architecture::Bert);

        assert_eq!(
            registry.get("m3").unwrap().architecture,
            Architecture::XlmRoberta
        );
    }

    #[test]
    fn test_unknown_architecture_is_rejected() {
        let yaml = "- key: mp\n  identifier: x/mpnet\n  architecture: mpnet\n";
        assert!(matches!(
            ModelRegistry::from_yaml(yaml),
            Err(BenchError::Registry(_))
        ));
    }

    #[test]
    fn test_rejects_duplicates_and_empty() {
        let yaml = "- key: a\n  identifier: x/a\n- key: a\n  identifier: x/b\n";
        assert!(ModelRegistry::from_yaml(yaml).is_err());
        assert!(ModelRegistry::new(Vec::new()).is_err());
    }
}
