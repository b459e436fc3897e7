//! In-memory vector store holding one model's passage embeddings.
//!
//! Each refresh replaces the whole store: documents are split into
//! overlapping passages, every passage is embedded with the current model,
//! and the previous model's vectors are dropped.

use crate::document::Document;
use crate::embeddings::Embedder;
use crate::error::{BenchError, Result};
use crate::persistence::{load_snapshot, save_snapshot};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// Passages embedded per model call.
const EMBED_BATCH_SIZE: usize = 32;

/// Configuration for text chunking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkConfig {
    /// Maximum characters per chunk.
    pub chunk_size: usize,
    /// Overlap between consecutive chunks.
    pub chunk_overlap: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: 512,
            chunk_overlap: 50,
        }
    }
}

/// A chunk of text with metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Chunk text content, always a substring of the document text.
    pub text: String,
    /// Start character position in original document.
    pub start_pos: usize,
    /// End character position in original document.
    pub end_pos: usize,
    /// Chunk index within its document.
    pub index: usize,
}

/// A stored passage and its embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredPassage {
    pub document_id: usize,
    pub chunk: Chunk,
    pub embedding: Vec<f32>,
}

/// Passage store for a single embedding model.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VectorStore {
    config: ChunkConfig,
    /// Key of the model that produced the current embeddings.
    model_key: Option<String>,
    passages: Vec<StoredPassage>,
}

impl VectorStore {
    /// Create a new empty store.
    pub fn new(config: ChunkConfig) -> Self {
        Self {
            config,
            model_key: None,
            passages: Vec::new(),
        }
    }

    /// Replace the store contents with `documents` embedded by `embedder`.
    ///
    /// Returns the number of stored passages. On error the store is left empty.
    pub fn refresh(
        &mut self,
        model_key: &str,
        documents: &[Document],
        embedder: &dyn Embedder,
    ) -> Result<usize> {
        self.passages.clear();
        self.model_key = None;

        let mut pending: Vec<(usize, Chunk)> = Vec::new();
        for document in documents {
            for chunk in chunk_text(&document.text, &self.config) {
                pending.push((document.id, chunk));
            }
        }

        let mut passages = Vec::with_capacity(pending.len());
        for batch in pending.chunks(EMBED_BATCH_SIZE) {
            let texts: Vec<&str> = batch.iter().map(|(_, c)| c.text.as_str()).collect();
            let embeddings = embedder.embed_passages(&texts)?;

            if embeddings.len() != batch.len() {
                return Err(BenchError::Embedding(format!(
                    "expected {} embeddings, got {}",
                    batch.len(),
                    embeddings.len()
                )));
            }

            for ((document_id, chunk), embedding) in batch.iter().zip(embeddings) {
                passages.push(StoredPassage {
                    document_id: *document_id,
                    chunk: chunk.clone(),
                    embedding,
                });
            }
            debug!(stored = passages.len(), total = pending.len(), "embedded passages");
        }

        self.passages = passages;
        self.model_key = Some(model_key.to_string());

        info!(
            model = model_key,
            documents = documents.len(),
            passages = self.passages.len(),
            "store refreshed"
        );
        Ok(self.passages.len())
    }

    /// Number of passages in the store.
    pub fn len(&self) -> usize {
        self.passages.len()
    }

    /// Check if store is empty.
    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }

    /// Get all passages.
    pub fn passages(&self) -> &[StoredPassage] {
        &self.passages
    }

    pub fn model_key(&self) -> Option<&str> {
        self.model_key.as_deref()
    }

    pub fn config(&self) -> &ChunkConfig {
        &self.config
    }

    /// Persist the store (JSON or bincode by extension).
    pub fn save(&self, path: &Path) -> Result<()> {
        save_snapshot(self, path)
    }

    /// Load a store written by [`VectorStore::save`].
    pub fn load(path: &Path) -> Result<Self> {
        load_snapshot(path)
    }
}

/// Chunk text into overlapping segments, preferring sentence boundaries.
pub fn chunk_text(text: &str, config: &ChunkConfig) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    let chars: Vec<char> = text.chars().collect();
    let text_len = chars.len();

    if text_len == 0 || config.chunk_size == 0 {
        return chunks;
    }

    let mut start = 0;
    let mut index = 0;

    while start < text_len {
        let end = (start + config.chunk_size).min(text_len);

        // Look for a sentence ending within the last 100 chars, but past start
        let adjusted_end = if end < text_len {
            let search_start = end.saturating_sub(100).max(start);
            chars[search_start..end]
                .iter()
                .rposition(|c| matches!(c, '.' | '!' | '?'))
                .map(|pos| search_start + pos + 1)
                .filter(|&candidate| candidate > start)
                .unwrap_or(end)
        } else {
            end
        };

        let final_end = adjusted_end.max(start + 1).min(text_len);
        let final_text: String = chars[start..final_end].iter().collect();

        if !final_text.trim().is_empty() {
            chunks.push(Chunk {
                text: final_text.trim().to_string(),
                start_pos: start,
                end_pos: final_end,
                index,
            });
            index += 1;
        }

        if final_end >= text_len {
            break;
        }

        let next_start = if config.chunk_overlap > 0 && final_end > config.chunk_overlap {
            final_end - config.chunk_overlap
        } else {
            final_end
        };

        // Always move forward by at least one character
        start = if next_start <= start {
            start + 1
        } else {
            next_start
        };
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::testing::WordHashEmbedder;
    use tempfile::TempDir;

    fn documents() -> Vec<Document> {
        vec![
            Document::from_pages(
                1,
                "eiffel.pdf",
                &["The Eiffel Tower was built for the 1889 World's Fair. Artists protested it."],
                Vec::new(),
            ),
            Document::from_pages(2, "empty.pdf", &["   "], Vec::new()),
            Document::from_pages(
                3,
                "wall.pdf",
                &["The Great Wall used beacon towers with smoke signals."],
                Vec::new(),
            ),
        ]
    }

    #[test]
    fn test_chunk_text() {
        let text = "This is a test. Another sentence here. And one more.";
        let config = ChunkConfig {
            chunk_size: 20,
            chunk_overlap: 5,
        };

        let chunks = chunk_text(text, &config);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(!chunk.text.is_empty());
            assert!(text.contains(&chunk.text));
        }
        let indices: Vec<_> = chunks.iter().map(|c| c.index).collect();
        assert_eq!(indices, (0..chunks.len()).collect::<Vec<_>>());
    }

    #[test]
    fn test_chunk_short_text_is_single_chunk() {
        let chunks = chunk_text("  Hello world  ", &ChunkConfig::default());
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "Hello world");
        assert!(chunk_text("", &ChunkConfig::default()).is_empty());
    }

    #[test]
    fn test_chunk_prefers_sentence_boundary() {
        let text = "Short sentence. Then a much longer tail that runs on";
        let config = ChunkConfig {
            chunk_size: 30,
            chunk_overlap: 0,
        };
        let chunks = chunk_text(text, &config);
        assert_eq!(chunks[0].text, "Short sentence.");
    }

    #[test]
    fn test_chunk_config_default() {
        let config = ChunkConfig::default();
        assert_eq!(config.chunk_size, 512);
        assert_eq!(config.chunk_overlap, 50);
    }

    #[test]
    fn test_refresh_replaces_contents() {
        let embedder = WordHashEmbedder::new();
        let mut store = VectorStore::new(ChunkConfig::default());

        let stored = store.refresh("first", &documents(), &embedder).unwrap();
        assert_eq!(stored, 2);
        assert_eq!(store.model_key(), Some("first"));
        let ids: Vec<_> = store.passages().iter().map(|p| p.document_id).collect();
        assert_eq!(ids, vec![1, 3]);

        let stored = store.refresh("second", &documents()[..1], &embedder).unwrap();
        assert_eq!(stored, 1);
        assert_eq!(store.len(), 1);
        assert_eq!(store.model_key(), Some("second"));
    }

    #[test]
    fn test_refresh_batches_passages() {
        let text = "Sentence number one is here. ".repeat(200);
        let docs = vec![Document::from_pages(1, "long.pdf", &[text.as_str()], Vec::new())];
        let embedder = WordHashEmbedder::new();
        let mut store = VectorStore::new(ChunkConfig {
            chunk_size: 40,
            chunk_overlap: 0,
        });

        let stored = store.refresh("m", &docs, &embedder).unwrap();
        assert!(stored > EMBED_BATCH_SIZE);
        assert_eq!(embedder.calls.get(), stored);
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.bin");

        let mut store = VectorStore::new(ChunkConfig::default());
        store
            .refresh("sbert-mini", &documents(), &WordHashEmbedder::new())
            .unwrap();
        store.save(&path).unwrap();

        let loaded = VectorStore::load(&path).unwrap();
        assert_eq!(loaded.model_key(), Some("sbert-mini"));
        assert_eq!(loaded.passages(), store.passages());
        assert_eq!(loaded.config(), store.config());
    }
}
