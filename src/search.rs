//! Semantic search over a [`VectorStore`].

use crate::embeddings::{Embedder, cosine_similarity};
use crate::error::Result;
use crate::store::VectorStore;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// One ranked passage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Passage text.
    pub text: String,
    /// Cosine similarity to the query.
    pub score: f32,
    /// Document the passage was stored under.
    pub document_id: usize,
}

/// Ranks stored passages against a query using the store's model.
pub struct SemanticSearcher<'a> {
    store: &'a VectorStore,
    embedder: &'a dyn Embedder,
}

impl<'a> SemanticSearcher<'a> {
    /// Create a new searcher.
    ///
    /// `embedder` must be the model the store was last refreshed with.
    pub fn new(store: &'a VectorStore, embedder: &'a dyn Embedder) -> Self {
        Self { store, embedder }
    }

    /// Return at most `top_k` hits, best first. An empty store yields no hits.
    pub fn search(&self, query: &str, top_k: usize) -> Result<Vec<SearchHit>> {
        if self.store.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }

        let query_embedding = self.embedder.embed_query(query)?;

        let mut hits: Vec<SearchHit> = self
            .store
            .passages()
            .iter()
            .map(|passage| SearchHit {
                text: passage.chunk.text.clone(),
                score: cosine_similarity(&query_embedding, &passage.embedding),
                document_id: passage.document_id,
            })
            .collect();

        // Stable sort keeps store order among equal scores
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        hits.truncate(top_k);

        Ok(hits)
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::embeddings::testing::WordHashEmbedder;
    use crate::store::ChunkConfig;

    fn store(embedder: &WordHashEmbedder) -> VectorStore {
        let docs = vec![
            Document::from_pages(1, "a.pdf", &["Python is a readable programming language."], Vec::new()),
            Document::from_pages(2, "b.pdf", &["Qubits rely on entanglement and superposition."], Vec::new()),
            Document::from_pages(3, "c.pdf", &["The Mona Lisa uses sfumato shading."], Vec::new()),
        ];
        let mut store = VectorStore::new(ChunkConfig::default());
        store.refresh("test", &docs, embedder).unwrap();
        store
    }

    #[test]
    fn test_best_match_first() {
        let embedder = WordHashEmbedder::new();
        let store = store(&embedder);
        let searcher = SemanticSearcher::new(&store, &embedder);

        let hits = searcher.search("entanglement of qubits", 3).unwrap();
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].document_id, 2);
        assert!(hits[0].score >= hits[1].score);
        assert!(hits[1].score >= hits[2].score);
    }

    #[test]
    fn test_top_k_limits_results() {
        let embedder = WordHashEmbedder::new();
        let store = store(&embedder);
        let searcher = SemanticSearcher::new(&store, &embedder);

        assert_eq!(searcher.search("sfumato", 1).unwrap().len(), 1);
        assert!(searcher.search("sfumato", 0).unwrap().is_empty());
    }

    #[test]
    fn test_empty_store_returns_nothing() {
        let embedder = WordHashEmbedder::new();
        let store = VectorStore::new(ChunkConfig::default());
        let searcher = SemanticSearcher::new(&store, &embedder);

        assert!(searcher.search("anything", 5).unwrap().is_empty());
    }
}
