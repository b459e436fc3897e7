//! Text embedding.
//!
//! [`Embedder`] is the single capability the store and the evaluation loop
//! need: turn text into a fixed-length vector. [`ModelLoader`] turns a
//! registry entry into an embedder, so the loop can be driven by a real
//! Hugging Face model or by a test double.

#[cfg(feature = "models")]
mod bert;

#[cfg(feature = "models")]
pub use bert::{BertEmbedder, HubLoader};

use crate::error::Result;
use crate::registry::ModelEntry;

/// Maps text to a fixed-length vector.
pub trait Embedder {
    /// Embed a single text.
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed several texts; the default embeds them one at a time.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    /// Embed a search query. Models trained with query instructions override this.
    fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        self.embed(query)
    }

    /// Embed stored passages. Models trained with passage instructions override this.
    fn embed_passages(&self, passages: &[&str]) -> Result<Vec<Vec<f32>>> {
        self.embed_batch(passages)
    }
}

impl<E: Embedder + ?Sized> Embedder for Box<E> {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        (**self).embed(text)
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        (**self).embed_batch(texts)
    }

    fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        (**self).embed_query(query)
    }

    fn embed_passages(&self, passages: &[&str]) -> Result<Vec<Vec<f32>>> {
        (**self).embed_passages(passages)
    }
}

/// Produces an embedder for a registry entry.
pub trait ModelLoader {
    fn load(&self, entry: &ModelEntry) -> Result<Box<dyn Embedder>>;
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::error::BenchError;
    use std::cell::Cell;

    const DIMENSION: usize = 64;

    /// Bag-of-words embedder: each lowercase word is hashed into one of 64 buckets.
    #[derive(Debug, Default)]
    pub(crate) struct WordHashEmbedder {
        pub(crate) query_prefix: Option<String>,
        pub(crate) calls: Cell<usize>,
    }

    impl WordHashEmbedder {
        pub(crate) fn new() -> Self {
            Self::default()
        }
    }

    fn bucket(word: &str) -> usize {
        // FNV-1a
        let mut hash: u64 = 0xcbf29ce484222325;
        for byte in word.bytes() {
            hash ^= byte as u64;
            hash = hash.wrapping_mul(0x100000001b3);
        }
        (hash % DIMENSION as u64) as usize
    }

    impl Embedder for WordHashEmbedder {
        fn embed(&self, text: &str) -> Result<Vec<f32>> {
            self.calls.set(self.calls.get() + 1);
            let mut vector = vec![0.0; DIMENSION];
            for word in text
                .split(|c: char| !c.is_alphanumeric())
                .filter(|w| !w.is_empty())
            {
                vector[bucket(&word.to_lowercase())] += 1.0;
            }
            Ok(vector)
        }

        fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
            match &self.query_prefix {
                Some(prefix) => self.embed(&format!("{}{}", prefix, query)),
                None => self.embed(query),
            }
        }
    }

    /// Loader handing out [`WordHashEmbedder`]s, failing for keys listed in `broken`.
    #[derive(Debug, Default)]
    pub(crate) struct WordHashLoader {
        pub(crate) broken: Vec<String>,
        pub(crate) loaded: std::cell::RefCell<Vec<String>>,
    }

    impl ModelLoader for WordHashLoader {
        fn load(&self, entry: &ModelEntry) -> Result<Box<dyn Embedder>> {
            self.loaded.borrow_mut().push(entry.key.clone());
            if self.broken.contains(&entry.key) {
                return Err(BenchError::model_load(&entry.identifier, "weights missing"));
            }
            Ok(Box::new(WordHashEmbedder::new()))
        }
    }
}
