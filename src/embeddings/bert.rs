//! BERT-family sentence embeddings with candle, weights from the Hugging Face Hub.
//!
//! Plain BERT checkpoints and XLM-RoBERTa checkpoints (such as `BAAI/bge-m3`)
//! share the tokenize, pool and normalize path; only the encoder differs.

use super::{Embedder, ModelLoader};
use crate::error::{BenchError, Result};
use crate::registry::{Architecture, ModelEntry, Pooling};
use candle_core::{Device, IndexOp, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig, DTYPE};
use candle_transformers::models::xlm_roberta::{Config as XlmRobertaConfig, XLMRobertaModel};
use hf_hub::{Repo, RepoType, api::sync::Api};
use tokenizers::{Tokenizer, TruncationParams};
use tracing::{debug, info};

/// Longest token sequence fed to the model.
const MAX_SEQUENCE_LENGTH: usize = 512;

/// The transformer producing per-token hidden states.
enum Encoder {
    Bert(BertModel),
    XlmRoberta(XLMRobertaModel),
}

impl Encoder {
    fn load(
        architecture: Architecture,
        config_json: &str,
        vb: VarBuilder,
    ) -> std::result::Result<Self, String> {
        match architecture {
            Architecture::Bert => {
                let config: BertConfig = serde_json::from_str(config_json)
                    .map_err(|e| format!("failed to parse config: {}", e))?;
                BertModel::load(vb, &config)
                    .map(Self::Bert)
                    .map_err(|e| format!("failed to build BERT model: {}", e))
            }
            Architecture::XlmRoberta => {
                let config: XlmRobertaConfig = serde_json::from_str(config_json)
                    .map_err(|e| format!("failed to parse config: {}", e))?;
                // Checkpoints exported from a task head nest the encoder under `roberta`.
                XLMRobertaModel::new(&config, vb.clone())
                    .or_else(|_| XLMRobertaModel::new(&config, vb.pp("roberta")))
                    .map(Self::XlmRoberta)
                    .map_err(|e| format!("failed to build XLM-RoBERTa model: {}", e))
            }
        }
    }

    /// Token id used to fill short sequences in a batch.
    fn pad_id(architecture: Architecture, config_json: &str) -> u32 {
        match architecture {
            Architecture::Bert => 0,
            Architecture::XlmRoberta => serde_json::from_str::<serde_json::Value>(config_json)
                .ok()
                .and_then(|v| v.get("pad_token_id").and_then(|id| id.as_u64()))
                .and_then(|id| u32::try_from(id).ok())
                .unwrap_or(1),
        }
    }

    fn forward(
        &self,
        input_ids: &Tensor,
        token_type_ids: &Tensor,
        attention_mask: &Tensor,
    ) -> candle_core::Result<Tensor> {
        match self {
            Self::Bert(model) => model.forward(input_ids, token_type_ids, Some(attention_mask)),
            Self::XlmRoberta(model) => {
                model.forward(input_ids, attention_mask, token_type_ids, None, None, None)
            }
        }
    }
}

/// Embedding model for generating text embeddings.
pub struct BertEmbedder {
    encoder: Encoder,
    pad_id: u32,
    tokenizer: Tokenizer,
    device: Device,
    pooling: Pooling,
    query_prefix: Option<String>,
    passage_prefix: Option<String>,
    normalize: bool,
}

impl BertEmbedder {
    /// Download (or reuse the cached copy of) a registry model and load it on CPU.
    pub fn load(entry: &ModelEntry) -> Result<Self> {
        let device = Device::Cpu;
        let model_id = entry.identifier.as_str();
        let fail = |message: String| BenchError::model_load(model_id, message);

        info!(model = model_id, architecture = ?entry.architecture, "loading embedding model");

        let api = Api::new().map_err(|e| fail(format!("failed to create HF Hub API: {}", e)))?;
        let repo = api.repo(Repo::new(model_id.to_string(), RepoType::Model));

        let config_path = repo
            .get("config.json")
            .map_err(|e| fail(format!("failed to get config.json: {}", e)))?;
        let tokenizer_path = repo
            .get("tokenizer.json")
            .map_err(|e| fail(format!("failed to get tokenizer.json: {}", e)))?;

        let config_json =
            std::fs::read_to_string(&config_path).map_err(|e| BenchError::io(&config_path, e))?;

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| fail(format!("failed to load tokenizer: {}", e)))?;
        tokenizer.with_padding(None);
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: MAX_SEQUENCE_LENGTH,
                ..Default::default()
            }))
            .map_err(|e| fail(format!("failed to configure truncation: {}", e)))?;

        let vb = match repo.get("model.safetensors") {
            Ok(weights) => unsafe {
                VarBuilder::from_mmaped_safetensors(&[weights], DTYPE, &device)
                    .map_err(|e| fail(format!("failed to load weights: {}", e)))?
            },
            Err(_) => {
                let weights = repo
                    .get("pytorch_model.bin")
                    .map_err(|e| fail(format!("failed to get model weights: {}", e)))?;
                VarBuilder::from_pth(&weights, DTYPE, &device)
                    .map_err(|e| fail(format!("failed to load weights: {}", e)))?
            }
        };

        let encoder = Encoder::load(entry.architecture, &config_json, vb).map_err(fail)?;

        Ok(Self {
            encoder,
            pad_id: Encoder::pad_id(entry.architecture, &config_json),
            tokenizer,
            device,
            pooling: entry.pooling,
            query_prefix: entry.query_prefix.clone(),
            passage_prefix: entry.passage_prefix.clone(),
            normalize: true,
        })
    }

    /// Run the model on a batch and pool to one vector per text.
    fn forward(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| BenchError::Embedding(format!("tokenization failed: {}", e)))?;

        let max_len = encodings
            .iter()
            .map(|e| e.get_ids().len())
            .max()
            .unwrap_or(0);

        let mut input_ids_vec = Vec::with_capacity(texts.len() * max_len);
        let mut attention_mask_vec = Vec::with_capacity(texts.len() * max_len);

        for encoding in &encodings {
            let mut padded_ids = encoding.get_ids().to_vec();
            let mut padded_mask = encoding.get_attention_mask().to_vec();
            padded_ids.resize(max_len, self.pad_id);
            padded_mask.resize(max_len, 0);

            input_ids_vec.extend(padded_ids);
            attention_mask_vec.extend(padded_mask);
        }

        let batch_size = texts.len();
        let input_ids = Tensor::from_vec(input_ids_vec, (batch_size, max_len), &self.device)?;
        let attention_mask =
            Tensor::from_vec(attention_mask_vec, (batch_size, max_len), &self.device)?;
        let token_type_ids = input_ids.zeros_like()?;

        let output = self
            .encoder
            .forward(&input_ids, &token_type_ids, &attention_mask)?;

        let pooled = match self.pooling {
            Pooling::Cls => output.i((.., 0))?,
            Pooling::Mean => {
                let mask = attention_mask
                    .unsqueeze(2)?
                    .to_dtype(output.dtype())?
                    .broadcast_as(output.shape())?;
                let summed = (output * &mask)?.sum(1)?;
                let counts = mask.sum(1)?.clamp(1e-9, f64::MAX)?;
                (summed / counts)?
            }
        };

        let pooled = if self.normalize {
            let norms = pooled.sqr()?.sum_keepdim(1)?.sqrt()?;
            pooled.broadcast_div(&norms)?
        } else {
            pooled
        };

        debug!(batch = batch_size, tokens = max_len, "embedded batch");
        Ok(pooled.to_vec2::<f32>()?)
    }
}

fn with_prefix<'a>(prefix: Option<&str>, texts: &[&'a str]) -> Vec<std::borrow::Cow<'a, str>> {
    texts
        .iter()
        .map(|t| match prefix {
            Some(p) => std::borrow::Cow::Owned(format!("{}{}", p, t)),
            None => std::borrow::Cow::Borrowed(*t),
        })
        .collect()
}

impl Embedder for BertEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.forward(&[text])?
            .into_iter()
            .next()
            .ok_or_else(|| BenchError::Embedding("model returned no embedding".to_string()))
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        self.forward(texts)
    }

    fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        let texts = with_prefix(self.query_prefix.as_deref(), &[query]);
        self.embed(&texts[0])
    }

    fn embed_passages(&self, passages: &[&str]) -> Result<Vec<Vec<f32>>> {
        let texts = with_prefix(self.passage_prefix.as_deref(), passages);
        let refs: Vec<&str> = texts.iter().map(|t| t.as_ref()).collect();
        self.forward(&refs)
    }
}

/// Loads registry entries as [`BertEmbedder`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct HubLoader;

impl ModelLoader for HubLoader {
    fn load(&self, entry: &ModelEntry) -> Result<Box<dyn Embedder>> {
        Ok(Box::new(BertEmbedder::load(entry)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pad_id_follows_architecture() {
        let config = r#"{"pad_token_id": 1, "hidden_size": 1024}"#;
        assert_eq!(Encoder::pad_id(Architecture::Bert, config), 0);
        assert_eq!(Encoder::pad_id(Architecture::XlmRoberta, config), 1);
        assert_eq!(Encoder::pad_id(Architecture::XlmRoberta, "{}"), 1);
    }

    #[test]
    fn test_with_prefix() {
        let texts = with_prefix(Some("query: "), &["towers", "walls"]);
        assert_eq!(texts[0], "query: towers");
        assert_eq!(texts[1], "query: walls");

        let texts = with_prefix(None, &["towers"]);
        assert!(matches!(texts[0], std::borrow::Cow::Borrowed("towers")));
    }
}
