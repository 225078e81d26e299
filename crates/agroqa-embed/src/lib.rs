//! Sentence embeddings for the retrieval pipeline.
//!
//! `SentenceEncoder` wraps a local BERT-architecture Portuguese sentence
//! encoder through candle, loading the tokenizer and safetensors weights
//! from a configured directory. `HashedEmbedder` is a deterministic,
//! model-free stand-in for tests and offline tooling; select it with
//! `AGROQA_USE_HASH_EMBEDDER=1`.
//!
//! Every row produced by either implementation is L2-normalized, so all
//! downstream similarity is the inner product of unit vectors.

mod device;
mod pool;
mod tokenize;

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use candle_core::{DType, Device};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use tokenizers::Tokenizer;
use tracing::info;

use agroqa_core::config::ModelSettings;
pub use agroqa_core::traits::Embedder;

pub struct SentenceEncoder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    dim: usize,
    max_seq_len: usize,
}

impl SentenceEncoder {
    pub fn load(model_dir: &Path, max_seq_len: usize) -> Result<Self> {
        let device = device::select_device();

        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path).map_err(|e| {
            anyhow!(
                "failed to load tokenizer from {}: {e}",
                tokenizer_path.display()
            )
        })?;

        let config_path = model_dir.join("config.json");
        let config: BertConfig = serde_json::from_str(
            &std::fs::read_to_string(&config_path)
                .with_context(|| format!("reading {}", config_path.display()))?,
        )?;

        let weights_path = model_dir.join("model.safetensors");
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights_path.clone()], DType::F32, &device)
        }
        .with_context(|| format!("loading weights from {}", weights_path.display()))?;
        let model = BertModel::load(vb, &config)?;

        info!(
            model_dir = %model_dir.display(),
            dim = config.hidden_size,
            "sentence encoder loaded"
        );
        Ok(Self {
            dim: config.hidden_size,
            model,
            tokenizer,
            device,
            max_seq_len,
        })
    }
}

impl Embedder for SentenceEncoder {
    fn dim(&self) -> usize {
        self.dim
    }

    fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let (input_ids, attention_mask) =
            tokenize::tokenize_batch(&self.tokenizer, texts, self.max_seq_len, &self.device)?;
        let token_type_ids = input_ids.zeros_like()?;

        let hidden = self
            .model
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))?;
        let pooled = pool::masked_mean_unit(&hidden, &attention_mask)?;
        Ok(pooled.to_device(&Device::Cpu)?.to_vec2::<f32>()?)
    }
}

/// Token-hashing embedder: no model files, deterministic, unit rows.
pub struct HashedEmbedder {
    dim: usize,
}

impl HashedEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }

    fn row(&self, text: &str) -> Vec<f32> {
        use std::hash::{Hash, Hasher};
        use twox_hash::XxHash64;

        let mut v = vec![0f32; self.dim];
        for (i, token) in text.split_whitespace().enumerate() {
            let mut hasher = XxHash64::with_seed(0);
            token.hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h as usize) % self.dim;
            let val = (((h >> 32) as u32) as f32) / (u32::MAX as f32);
            v[idx] += val + (i as f32 % 3.0) * 0.01;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt() + 1e-12;
        for x in &mut v {
            *x /= norm;
        }
        v
    }
}

impl Embedder for HashedEmbedder {
    fn dim(&self) -> usize {
        self.dim
    }

    fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.row(t)).collect())
    }
}

pub fn default_embedder(model: &ModelSettings) -> Result<Box<dyn Embedder>> {
    let use_hash = std::env::var("AGROQA_USE_HASH_EMBEDDER")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    if use_hash {
        info!(dim = model.dim, "using hashed embedder");
        return Ok(Box::new(HashedEmbedder::new(model.dim)));
    }
    Ok(Box::new(SentenceEncoder::load(&model.dir, model.max_seq_len)?))
}
