//! Phrase embeddings for relevance filtering.
//!
//! [`Embedder`] is the seam the relevance filter depends on;
//! [`SciBertEmbedder`] is the production implementation: a BERT encoder run
//! on CPU with `candle`, pooled by averaging the final hidden states of every
//! token (special tokens included), one forward pass per phrase.
//!
//! Model files come from a local directory or from the Hugging Face Hub.
//! `hf-hub` keeps downloaded files in its own cache; the model itself is
//! loaded fresh on every run.

use crate::error::KeywordError;
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tokenizers::models::wordpiece::WordPiece;
use tokenizers::normalizers::bert::BertNormalizer;
use tokenizers::pre_tokenizers::bert::BertPreTokenizer;
use tokenizers::processors::bert::BertProcessing;
use tokenizers::Tokenizer;
use tracing::{debug, info, warn};

/// Produces a fixed-dimension vector for a phrase.
pub trait Embedder: Send + Sync {
    fn embed(&self, phrase: &str) -> Result<Vec<f32>, KeywordError>;
}

/// Cosine similarity of two vectors.
///
/// Returns `0.0` when either vector has zero norm or the lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (x as f64, y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a.sqrt() * norm_b.sqrt())) as f32
}

// ── Model files ──────────────────────────────────────────────────────────

enum WeightsFile {
    SafeTensors(PathBuf),
    PyTorch(PathBuf),
}

enum TokenizerFile {
    Json(PathBuf),
    Vocab(PathBuf),
}

struct ModelFiles {
    config: PathBuf,
    weights: WeightsFile,
    tokenizer: TokenizerFile,
}

impl ModelFiles {
    /// Locate the files in a local directory.
    fn from_dir(dir: &Path) -> Result<Self, String> {
        let pick = |names: &[&str]| names.iter().map(|n| dir.join(n)).find(|p| p.is_file());

        let config = pick(&["config.json"])
            .ok_or_else(|| format!("no config.json in {}", dir.display()))?;

        let weights = match pick(&["model.safetensors"]) {
            Some(p) => WeightsFile::SafeTensors(p),
            None => WeightsFile::PyTorch(pick(&["pytorch_model.bin"]).ok_or_else(|| {
                format!(
                    "no model.safetensors or pytorch_model.bin in {}",
                    dir.display()
                )
            })?),
        };

        let tokenizer = match pick(&["tokenizer.json"]) {
            Some(p) => TokenizerFile::Json(p),
            None => TokenizerFile::Vocab(pick(&["vocab.txt"]).ok_or_else(|| {
                format!("no tokenizer.json or vocab.txt in {}", dir.display())
            })?),
        };

        Ok(Self {
            config,
            weights,
            tokenizer,
        })
    }

    /// Fetch the files from the Hugging Face Hub (or its local cache).
    fn from_hub(repo_id: &str) -> Result<Self, String> {
        let api = hf_hub::api::sync::Api::new().map_err(|e| e.to_string())?;
        let repo = api.model(repo_id.to_string());

        let config = repo.get("config.json").map_err(|e| e.to_string())?;

        let weights = match repo.get("model.safetensors") {
            Ok(p) => WeightsFile::SafeTensors(p),
            Err(e) => {
                debug!("{}: no model.safetensors ({}), trying pytorch_model.bin", repo_id, e);
                WeightsFile::PyTorch(repo.get("pytorch_model.bin").map_err(|e| e.to_string())?)
            }
        };

        let tokenizer = match repo.get("tokenizer.json") {
            Ok(p) => TokenizerFile::Json(p),
            Err(e) => {
                debug!("{}: no tokenizer.json ({}), building from vocab.txt", repo_id, e);
                TokenizerFile::Vocab(repo.get("vocab.txt").map_err(|e| e.to_string())?)
            }
        };

        Ok(Self {
            config,
            weights,
            tokenizer,
        })
    }
}

// ── SciBERT ──────────────────────────────────────────────────────────────

/// Mean-pooled BERT embeddings computed with `candle` on CPU.
pub struct SciBertEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    max_tokens: usize,
}

impl SciBertEmbedder {
    /// Load the model named `repo_id`, from `local_dir` when given.
    pub fn load(repo_id: &str, local_dir: Option<&Path>) -> Result<Self, KeywordError> {
        let load_err = |detail: String| KeywordError::EmbeddingModelLoad {
            model: repo_id.to_string(),
            detail,
        };

        let files = match local_dir {
            Some(dir) => ModelFiles::from_dir(dir),
            None => ModelFiles::from_hub(repo_id),
        }
        .map_err(load_err)?;

        let raw = std::fs::read_to_string(&files.config)
            .map_err(|e| load_err(format!("reading config.json: {}", e)))?;
        let (config, max_tokens) = parse_bert_config(&raw).map_err(load_err)?;

        let device = Device::Cpu;
        let vb = match &files.weights {
            // SAFETY: the file is memory-mapped read-only and not modified
            // while the model is alive.
            WeightsFile::SafeTensors(p) => unsafe {
                VarBuilder::from_mmaped_safetensors(&[p], DType::F32, &device)
            },
            WeightsFile::PyTorch(p) => VarBuilder::from_pth(p, DType::F32, &device),
        }
        .map_err(|e| load_err(format!("reading weights: {}", e)))?;

        let model =
            BertModel::load(vb, &config).map_err(|e| load_err(format!("building model: {}", e)))?;
        let tokenizer = load_tokenizer(&files.tokenizer).map_err(load_err)?;

        info!("Embedding model loaded: {} (max {} tokens)", repo_id, max_tokens);

        Ok(Self {
            model,
            tokenizer,
            device,
            max_tokens,
        })
    }

    fn forward(&self, phrase: &str) -> Result<Vec<f32>, String> {
        let encoding = self
            .tokenizer
            .encode(phrase, true)
            .map_err(|e| format!("tokenizing: {}", e))?;

        let mut ids = encoding.get_ids().to_vec();
        let mut type_ids = encoding.get_type_ids().to_vec();
        if ids.len() > self.max_tokens {
            warn!(
                "Truncating '{}' from {} to {} tokens",
                phrase,
                ids.len(),
                self.max_tokens
            );
            truncate_keep_last(&mut ids, self.max_tokens);
            truncate_keep_last(&mut type_ids, self.max_tokens);
        }

        let input_ids = Tensor::new(ids.as_slice(), &self.device)
            .and_then(|t| t.unsqueeze(0))
            .map_err(|e| e.to_string())?;
        let token_type_ids = Tensor::new(type_ids.as_slice(), &self.device)
            .and_then(|t| t.unsqueeze(0))
            .map_err(|e| e.to_string())?;

        let hidden = self
            .model
            .forward(&input_ids, &token_type_ids, None)
            .map_err(|e| format!("forward pass: {}", e))?;

        hidden
            .mean(1)
            .and_then(|t| t.squeeze(0))
            .and_then(|t| t.to_vec1::<f32>())
            .map_err(|e| format!("pooling: {}", e))
    }
}

impl Embedder for SciBertEmbedder {
    fn embed(&self, phrase: &str) -> Result<Vec<f32>, KeywordError> {
        self.forward(phrase)
            .map_err(|detail| KeywordError::EmbeddingFailed {
                phrase: phrase.to_string(),
                detail,
            })
    }
}

/// Parse a BERT `config.json`, filling keys older checkpoints omit.
///
/// Returns the config and the position-embedding limit.
fn parse_bert_config(raw: &str) -> Result<(BertConfig, usize), String> {
    let mut value: Value = serde_json::from_str(raw).map_err(|e| format!("config.json: {}", e))?;
    let obj = value
        .as_object_mut()
        .ok_or_else(|| "config.json is not a JSON object".to_string())?;

    obj.entry("hidden_act").or_insert(json!("gelu"));
    obj.entry("layer_norm_eps").or_insert(json!(1e-12));
    obj.entry("pad_token_id").or_insert(json!(0));
    // Lets BertModel::load fall back to `bert.`-prefixed weight names.
    obj.entry("model_type").or_insert(json!("bert"));

    let max_tokens = obj
        .get("max_position_embeddings")
        .and_then(Value::as_u64)
        .unwrap_or(512) as usize;

    let config: BertConfig =
        serde_json::from_value(value).map_err(|e| format!("config.json: {}", e))?;
    Ok((config, max_tokens))
}

fn load_tokenizer(source: &TokenizerFile) -> Result<Tokenizer, String> {
    match source {
        TokenizerFile::Json(path) => {
            Tokenizer::from_file(path).map_err(|e| format!("tokenizer.json: {}", e))
        }
        TokenizerFile::Vocab(path) => {
            let vocab = path
                .to_str()
                .ok_or_else(|| format!("non UTF-8 vocab path {}", path.display()))?;
            let wordpiece = WordPiece::from_file(vocab)
                .build()
                .map_err(|e| format!("vocab.txt: {}", e))?;

            let mut tokenizer = Tokenizer::new(wordpiece);
            let cls = tokenizer
                .token_to_id("[CLS]")
                .ok_or_else(|| "vocab.txt has no [CLS] token".to_string())?;
            let sep = tokenizer
                .token_to_id("[SEP]")
                .ok_or_else(|| "vocab.txt has no [SEP] token".to_string())?;

            tokenizer
                .with_normalizer(Some(BertNormalizer::default()))
                .with_pre_tokenizer(Some(BertPreTokenizer))
                .with_post_processor(Some(BertProcessing::new(
                    ("[SEP]".to_string(), sep),
                    ("[CLS]".to_string(), cls),
                )));
            Ok(tokenizer)
        }
    }
}

/// Truncate to `max` items; the last item (the `[SEP]`) survives.
fn truncate_keep_last(ids: &mut Vec<u32>, max: usize) {
    if max == 0 || ids.len() <= max {
        return;
    }
    let last = ids[ids.len() - 1];
    ids.truncate(max);
    ids[max - 1] = last;
}
