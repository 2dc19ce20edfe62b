use anyhow::{anyhow, Result};
use hf_hub::api::tokio::ApiBuilder;
use ndarray::Array2;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tokenizers::{Tokenizer, TruncationParams};

#[cfg(feature = "coreml")]
use ort::execution_providers::CoreMLExecutionProvider;
#[cfg(feature = "cuda")]
use ort::execution_providers::CUDAExecutionProvider;
use ort::{
  execution_providers::{CPUExecutionProvider, ExecutionProviderDispatch},
  session::Session,
  value::Value,
};

use crate::config::ModelConfig;
use crate::error::EncoderError;

const PROBE_TEXT: &str = "probe";

/// Deterministic text to vector mapping shared by every request
///
/// Implementations are loaded once at startup and must tolerate concurrent
/// `encode` calls.
pub trait TextEncoder: Send + Sync {
  /// Output dimension of every vector this encoder produces
  fn dimension(&self) -> usize;

  /// Identifier of the underlying model, for status output
  fn model_name(&self) -> &str;

  fn encode(&self, text: &str) -> Result<Vec<f32>, EncoderError>;
}

/// Shared handle to any encoder implementation
pub type SharedEncoder = Arc<dyn TextEncoder>;

/// Trait for extracting tensor data - allows testing without ONNX complexity
trait EmbeddingOutput {
  fn get_tensor(&self, key: &str) -> Option<&dyn TensorData>;
}

trait TensorData {
  fn extract_f32_data(&self) -> Result<(&[i64], &[f32])>;
}

/// Trait abstraction for testable tensor preparation
trait TokenEncoding {
  fn get_ids(&self) -> &[u32];
  fn get_attention_mask(&self) -> &[u32];
  fn get_type_ids(&self) -> &[u32];
}

// Implementations for real ONNX types
#[cfg(not(tarpaulin_include))]
impl<'s> EmbeddingOutput for ort::session::SessionOutputs<'s> {
  fn get_tensor(&self, key: &str) -> Option<&dyn TensorData> {
    self.get(key).map(|v| v as &dyn TensorData)
  }
}

#[cfg(not(tarpaulin_include))]
impl TensorData for ort::value::Value {
  fn extract_f32_data(&self) -> Result<(&[i64], &[f32])> {
    let (shape, data) = self.try_extract_tensor::<f32>()?;
    Ok((shape.as_ref(), data))
  }
}

#[cfg(not(tarpaulin_include))]
impl TokenEncoding for tokenizers::Encoding {
  fn get_ids(&self) -> &[u32] {
    self.get_ids()
  }
  fn get_attention_mask(&self) -> &[u32] {
    self.get_attention_mask()
  }
  fn get_type_ids(&self) -> &[u32] {
    self.get_type_ids()
  }
}

/// Sentence-transformer running on ONNX Runtime
pub struct OnnxEncoder {
  session: Mutex<Session>,
  tokenizer: Tokenizer,
  input_names: Vec<String>,
  model_name: String,
  dimension: usize,
}

struct ModelFiles {
  tokenizer_file: PathBuf,
  model_path: PathBuf,
}

// Public API
#[cfg(not(tarpaulin_include))]
impl OnnxEncoder {
  /// Fetch (or reuse cached) model files and load the session
  ///
  /// Any failure here is fatal for the process; nothing retries it.
  pub async fn load(config: &ModelConfig) -> Result<Self, EncoderError> {
    bentley::info!("Loading embedding model {}...", config.repo);

    let loaded = Self::load_inner(config).await.map_err(|e| EncoderError::ModelLoad(format!("{e:#}")))?;

    bentley::success!("Embedding model ready ({} dimensions)", loaded.dimension);
    Ok(loaded)
  }

  async fn load_inner(config: &ModelConfig) -> Result<Self> {
    let files = match &config.local_dir {
      Some(dir) => Self::local_model_files(dir, config)?,
      None => Self::download_model(config).await?,
    };

    let tokenizer = Self::load_tokenizer(&files.tokenizer_file, config.max_sequence_length)?;
    let session = Self::load_model(&files.model_path)?;
    let input_names = session.inputs.iter().map(|input| input.name.to_string()).collect();

    let mut encoder = Self {
      session: Mutex::new(session),
      tokenizer,
      input_names,
      model_name: config.repo.clone(),
      dimension: 0,
    };

    // Output width is only known after running the model once
    encoder.dimension = encoder.embed(PROBE_TEXT)?.len();
    if encoder.dimension == 0 {
      return Err(anyhow!("model produced an empty embedding"));
    }
    Ok(encoder)
  }
}

// Model initialization
#[cfg(not(tarpaulin_include))]
impl OnnxEncoder {
  async fn download_model(config: &ModelConfig) -> Result<ModelFiles> {
    let mut builder = ApiBuilder::new().with_progress(false);
    if let Some(cache_dir) = &config.cache_dir {
      builder = builder.with_cache_dir(cache_dir.clone());
    }
    let api = builder.build().map_err(|e| anyhow!("HF API initialization failed: {}", e))?;
    let repo = api.model(config.repo.clone());

    let tokenizer_file = repo
      .get(&config.tokenizer_file)
      .await
      .map_err(|e| anyhow!("Failed to download tokenizer: {}", e))?;

    let model_path = repo
      .get(&config.model_file)
      .await
      .map_err(|e| anyhow!("Failed to download ONNX model: {}", e))?;

    Ok(ModelFiles { tokenizer_file, model_path })
  }

  fn local_model_files(dir: &Path, config: &ModelConfig) -> Result<ModelFiles> {
    let tokenizer_file = dir.join(&config.tokenizer_file);
    let model_path = dir.join(&config.model_file);

    for path in [&tokenizer_file, &model_path] {
      if !path.is_file() {
        return Err(anyhow!("Model file not found: {}", path.display()));
      }
    }
    Ok(ModelFiles { tokenizer_file, model_path })
  }

  fn load_tokenizer(path: &Path, max_sequence_length: usize) -> Result<Tokenizer> {
    let mut tokenizer =
      Tokenizer::from_file(path).map_err(|e| anyhow!("Failed to load tokenizer: {}", e))?;

    tokenizer
      .with_truncation(Some(TruncationParams { max_length: max_sequence_length, ..Default::default() }))
      .map_err(|e| anyhow!("Failed to configure truncation: {}", e))?;

    Ok(tokenizer)
  }

  fn load_model(model_path: &Path) -> Result<Session> {
    let session = Session::builder()?
      .with_execution_providers(Self::get_execution_providers())?
      .commit_from_file(model_path)?;

    Ok(session)
  }

  fn get_execution_providers() -> Vec<ExecutionProviderDispatch> {
    let mut providers = Vec::new();

    #[cfg(feature = "coreml")]
    providers.push(CoreMLExecutionProvider::default().into());

    #[cfg(feature = "cuda")]
    providers.push(CUDAExecutionProvider::default().build());

    providers.push(CPUExecutionProvider::default().into());
    providers
  }

  /// Tokenize, run, pool, and normalize one text
  fn embed(&self, text: &str) -> Result<Vec<f32>, EncoderError> {
    let tokens = self
      .tokenizer
      .encode(text, true)
      .map_err(|e| EncoderError::Inference(format!("tokenization failed: {e}")))?;
    let input = prepare(&tokens, &self.input_names).map_err(inference_error)?;

    let mut session = lock_session(&self.session)?;
    let output = session.run(input).map_err(|e| EncoderError::Inference(e.to_string()))?;
    let pooled = extract_embedding(&output, tokens.get_attention_mask()).map_err(inference_error)?;
    Ok(normalize_embedding(pooled))
  }
}

#[cfg(not(tarpaulin_include))]
impl TextEncoder for OnnxEncoder {
  fn dimension(&self) -> usize {
    self.dimension
  }

  fn model_name(&self) -> &str {
    &self.model_name
  }

  fn encode(&self, text: &str) -> Result<Vec<f32>, EncoderError> {
    let embedding = self.embed(text)?;

    if embedding.len() != self.dimension {
      return Err(EncoderError::Inference(format!(
        "model produced {} dimensions, expected {}",
        embedding.len(),
        self.dimension
      )));
    }
    Ok(embedding)
  }
}

// Embedding processing
// ====================

/// A poisoned session means an earlier inference panicked mid-run
fn lock_session<T>(session: &Mutex<T>) -> Result<MutexGuard<'_, T>, EncoderError> {
  session.lock().map_err(|_| EncoderError::Unavailable("embedding session lock poisoned".into()))
}

fn inference_error(error: anyhow::Error) -> EncoderError {
  EncoderError::Inference(format!("{error:#}"))
}

/// Build the model input map from a tokenized sentence
fn prepare(tokens: &dyn TokenEncoding, input_names: &[String]) -> Result<HashMap<String, Value>> {
  let mut input = HashMap::new();
  input.insert("input_ids".to_string(), to_tensor(tokens.get_ids())?);
  input.insert("attention_mask".to_string(), to_tensor(tokens.get_attention_mask())?);

  if input_names.iter().any(|name| name == "token_type_ids") {
    input.insert("token_type_ids".to_string(), to_tensor(tokens.get_type_ids())?);
  }

  if input_names.iter().any(|name| name == "position_ids") {
    let position_ids: Vec<u32> = (0..tokens.get_ids().len() as u32).collect();
    input.insert("position_ids".to_string(), to_tensor(&position_ids)?);
  }

  Ok(input)
}

fn to_tensor<T: Copy + Into<i64>>(values: &[T]) -> Result<Value> {
  let data: Vec<i64> = values.iter().map(|&x| x.into()).collect();
  let array: Array2<i64> = Array2::from_shape_vec((1, data.len()), data)?;
  Ok(Value::from_array(array)?.into())
}

/// Pull the token embeddings out of the model output and pool them
fn extract_embedding(output: &dyn EmbeddingOutput, attention_mask: &[u32]) -> Result<Vec<f32>> {
  let tensor = output
    .get_tensor("last_hidden_state")
    .or_else(|| output.get_tensor("0"))
    .ok_or_else(|| anyhow!("No output found from model - expected 'last_hidden_state' or '0'"))?;

  let (shape, data) = tensor.extract_f32_data()?;
  mean_pool(shape, data, attention_mask)
}

/// Average token embeddings over positions the attention mask keeps
///
/// `shape` is `[batch=1, seq_len, hidden]`.
pub fn mean_pool(shape: &[i64], data: &[f32], attention_mask: &[u32]) -> Result<Vec<f32>> {
  let [_, seq_length, hidden_size] = shape else {
    return Err(anyhow!("expected a 3-D hidden state, got shape {:?}", shape));
  };
  let (seq_length, hidden_size) = (*seq_length as usize, *hidden_size as usize);

  if data.len() < seq_length * hidden_size || attention_mask.len() < seq_length {
    return Err(anyhow!("hidden state and attention mask do not match shape {:?}", shape));
  }

  let mut embedding = vec![0.0f32; hidden_size];
  let mut kept = 0usize;
  for token_idx in (0..seq_length).filter(|&i| attention_mask[i] != 0) {
    let start = token_idx * hidden_size;
    for (sum, &value) in embedding.iter_mut().zip(&data[start..start + hidden_size]) {
      *sum += value;
    }
    kept += 1;
  }

  if kept == 0 {
    return Err(anyhow!("attention mask keeps no tokens"));
  }

  for value in embedding.iter_mut() {
    *value /= kept as f32;
  }
  Ok(embedding)
}

/// Normalize embedding vector to unit length
pub fn normalize_embedding(mut embedding: Vec<f32>) -> Vec<f32> {
  let magnitude: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();

  if magnitude < f32::EPSILON {
    bentley::warn!("Zero-magnitude embedding detected - returning unchanged");
    return embedding;
  }

  for value in embedding.iter_mut() {
    *value /= magnitude;
  }
  embedding
}

#[cfg(test)]
mod tests {
  use super::*;

  struct FakeTokens {
    ids: Vec<u32>,
    mask: Vec<u32>,
    type_ids: Vec<u32>,
  }

  impl FakeTokens {
    fn new(ids: Vec<u32>) -> Self {
      let len = ids.len();
      Self { ids, mask: vec![1; len], type_ids: vec![0; len] }
    }
  }

  impl TokenEncoding for FakeTokens {
    fn get_ids(&self) -> &[u32] {
      &self.ids
    }
    fn get_attention_mask(&self) -> &[u32] {
      &self.mask
    }
    fn get_type_ids(&self) -> &[u32] {
      &self.type_ids
    }
  }

  struct FakeTensor {
    shape: Vec<i64>,
    data: Vec<f32>,
  }

  impl TensorData for FakeTensor {
    fn extract_f32_data(&self) -> Result<(&[i64], &[f32])> {
      Ok((&self.shape, &self.data))
    }
  }

  struct FakeOutput {
    tensors: HashMap<String, FakeTensor>,
  }

  impl EmbeddingOutput for FakeOutput {
    fn get_tensor(&self, key: &str) -> Option<&dyn TensorData> {
      self.tensors.get(key).map(|t| t as &dyn TensorData)
    }
  }

  fn names(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
  }

  #[test]
  fn test_prepare_bert_style_inputs() -> Result<()> {
    let tokens = FakeTokens::new(vec![101, 2054, 102]);
    let input = prepare(&tokens, &names(&["input_ids", "attention_mask", "token_type_ids"]))?;

    assert_eq!(input.len(), 3);
    assert!(input.contains_key("token_type_ids"));
    assert!(!input.contains_key("position_ids"));
    Ok(())
  }

  #[test]
  fn test_prepare_skips_inputs_the_model_does_not_take() -> Result<()> {
    let tokens = FakeTokens::new(vec![101, 102]);
    let input = prepare(&tokens, &names(&["input_ids", "attention_mask"]))?;

    assert_eq!(input.len(), 2);
    assert!(!input.contains_key("token_type_ids"));
    Ok(())
  }

  #[test]
  fn test_prepare_adds_position_ids_when_expected() -> Result<()> {
    let tokens = FakeTokens::new(vec![1, 2, 3, 4]);
    let input = prepare(&tokens, &names(&["input_ids", "attention_mask", "position_ids"]))?;

    assert!(input.contains_key("position_ids"));
    Ok(())
  }

  #[test]
  fn test_extract_embedding_prefers_last_hidden_state() -> Result<()> {
    let mut tensors = HashMap::new();
    tensors.insert("last_hidden_state".to_string(), FakeTensor { shape: vec![1, 1, 2], data: vec![1.0, 2.0] });
    tensors.insert("0".to_string(), FakeTensor { shape: vec![1, 1, 2], data: vec![9.0, 9.0] });

    let embedding = extract_embedding(&FakeOutput { tensors }, &[1])?;
    assert_eq!(embedding, vec![1.0, 2.0]);
    Ok(())
  }

  #[test]
  fn test_extract_embedding_falls_back_to_first_output() -> Result<()> {
    let mut tensors = HashMap::new();
    tensors.insert("0".to_string(), FakeTensor { shape: vec![1, 2, 1], data: vec![2.0, 4.0] });

    let embedding = extract_embedding(&FakeOutput { tensors }, &[1, 1])?;
    assert_eq!(embedding, vec![3.0]);
    Ok(())
  }

  #[test]
  fn test_extract_embedding_without_known_output_fails() {
    let output = FakeOutput { tensors: HashMap::new() };
    assert!(extract_embedding(&output, &[1]).is_err());
  }

  #[test]
  fn test_mean_pool_averages_kept_tokens() -> Result<()> {
    // Token 1: [1, 2], Token 2: [3, 4]
    let embedding = mean_pool(&[1, 2, 2], &[1.0, 2.0, 3.0, 4.0], &[1, 1])?;
    assert_eq!(embedding, vec![2.0, 3.0]);
    Ok(())
  }

  #[test]
  fn test_mean_pool_ignores_padding() -> Result<()> {
    let embedding = mean_pool(&[1, 3, 1], &[2.0, 4.0, 100.0], &[1, 1, 0])?;
    assert_eq!(embedding, vec![3.0]);
    Ok(())
  }

  #[test]
  fn test_mean_pool_rejects_fully_masked_input() {
    assert!(mean_pool(&[1, 2, 1], &[1.0, 2.0], &[0, 0]).is_err());
  }

  #[test]
  fn test_mean_pool_rejects_bad_shape() {
    assert!(mean_pool(&[2, 1], &[1.0, 2.0], &[1]).is_err());
    assert!(mean_pool(&[1, 3, 2], &[1.0, 2.0], &[1, 1, 1]).is_err());
  }

  #[test]
  fn test_normalize_embedding() {
    let result = normalize_embedding(vec![3.0, 4.0, 0.0]);
    assert!((result[0] - 0.6).abs() < f32::EPSILON);
    assert!((result[1] - 0.8).abs() < f32::EPSILON);

    let magnitude: f32 = result.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((magnitude - 1.0).abs() < 1e-6);
  }

  #[test]
  fn test_normalize_embedding_zero_vector() {
    let embedding = vec![0.0, 0.0, 0.0];
    assert_eq!(normalize_embedding(embedding.clone()), embedding);
  }

  #[test]
  fn test_poisoned_session_is_unavailable() {
    let session = Arc::new(Mutex::new(()));
    let poisoner = Arc::clone(&session);
    let _ = std::thread::spawn(move || {
      let _guard = poisoner.lock();
      panic!("inference panicked");
    })
    .join();

    assert!(matches!(lock_session(&session), Err(EncoderError::Unavailable(_))));
  }

  #[test]
  fn test_healthy_session_locks() {
    let session = Mutex::new(7);
    assert!(matches!(lock_session(&session).map(|guard| *guard), Ok(7)));
  }
}
