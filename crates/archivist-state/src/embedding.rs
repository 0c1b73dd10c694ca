//! C5 embedder adapter: local fastembed runtime with a deterministic hashed
//! fallback, plus an external HTTP provider for hosted models. Callers never
//! see the difference beyond `EmbeddingProvider::model_id`.

use archivist_core::config::SemanticConfig;
use archivist_core::constants;
use archivist_core::error::StateError;
use fastembed::{EmbeddingModel, TextEmbedding, TextInitOptions};
use reqwest::blocking::Client;
use serde::Deserialize;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;
use tracing::warn;

const VOYAGE_EMBED_ENDPOINT: &str = "https://api.voyageai.com/v1/embeddings";
const OPENAI_EMBED_ENDPOINT: &str = "https://api.openai.com/v1/embeddings";
const DEFAULT_FASTEMBED_CACHE_CAPACITY: usize = 4096;

type SharedTextEmbeddingRuntime = Arc<Mutex<TextEmbedding>>;
type RuntimeCache = HashMap<String, Option<SharedTextEmbeddingRuntime>>;
static FASTEMBED_RUNTIME_CACHE: OnceLock<Mutex<RuntimeCache>> = OnceLock::new();

fn runtime_cache() -> &'static Mutex<RuntimeCache> {
    FASTEMBED_RUNTIME_CACHE.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Uniform surface over local and external embedding backends.
pub trait EmbeddingProvider {
    fn model_id(&self) -> &str;
    fn dimensions(&self) -> usize;
    fn embed_batch(&mut self, inputs: &[String]) -> Result<Vec<Vec<f32>>, StateError>;

    /// Health probe the orchestrator can call before a run to log a warning
    /// up front instead of discovering the fallback mid-batch.
    fn ready(&self) -> bool {
        true
    }
}

/// Build the configured embedding provider, falling back to the local model
/// when an external provider is requested but `allow_fallback` forbids
/// sending source text off-box.
pub fn build_embedding_provider(
    semantic: &SemanticConfig,
) -> Result<Box<dyn EmbeddingProvider + Send>, StateError> {
    let model = resolve_fastembed_model(&semantic.model);
    let dimensions = model_dimensions(&semantic.model).unwrap_or(768);

    match semantic.provider.to_ascii_lowercase().as_str() {
        "voyage" | "openai" if semantic.allow_fallback => {
            let external = ExternalEmbeddingProvider::new(
                semantic.provider.clone(),
                semantic.model.clone(),
                dimensions,
                semantic.batch_size.max(1),
            )?;
            Ok(Box::new(external))
        }
        _ => Ok(Box::new(FastEmbedProvider::new(
            semantic.model.clone(),
            dimensions,
            model,
            semantic.batch_size.max(1),
        ))),
    }
}

fn resolve_fastembed_model(name: &str) -> Option<EmbeddingModel> {
    match name.trim().to_ascii_lowercase().as_str() {
        "nomic-embed-text-v1.5-q" | "nomicembedtextv15q" => Some(EmbeddingModel::NomicEmbedTextV15Q),
        "bge-small-en-v1.5-q" | "bgesmallenv15q" => Some(EmbeddingModel::BGESmallENV15Q),
        "bge-base-en-v1.5-q" | "bgebaseenv15q" => Some(EmbeddingModel::BGEBaseENV15Q),
        "jina-embeddings-v2-base-code" | "jinaembeddingsv2basecode" => {
            Some(EmbeddingModel::JinaEmbeddingsV2BaseCode)
        }
        other => other.parse::<EmbeddingModel>().ok(),
    }
}

fn model_dimensions(name: &str) -> Option<usize> {
    let target = resolve_fastembed_model(name)?;
    TextEmbedding::list_supported_models()
        .into_iter()
        .find(|entry| entry.model == target)
        .map(|entry| entry.dim)
}

/// Local embedding provider. Lazily initializes the ONNX runtime on first
/// use; if initialization or inference ever produces the wrong shape, it
/// permanently switches to the deterministic hashed fallback rather than
/// retrying a broken runtime on every call.
pub struct FastEmbedProvider {
    model_id: String,
    dimensions: usize,
    fastembed_model: Option<EmbeddingModel>,
    batch_size: usize,
    runtime: Option<SharedTextEmbeddingRuntime>,
    cache: HashMap<String, Vec<f32>>,
    cache_order: VecDeque<String>,
    cache_capacity: usize,
    attempted_runtime_init: bool,
    degraded_to_fallback: bool,
}

impl FastEmbedProvider {
    fn new(
        model_id: String,
        dimensions: usize,
        fastembed_model: Option<EmbeddingModel>,
        batch_size: usize,
    ) -> Self {
        Self {
            model_id,
            dimensions,
            fastembed_model,
            batch_size,
            runtime: None,
            cache: HashMap::new(),
            cache_order: VecDeque::new(),
            cache_capacity: fastembed_cache_capacity(),
            attempted_runtime_init: false,
            degraded_to_fallback: false,
        }
    }

    #[cfg(test)]
    fn cache_entries(&self) -> usize {
        self.cache.len()
    }

    fn ensure_runtime(&mut self) {
        if self.attempted_runtime_init {
            return;
        }
        self.attempted_runtime_init = true;
        let Some(model) = self.fastembed_model.clone() else {
            self.degraded_to_fallback = true;
            return;
        };
        let cache_key = self.model_id.clone();

        if let Ok(cache) = runtime_cache().lock()
            && let Some(cached) = cache.get(&cache_key).cloned()
        {
            self.runtime = cached;
            return;
        }

        let options = TextInitOptions::new(model).with_show_download_progress(false);
        match TextEmbedding::try_new(options) {
            Ok(runtime) => {
                let shared: SharedTextEmbeddingRuntime = Arc::new(Mutex::new(runtime));
                self.runtime = Some(shared.clone());
                if let Ok(mut cache) = runtime_cache().lock() {
                    cache.insert(cache_key, Some(shared));
                }
            }
            Err(err) => {
                warn!(model = self.model_id, error = %err, "fastembed init failed, using deterministic fallback");
                self.degraded_to_fallback = true;
                if let Ok(mut cache) = runtime_cache().lock() {
                    cache.insert(cache_key, None);
                }
            }
        }
    }

    fn embed_uncached(&mut self, inputs: &[String]) -> Vec<Vec<f32>> {
        self.ensure_runtime();
        if let Some(runtime) = self.runtime.as_ref() {
            let refs: Vec<&str> = inputs.iter().map(String::as_str).collect();
            let result = runtime
                .lock()
                .ok()
                .and_then(|mut r| r.embed(refs, Some(self.batch_size)).ok());
            if let Some(vectors) = result
                && vectors.iter().all(|v| v.len() == self.dimensions)
            {
                return vectors;
            }
            warn!(model = self.model_id, "fastembed returned wrong shape, disabling runtime");
            self.runtime = None;
            self.degraded_to_fallback = true;
            if let Ok(mut cache) = runtime_cache().lock() {
                cache.insert(self.model_id.clone(), None);
            }
        }
        inputs
            .iter()
            .map(|input| deterministic_embedding(input, self.dimensions))
            .collect()
    }

    fn insert_cache_entry(&mut self, input: String, vector: Vec<f32>) {
        if self.cache_capacity == 0 {
            return;
        }
        if let std::collections::hash_map::Entry::Occupied(mut entry) =
            self.cache.entry(input.clone())
        {
            entry.insert(vector);
            self.cache_order.retain(|k| k != &input);
            self.cache_order.push_back(input);
            return;
        }
        while self.cache.len() >= self.cache_capacity {
            let Some(evicted) = self.cache_order.pop_front() else {
                break;
            };
            self.cache.remove(&evicted);
        }
        self.cache_order.push_back(input.clone());
        self.cache.insert(input, vector);
    }
}

impl EmbeddingProvider for FastEmbedProvider {
    fn model_id(&self) -> &str {
        if self.degraded_to_fallback {
            constants::FALLBACK_EMBEDDING_MODEL_ID
        } else {
            &self.model_id
        }
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn ready(&self) -> bool {
        !self.degraded_to_fallback
    }

    fn embed_batch(&mut self, inputs: &[String]) -> Result<Vec<Vec<f32>>, StateError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }
        let uncached: Vec<String> = inputs
            .iter()
            .filter(|i| !self.cache.contains_key(i.as_str()))
            .cloned()
            .collect();
        if !uncached.is_empty() {
            let vectors = self.embed_uncached(&uncached);
            for (input, vector) in uncached.into_iter().zip(vectors) {
                self.insert_cache_entry(input, vector);
            }
        }
        Ok(inputs
            .iter()
            .map(|input| {
                self.cache
                    .get(input)
                    .cloned()
                    .unwrap_or_else(|| deterministic_embedding(input, self.dimensions))
            })
            .collect())
    }
}

/// Deterministic fallback embedding: xorshift64* seeded by a
/// blake3 hash of the input, L2-normalized. Used whenever the local runtime
/// is unavailable, so `index_repository` never hard-fails on missing model
/// weights.
fn deterministic_embedding(input: &str, dimensions: usize) -> Vec<f32> {
    if dimensions == 0 {
        return Vec::new();
    }
    let seed = blake3::hash(input.as_bytes());
    let mut state = u64::from_le_bytes(seed.as_bytes()[0..8].try_into().expect("8 bytes"));
    if state == 0 {
        state = 0x9e37_79b9_7f4a_7c15;
    }

    let mut vector = Vec::with_capacity(dimensions);
    for _ in 0..dimensions {
        state ^= state >> 12;
        state ^= state << 25;
        state ^= state >> 27;
        let n = state.wrapping_mul(0x2545_F491_4F6C_DD1D);
        let scaled = (n as f64 / u64::MAX as f64) * 2.0 - 1.0;
        vector.push(scaled as f32);
    }

    let norm = vector.iter().map(|v| (*v as f64).powi(2)).sum::<f64>().sqrt();
    if norm == 0.0 {
        return vector;
    }
    vector.into_iter().map(|v| (v as f64 / norm) as f32).collect()
}

/// External HTTP embedding provider (Voyage / OpenAI-compatible), with
/// fixed-step retry and a per-request timeout.
pub struct ExternalEmbeddingProvider {
    provider: String,
    model_id: String,
    dimensions: usize,
    batch_size: usize,
    endpoint: String,
    client: Client,
}

impl ExternalEmbeddingProvider {
    fn new(
        provider: String,
        model_id: String,
        dimensions: usize,
        batch_size: usize,
    ) -> Result<Self, StateError> {
        let endpoint = match provider.as_str() {
            "voyage" => VOYAGE_EMBED_ENDPOINT.to_string(),
            _ => OPENAI_EMBED_ENDPOINT.to_string(),
        };
        let client = Client::builder()
            .timeout(Duration::from_secs(constants::DEFAULT_EMBED_TIMEOUT_SECS))
            .build()
            .map_err(StateError::embedder)?;
        Ok(Self {
            provider,
            model_id,
            dimensions,
            batch_size,
            endpoint,
            client,
        })
    }

    fn embed_chunk_with_retry(&self, chunk: &[String], api_key: &str) -> Result<Vec<Vec<f32>>, StateError> {
        let mut attempt = 0;
        loop {
            match self.embed_chunk(chunk, api_key) {
                Ok(vectors) => return Ok(vectors),
                Err(err) if attempt + 1 < constants::DEFAULT_EMBED_RETRIES => {
                    attempt += 1;
                    let backoff_ms = constants::DEFAULT_EMBED_RETRY_BASE_MS * 2u64.pow(attempt - 1);
                    warn!(attempt, backoff_ms, error = %err, "retrying embedding request");
                    std::thread::sleep(Duration::from_millis(backoff_ms));
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn embed_chunk(&self, chunk: &[String], api_key: &str) -> Result<Vec<Vec<f32>>, StateError> {
        let payload = if self.provider == "voyage" {
            serde_json::json!({ "model": self.model_id, "input": chunk, "input_type": "document" })
        } else {
            serde_json::json!({ "model": self.model_id, "input": chunk })
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .header("content-type", "application/json")
            .json(&payload)
            .send()
            .map_err(StateError::embedder)?;
        if !response.status().is_success() {
            return Err(StateError::embedder(format!(
                "external embedding http {}",
                response.status().as_u16()
            )));
        }
        let body: EmbeddingApiResponse = response.json().map_err(StateError::embedder)?;
        align_external_embeddings(body.data, chunk.len(), self.dimensions)
    }
}

impl EmbeddingProvider for ExternalEmbeddingProvider {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn embed_batch(&mut self, inputs: &[String]) -> Result<Vec<Vec<f32>>, StateError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }
        let api_key = std::env::var("ARCHIVIST_EMBEDDING_API_KEY")
            .map_err(|_| StateError::embedder("missing ARCHIVIST_EMBEDDING_API_KEY"))?;

        let mut all_vectors = Vec::with_capacity(inputs.len());
        for chunk in inputs.chunks(self.batch_size) {
            all_vectors.extend(self.embed_chunk_with_retry(chunk, &api_key)?);
        }
        if all_vectors.len() != inputs.len() {
            return Err(StateError::embedder(format!(
                "external embedding count mismatch expected={} got={}",
                inputs.len(),
                all_vectors.len()
            )));
        }
        Ok(all_vectors)
    }
}

#[derive(Debug, Deserialize)]
struct EmbeddingApiResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: Option<usize>,
    embedding: Vec<f32>,
}

fn align_external_embeddings(
    data: Vec<EmbeddingData>,
    expected_count: usize,
    dimensions: usize,
) -> Result<Vec<Vec<f32>>, StateError> {
    let indexed_count = data.iter().filter(|d| d.index.is_some()).count();
    if indexed_count > 0 {
        if indexed_count != data.len() {
            return Err(StateError::embedder("mixed index presence in embedding response"));
        }
        let mut ordered = vec![None; expected_count];
        for item in data {
            let index = item
                .index
                .ok_or_else(|| StateError::embedder("missing index"))?;
            if index >= expected_count {
                return Err(StateError::embedder(format!("index out of range: {index}")));
            }
            if item.embedding.len() != dimensions {
                return Err(StateError::embedder(format!(
                    "dimensions mismatch expected={} got={}",
                    dimensions,
                    item.embedding.len()
                )));
            }
            if ordered[index].is_some() {
                return Err(StateError::embedder(format!("duplicate index: {index}")));
            }
            ordered[index] = Some(item.embedding);
        }
        return ordered
            .into_iter()
            .enumerate()
            .map(|(i, v)| v.ok_or_else(|| StateError::embedder(format!("missing index: {i}"))))
            .collect();
    }

    if data.len() != expected_count {
        return Err(StateError::embedder(format!(
            "result count mismatch expected={} got={}",
            expected_count,
            data.len()
        )));
    }
    data.into_iter()
        .map(|item| {
            if item.embedding.len() != dimensions {
                Err(StateError::embedder(format!(
                    "dimensions mismatch expected={} got={}",
                    dimensions,
                    item.embedding.len()
                )))
            } else {
                Ok(item.embedding)
            }
        })
        .collect()
}

fn fastembed_cache_capacity() -> usize {
    std::env::var("ARCHIVIST_FASTEMBED_CACHE_CAP")
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(DEFAULT_FASTEMBED_CACHE_CAPACITY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_embedding_is_stable_and_unit_norm() {
        let v1 = deterministic_embedding("fn foo() {}", 32);
        let v2 = deterministic_embedding("fn foo() {}", 32);
        assert_eq!(v1, v2);
        let norm: f64 = v1.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }

    #[test]
    fn deterministic_embedding_differs_for_different_input() {
        assert_ne!(
            deterministic_embedding("a", 16),
            deterministic_embedding("b", 16)
        );
    }

    #[test]
    fn fastembed_provider_without_local_model_reports_fallback_model_id() {
        let mut provider = FastEmbedProvider::new("test-model".into(), 16, None, 2);
        assert!(provider.ready());
        provider.embed_batch(&["alpha".into()]).unwrap();
        assert!(!provider.ready());
        assert_eq!(provider.model_id(), constants::FALLBACK_EMBEDDING_MODEL_ID);
    }

    #[test]
    fn fastembed_provider_caches_repeated_inputs() {
        let mut provider = FastEmbedProvider::new("test-model".into(), 16, None, 2);
        let first = provider
            .embed_batch(&["alpha".into(), "beta".into(), "alpha".into()])
            .unwrap();
        assert_eq!(provider.cache_entries(), 2);
        assert_eq!(first[0], first[2]);

        let second = provider.embed_batch(&["alpha".into()]).unwrap();
        assert_eq!(second[0], first[0]);
    }

    #[test]
    fn fastembed_provider_cache_respects_capacity() {
        let mut provider = FastEmbedProvider::new("test-model".into(), 8, None, 2);
        provider.cache_capacity = 1;
        provider.embed_batch(&["a".into(), "b".into()]).unwrap();
        assert_eq!(provider.cache_entries(), 1);
    }

    #[test]
    fn external_embeddings_reorder_by_index() {
        let aligned = align_external_embeddings(
            vec![
                EmbeddingData { index: Some(1), embedding: vec![2.0, 0.0] },
                EmbeddingData { index: Some(0), embedding: vec![1.0, 0.0] },
            ],
            2,
            2,
        )
        .unwrap();
        assert_eq!(aligned[0], vec![1.0, 0.0]);
        assert_eq!(aligned[1], vec![2.0, 0.0]);
    }

    #[test]
    fn external_embeddings_reject_dimension_mismatch() {
        let err = align_external_embeddings(
            vec![EmbeddingData { index: None, embedding: vec![1.0] }],
            1,
            2,
        )
        .unwrap_err();
        assert!(err.to_string().contains("dimensions mismatch"));
    }

    #[test]
    fn external_embeddings_reject_missing_index() {
        let err = align_external_embeddings(
            vec![EmbeddingData { index: Some(5), embedding: vec![1.0, 0.0] }],
            2,
            2,
        )
        .unwrap_err();
        assert!(err.to_string().contains("index out of range"));
    }
}
