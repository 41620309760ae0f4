//! Optional text-embedding capability.
//!
//! - [`NoEncoder`]: null object, the scorer skips the embedding term
//! - [`HttpEncoder`]: OpenAI-compatible `/v1/embeddings` client
//! - [`CachingEncoder`]: memoizes vectors per text for one run

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use thiserror::Error;

use crate::config::EmbeddingConfig;

/// Errors from an encoder. Always absorbed by the scorer.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("encoder unavailable")]
    Unavailable,
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("request timed out")]
    Timeout,
    #[error("embedding service returned {status}: {body}")]
    Http { status: u16, body: String },
    #[error("malformed embedding response: {0}")]
    MalformedResponse(String),
}

/// Maps text to a dense vector.
#[async_trait]
pub trait TextEncoder: Send + Sync {
    async fn encode(&self, text: &str) -> Result<Vec<f32>, EncodeError>;

    /// False for encoders that never produce vectors.
    fn is_available(&self) -> bool {
        true
    }
}

/// Encoder that is never available.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoEncoder;

#[async_trait]
impl TextEncoder for NoEncoder {
    async fn encode(&self, _text: &str) -> Result<Vec<f32>, EncodeError> {
        Err(EncodeError::Unavailable)
    }

    fn is_available(&self) -> bool {
        false
    }
}

/// Client for an OpenAI-compatible embeddings endpoint.
pub struct HttpEncoder {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl HttpEncoder {
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            model: model.into(),
            api_key,
            timeout,
        }
    }

    pub fn from_config(config: &EmbeddingConfig) -> Self {
        Self::new(
            config.endpoint.clone(),
            config.model.clone(),
            config.api_key(),
            config.timeout(),
        )
    }

    async fn request(&self, text: &str) -> Result<Vec<f32>, EncodeError> {
        let body = serde_json::json!({
            "model": self.model,
            "input": [text],
        });

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EncodeError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let json: serde_json::Value = response.json().await?;
        parse_embedding(&json)
    }
}

#[async_trait]
impl TextEncoder for HttpEncoder {
    async fn encode(&self, text: &str) -> Result<Vec<f32>, EncodeError> {
        match tokio::time::timeout(self.timeout, self.request(text)).await {
            Ok(result) => result,
            Err(_) => Err(EncodeError::Timeout),
        }
    }
}

/// Reads `data[0].embedding` from an embeddings response.
fn parse_embedding(json: &serde_json::Value) -> Result<Vec<f32>, EncodeError> {
    let embedding = json
        .get("data")
        .and_then(|d| d.as_array())
        .and_then(|d| d.first())
        .and_then(|item| item.get("embedding"))
        .and_then(|e| e.as_array())
        .ok_or_else(|| EncodeError::MalformedResponse("missing data[0].embedding".into()))?;

    Ok(embedding
        .iter()
        .map(|v| v.as_f64().unwrap_or(0.0) as f32)
        .collect())
}

/// Wraps an encoder and remembers every vector it produced.
///
/// The first failure disables the encoder for the wrapper's lifetime;
/// later calls fail fast with [`EncodeError::Unavailable`].
pub struct CachingEncoder {
    inner: Arc<dyn TextEncoder>,
    memory: RwLock<HashMap<String, Vec<f32>>>,
    failed: AtomicBool,
}

impl CachingEncoder {
    pub fn new(inner: Arc<dyn TextEncoder>) -> Self {
        Self {
            inner,
            memory: RwLock::new(HashMap::new()),
            failed: AtomicBool::new(false),
        }
    }

    /// Whether an inner failure has disabled this encoder.
    pub fn has_failed(&self) -> bool {
        self.failed.load(Ordering::Relaxed)
    }

    /// Number of cached vectors.
    pub fn len(&self) -> usize {
        self.memory.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl TextEncoder for CachingEncoder {
    async fn encode(&self, text: &str) -> Result<Vec<f32>, EncodeError> {
        if let Ok(cache) = self.memory.read() {
            if let Some(vector) = cache.get(text) {
                return Ok(vector.clone());
            }
        }

        if self.has_failed() {
            return Err(EncodeError::Unavailable);
        }

        let vector = match self.inner.encode(text).await {
            Ok(vector) => vector,
            Err(e) => {
                if !self.failed.swap(true, Ordering::Relaxed) {
                    tracing::warn!(error = %e, "embedding encoder failed, disabled for this run");
                }
                return Err(e);
            }
        };
        if let Ok(mut cache) = self.memory.write() {
            cache.insert(text.to_string(), vector.clone());
        }
        Ok(vector)
    }

    fn is_available(&self) -> bool {
        !self.has_failed() && self.inner.is_available()
    }
}

/// Cosine similarity in [-1, 1].
///
/// Returns `None` for empty or mismatched vectors and zero norms.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f64> {
    if a.is_empty() || a.len() != b.len() {
        return None;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f64::EPSILON {
        return None;
    }
    Some((dot / denom).clamp(-1.0, 1.0))
}
