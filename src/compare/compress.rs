//! Optional prompt compression before submission.
//!
//! Failures never surface: the engine falls back to the original text.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::config::CompressionConfig;

#[derive(Error, Debug)]
pub enum CompressError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("request timed out")]
    Timeout,
    #[error("compression service returned {0}")]
    Http(u16),
    #[error("malformed compression response")]
    MalformedResponse,
}

#[async_trait]
pub trait PromptCompressor: Send + Sync {
    async fn compress(&self, text: &str) -> Result<String, CompressError>;
}

/// Passes text through unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCompression;

#[async_trait]
impl PromptCompressor for NoCompression {
    async fn compress(&self, text: &str) -> Result<String, CompressError> {
        Ok(text.to_string())
    }
}

/// Client for a compression endpoint taking `{input, aggressiveness}` and
/// answering `{output}`.
pub struct HttpCompressor {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    aggressiveness: f64,
    timeout: Duration,
}

impl HttpCompressor {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>, aggressiveness: f64, timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
            api_key,
            aggressiveness,
            timeout,
        }
    }

    pub fn from_config(config: &CompressionConfig) -> Self {
        Self::new(
            config.endpoint.clone(),
            config.api_key(),
            config.aggressiveness,
            config.timeout(),
        )
    }

    async fn request(&self, text: &str) -> Result<String, CompressError> {
        let body = serde_json::json!({
            "input": text,
            "aggressiveness": self.aggressiveness,
        });
        let mut request = self.http.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CompressError::Http(status.as_u16()));
        }
        let json: serde_json::Value = response.json().await?;
        json.get("output")
            .and_then(|o| o.as_str())
            .filter(|o| !o.trim().is_empty())
            .map(str::to_string)
            .ok_or(CompressError::MalformedResponse)
    }
}

#[async_trait]
impl PromptCompressor for HttpCompressor {
    async fn compress(&self, text: &str) -> Result<String, CompressError> {
        match tokio::time::timeout(self.timeout, self.request(text)).await {
            Ok(result) => result,
            Err(_) => Err(CompressError::Timeout),
        }
    }
}

/// Compressed text, or `text` itself when compression fails.
pub(crate) async fn compress_or_original(compressor: &dyn PromptCompressor, text: &str) -> String {
    match compressor.compress(text).await {
        Ok(compressed) => compressed,
        Err(e) => {
            tracing::warn!(error = %e, "prompt compression failed, sending original text");
            text.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BrokenCompressor;

    #[async_trait]
    impl PromptCompressor for BrokenCompressor {
        async fn compress(&self, _text: &str) -> Result<String, CompressError> {
            Err(CompressError::Http(503))
        }
    }

    #[tokio::test]
    async fn test_no_compression_is_identity() {
        assert_eq!(compress_or_original(&NoCompression, "prompt").await, "prompt");
    }

    #[tokio::test]
    async fn test_failure_falls_back_to_original() {
        assert_eq!(compress_or_original(&BrokenCompressor, "prompt").await, "prompt");
    }
}
