//! Gemini reasoning service.
//!
//! Calls: POST {base_url}/models/{model}:generateContent?key={api_key}

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use super::{ReasoningService, ServiceError};
use crate::config::{ConfigurationError, ReasoningConfig};

pub struct GeminiService {
    http: Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl GeminiService {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, api_key: impl Into<String>) -> Self {
        let http = Client::builder()
            .user_agent(concat!("driftcheck/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();
        Self {
            http,
            base_url: base_url.into(),
            model: model.into(),
            api_key: api_key.into(),
        }
    }

    /// Build from configuration; a missing API key is a configuration error.
    pub fn from_config(config: &ReasoningConfig) -> Result<Self, ConfigurationError> {
        let api_key = config.api_key()?;
        Ok(Self::new(config.base_url.clone(), config.model.clone(), api_key))
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

#[async_trait]
impl ReasoningService for GeminiService {
    async fn submit(&self, prompt: &str) -> Result<String, ServiceError> {
        let body = serde_json::json!({
            "contents": [{"parts": [{"text": prompt}]}],
        });

        let response = self
            .http
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ServiceError::Timeout
                } else {
                    ServiceError::Network(e)
                }
            })?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(ServiceError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| ServiceError::MalformedResponse(e.to_string()))?;
        reply_text(&json)
    }
}

/// Reads `candidates[0].content.parts[0].text`.
fn reply_text(json: &Value) -> Result<String, ServiceError> {
    json.pointer("/candidates/0/content/parts/0/text")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            ServiceError::MalformedResponse("missing candidates[0].content.parts[0].text".into())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_text() {
        let json = serde_json::json!({
            "candidates": [{"content": {"parts": [{"text": "{\"confidence\": 90}"}]}}]
        });
        assert_eq!(reply_text(&json).unwrap(), "{\"confidence\": 90}");

        let blocked = serde_json::json!({"promptFeedback": {"blockReason": "SAFETY"}});
        assert!(matches!(
            reply_text(&blocked),
            Err(ServiceError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_endpoint() {
        let service = GeminiService::new(
            "https://generativelanguage.googleapis.com/v1beta/",
            "gemini-2.5-flash",
            "k",
        );
        assert_eq!(
            service.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[test]
    fn test_from_config_requires_key() {
        let config = ReasoningConfig {
            api_key_env: "DRIFTCHECK_TEST_NO_SUCH_KEY".to_string(),
            ..ReasoningConfig::default()
        };
        assert!(matches!(
            GeminiService::from_config(&config),
            Err(ConfigurationError::MissingCredential(_))
        ));
    }
}
