//! Deep comparison of matched pairs.
//!
//! - [`ComparisonEngine`]: asks a remote reasoning service whether a code
//!   signature and its documentation agree, with retry and backoff
//! - [`HybridComparator`]: decides per pair whether the similarity score
//!   alone is conclusive, or the engine must be consulted
//!
//! Remote capabilities sit behind the [`ReasoningService`] and
//! [`PromptCompressor`] traits so runs can be stubbed.

mod compress;
mod engine;
mod hybrid;
mod prompt;
pub mod retry;
mod service;

pub use compress::{CompressError, HttpCompressor, NoCompression, PromptCompressor};
pub use engine::ComparisonEngine;
pub use hybrid::HybridComparator;
pub use prompt::{build_prompt, parse_reply, Reply};
pub use retry::{FailureClass, RetryPolicy};
pub use service::GeminiService;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ConfigurationError;

/// How serious a documentation problem is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }

    /// Lenient parse for service replies; anything unknown is medium.
    pub fn from_reply(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "low" => Severity::Low,
            "high" | "critical" => Severity::High,
            _ => Severity::Medium,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A problem found between code and documentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub severity: Severity,
    /// Function the issue is about
    pub function: String,
    pub description: String,
    /// What the code shows
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_snippet: Option<String>,
    /// What the documentation claims
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_snippet: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_fix: Option<String>,
}

impl Issue {
    pub fn new(severity: Severity, function: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            severity,
            function: function.into(),
            description: description.into(),
            code_snippet: None,
            doc_snippet: None,
            suggested_fix: None,
        }
    }

    pub fn with_code(mut self, snippet: impl Into<String>) -> Self {
        self.code_snippet = Some(snippet.into());
        self
    }

    pub fn with_doc(mut self, snippet: impl Into<String>) -> Self {
        self.doc_snippet = Some(snippet.into());
        self
    }

    pub fn with_fix(mut self, fix: impl Into<String>) -> Self {
        self.suggested_fix = Some(fix.into());
        self
    }
}

/// Which path produced a comparison result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareMethod {
    /// Similarity too low to be the same function; no deep comparison
    EmbeddingOnlyVeryLow,
    /// Similarity high and parameters agree; no deep comparison
    EmbeddingOnly,
    /// Deep comparison blended 60/40 with similarity
    Hybrid,
    /// Deep comparison blended 80/20 with similarity
    LlmFocused,
    /// Deep comparison alone
    Llm,
    /// One side of the pair is missing
    Unmatched,
}

impl CompareMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompareMethod::EmbeddingOnlyVeryLow => "embedding_only_very_low",
            CompareMethod::EmbeddingOnly => "embedding_only",
            CompareMethod::Hybrid => "hybrid",
            CompareMethod::LlmFocused => "llm_focused",
            CompareMethod::Llm => "llm",
            CompareMethod::Unmatched => "unmatched",
        }
    }
}

impl std::fmt::Display for CompareMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Verdict for one code/documentation pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonResult {
    /// Always `confidence >= verification threshold`
    pub matches: bool,
    /// 0..=100
    pub confidence: u32,
    pub issues: Vec<Issue>,
    pub method: CompareMethod,
}

impl ComparisonResult {
    /// Build a result, deriving `matches` from the verification threshold.
    pub fn new(confidence: u32, issues: Vec<Issue>, method: CompareMethod, threshold: u32) -> Self {
        let confidence = confidence.min(100);
        Self {
            matches: confidence >= threshold,
            confidence,
            issues,
            method,
        }
    }
}

/// Errors from a reasoning service call.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Credential environment variable not set
    #[error("missing credential: {0} is not set")]
    MissingCredential(String),
    #[error("rate limited by reasoning service")]
    RateLimited,
    #[error("request timed out")]
    Timeout,
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("reasoning service returned {status}: {body}")]
    Http { status: u16, body: String },
    #[error("malformed service response: {0}")]
    MalformedResponse(String),
}

impl ServiceError {
    /// How the retry loop should treat this error.
    pub fn class(&self) -> FailureClass {
        match self {
            ServiceError::RateLimited => FailureClass::RateLimited,
            ServiceError::Timeout | ServiceError::Network(_) => FailureClass::Transient,
            ServiceError::Http { status, .. } if *status >= 500 => FailureClass::Transient,
            ServiceError::Http { .. }
            | ServiceError::MissingCredential(_)
            | ServiceError::MalformedResponse(_) => FailureClass::Fatal,
        }
    }
}

/// Errors returned by [`ComparisonEngine::compare`].
#[derive(Error, Debug)]
pub enum CompareError {
    /// The run cannot proceed; never retried.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error("gave up after {attempts} attempts: {source}")]
    Exhausted {
        attempts: u32,
        #[source]
        source: ServiceError,
    },
    #[error("reasoning service failed: {0}")]
    Fatal(ServiceError),
}

/// A remote service that answers a natural-language prompt.
#[async_trait]
pub trait ReasoningService: Send + Sync {
    async fn submit(&self, prompt: &str) -> Result<String, ServiceError>;
}
