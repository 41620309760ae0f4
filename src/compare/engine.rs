//! Deep comparison through a remote reasoning service.

use std::sync::Arc;
use std::time::Duration;

use super::compress::compress_or_original;
use super::prompt::{build_prompt, parse_reply};
use super::retry::{RetryEvent, RetryPolicy, RetryState};
use super::{
    CompareError, CompareMethod, ComparisonResult, GeminiService, HttpCompressor, NoCompression,
    PromptCompressor, ReasoningService, ServiceError,
};
use crate::config::{Config, ConfigurationError};
use crate::signature::FunctionSignature;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_VERIFICATION_THRESHOLD: u32 = 80;

/// Compares one pair by asking a [`ReasoningService`].
#[derive(Clone)]
pub struct ComparisonEngine {
    service: Arc<dyn ReasoningService>,
    compressor: Arc<dyn PromptCompressor>,
    policy: RetryPolicy,
    timeout: Duration,
    verification_threshold: u32,
}

impl std::fmt::Debug for ComparisonEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComparisonEngine")
            .field("policy", &self.policy)
            .field("timeout", &self.timeout)
            .field("verification_threshold", &self.verification_threshold)
            .finish()
    }
}

impl ComparisonEngine {
    pub fn new(service: Arc<dyn ReasoningService>) -> Self {
        Self {
            service,
            compressor: Arc::new(NoCompression),
            policy: RetryPolicy::default(),
            timeout: DEFAULT_TIMEOUT,
            verification_threshold: DEFAULT_VERIFICATION_THRESHOLD,
        }
    }

    /// Engine wired from configuration.
    ///
    /// Fails immediately when the reasoning credential is missing.
    pub fn from_config(config: &Config) -> Result<Self, ConfigurationError> {
        let service = GeminiService::from_config(&config.reasoning)?;
        let compressor: Arc<dyn PromptCompressor> = if config.compression.enabled {
            Arc::new(HttpCompressor::from_config(&config.compression))
        } else {
            Arc::new(NoCompression)
        };

        Ok(Self::new(Arc::new(service))
            .with_compressor(compressor)
            .with_policy(RetryPolicy::new(
                config.reasoning.max_retries,
                config.reasoning.base_delay(),
            ))
            .with_timeout(config.reasoning.timeout())
            .with_verification_threshold(config.verification.threshold))
    }

    pub fn with_compressor(mut self, compressor: Arc<dyn PromptCompressor>) -> Self {
        self.compressor = compressor;
        self
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Bound on each individual service call.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_verification_threshold(mut self, threshold: u32) -> Self {
        self.verification_threshold = threshold;
        self
    }

    /// Ask the service whether `doc` still describes `code`.
    ///
    /// Unusable replies give a neutral zero-confidence result. Service
    /// failures are retried per the policy and then returned as errors.
    pub async fn compare(
        &self,
        code: &FunctionSignature,
        doc: &FunctionSignature,
    ) -> Result<ComparisonResult, CompareError> {
        let prompt = build_prompt(code, doc);
        let prompt = compress_or_original(self.compressor.as_ref(), &prompt).await;

        let text = self.submit(&prompt, &code.name).await?;
        let reply = parse_reply(&text, &code.name);
        Ok(ComparisonResult::new(
            reply.confidence,
            reply.issues,
            CompareMethod::Llm,
            self.verification_threshold,
        ))
    }

    /// Submit with retries, driving the [`RetryState`] machine.
    async fn submit(&self, prompt: &str, function: &str) -> Result<String, CompareError> {
        let mut state = RetryState::Idle.next(RetryEvent::Start, &self.policy);

        loop {
            state = match state {
                RetryState::Sent { attempt } => match self.submit_once(prompt).await {
                    Ok(text) => {
                        tracing::debug!(function, attempt, "reasoning service replied");
                        return Ok(text);
                    }
                    Err(ServiceError::MissingCredential(var)) => {
                        return Err(ConfigurationError::MissingCredential(var).into());
                    }
                    Err(e) => {
                        let next = state.next(RetryEvent::Failed(e.class()), &self.policy);
                        if let RetryState::Failed { attempts, exhausted } = next {
                            tracing::warn!(function, attempts, error = %e, "reasoning call failed");
                            return Err(if exhausted {
                                CompareError::Exhausted {
                                    attempts,
                                    source: e,
                                }
                            } else {
                                CompareError::Fatal(e)
                            });
                        }
                        tracing::debug!(function, attempt, error = %e, "reasoning call failed, retrying");
                        next
                    }
                },
                RetryState::Backoff { attempt, delay } => {
                    tracing::debug!(function, attempt, delay_ms = delay.as_millis() as u64, "backing off");
                    tokio::time::sleep(delay).await;
                    state.next(RetryEvent::BackoffElapsed, &self.policy)
                }
                RetryState::Idle => state.next(RetryEvent::Start, &self.policy),
                RetryState::Done | RetryState::Failed { .. } => {
                    unreachable!("terminal retry states return before the next iteration")
                }
            };
        }
    }

    async fn submit_once(&self, prompt: &str) -> Result<String, ServiceError> {
        match tokio::time::timeout(self.timeout, self.service.submit(prompt)).await {
            Ok(result) => result,
            Err(_) => Err(ServiceError::Timeout),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::{CompressError, Severity};
    use crate::signature::Parameter;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Replays scripted outcomes, then repeats the last one.
    struct Scripted {
        outcomes: Mutex<Vec<Result<String, ServiceError>>>,
        calls: AtomicUsize,
        prompts: Mutex<Vec<String>>,
    }

    impl Scripted {
        fn new(outcomes: Vec<Result<String, ServiceError>>) -> Arc<Self> {
            Arc::new(Self {
                outcomes: Mutex::new(outcomes),
                calls: AtomicUsize::new(0),
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ReasoningService for Scripted {
        async fn submit(&self, prompt: &str) -> Result<String, ServiceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.prompts.lock().unwrap().push(prompt.to_string());
            let mut outcomes = self.outcomes.lock().unwrap();
            if outcomes.len() > 1 {
                outcomes.remove(0)
            } else {
                match &outcomes[0] {
                    Ok(text) => Ok(text.clone()),
                    Err(ServiceError::RateLimited) => Err(ServiceError::RateLimited),
                    Err(_) => Err(ServiceError::Timeout),
                }
            }
        }
    }

    struct Shouting;

    #[async_trait]
    impl PromptCompressor for Shouting {
        async fn compress(&self, text: &str) -> Result<String, CompressError> {
            Ok(text.to_uppercase())
        }
    }

    fn pair() -> (FunctionSignature, FunctionSignature) {
        let code = FunctionSignature::new("calculate_total", "cart.py", 1)
            .with_parameters(vec![Parameter::new("price")]);
        let doc = FunctionSignature::new("calculate_total", "README.md", 5)
            .with_parameters(vec![Parameter::new("price")]);
        (code, doc)
    }

    fn fast(service: Arc<dyn ReasoningService>) -> ComparisonEngine {
        ComparisonEngine::new(service).with_policy(RetryPolicy::new(3, Duration::from_millis(1)))
    }

    #[tokio::test]
    async fn test_compare_parses_reply() {
        let service = Scripted::new(vec![Ok(
            r#"{"matches": true, "confidence": 85, "issues": [{"severity": "low", "issue": "minor"}]}"#
                .to_string(),
        )]);
        let (code, doc) = pair();
        let result = fast(service).compare(&code, &doc).await.unwrap();

        assert_eq!(result.confidence, 85);
        assert!(result.matches);
        assert_eq!(result.method, CompareMethod::Llm);
        assert_eq!(result.issues[0].severity, Severity::Low);
    }

    #[tokio::test]
    async fn test_reply_matches_field_is_ignored() {
        let service = Scripted::new(vec![Ok(r#"{"matches": true, "confidence": 40}"#.to_string())]);
        let (code, doc) = pair();
        let result = fast(service).compare(&code, &doc).await.unwrap();
        assert!(!result.matches);
    }

    #[tokio::test]
    async fn test_garbage_reply_is_neutral() {
        let service = Scripted::new(vec![Ok("no idea".to_string())]);
        let (code, doc) = pair();
        let result = fast(service).compare(&code, &doc).await.unwrap();
        assert_eq!(result.confidence, 0);
        assert!(!result.matches);
        assert!(result.issues.is_empty());
    }

    #[tokio::test]
    async fn test_retries_rate_limit_then_succeeds() {
        let service = Scripted::new(vec![
            Err(ServiceError::RateLimited),
            Err(ServiceError::Http {
                status: 502,
                body: String::new(),
            }),
            Ok(r#"{"confidence": 90}"#.to_string()),
        ]);
        let (code, doc) = pair();
        let result = fast(service.clone()).compare(&code, &doc).await.unwrap();
        assert_eq!(result.confidence, 90);
        assert_eq!(service.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhausted_after_budget() {
        let service = Scripted::new(vec![Err(ServiceError::RateLimited)]);
        let (code, doc) = pair();
        let err = fast(service.clone()).compare(&code, &doc).await.unwrap_err();
        assert!(matches!(err, CompareError::Exhausted { attempts: 4, .. }));
        assert_eq!(service.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_fatal_not_retried() {
        let service = Scripted::new(vec![
            Err(ServiceError::Http {
                status: 400,
                body: "bad request".to_string(),
            }),
            Ok(r#"{"confidence": 90}"#.to_string()),
        ]);
        let (code, doc) = pair();
        let err = fast(service.clone()).compare(&code, &doc).await.unwrap_err();
        assert!(matches!(err, CompareError::Fatal(_)));
        assert_eq!(service.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_credential_is_configuration_error() {
        let service = Scripted::new(vec![
            Err(ServiceError::MissingCredential("GEMINI_API_KEY".to_string())),
            Ok(r#"{"confidence": 90}"#.to_string()),
        ]);
        let (code, doc) = pair();
        let err = fast(service.clone()).compare(&code, &doc).await.unwrap_err();
        assert!(matches!(err, CompareError::Configuration(_)));
        assert_eq!(service.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_compressed_prompt_is_submitted() {
        let service = Scripted::new(vec![Ok(r#"{"confidence": 90}"#.to_string())]);
        let (code, doc) = pair();
        fast(service.clone())
            .with_compressor(Arc::new(Shouting))
            .compare(&code, &doc)
            .await
            .unwrap();
        let prompts = service.prompts.lock().unwrap();
        assert!(prompts[0].contains("FUNCTION: CALCULATE_TOTAL"));
    }

    #[tokio::test]
    async fn test_timeout_counts_as_transient() {
        struct Slow;

        #[async_trait]
        impl ReasoningService for Slow {
            async fn submit(&self, _prompt: &str) -> Result<String, ServiceError> {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok("{}".to_string())
            }
        }

        let (code, doc) = pair();
        let err = ComparisonEngine::new(Arc::new(Slow))
            .with_policy(RetryPolicy::new(1, Duration::from_millis(1)))
            .with_timeout(Duration::from_millis(10))
            .compare(&code, &doc)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CompareError::Exhausted {
                attempts: 2,
                source: ServiceError::Timeout
            }
        ));
    }
}
