//! End-to-end analysis tests with a scripted reasoning service.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use driftcheck::compare::RetryPolicy;
use driftcheck::{
    Analyzer, CompareMethod, ComparisonEngine, ConfigurationError, FunctionSignature,
    HybridComparator, Matcher, Parameter, ReasoningService, ServiceError, Severity,
    SimilarityScorer,
};

fn testdata_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("testdata")
}

enum Behavior {
    Reply(&'static str),
    Fail,
    NoCredential,
}

struct StubService {
    behavior: Behavior,
    calls: AtomicUsize,
}

impl StubService {
    fn new(behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReasoningService for StubService {
    async fn submit(&self, _prompt: &str) -> Result<String, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            Behavior::Reply(text) => Ok(text.to_string()),
            Behavior::Fail => Err(ServiceError::Http {
                status: 400,
                body: "bad request".to_string(),
            }),
            Behavior::NoCredential => Err(ServiceError::MissingCredential("GEMINI_API_KEY".to_string())),
        }
    }
}

const DRIFT_REPLY: &str = r#"{
  "matches": false,
  "confidence": 40,
  "issues": [
    {
      "severity": "high",
      "issue": "Documentation describes a tax rate but the code applies a discount",
      "code_has": "discount=0.0",
      "docs_say": "tax_rate (float)",
      "suggested_fix": "Document the discount parameter instead of tax_rate"
    }
  ]
}"#;

fn analyzer(service: Arc<StubService>) -> Analyzer {
    let scorer = SimilarityScorer::new();
    let engine = ComparisonEngine::new(service).with_policy(RetryPolicy::new(0, Duration::ZERO));
    Analyzer::new(
        Matcher::new(scorer.clone()),
        HybridComparator::new(scorer, engine),
    )
}

fn calculate_total_code() -> FunctionSignature {
    FunctionSignature::new("calculate_total", "cart.py", 4).with_parameters(vec![
        Parameter::new("price"),
        Parameter::new("quantity"),
        Parameter::new("discount").with_default("0.0"),
    ])
}

fn calculate_total_doc() -> FunctionSignature {
    FunctionSignature::new("calculate_total", "README.md", 5).with_parameters(vec![
        Parameter::typed("price", "float"),
        Parameter::typed("quantity", "int"),
        Parameter::typed("tax_rate", "float"),
    ])
}

fn send_email_doc() -> FunctionSignature {
    FunctionSignature::new("send_email", "README.md", 20).with_parameters(vec![
        Parameter::typed("to", "str"),
        Parameter::typed("subject", "str"),
    ])
}

fn typed_total(file: &str) -> FunctionSignature {
    FunctionSignature::new("calculate_total", file, 1)
        .with_parameters(vec![
            Parameter::typed("price", "float"),
            Parameter::typed("quantity", "int"),
        ])
        .with_return_type(Some("float".to_string()))
        .with_documentation(Some("Compute the order total.".to_string()))
}

#[tokio::test]
async fn test_empty_inputs_are_fully_trusted() {
    let service = StubService::new(Behavior::Reply(DRIFT_REPLY));
    let report = analyzer(service.clone()).analyze(&[], &[]).await.unwrap();

    assert_eq!(report.trust_score, 100);
    assert_eq!(report.total_functions, 0);
    assert_eq!(report.verified, 0);
    assert!(report.issues.is_empty());
    assert!(report.method_stats.is_empty());
    assert_eq!(service.calls(), 0);
}

#[tokio::test]
async fn test_documented_function_missing_from_code() {
    let service = StubService::new(Behavior::Reply(DRIFT_REPLY));
    let report = analyzer(service)
        .analyze(&[calculate_total_code()], &[calculate_total_doc(), send_email_doc()])
        .await
        .unwrap();

    assert_eq!(report.total_functions, 2);
    assert_eq!(report.method_stats.get("unmatched"), Some(&1));
    assert_eq!(report.method_stats.values().sum::<usize>(), report.total_functions);

    let reported: Vec<_> = report
        .issues
        .iter()
        .filter(|i| i.function == "send_email")
        .collect();
    assert_eq!(reported.len(), 1);
    let missing = reported[0];
    assert_eq!(missing.severity, Severity::Medium);
    assert_eq!(missing.description, "Documented function not found in code");
    assert_eq!(
        missing.suggested_fix.as_deref(),
        Some("Remove from documentation or check if it was renamed")
    );
}

#[tokio::test]
async fn test_unmatched_pairs_contribute_zero() {
    let service = StubService::new(Behavior::Reply(DRIFT_REPLY));
    let code = FunctionSignature::new("flush_cache", "cache.py", 1);
    let report = analyzer(service.clone())
        .analyze(&[code], &[send_email_doc()])
        .await
        .unwrap();

    assert_eq!(service.calls(), 0);
    assert_eq!(report.total_functions, 2);
    assert_eq!(report.verified, 0);
    assert_eq!(report.trust_score, 0);
    assert_eq!(report.method_stats.len(), 1);
    assert_eq!(report.method_stats.get("unmatched"), Some(&2));

    assert_eq!(report.issues.len(), 2);
    let undocumented = report.issues.iter().find(|i| i.function == "flush_cache").unwrap();
    assert_eq!(undocumented.severity, Severity::Low);
    assert_eq!(undocumented.description, "Function exists in code but is not documented");
    let missing = report.issues.iter().find(|i| i.function == "send_email").unwrap();
    assert_eq!(missing.severity, Severity::Medium);
}

#[tokio::test]
async fn test_unmatched_pairs_dilute_verified_ones() {
    let service = StubService::new(Behavior::Reply(DRIFT_REPLY));
    let code = [typed_total("cart.py"), FunctionSignature::new("flush_cache", "cache.py", 9)];
    let docs = [typed_total("README.md"), send_email_doc()];
    let report = analyzer(service.clone()).analyze(&code, &docs).await.unwrap();

    assert_eq!(service.calls(), 0);
    assert_eq!(report.total_functions, 3);
    assert_eq!(report.verified, 1);
    // (100 + 0 + 0) / 3
    assert_eq!(report.trust_score, 33);
    assert_eq!(report.method_stats.get("unmatched"), Some(&2));
    assert_eq!(report.method_stats.get("embedding_only"), Some(&1));
    assert_eq!(report.issues.len(), 2);
}

#[tokio::test]
async fn test_parameter_drift_is_compared_in_depth() {
    let service = StubService::new(Behavior::Reply(DRIFT_REPLY));
    let report = analyzer(service.clone())
        .analyze(&[calculate_total_code()], &[calculate_total_doc()])
        .await
        .unwrap();

    assert_eq!(service.calls(), 1);
    assert_eq!(report.total_functions, 1);
    assert_eq!(report.verified, 0);
    assert!(report.method_stats.get("embedding_only").is_none());
    assert!(report.trust_score < 80);
    assert!(report.issues.iter().any(|i| {
        let text = format!(
            "{} {} {}",
            i.description,
            i.code_snippet.as_deref().unwrap_or(""),
            i.doc_snippet.as_deref().unwrap_or("")
        );
        i.function == "calculate_total" && (text.contains("discount") || text.contains("tax_rate"))
    }));
}

#[tokio::test]
async fn test_identical_signatures_are_verified_locally() {
    let service = StubService::new(Behavior::Reply(DRIFT_REPLY));
    let report = analyzer(service.clone())
        .analyze(&[typed_total("cart.py")], &[typed_total("README.md")])
        .await
        .unwrap();

    assert_eq!(service.calls(), 0);
    assert_eq!(report.trust_score, 100);
    assert_eq!(report.verified, 1);
    assert!(report.issues.is_empty());
    assert_eq!(
        report.method_stats.get(CompareMethod::EmbeddingOnly.as_str()),
        Some(&1)
    );
}

#[tokio::test]
async fn test_analysis_is_repeatable() {
    let service = StubService::new(Behavior::Reply(DRIFT_REPLY));
    let analyzer = analyzer(service);
    let code = [calculate_total_code()];
    let docs = [calculate_total_doc(), send_email_doc()];

    let first = analyzer.analyze(&code, &docs).await.unwrap();
    let second = analyzer.analyze(&code, &docs).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_matches_always_follows_threshold() {
    let service = StubService::new(Behavior::Reply(DRIFT_REPLY));
    let engine = ComparisonEngine::new(service);
    let comparator = HybridComparator::new(SimilarityScorer::new(), engine);

    let pairs = [
        (typed_total("a.py"), typed_total("a.md")),
        (calculate_total_code(), calculate_total_doc()),
        (calculate_total_code(), send_email_doc()),
    ];
    for (code, doc) in &pairs {
        let result = comparator.compare(code, doc).await.unwrap();
        assert!(result.confidence <= 100);
        assert_eq!(
            result.matches,
            result.confidence >= comparator.verification_threshold(),
            "{} vs {}",
            code.name,
            doc.name
        );
    }
}

#[tokio::test]
async fn test_service_failure_lowers_one_pair() {
    let service = StubService::new(Behavior::Fail);
    let report = analyzer(service.clone())
        .analyze(&[calculate_total_code()], &[calculate_total_doc()])
        .await
        .unwrap();

    assert_eq!(service.calls(), 1);
    assert_eq!(report.trust_score, 0);
    assert!(report
        .issues
        .iter()
        .any(|i| i.severity == Severity::Low && i.description.starts_with("Deep comparison unavailable")));
    assert!(report
        .issues
        .iter()
        .any(|i| i.description.contains("'tax_rate'")));
}

#[tokio::test]
async fn test_missing_credential_aborts_run() {
    let service = StubService::new(Behavior::NoCredential);
    let err = analyzer(service)
        .analyze(&[calculate_total_code()], &[calculate_total_doc()])
        .await
        .unwrap_err();
    assert_eq!(
        err,
        ConfigurationError::MissingCredential("GEMINI_API_KEY".to_string())
    );
}

#[cfg(feature = "tree-sitter")]
#[tokio::test]
async fn test_fixture_repository() {
    let shop = testdata_path().join("shop");
    let code_text = std::fs::read_to_string(shop.join("cart.py")).unwrap();
    let docs_text = std::fs::read_to_string(shop.join("README.md")).unwrap();
    let code = driftcheck::extract(&code_text, "cart.py");
    let docs = driftcheck::extract(&docs_text, "README.md");
    assert_eq!(code.len(), 1);
    assert_eq!(docs.len(), 2);

    let service = StubService::new(Behavior::Reply(DRIFT_REPLY));
    let report = analyzer(service.clone()).analyze(&code, &docs).await.unwrap();

    assert_eq!(service.calls(), 1);
    assert_eq!(report.total_functions, 2);
    assert!(report.issues.iter().any(|i| i.function == "send_email"));
    assert!(report.trust_score < 50);
    assert_eq!(report.grade(), "F");
}
