//! Cost-aware escalation between the similarity score and deep comparison.
//!
//! | similarity / names                          | method                    | engine |
//! |---------------------------------------------|---------------------------|--------|
//! | < very_low, or name < name_floor            | `embedding_only_very_low` | no     |
//! | >= high and identical parameter names       | `embedding_only`          | no     |
//! | >= medium                                   | `hybrid`                  | yes    |
//! | otherwise                                   | `llm_focused`             | yes    |

use std::collections::HashMap;

use super::{CompareError, CompareMethod, ComparisonEngine, ComparisonResult, Issue, Severity};
use crate::config::{ConfigurationError, HybridConfig};
use crate::signature::FunctionSignature;
use crate::similarity::signals::{parameters_differ, rough_name_similarity};
use crate::similarity::SimilarityScorer;

#[derive(Debug, Clone)]
pub struct HybridComparator {
    scorer: SimilarityScorer,
    engine: ComparisonEngine,
    bands: HybridConfig,
    verification_threshold: u32,
}

impl HybridComparator {
    pub fn new(scorer: SimilarityScorer, engine: ComparisonEngine) -> Self {
        Self {
            scorer,
            engine,
            bands: HybridConfig::default(),
            verification_threshold: 80,
        }
    }

    pub fn with_bands(mut self, bands: HybridConfig) -> Self {
        self.bands = bands;
        self
    }

    pub fn with_verification_threshold(mut self, threshold: u32) -> Self {
        self.verification_threshold = threshold;
        self
    }

    pub fn verification_threshold(&self) -> u32 {
        self.verification_threshold
    }

    /// Compare a matched pair.
    ///
    /// Engine failures become a zero-confidence result; only a
    /// configuration error is returned.
    pub async fn compare(
        &self,
        code: &FunctionSignature,
        doc: &FunctionSignature,
    ) -> Result<ComparisonResult, ConfigurationError> {
        let similarity = self.scorer.score(code, doc).await.value;
        let names = rough_name_similarity(&code.name, &doc.name);
        let bands = &self.bands;
        let percent = percent(similarity);

        let result = if similarity < bands.very_low || names < bands.name_floor {
            self.finish(
                percent,
                vec![mismatch_issue(code, doc, percent)],
                CompareMethod::EmbeddingOnlyVeryLow,
            )
        } else if similarity >= bands.high && !parameters_differ(code, doc) {
            self.finish(percent, structural_issues(code, doc), CompareMethod::EmbeddingOnly)
        } else {
            let method = if similarity >= bands.medium {
                CompareMethod::Hybrid
            } else {
                CompareMethod::LlmFocused
            };
            match self.engine.compare(code, doc).await {
                Ok(deep) => {
                    let combined = self.blend(method, similarity, percent, deep.confidence);
                    self.finish(combined, deep.issues, method)
                }
                Err(CompareError::Configuration(e)) => return Err(e),
                Err(e) => {
                    tracing::warn!(function = %code.name, error = %e, "deep comparison unavailable");
                    let mut issues = structural_issues(code, doc);
                    issues.push(
                        Issue::new(
                            Severity::Low,
                            code.name.as_str(),
                            format!("Deep comparison unavailable: {}", e),
                        )
                        .with_fix("Re-run the check once the reasoning service is reachable"),
                    );
                    self.finish(0, issues, method)
                }
            }
        };

        tracing::debug!(
            function = %code.name,
            similarity,
            method = %result.method,
            confidence = result.confidence,
            "pair compared"
        );
        Ok(result)
    }

    /// Combine similarity with the engine's confidence for `method`.
    fn blend(&self, method: CompareMethod, similarity: f64, percent: u32, deep: u32) -> u32 {
        let (percent, deep_f) = (percent as f64, deep as f64);
        let combined = match method {
            CompareMethod::Hybrid => 0.4 * percent + 0.6 * deep_f,
            _ if similarity < self.bands.disagreement_similarity
                && deep > self.bands.disagreement_confidence =>
            {
                deep_f * self.bands.disagreement_discount
            }
            _ => 0.2 * percent + 0.8 * deep_f,
        };
        to_confidence(combined)
    }

    fn finish(&self, confidence: u32, issues: Vec<Issue>, method: CompareMethod) -> ComparisonResult {
        ComparisonResult::new(confidence, issues, method, self.verification_threshold)
    }
}

/// Similarity as a truncated percentage.
fn percent(similarity: f64) -> u32 {
    to_confidence(similarity * 100.0)
}

fn to_confidence(value: f64) -> u32 {
    if value.is_finite() {
        value.clamp(0.0, 100.0) as u32
    } else {
        0
    }
}

fn mismatch_issue(code: &FunctionSignature, doc: &FunctionSignature, percent: u32) -> Issue {
    Issue::new(
        Severity::High,
        code.name.as_str(),
        format!(
            "Functions are completely different (similarity {}%). Code function '{}' does not match documented function '{}'.",
            percent, code.name, doc.name
        ),
    )
    .with_code(code.call_form())
    .with_doc(doc.call_form())
    .with_fix("Check if the function was renamed or if the documentation refers to different code, and update the documentation to match")
}

/// Parameter presence check that needs no remote call.
///
/// Code parameters missing from the docs are high severity when required
/// and medium when they have a default; documented parameters missing
/// from the code are high severity.
pub(crate) fn structural_issues(code: &FunctionSignature, doc: &FunctionSignature) -> Vec<Issue> {
    let code_params: HashMap<String, _> = code
        .parameters
        .iter()
        .map(|p| (p.name.to_lowercase(), p))
        .collect();
    let doc_params: HashMap<String, _> = doc
        .parameters
        .iter()
        .map(|p| (p.name.to_lowercase(), p))
        .collect();

    let mut issues = Vec::new();
    for param in &code.parameters {
        if doc_params.contains_key(&param.name.to_lowercase()) {
            continue;
        }
        let (severity, kind) = if param.is_required() {
            (Severity::High, "Required")
        } else {
            (Severity::Medium, "Optional")
        };
        let mut shown = format!(
            "{}: {}",
            param.name,
            param.type_annotation.as_deref().unwrap_or("Any")
        );
        if let Some(default) = &param.default {
            shown.push_str(&format!(" = {}", default));
        }
        issues.push(
            Issue::new(
                severity,
                code.name.as_str(),
                format!("{} parameter '{}' is missing from documentation", kind, param.name),
            )
            .with_code(shown)
            .with_doc("Not documented")
            .with_fix(format!("Add '{}' parameter to documentation", param.name)),
        );
    }

    for param in &doc.parameters {
        if code_params.contains_key(&param.name.to_lowercase()) {
            continue;
        }
        let shown = match &param.type_annotation {
            Some(ty) => format!("{} ({})", param.name, ty),
            None => param.name.clone(),
        };
        issues.push(
            Issue::new(
                Severity::High,
                code.name.as_str(),
                format!("Parameter '{}' is documented but does not exist in code", param.name),
            )
            .with_code("Parameter does not exist")
            .with_doc(shown)
            .with_fix(format!(
                "Remove '{}' from documentation or check if the parameter was renamed",
                param.name
            )),
        );
    }
    issues
}
