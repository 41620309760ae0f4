//! Repository-level trust scoring.
//!
//! Runs the matcher once, compares every matched pair, and folds the
//! outcomes into one trust score (0-100, higher = docs more trustworthy).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::compare::{
    CompareMethod, ComparisonEngine, HybridComparator, Issue, Severity,
};
use crate::config::{Config, ConfigurationError};
use crate::matcher::{MatchedPair, Matcher};
use crate::signature::FunctionSignature;
use crate::similarity::{CachingEncoder, HttpEncoder, SimilarityScorer, TextEncoder};

/// Grade thresholds (minimum trust score per letter).
pub mod grades {
    pub const A_MIN: u32 = 90;
    pub const B_MIN: u32 = 75;
    pub const C_MIN: u32 = 60;
    pub const D_MIN: u32 = 40;
}

/// Letter grade for a trust score.
pub fn calculate_grade(trust_score: u32) -> &'static str {
    match trust_score {
        s if s >= grades::A_MIN => "A",
        s if s >= grades::B_MIN => "B",
        s if s >= grades::C_MIN => "C",
        s if s >= grades::D_MIN => "D",
        _ => "F",
    }
}

/// Outcome of analyzing one repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryReport {
    /// Average pair confidence, 100 when there is nothing to compare
    pub trust_score: u32,
    /// Number of pairs, matched or not
    pub total_functions: usize,
    /// Pairs whose confidence reached the verification threshold
    pub verified: usize,
    pub issues: Vec<Issue>,
    /// Pairs resolved per comparison method
    pub method_stats: BTreeMap<String, usize>,
}

impl RepositoryReport {
    pub fn grade(&self) -> &'static str {
        calculate_grade(self.trust_score)
    }

    /// Issue count per severity, highest first.
    pub fn severity_counts(&self) -> Vec<(Severity, usize)> {
        [Severity::High, Severity::Medium, Severity::Low]
            .into_iter()
            .map(|s| (s, self.issues.iter().filter(|i| i.severity == s).count()))
            .collect()
    }
}

/// The full extraction-independent pipeline: match, compare, aggregate.
#[derive(Debug, Clone)]
pub struct Analyzer {
    matcher: Matcher,
    comparator: HybridComparator,
}

impl Analyzer {
    pub fn new(matcher: Matcher, comparator: HybridComparator) -> Self {
        Self {
            matcher,
            comparator,
        }
    }

    /// Wire the pipeline from configuration.
    ///
    /// Fails when the reasoning credential is missing.
    pub fn from_config(config: &Config) -> Result<Self, ConfigurationError> {
        let scorer = if config.embedding.enabled {
            let http: Arc<dyn TextEncoder> = Arc::new(HttpEncoder::from_config(&config.embedding));
            SimilarityScorer::with_encoder(Arc::new(CachingEncoder::new(http)))
        } else {
            SimilarityScorer::new()
        };

        let engine = ComparisonEngine::from_config(config)?;
        let comparator = HybridComparator::new(scorer.clone(), engine)
            .with_bands(config.hybrid.clone())
            .with_verification_threshold(config.verification.threshold);
        let matcher = Matcher::new(scorer).with_threshold(config.matching.threshold);

        Ok(Self::new(matcher, comparator))
    }

    /// Analyze one repository's code and documentation signatures.
    ///
    /// Pairs are processed sequentially. Only a configuration error aborts
    /// the run; every other failure lowers one pair's contribution.
    pub async fn analyze(
        &self,
        code: &[FunctionSignature],
        docs: &[FunctionSignature],
    ) -> Result<RepositoryReport, ConfigurationError> {
        let pairs = self.matcher.match_signatures(code, docs).await;

        let mut issues = Vec::new();
        let mut method_stats: BTreeMap<String, usize> = BTreeMap::new();
        let mut total_confidence: u64 = 0;
        let mut verified = 0;

        for pair in &pairs {
            match pair {
                MatchedPair::CodeOnly(code_sig) => {
                    issues.push(undocumented(code_sig));
                    *method_stats
                        .entry(CompareMethod::Unmatched.as_str().to_string())
                        .or_insert(0) += 1;
                }
                MatchedPair::DocOnly(doc_sig) => {
                    issues.push(not_in_code(doc_sig));
                    *method_stats
                        .entry(CompareMethod::Unmatched.as_str().to_string())
                        .or_insert(0) += 1;
                }
                MatchedPair::Matched { code, doc, .. } => {
                    let result = self.comparator.compare(code, doc).await?;
                    *method_stats
                        .entry(result.method.as_str().to_string())
                        .or_insert(0) += 1;
                    total_confidence += u64::from(result.confidence);
                    if result.matches {
                        verified += 1;
                    } else {
                        issues.extend(result.issues);
                    }
                }
            }
        }

        let total = pairs.len();
        let trust_score = if total == 0 {
            100
        } else {
            (total_confidence as f64 / total as f64).round() as u32
        };

        tracing::info!(
            pairs = total,
            verified,
            trust_score,
            issues = issues.len(),
            "analysis complete"
        );

        Ok(RepositoryReport {
            trust_score,
            total_functions: total,
            verified,
            issues,
            method_stats,
        })
    }
}

fn undocumented(code: &FunctionSignature) -> Issue {
    Issue::new(
        Severity::Low,
        code.name.as_str(),
        "Function exists in code but is not documented",
    )
    .with_code(code.call_form())
    .with_doc("No documentation found")
    .with_fix("Add documentation for this function")
}

fn not_in_code(doc: &FunctionSignature) -> Issue {
    Issue::new(
        Severity::Medium,
        doc.name.as_str(),
        "Documented function not found in code",
    )
    .with_code("Function does not exist")
    .with_doc(format!("Documents {}()", doc.name))
    .with_fix("Remove from documentation or check if it was renamed")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calculate_grade() {
        assert_eq!(calculate_grade(100), "A");
        assert_eq!(calculate_grade(90), "A");
        assert_eq!(calculate_grade(89), "B");
        assert_eq!(calculate_grade(75), "B");
        assert_eq!(calculate_grade(60), "C");
        assert_eq!(calculate_grade(40), "D");
        assert_eq!(calculate_grade(39), "F");
        assert_eq!(calculate_grade(0), "F");
    }

    #[test]
    fn test_severity_counts() {
        let report = RepositoryReport {
            trust_score: 50,
            total_functions: 3,
            verified: 0,
            issues: vec![
                Issue::new(Severity::Low, "a", "x"),
                Issue::new(Severity::High, "b", "y"),
                Issue::new(Severity::Low, "c", "z"),
            ],
            method_stats: BTreeMap::new(),
        };
        assert_eq!(
            report.severity_counts(),
            [(Severity::High, 1), (Severity::Medium, 0), (Severity::Low, 2)]
        );
        assert_eq!(report.grade(), "D");
    }

    #[test]
    fn test_unmatched_issue_text() {
        let doc = FunctionSignature::new("send_email", "README.md", 4);
        let issue = not_in_code(&doc);
        assert_eq!(issue.severity, Severity::Medium);
        assert_eq!(issue.description, "Documented function not found in code");
        assert_eq!(issue.doc_snippet.as_deref(), Some("Documents send_email()"));

        let code = FunctionSignature::new("helper", "a.py", 1);
        assert_eq!(undocumented(&code).severity, Severity::Low);
    }
}
