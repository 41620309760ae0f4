//! Pairs code signatures with documentation signatures.
//!
//! Exact (case-insensitive) names pair first; remaining code signatures
//! take their best-scoring unconsumed doc signature if it clears the
//! threshold. Every input signature lands in exactly one pair.

use crate::signature::FunctionSignature;
use crate::similarity::{SimilarityScore, SimilarityScorer};

/// Default acceptance bar for non-exact pairings.
pub const DEFAULT_MATCH_THRESHOLD: f64 = 0.5;

/// One outcome of matching. At least one side is always present.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchedPair<'a> {
    Matched {
        code: &'a FunctionSignature,
        doc: &'a FunctionSignature,
        similarity: SimilarityScore,
    },
    /// Declared in code, not documented
    CodeOnly(&'a FunctionSignature),
    /// Documented, not found in code
    DocOnly(&'a FunctionSignature),
}

impl<'a> MatchedPair<'a> {
    pub fn code(&self) -> Option<&'a FunctionSignature> {
        match self {
            MatchedPair::Matched { code, .. } | MatchedPair::CodeOnly(code) => Some(code),
            MatchedPair::DocOnly(_) => None,
        }
    }

    pub fn doc(&self) -> Option<&'a FunctionSignature> {
        match self {
            MatchedPair::Matched { doc, .. } | MatchedPair::DocOnly(doc) => Some(doc),
            MatchedPair::CodeOnly(_) => None,
        }
    }

    /// Name of the function the pair is about, code side first.
    pub fn function_name(&self) -> &'a str {
        match self {
            MatchedPair::Matched { code, .. } | MatchedPair::CodeOnly(code) => &code.name,
            MatchedPair::DocOnly(doc) => &doc.name,
        }
    }
}

/// Function matcher with a configurable acceptance threshold.
#[derive(Debug, Clone)]
pub struct Matcher {
    scorer: SimilarityScorer,
    threshold: f64,
}

impl Default for Matcher {
    fn default() -> Self {
        Self::new(SimilarityScorer::new())
    }
}

impl Matcher {
    pub fn new(scorer: SimilarityScorer) -> Self {
        Self {
            scorer,
            threshold: DEFAULT_MATCH_THRESHOLD,
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn scorer(&self) -> &SimilarityScorer {
        &self.scorer
    }

    /// Pair `code` with `docs`.
    ///
    /// Output order: code signatures in input order (matched or not),
    /// then unconsumed doc signatures in input order.
    pub async fn match_signatures<'a>(
        &self,
        code: &'a [FunctionSignature],
        docs: &'a [FunctionSignature],
    ) -> Vec<MatchedPair<'a>> {
        let mut consumed = vec![false; docs.len()];
        let mut paired: Vec<Option<(usize, SimilarityScore)>> = vec![None; code.len()];

        // Exact names first, so a fuzzy pairing never steals an exact partner.
        let doc_keys: Vec<String> = docs.iter().map(FunctionSignature::match_key).collect();
        for (ci, code_sig) in code.iter().enumerate() {
            let key = code_sig.match_key();
            if let Some(di) = (0..docs.len()).find(|&di| !consumed[di] && doc_keys[di] == key) {
                consumed[di] = true;
                paired[ci] = Some((di, SimilarityScore::exact()));
            }
        }

        for (ci, code_sig) in code.iter().enumerate() {
            if paired[ci].is_some() {
                continue;
            }

            let mut best: Option<(usize, SimilarityScore)> = None;
            for (di, doc_sig) in docs.iter().enumerate() {
                if consumed[di] {
                    continue;
                }
                let score = self.scorer.score(code_sig, doc_sig).await;
                if best.map_or(true, |(_, b)| score.value > b.value) {
                    best = Some((di, score));
                }
            }

            if let Some((di, score)) = best {
                if score.value >= self.threshold {
                    tracing::debug!(
                        code = %code_sig.name,
                        doc = %docs[di].name,
                        similarity = score.value,
                        "paired by similarity"
                    );
                    consumed[di] = true;
                    paired[ci] = Some((di, score));
                }
            }
        }

        let mut pairs: Vec<MatchedPair<'a>> = code
            .iter()
            .zip(paired)
            .map(|(code_sig, pairing)| match pairing {
                Some((di, similarity)) => MatchedPair::Matched {
                    code: code_sig,
                    doc: &docs[di],
                    similarity,
                },
                None => MatchedPair::CodeOnly(code_sig),
            })
            .collect();

        pairs.extend(
            docs.iter()
                .zip(&consumed)
                .filter(|(_, used)| !**used)
                .map(|(doc_sig, _)| MatchedPair::DocOnly(doc_sig)),
        );
        pairs
    }
}

/// Match with the default scorer and threshold.
pub async fn match_signatures<'a>(
    code: &'a [FunctionSignature],
    docs: &'a [FunctionSignature],
) -> Vec<MatchedPair<'a>> {
    Matcher::default().match_signatures(code, docs).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::Parameter;
    use crate::similarity::ScoreMethod;

    fn sig(name: &str) -> FunctionSignature {
        FunctionSignature::new(name, "test", 1)
    }

    fn names(pairs: &[MatchedPair<'_>]) -> Vec<(Option<String>, Option<String>)> {
        pairs
            .iter()
            .map(|p| (p.code().map(|s| s.name.clone()), p.doc().map(|s| s.name.clone())))
            .collect()
    }

    #[tokio::test]
    async fn test_exact_match_case_insensitive() {
        let code = vec![sig("Calculate_Total")];
        let docs = vec![sig("calculate_total")];
        let pairs = match_signatures(&code, &docs).await;

        assert_eq!(pairs.len(), 1);
        match &pairs[0] {
            MatchedPair::Matched { similarity, .. } => {
                assert_eq!(similarity.method, ScoreMethod::Exact);
                assert_eq!(similarity.value, 1.0);
            }
            other => panic!("expected a match, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unmatched_sides() {
        let code = vec![sig("parse_config")];
        let docs = vec![sig("send_email")];
        let pairs = match_signatures(&code, &docs).await;
        assert_eq!(
            names(&pairs),
            [
                (Some("parse_config".to_string()), None),
                (None, Some("send_email".to_string())),
            ]
        );
    }

    #[tokio::test]
    async fn test_similar_names_pair_above_threshold() {
        let code = vec![sig("calculateTotal").with_parameters(vec![Parameter::new("price")])];
        let docs = vec![sig("calculate_total").with_parameters(vec![Parameter::new("price")])];
        let pairs = match_signatures(&code, &docs).await;
        assert_eq!(pairs.len(), 1);
        assert!(matches!(pairs[0], MatchedPair::Matched { .. }));
    }

    #[tokio::test]
    async fn test_exact_pass_runs_before_similarity() {
        // `get_user_v2` would pick `get_user` by similarity if it went first.
        let code = vec![sig("get_user_v2"), sig("get_user")];
        let docs = vec![sig("get_user")];
        let pairs = match_signatures(&code, &docs).await;
        assert_eq!(
            names(&pairs),
            [
                (Some("get_user_v2".to_string()), None),
                (Some("get_user".to_string()), Some("get_user".to_string())),
            ]
        );
    }

    #[tokio::test]
    async fn test_every_signature_in_exactly_one_pair() {
        let code = vec![sig("a_one"), sig("b_two"), sig("dup"), sig("dup")];
        let docs = vec![sig("dup"), sig("b_two"), sig("zzz_unrelated"), sig("DUP")];
        let pairs = match_signatures(&code, &docs).await;

        assert!(pairs.len() >= code.len());
        for c in &code {
            let hits = pairs
                .iter()
                .filter(|p| p.code().is_some_and(|s| std::ptr::eq(s, c)))
                .count();
            assert_eq!(hits, 1);
        }
        for d in &docs {
            let hits = pairs
                .iter()
                .filter(|p| p.doc().is_some_and(|s| std::ptr::eq(s, d)))
                .count();
            assert_eq!(hits, 1);
        }
    }

    #[tokio::test]
    async fn test_threshold_is_configurable() {
        let code = vec![sig("fetch_user")];
        let docs = vec![sig("get_user")];

        let strict = Matcher::default().with_threshold(0.99);
        let pairs = strict.match_signatures(&code, &docs).await;
        assert_eq!(pairs.len(), 2);

        let lenient = Matcher::default().with_threshold(0.0);
        let pairs = lenient.match_signatures(&code, &docs).await;
        assert_eq!(pairs.len(), 1);
    }
}
