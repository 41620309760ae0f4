//! Semantic closeness between two signatures.
//!
//! Combines name, feature and (when an encoder is supplied) embedding
//! signals into one [`SimilarityScore`]. Scoring is total: encoder
//! failures fall back to the local formula.

mod encoder;
pub mod signals;

pub use encoder::{
    cosine_similarity, CachingEncoder, EncodeError, HttpEncoder, NoEncoder, TextEncoder,
};

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::signature::FunctionSignature;

/// Documentation characters included in the embedding text.
const EMBEDDING_DOC_CHARS: usize = 200;

/// How a similarity value was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreMethod {
    /// Case-insensitive name equality, assigned by the matcher
    Exact,
    /// Embedding, name and feature signals
    HybridEmbedding,
    /// Name and feature signals only
    HybridFallback,
}

impl ScoreMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScoreMethod::Exact => "exact",
            ScoreMethod::HybridEmbedding => "hybrid_embedding",
            ScoreMethod::HybridFallback => "hybrid_fallback",
        }
    }
}

impl std::fmt::Display for ScoreMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A similarity value in [0, 1] with its provenance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimilarityScore {
    pub value: f64,
    pub method: ScoreMethod,
    /// How much the value can be trusted, in [0, 1]
    pub confidence: f64,
}

impl SimilarityScore {
    /// Score assigned to an exact-name pairing.
    pub fn exact() -> Self {
        Self {
            value: 1.0,
            method: ScoreMethod::Exact,
            confidence: 1.0,
        }
    }
}

/// Computes [`SimilarityScore`]s, optionally with an embedding signal.
#[derive(Clone)]
pub struct SimilarityScorer {
    encoder: Arc<dyn TextEncoder>,
}

impl Default for SimilarityScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SimilarityScorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimilarityScorer")
            .field("embeddings", &self.encoder.is_available())
            .finish()
    }
}

impl SimilarityScorer {
    /// Scorer without an embedding signal.
    pub fn new() -> Self {
        Self {
            encoder: Arc::new(NoEncoder),
        }
    }

    pub fn with_encoder(encoder: Arc<dyn TextEncoder>) -> Self {
        Self { encoder }
    }

    /// Score two signatures.
    pub async fn score(&self, a: &FunctionSignature, b: &FunctionSignature) -> SimilarityScore {
        let name = signals::name_similarity(&a.name, &b.name);
        let feature = signals::feature_similarity(a, b);

        match self.embedding_similarity(a, b).await {
            Some(embedding) => SimilarityScore {
                value: clamp_unit(0.6 * embedding + 0.2 * name + 0.2 * feature),
                method: ScoreMethod::HybridEmbedding,
                confidence: 0.9,
            },
            None => local_score(name, feature),
        }
    }

    /// Cosine similarity of the two renderings, rescaled to [0, 1].
    async fn embedding_similarity(
        &self,
        a: &FunctionSignature,
        b: &FunctionSignature,
    ) -> Option<f64> {
        if !self.encoder.is_available() {
            return None;
        }

        let (left, right) = (embedding_text(a), embedding_text(b));
        let left = self.encode(&left, &a.name).await?;
        let right = self.encode(&right, &b.name).await?;

        match cosine_similarity(&left, &right) {
            Some(cosine) => Some(((cosine + 1.0) / 2.0).max(0.0)),
            None => {
                tracing::debug!(
                    left = %a.name,
                    right = %b.name,
                    "embedding vectors not comparable, using local signals"
                );
                None
            }
        }
    }

    async fn encode(&self, text: &str, function: &str) -> Option<Vec<f32>> {
        match self.encoder.encode(text).await {
            Ok(vector) => Some(vector),
            Err(e) => {
                tracing::debug!(function, error = %e, "encoder failed, using local signals");
                None
            }
        }
    }
}

fn local_score(name: f64, feature: f64) -> SimilarityScore {
    SimilarityScore {
        value: clamp_unit(0.5 * name + 0.5 * feature),
        method: ScoreMethod::HybridFallback,
        confidence: 0.7,
    }
}

fn clamp_unit(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

/// Canonical text rendering of a signature for the encoder.
pub fn embedding_text(sig: &FunctionSignature) -> String {
    let mut parts = vec![format!("Function: {}", sig.name)];

    if sig.parameters.is_empty() {
        parts.push("Parameters: none".to_string());
    } else {
        let params: Vec<String> = sig
            .parameters
            .iter()
            .map(|p| {
                let mut desc = p.name.clone();
                if let Some(ty) = &p.type_annotation {
                    desc.push_str(&format!(" ({})", ty));
                }
                if let Some(default) = &p.default {
                    desc.push_str(&format!(" default {}", default));
                }
                desc
            })
            .collect();
        parts.push(format!("Parameters: {}", params.join(", ")));
    }

    if let Some(ret) = &sig.return_type {
        parts.push(format!("Returns: {}", ret));
    }

    if let Some(doc) = &sig.documentation {
        let summary: String = doc
            .chars()
            .take(EMBEDDING_DOC_CHARS)
            .map(|c| if c == '\n' { ' ' } else { c })
            .collect();
        parts.push(format!("Purpose: {}", summary));
    }

    parts.join(". ")
}
