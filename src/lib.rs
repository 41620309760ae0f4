//! Driftcheck - documentation drift detection.
//!
//! Driftcheck reads a repository's source code and its documentation,
//! extracts function signatures from both, pairs each documented function
//! with its implementation, and reports where the two disagree. The result
//! is a trust score (0-100) with a list of concrete issues.
//!
//! # Architecture
//!
//! - `extract`: per-language signature extractors behind a suffix registry
//! - `similarity`: name, feature and optional embedding similarity
//! - `matcher`: one-to-one pairing of code and documentation signatures
//! - `compare`: reasoning-service comparison with retries, and the hybrid
//!   comparator that decides when the service is worth asking
//! - `score`: repository aggregation into a trust score
//! - `config`: YAML configuration
//! - `report`: output formatting (pretty, JSON)
//!
//! # Adding a New Language
//!
//! See `src/extract/languages/` for examples. Implement the
//! `SignatureExtractor` trait and add it to `builtin_extractors`.

pub mod cli;
pub mod compare;
pub mod config;
pub mod extract;
pub mod matcher;
pub mod report;
pub mod score;
pub mod signature;
pub mod similarity;

pub use compare::{
    CompareError, CompareMethod, ComparisonEngine, ComparisonResult, HybridComparator, Issue,
    ReasoningService, ServiceError, Severity,
};
pub use config::{Config, ConfigurationError};
pub use extract::{default_registry, extract, extract_all, Registry, SignatureExtractor, SourceKind};
pub use matcher::{match_signatures, MatchedPair, Matcher};
pub use score::{Analyzer, RepositoryReport};
pub use signature::{FunctionSignature, Parameter, SourceLocation};
pub use similarity::{ScoreMethod, SimilarityScore, SimilarityScorer, TextEncoder};
