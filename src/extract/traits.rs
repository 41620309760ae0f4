//! Core traits for signature extraction.

use serde::{Deserialize, Serialize};

use crate::signature::FunctionSignature;

/// Which side of the comparison an extractor's output belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Declarations found in source code
    Code,
    /// Functions described by documentation
    Docs,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Code => "code",
            SourceKind::Docs => "docs",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Language-specific signature extraction strategy.
///
/// Implementations must be total: malformed input yields an empty list,
/// never a panic or an error. Internal failures are logged and swallowed
/// at this boundary.
///
/// # Thread Safety
///
/// tree_sitter::Parser is not Sync, so implementations create parsers
/// per call.
pub trait SignatureExtractor: Send + Sync {
    /// Returns the language identifier (e.g., "python", "markdown").
    fn language_id(&self) -> &'static str;

    /// Returns file suffixes this extractor handles, including the dot.
    ///
    /// Examples: `[".py", ".pyi"]`, `[".md", ".markdown"]`
    fn file_suffixes(&self) -> &'static [&'static str];

    /// Whether the output describes code or documentation.
    fn source_kind(&self) -> SourceKind {
        SourceKind::Code
    }

    /// Extract signatures in declaration order.
    fn extract(&self, text: &str, identifier: &str) -> Vec<FunctionSignature>;
}

/// Run a fallible extraction and collapse failures into an empty result.
pub(crate) fn total<F>(language: &str, identifier: &str, f: F) -> Vec<FunctionSignature>
where
    F: FnOnce() -> anyhow::Result<Vec<FunctionSignature>>,
{
    match f() {
        Ok(signatures) => signatures,
        Err(e) => {
            tracing::debug!(language, file = identifier, error = %e, "extraction failed, returning no signatures");
            Vec::new()
        }
    }
}
