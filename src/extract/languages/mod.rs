//! Language-specific extractor implementations.

#[cfg(feature = "tree-sitter")]
mod go;
mod java;
mod javascript;
mod json;
mod markdown;
#[cfg(feature = "tree-sitter")]
mod python;
#[cfg(feature = "tree-sitter")]
mod rust_lang;

#[cfg(feature = "tree-sitter")]
pub use go::GoExtractor;
pub use java::JavaExtractor;
pub use javascript::JavaScriptExtractor;
pub use json::JsonExtractor;
pub use markdown::MarkdownExtractor;
#[cfg(feature = "tree-sitter")]
pub use python::PythonExtractor;
#[cfg(feature = "tree-sitter")]
pub use rust_lang::RustExtractor;

use std::sync::Arc;

use super::SignatureExtractor;

/// All built-in extractors, one per language.
pub fn builtin_extractors() -> Vec<Arc<dyn SignatureExtractor>> {
    #[allow(unused_mut)]
    let mut extractors: Vec<Arc<dyn SignatureExtractor>> = vec![
        Arc::new(JavaScriptExtractor::new()),
        Arc::new(JavaExtractor::new()),
        Arc::new(MarkdownExtractor::new()),
        Arc::new(JsonExtractor::new()),
    ];

    #[cfg(feature = "tree-sitter")]
    {
        extractors.push(Arc::new(PythonExtractor::new()));
        extractors.push(Arc::new(RustExtractor::new()));
        extractors.push(Arc::new(GoExtractor::new()));
    }

    extractors
}

/// Get all registered language IDs.
pub fn registered_languages() -> Vec<&'static str> {
    builtin_extractors()
        .iter()
        .map(|e| e.language_id())
        .collect()
}
