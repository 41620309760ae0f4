//! Signature extraction and suffix-based dispatch.
//!
//! This module provides:
//! - `SignatureExtractor` trait: one pluggable strategy per language
//! - `Registry`: suffix → extractor lookup (longest suffix wins)
//! - `extract` / `extract_all`: entry points over the default registry

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use rayon::prelude::*;

use crate::signature::FunctionSignature;

mod heuristics;
pub mod languages;
mod traits;
#[cfg(feature = "tree-sitter")]
pub(crate) mod treesitter;

pub use traits::{SignatureExtractor, SourceKind};

/// Maps lowercase file suffixes (".py", ".d.ts") to extractors.
#[derive(Clone, Default)]
pub struct Registry {
    extractors: HashMap<String, Arc<dyn SignatureExtractor>>,
}

impl Registry {
    /// An empty registry; every identifier yields no signatures.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with every built-in extractor.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for extractor in languages::builtin_extractors() {
            registry.register(extractor);
        }
        registry
    }

    /// Register an extractor under all of its declared suffixes.
    pub fn register(&mut self, extractor: Arc<dyn SignatureExtractor>) {
        for suffix in extractor.file_suffixes() {
            self.register_suffix(suffix, Arc::clone(&extractor));
        }
    }

    /// Register an extractor for one suffix, replacing any previous mapping.
    /// Suffix should include the dot (e.g., ".go", ".py").
    pub fn register_suffix(&mut self, suffix: &str, extractor: Arc<dyn SignatureExtractor>) {
        self.extractors.insert(suffix.to_lowercase(), extractor);
    }

    /// Find the extractor for an identifier, matching suffixes case-insensitively.
    pub fn for_identifier(&self, identifier: &str) -> Option<&Arc<dyn SignatureExtractor>> {
        let lower = identifier.to_lowercase();
        self.extractors
            .iter()
            .filter(|(suffix, _)| lower.ends_with(suffix.as_str()))
            .max_by_key(|(suffix, _)| suffix.len())
            .map(|(_, extractor)| extractor)
    }

    /// Whether the identifier holds code, documentation, or nothing we read.
    pub fn source_kind(&self, identifier: &str) -> Option<SourceKind> {
        self.for_identifier(identifier).map(|e| e.source_kind())
    }

    /// Return all registered suffixes, sorted.
    pub fn supported_suffixes(&self) -> Vec<String> {
        let mut suffixes: Vec<String> = self.extractors.keys().cloned().collect();
        suffixes.sort();
        suffixes
    }

    /// Extract signatures from one file.
    ///
    /// Unknown suffixes and blank text yield an empty list, not an error.
    pub fn extract(&self, text: &str, identifier: &str) -> Vec<FunctionSignature> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        match self.for_identifier(identifier) {
            Some(extractor) => {
                let signatures = extractor.extract(text, identifier);
                tracing::debug!(
                    file = identifier,
                    language = extractor.language_id(),
                    count = signatures.len(),
                    "extracted signatures"
                );
                signatures
            }
            None => {
                tracing::trace!(file = identifier, "no extractor for suffix");
                Vec::new()
            }
        }
    }

    /// Extract many files in parallel; results are concatenated in input order.
    pub fn extract_all<S>(&self, files: &[(S, S)]) -> Vec<FunctionSignature>
    where
        S: AsRef<str> + Sync,
    {
        files
            .par_iter()
            .map(|(identifier, text)| self.extract(text.as_ref(), identifier.as_ref()))
            .collect::<Vec<_>>()
            .into_iter()
            .flatten()
            .collect()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("suffixes", &self.supported_suffixes())
            .finish()
    }
}

/// Registry with the built-in extractors, shared by the free functions.
static DEFAULT_REGISTRY: OnceCell<Registry> = OnceCell::new();

/// The shared built-in registry.
pub fn default_registry() -> &'static Registry {
    DEFAULT_REGISTRY.get_or_init(Registry::with_defaults)
}

/// Extract signatures from `(identifier, text)` using the built-in extractors.
pub fn extract(text: &str, identifier: &str) -> Vec<FunctionSignature> {
    default_registry().extract(text, identifier)
}

/// Parallel extraction over many files using the built-in extractors.
pub fn extract_all<S>(files: &[(S, S)]) -> Vec<FunctionSignature>
where
    S: AsRef<str> + Sync,
{
    default_registry().extract_all(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedExtractor {
        id: &'static str,
        suffixes: &'static [&'static str],
    }

    impl SignatureExtractor for FixedExtractor {
        fn language_id(&self) -> &'static str {
            self.id
        }

        fn file_suffixes(&self) -> &'static [&'static str] {
            self.suffixes
        }

        fn extract(&self, _text: &str, identifier: &str) -> Vec<FunctionSignature> {
            vec![FunctionSignature::new(self.id, identifier, 1)]
        }
    }

    #[test]
    fn test_unknown_suffix_is_empty() {
        assert!(extract("fn main() {}", "notes.txt").is_empty());
        assert!(extract("anything", "Makefile").is_empty());
    }

    #[test]
    fn test_blank_text_is_empty() {
        assert!(extract("", "lib.py").is_empty());
        assert!(extract("   \n\t", "README.md").is_empty());
    }

    #[test]
    fn test_longest_suffix_wins() {
        let mut registry = Registry::new();
        registry.register(Arc::new(FixedExtractor {
            id: "ts",
            suffixes: &[".ts"],
        }));
        registry.register(Arc::new(FixedExtractor {
            id: "decl",
            suffixes: &[".d.ts"],
        }));

        assert_eq!(registry.extract("x", "index.d.ts")[0].name, "decl");
        assert_eq!(registry.extract("x", "index.ts")[0].name, "ts");
    }

    #[test]
    fn test_suffix_match_is_case_insensitive() {
        let mut registry = Registry::new();
        registry.register_suffix(
            ".MOCK",
            Arc::new(FixedExtractor {
                id: "mock",
                suffixes: &[],
            }),
        );
        assert_eq!(registry.extract("x", "File.Mock").len(), 1);
        assert_eq!(registry.supported_suffixes(), vec![".mock".to_string()]);
    }

    #[test]
    fn test_extract_all_keeps_input_order() {
        let files = vec![
            ("a.md", "## first_function\n\nDoes things.\n"),
            ("skip.txt", "ignored"),
            ("b.md", "## second_function\n\nDoes more.\n"),
        ];
        let names: Vec<_> = extract_all(&files).into_iter().map(|s| s.name).collect();
        assert_eq!(names, ["first_function", "second_function"]);
    }

    #[test]
    fn test_source_kind() {
        let registry = default_registry();
        assert_eq!(registry.source_kind("guide.md"), Some(SourceKind::Docs));
        assert_eq!(registry.source_kind("app.js"), Some(SourceKind::Code));
        assert_eq!(registry.source_kind("data.bin"), None);
    }
}
