//! Go signature extractor using tree-sitter.
//!
//! Extracts function declarations and methods with receivers. Grouped
//! parameters (`a, b int`) expand to one parameter per name.

use streaming_iterator::StreamingIterator;
use tree_sitter::{Language, Node, Query, QueryCursor};

use crate::extract::traits::total;
use crate::extract::treesitter::{line_of, preceding_comments, ParsedSource};
use crate::extract::SignatureExtractor;
use crate::signature::{FunctionSignature, Parameter};

/// Tree-sitter query for Go function declarations.
const DECLARATION_QUERY: &str = r#"
(function_declaration) @function
(method_declaration) @method
"#;

pub struct GoExtractor {
    language: Language,
}

impl GoExtractor {
    pub fn new() -> Self {
        Self {
            language: tree_sitter_go::LANGUAGE.into(),
        }
    }

    fn extract_signatures(
        &self,
        text: &str,
        identifier: &str,
    ) -> anyhow::Result<Vec<FunctionSignature>> {
        let parsed = ParsedSource::parse(&self.language, text)?;
        let query = Query::new(&self.language, DECLARATION_QUERY)?;
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&query, parsed.tree.root_node(), parsed.source);

        let mut signatures = Vec::new();
        while let Some(m) = matches.next() {
            for capture in m.captures {
                signatures.push(self.function_signature(&parsed, capture.node, identifier));
            }
        }
        signatures.sort_by_key(|s| s.location.line);
        Ok(signatures)
    }

    fn function_signature(
        &self,
        parsed: &ParsedSource,
        func: Node,
        identifier: &str,
    ) -> FunctionSignature {
        let name = parsed
            .field_text(func, "name")
            .unwrap_or_else(|| "<anonymous>".to_string());

        let parameters = func
            .child_by_field_name("parameters")
            .map(|p| self.parameters(parsed, p))
            .unwrap_or_default();

        let documentation = preceding_comments(parsed, func, &["comment"], &[], |raw| {
            raw.strip_prefix("//")
                .map(|rest| rest.strip_prefix(' ').unwrap_or(rest).trim_end().to_string())
        });

        FunctionSignature::new(name, identifier, line_of(func))
            .with_parameters(parameters)
            .with_return_type(parsed.field_text(func, "result"))
            .with_documentation(documentation)
    }

    fn parameters(&self, parsed: &ParsedSource, params: Node) -> Vec<Parameter> {
        let mut out = Vec::new();
        let mut cursor = params.walk();
        for decl in params.named_children(&mut cursor) {
            let type_annotation = match decl.kind() {
                "parameter_declaration" => parsed.field_text(decl, "type"),
                "variadic_parameter_declaration" => {
                    parsed.field_text(decl, "type").map(|t| format!("...{}", t))
                }
                _ => continue,
            };

            let mut name_cursor = decl.walk();
            let names: Vec<String> = decl
                .children_by_field_name("name", &mut name_cursor)
                .map(|n| parsed.node_text(n).to_string())
                .collect();

            if names.is_empty() {
                // Unnamed parameters only carry a type.
                out.push(Parameter {
                    name: "_".to_string(),
                    type_annotation,
                    default: None,
                });
                continue;
            }
            for name in names {
                out.push(Parameter {
                    name,
                    type_annotation: type_annotation.clone(),
                    default: None,
                });
            }
        }
        out
    }
}

impl Default for GoExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl SignatureExtractor for GoExtractor {
    fn language_id(&self) -> &'static str {
        "go"
    }

    fn file_suffixes(&self) -> &'static [&'static str] {
        &[".go"]
    }

    fn extract(&self, text: &str, identifier: &str) -> Vec<FunctionSignature> {
        total(self.language_id(), identifier, || {
            self.extract_signatures(text, identifier)
        })
    }
}
