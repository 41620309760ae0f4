//! Rust signature extractor using tree-sitter.
//!
//! Extracts:
//! - Free functions at module level
//! - Methods and associated functions in `impl` blocks
//! - Trait method declarations (with or without default bodies)
//!
//! Documentation comes from the `///` block above the item; attributes
//! between the comment and the item are skipped.

use tree_sitter::{Language, Node};

use crate::extract::traits::total;
use crate::extract::treesitter::{line_of, preceding_comments, ParsedSource};
use crate::extract::SignatureExtractor;
use crate::signature::{FunctionSignature, Parameter};

pub struct RustExtractor {
    language: Language,
}

impl RustExtractor {
    pub fn new() -> Self {
        Self {
            language: tree_sitter_rust::LANGUAGE.into(),
        }
    }

    fn extract_signatures(
        &self,
        text: &str,
        identifier: &str,
    ) -> anyhow::Result<Vec<FunctionSignature>> {
        let parsed = ParsedSource::parse(&self.language, text)?;
        let mut signatures = Vec::new();
        self.visit_items(&parsed, parsed.tree.root_node(), identifier, &mut signatures);
        Ok(signatures)
    }

    fn visit_items(
        &self,
        parsed: &ParsedSource,
        container: Node,
        identifier: &str,
        out: &mut Vec<FunctionSignature>,
    ) {
        let mut cursor = container.walk();
        for item in container.named_children(&mut cursor) {
            match item.kind() {
                "function_item" | "function_signature_item" => {
                    out.push(self.function_signature(parsed, item, identifier));
                }
                "impl_item" | "trait_item" => {
                    if let Some(body) = item.child_by_field_name("body") {
                        self.visit_items(parsed, body, identifier, out);
                    }
                }
                _ => {}
            }
        }
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

        let documentation = preceding_comments(
            parsed,
            func,
            &["line_comment", "block_comment"],
            &["attribute_item"],
            doc_comment_text,
        );

        FunctionSignature::new(name, identifier, line_of(func))
            .with_parameters(parameters)
            .with_return_type(parsed.field_text(func, "return_type"))
            .with_documentation(documentation)
    }

    fn parameters(&self, parsed: &ParsedSource, params: Node) -> Vec<Parameter> {
        let mut out = Vec::new();
        let mut cursor = params.walk();
        for param in params.named_children(&mut cursor) {
            // self_parameter, attribute_item and variadics carry no name
            if param.kind() != "parameter" {
                continue;
            }
            let Some(pattern) = parsed.field_text(param, "pattern") else {
                continue;
            };
            let name = pattern.strip_prefix("mut ").unwrap_or(&pattern).trim();
            out.push(Parameter {
                name: name.to_string(),
                type_annotation: parsed.field_text(param, "type"),
                default: None,
            });
        }
        out
    }
}

impl Default for RustExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl SignatureExtractor for RustExtractor {
    fn language_id(&self) -> &'static str {
        "rust"
    }

    fn file_suffixes(&self) -> &'static [&'static str] {
        &[".rs"]
    }

    fn extract(&self, text: &str, identifier: &str) -> Vec<FunctionSignature> {
        total(self.language_id(), identifier, || {
            self.extract_signatures(text, identifier)
        })
    }
}

/// Outer doc comment text; plain and inner (`//!`) comments are not docs.
fn doc_comment_text(raw: &str) -> Option<String> {
    let raw = raw.trim_end();
    if let Some(rest) = raw.strip_prefix("///") {
        if rest.starts_with('/') {
            return None;
        }
        return Some(rest.strip_prefix(' ').unwrap_or(rest).to_string());
    }
    if let Some(body) = raw
        .strip_prefix("/**")
        .and_then(|rest| rest.strip_suffix("*/"))
    {
        let lines: Vec<&str> = body
            .lines()
            .map(|l| l.trim().trim_start_matches('*').trim())
            .collect();
        return Some(lines.join("\n").trim().to_string());
    }
    None
}
