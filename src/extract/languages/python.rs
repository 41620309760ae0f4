//! Python signature extractor using tree-sitter.
//!
//! Extracts top-level functions and class members (including decorated
//! ones). Nested functions are local implementation details and are
//! skipped.

use tree_sitter::{Language, Node};

use crate::extract::traits::total;
use crate::extract::treesitter::{clean_doc, line_of, preceding_comments, ParsedSource};
use crate::extract::SignatureExtractor;
use crate::signature::{FunctionSignature, Parameter};

/// Receivers implied by the method call syntax.
const IMPLICIT_RECEIVERS: &[&str] = &["self", "cls"];

pub struct PythonExtractor {
    language: Language,
}

impl PythonExtractor {
    pub fn new() -> Self {
        Self {
            language: tree_sitter_python::LANGUAGE.into(),
        }
    }

    fn extract_signatures(
        &self,
        text: &str,
        identifier: &str,
    ) -> anyhow::Result<Vec<FunctionSignature>> {
        let parsed = ParsedSource::parse(&self.language, text)?;
        let root = parsed.tree.root_node();

        let mut signatures = Vec::new();
        let mut cursor = root.walk();
        for child in root.named_children(&mut cursor) {
            self.visit_statement(&parsed, child, identifier, false, &mut signatures);
        }
        Ok(signatures)
    }

    fn visit_statement(
        &self,
        parsed: &ParsedSource,
        node: Node,
        identifier: &str,
        in_class: bool,
        out: &mut Vec<FunctionSignature>,
    ) {
        match node.kind() {
            "function_definition" => {
                out.push(self.function_signature(parsed, node, node, identifier, in_class));
            }
            "decorated_definition" => {
                if let Some(def) = node.child_by_field_name("definition") {
                    match def.kind() {
                        "function_definition" => {
                            out.push(self.function_signature(parsed, def, node, identifier, in_class));
                        }
                        "class_definition" => self.visit_class(parsed, def, identifier, out),
                        _ => {}
                    }
                }
            }
            "class_definition" => self.visit_class(parsed, node, identifier, out),
            _ => {}
        }
    }

    fn visit_class(
        &self,
        parsed: &ParsedSource,
        class_node: Node,
        identifier: &str,
        out: &mut Vec<FunctionSignature>,
    ) {
        let Some(body) = class_node.child_by_field_name("body") else {
            return;
        };
        let mut cursor = body.walk();
        for member in body.named_children(&mut cursor) {
            self.visit_statement(parsed, member, identifier, true, out);
        }
    }

    /// `outer` is the decorated wrapper when present; comments attach to it.
    fn function_signature(
        &self,
        parsed: &ParsedSource,
        func: Node,
        outer: Node,
        identifier: &str,
        is_member: bool,
    ) -> FunctionSignature {
        let name = parsed
            .field_text(func, "name")
            .unwrap_or_else(|| "<anonymous>".to_string());

        let mut parameters = func
            .child_by_field_name("parameters")
            .map(|p| self.parameters(parsed, p))
            .unwrap_or_default();
        if is_member
            && parameters
                .first()
                .is_some_and(|p| IMPLICIT_RECEIVERS.contains(&p.name.as_str()))
        {
            parameters.remove(0);
        }

        let documentation = self.docstring(parsed, func).or_else(|| {
            preceding_comments(parsed, outer, &["comment"], &[], |raw| {
                Some(raw.trim_start_matches('#').trim().to_string())
            })
        });

        FunctionSignature::new(name, identifier, line_of(func))
            .with_parameters(parameters)
            .with_return_type(parsed.field_text(func, "return_type"))
            .with_documentation(documentation)
    }

    fn parameters(&self, parsed: &ParsedSource, params: Node) -> Vec<Parameter> {
        let mut out = Vec::new();
        let mut cursor = params.walk();
        for param in params.named_children(&mut cursor) {
            let parameter = match param.kind() {
                "identifier" => Some(Parameter::new(parsed.node_text(param))),
                "typed_parameter" => match param.named_child(0) {
                    Some(n) if !is_splat(n.kind()) => Some(Parameter {
                        name: parsed.node_text(n).to_string(),
                        type_annotation: parsed.field_text(param, "type"),
                        default: None,
                    }),
                    _ => None,
                },
                "default_parameter" | "typed_default_parameter" => Some(Parameter {
                    name: parsed.field_text(param, "name").unwrap_or_default(),
                    type_annotation: parsed.field_text(param, "type"),
                    default: parsed.field_text(param, "value"),
                }),
                // *args, **kwargs, keyword_separator, positional_separator, comments
                _ => None,
            };
            if let Some(p) = parameter.filter(|p| !p.name.is_empty()) {
                out.push(p);
            }
        }
        out
    }

    fn docstring(&self, parsed: &ParsedSource, func: Node) -> Option<String> {
        let body = func.child_by_field_name("body")?;
        let first = body.named_child(0)?;
        if first.kind() != "expression_statement" {
            return None;
        }
        let string = first.named_child(0)?;
        if string.kind() != "string" {
            return None;
        }
        Some(clean_doc(strip_string_quotes(parsed.node_text(string))))
    }
}

/// `*args` and `**kwargs` are never documented as named parameters.
fn is_splat(kind: &str) -> bool {
    matches!(kind, "list_splat_pattern" | "dictionary_splat_pattern")
}

impl Default for PythonExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl SignatureExtractor for PythonExtractor {
    fn language_id(&self) -> &'static str {
        "python"
    }

    fn file_suffixes(&self) -> &'static [&'static str] {
        &[".py", ".pyi"]
    }

    fn extract(&self, text: &str, identifier: &str) -> Vec<FunctionSignature> {
        total(self.language_id(), identifier, || {
            self.extract_signatures(text, identifier)
        })
    }
}

/// Strip string prefixes (r, b, u, f) and the surrounding quotes.
fn strip_string_quotes(literal: &str) -> &str {
    let body = literal.trim_start_matches(['r', 'R', 'b', 'B', 'u', 'U', 'f', 'F']);
    for quote in ["\"\"\"", "'''", "\"", "'"] {
        if let Some(inner) = body
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner;
        }
    }
    body
}
