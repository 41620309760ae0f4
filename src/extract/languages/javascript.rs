//! JavaScript / TypeScript signature extractor using ordered line patterns.
//!
//! Rules, first match wins:
//! 1. `function name(...)` declarations
//! 2. `const name = (...) =>` arrows and `const name = function(...)` expressions
//! 3. method declarations `name(...) {` (class bodies and object literals)
//!
//! Parameter lists spanning several lines are joined before matching.

use lazy_static::lazy_static;
use phf::phf_set;
use regex::Regex;

use crate::extract::heuristics::{
    join_declaration, parenthesized, preceding_block_doc, split_once_top_level, split_top_level,
    ClassTracker,
};
use crate::extract::SignatureExtractor;
use crate::signature::{FunctionSignature, Parameter};

lazy_static! {
    static ref FUNCTION_DECL: Regex = Regex::new(
        r"^(?:export\s+)?(?:default\s+)?(?:declare\s+)?(?:async\s+)?function\s*\*?\s*([A-Za-z_$][\w$]*)\s*(?:<[^(]*>)?\s*\("
    ).unwrap();

    static ref BINDING_DECL: Regex = Regex::new(
        r"^(?:export\s+)?(?:const|let|var)\s+([A-Za-z_$][\w$]*)\s*(?::\s*[^=]+?)?\s*=\s*(?:async\s+)?"
    ).unwrap();

    static ref FUNCTION_EXPR: Regex = Regex::new(
        r"^function\s*\*?\s*[\w$]*\s*(?:<[^(]*>)?\s*\("
    ).unwrap();

    static ref SINGLE_PARAM_ARROW: Regex = Regex::new(
        r"^([A-Za-z_$][\w$]*)\s*=>"
    ).unwrap();

    static ref ARROW_TAIL: Regex = Regex::new(
        r"^\s*(?::\s*(.+?))?\s*=>"
    ).unwrap();

    static ref METHOD_DECL: Regex = Regex::new(
        r"^(?:(?:public|private|protected|static|async|readonly|override|abstract|get|set)\s+)*\*?\s*(#?[A-Za-z_$][\w$]*)\s*\??\s*(?:<[^(]*>)?\s*\("
    ).unwrap();

    /// Return annotation followed by a body, e.g. `: Promise<void> {`
    static ref BODY_TAIL: Regex = Regex::new(
        r"^\s*(?::\s*(.+?))?\s*\{"
    ).unwrap();

    /// Overload / abstract member without body, e.g. `: string;`
    static ref DECLARATION_TAIL: Regex = Regex::new(
        r"^\s*(?::\s*(.+?))?\s*;"
    ).unwrap();

    static ref CLASS_DECL: Regex = Regex::new(
        r"^(?:export\s+)?(?:default\s+)?(?:abstract\s+)?class\s+([A-Za-z_$][\w$]*)"
    ).unwrap();
}

/// Words that look like `name(` but are never declarations.
static CONTROL_KEYWORDS: phf::Set<&'static str> = phf_set! {
    "if", "else", "for", "while", "do", "switch", "case", "catch", "try",
    "finally", "return", "throw", "function", "new", "typeof", "delete",
    "void", "await", "yield", "with", "super", "import", "export", "in",
    "of", "instanceof", "class", "const", "let", "var",
};

/// TypeScript parameter-property modifiers.
const PARAMETER_MODIFIERS: &[&str] = &["public ", "private ", "protected ", "readonly ", "override "];

pub struct JavaScriptExtractor;

impl JavaScriptExtractor {
    pub fn new() -> Self {
        Self
    }

    fn match_declaration(
        &self,
        decl: &str,
        classes: &ClassTracker,
    ) -> Option<(String, Vec<Parameter>, Option<String>)> {
        if let Some(caps) = FUNCTION_DECL.captures(decl) {
            let name = caps[1].to_string();
            let open = caps.get(0)?.end() - 1;
            let (params, tail) = params_and_tail(decl, open)?;
            let ret = BODY_TAIL
                .captures(tail)
                .or_else(|| DECLARATION_TAIL.captures(tail))
                .and_then(|c| c.get(1).map(|m| m.as_str().trim().to_string()));
            return Some((name, parse_params(params), ret));
        }

        if let Some(caps) = BINDING_DECL.captures(decl) {
            let name = caps[1].to_string();
            let value = &decl[caps.get(0)?.end()..];

            if let Some(expr) = FUNCTION_EXPR.find(value) {
                let (params, tail) = params_and_tail(value, expr.end() - 1)?;
                let ret = BODY_TAIL
                    .captures(tail)
                    .and_then(|c| c.get(1).map(|m| m.as_str().trim().to_string()));
                return Some((name, parse_params(params), ret));
            }
            if let Some(single) = SINGLE_PARAM_ARROW.captures(value) {
                return Some((name, vec![Parameter::new(&single[1])], None));
            }
            if let Some(open) = value.find('(') {
                // Only generics may precede the parameter list.
                let prefix = value[..open].trim();
                if prefix.is_empty() || (prefix.starts_with('<') && prefix.ends_with('>')) {
                    let (params, tail) = params_and_tail(value, open)?;
                    let tail = ARROW_TAIL.captures(tail)?;
                    let ret = tail.get(1).map(|m| m.as_str().trim().to_string());
                    return Some((name, parse_params(params), ret));
                }
            }
            return None;
        }

        let caps = METHOD_DECL.captures(decl)?;
        let mut name = caps[1].to_string();
        if CONTROL_KEYWORDS.contains(name.as_str()) {
            return None;
        }
        let open = caps.get(0)?.end() - 1;
        let (params, tail) = params_and_tail(decl, open)?;
        // Outside class bodies only `name(...) {` counts (object literal methods).
        let ret = match BODY_TAIL.captures(tail) {
            Some(c) => c.get(1).map(|m| m.as_str().trim().to_string()),
            None if classes.in_class_body() => DECLARATION_TAIL
                .captures(tail)?
                .get(1)
                .map(|m| m.as_str().trim().to_string()),
            None => return None,
        };
        if name == "constructor" {
            name = classes.current()?.to_string();
        }
        Some((name, parse_params(params), ret))
    }
}

impl Default for JavaScriptExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl SignatureExtractor for JavaScriptExtractor {
    fn language_id(&self) -> &'static str {
        "javascript"
    }

    fn file_suffixes(&self) -> &'static [&'static str] {
        &[".js", ".jsx", ".mjs", ".cjs", ".ts", ".tsx", ".mts", ".cts"]
    }

    fn extract(&self, text: &str, identifier: &str) -> Vec<FunctionSignature> {
        let lines: Vec<&str> = text.lines().collect();
        let mut classes = ClassTracker::new();
        let mut signatures = Vec::new();

        let mut i = 0;
        while i < lines.len() {
            let trimmed = lines[i].trim();

            if is_comment_line(trimmed) {
                i += 1;
                continue;
            }

            if let Some(caps) = CLASS_DECL.captures(trimmed) {
                classes.enter(&caps[1]);
                classes.advance(lines[i]);
                i += 1;
                continue;
            }

            let (decl, end) = join_declaration(&lines, i);
            if let Some((name, parameters, return_type)) = self.match_declaration(&decl, &classes) {
                signatures.push(
                    FunctionSignature::new(name, identifier, i + 1)
                        .with_parameters(parameters)
                        .with_return_type(return_type.filter(|r| !r.is_empty()))
                        .with_documentation(preceding_block_doc(&lines, i)),
                );
            }

            for line in &lines[i..=end] {
                classes.advance(line);
            }
            i = end + 1;
        }

        tracing::trace!(file = identifier, count = signatures.len(), "javascript heuristics");
        signatures
    }
}

fn is_comment_line(trimmed: &str) -> bool {
    trimmed.starts_with("//") || trimmed.starts_with("/*") || trimmed.starts_with('*')
}

/// Split `decl` at the parameter list opening at byte `open`.
fn params_and_tail(decl: &str, open: usize) -> Option<(&str, &str)> {
    let params = parenthesized(&decl[open..])?;
    let tail_start = open + 1 + params.len() + 1;
    Some((params, decl.get(tail_start..).unwrap_or("")))
}

fn parse_params(params: &str) -> Vec<Parameter> {
    split_top_level(params, ',')
        .iter()
        .filter_map(|raw| parse_param(raw))
        .collect()
}

fn parse_param(raw: &str) -> Option<Parameter> {
    let mut text = raw.trim();
    for modifier in PARAMETER_MODIFIERS {
        if let Some(rest) = text.strip_prefix(modifier) {
            text = rest.trim_start();
        }
    }

    let (binding, default) = match split_once_top_level(text, '=') {
        Some((binding, default)) => (binding.trim(), Some(default.trim().to_string())),
        None => (text, None),
    };
    let (name, type_annotation) = match split_once_top_level(binding, ':') {
        Some((name, ty)) => (name.trim(), Some(ty.trim().to_string())),
        None => (binding, None),
    };

    let (name, optional) = match name.strip_suffix('?') {
        Some(stripped) => (stripped.trim(), true),
        None => (name, false),
    };
    if name.is_empty() || name == "this" {
        return None;
    }

    let default = default
        .filter(|d| !d.is_empty())
        .or_else(|| optional.then(|| "undefined".to_string()));

    Some(Parameter {
        name: name.to_string(),
        type_annotation: type_annotation.filter(|t| !t.is_empty()),
        default,
    })
}
