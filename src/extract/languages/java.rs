//! Java signature extractor using line patterns.
//!
//! Recognizes methods (`modifiers ReturnType name(...)`), and constructors
//! (`ClassName(...)` while inside that class). Javadoc blocks directly
//! above a declaration (annotations in between are fine) become its
//! documentation.

use lazy_static::lazy_static;
use phf::phf_set;
use regex::Regex;

use crate::extract::heuristics::{
    join_declaration, parenthesized, preceding_block_doc, split_top_level, ClassTracker,
};
use crate::extract::SignatureExtractor;
use crate::signature::{FunctionSignature, Parameter};

lazy_static! {
    static ref TYPE_DECL: Regex = Regex::new(
        r"^(?:(?:public|private|protected|abstract|final|static|sealed|non-sealed|strictfp)\s+)*(?:class|interface|enum|record|@interface)\s+([A-Za-z_$][\w$]*)"
    ).unwrap();

    static ref METHOD_DECL: Regex = Regex::new(
        r"^(?:@[\w.]+(?:\([^)]*\))?\s+)*(?:(?:public|private|protected|static|final|abstract|synchronized|native|default|strictfp)\s+)*(?:<[^(]+>\s+)?([\w.$]+(?:<.*>)?(?:\[\])*)\s+([A-Za-z_$][\w$]*)\s*\("
    ).unwrap();

    static ref CONSTRUCTOR_DECL: Regex = Regex::new(
        r"^(?:@[\w.]+(?:\([^)]*\))?\s+)*(?:(?:public|private|protected)\s+)?([A-Za-z_$][\w$]*)\s*\("
    ).unwrap();

    /// What may follow a declaration's parameter list.
    static ref DECLARATION_TAIL: Regex = Regex::new(
        r"^\s*(?:throws\s+[\w.,\s<>]+?)?\s*(?:\{.*|;|default\s+.*;)?\s*$"
    ).unwrap();

    static ref ANNOTATION: Regex = Regex::new(r"@[\w.]+(?:\([^)]*\))?\s*").unwrap();
}

/// Keywords that can appear in the return-type or name position of a
/// statement that looks like a declaration.
static NOT_DECLARATION: phf::Set<&'static str> = phf_set! {
    "if", "else", "for", "while", "do", "switch", "case", "catch", "try",
    "finally", "return", "throw", "new", "assert", "yield",
};

static MODIFIERS: phf::Set<&'static str> = phf_set! {
    "public", "private", "protected", "static", "final", "abstract",
    "synchronized", "native", "default", "strictfp",
};

pub struct JavaExtractor;

impl JavaExtractor {
    pub fn new() -> Self {
        Self
    }

    fn match_declaration(
        &self,
        decl: &str,
        classes: &ClassTracker,
    ) -> Option<(String, Vec<Parameter>, Option<String>)> {
        if let Some(caps) = METHOD_DECL.captures(decl) {
            let return_type = caps[1].to_string();
            let name = caps[2].to_string();
            if NOT_DECLARATION.contains(return_type.as_str()) || NOT_DECLARATION.contains(name.as_str())
            {
                return None;
            }
            // `public Cart(` matches with the modifier as return type.
            if !MODIFIERS.contains(return_type.as_str()) {
                let open = caps.get(0)?.end() - 1;
                let params = declaration_params(decl, open)?;
                return Some((name, parse_params(params), Some(return_type)));
            }
        }

        if !classes.in_class_body() {
            return None;
        }
        let class = classes.current()?;
        let caps = CONSTRUCTOR_DECL.captures(decl)?;
        if &caps[1] != class {
            return None;
        }
        let open = caps.get(0)?.end() - 1;
        let params = declaration_params(decl, open)?;
        Some((class.to_string(), parse_params(params), None))
    }
}

impl Default for JavaExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl SignatureExtractor for JavaExtractor {
    fn language_id(&self) -> &'static str {
        "java"
    }

    fn file_suffixes(&self) -> &'static [&'static str] {
        &[".java"]
    }

    fn extract(&self, text: &str, identifier: &str) -> Vec<FunctionSignature> {
        let lines: Vec<&str> = text.lines().collect();
        let mut classes = ClassTracker::new();
        let mut signatures = Vec::new();

        let mut i = 0;
        while i < lines.len() {
            let trimmed = lines[i].trim();

            if trimmed.starts_with("//") || trimmed.starts_with("/*") || trimmed.starts_with('*') {
                i += 1;
                continue;
            }

            if let Some(caps) = TYPE_DECL.captures(trimmed) {
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
                        .with_return_type(return_type)
                        .with_documentation(preceding_block_doc(&lines, i)),
                );
            }

            for line in &lines[i..=end] {
                classes.advance(line);
            }
            i = end + 1;
        }

        signatures
    }
}

/// Parameter list text, provided what follows it can end a declaration.
fn declaration_params(decl: &str, open: usize) -> Option<&str> {
    let params = parenthesized(&decl[open..])?;
    let tail = decl.get(open + params.len() + 2..).unwrap_or("");
    DECLARATION_TAIL.is_match(tail).then_some(params)
}

fn parse_params(params: &str) -> Vec<Parameter> {
    split_top_level(params, ',')
        .iter()
        .filter_map(|raw| {
            let cleaned = ANNOTATION.replace_all(raw, "");
            let cleaned = cleaned.trim();
            let cleaned = cleaned.strip_prefix("final ").unwrap_or(cleaned).trim();
            let split = cleaned.rfind(char::is_whitespace)?;
            let (ty, name) = cleaned.split_at(split);
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some(Parameter::typed(name, ty.trim()))
        })
        .collect()
}
