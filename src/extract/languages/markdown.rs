//! Markdown documentation extractor.
//!
//! Each second-level heading that reads like a function name opens one
//! function's documentation section. Nested headings and body text up to
//! the next heading of level 1 or 2 belong to that section. Within a
//! section, a "Parameters" subsection is parsed line by line and a
//! "Returns" subsection supplies the return type.
//!
//! Code fences tagged with a supported language (python, js/ts, java) are
//! run through that language's extractor, so signatures shown as examples
//! count as documented. Untagged fences are ignored.
//!
//! Files without any qualifying heading or fenced signature describe a
//! single function named after the file itself.

use std::collections::HashSet;

use lazy_static::lazy_static;
use phf::phf_set;
use regex::Regex;

use crate::extract::heuristics::split_top_level;
use crate::extract::{SignatureExtractor, SourceKind};
use crate::signature::{FunctionSignature, Parameter};

/// Headings longer than this are prose, not names.
const MAX_NAME_HEADING_LEN: usize = 70;

/// File-name prefixes dropped when naming the whole-file fallback.
const DOC_PREFIXES: &[&str] = &["docs_", "docs-", "doc_", "doc-"];

lazy_static! {
    static ref HEADING: Regex = Regex::new(r"^(#{1,6})\s+(.+?)\s*#*\s*$").unwrap();

    static ref IDENTIFIER: Regex = Regex::new(r"^[A-Za-z_$][\w$]*(?:\.[A-Za-z_$][\w$]*)*$").unwrap();

    /// `### Parameters`, `**Parameters:**`, `Args:` ...
    static ref PARAMS_LABEL: Regex = Regex::new(
        r"(?i)^(?:#{1,6}\s+)?\**\s*(?:parameters?|params|arguments?|args)\s*:?\s*\**\s*:?$"
    ).unwrap();

    static ref RETURNS_LABEL: Regex = Regex::new(
        r"(?i)^(?:#{1,6}\s+)?\**\s*(?:returns?|return\s+value)\s*(?:\**\s*:\s*\**\s*(.*)|\**)$"
    ).unwrap();

    /// `- `name` (type): description`
    static ref PARAM_BACKTICK: Regex = Regex::new(
        r"^[-*+]\s*`([^`]+)`\s*(?:\(([^)]*)\))?\s*(?:[:\-–—]\s*(.*))?$"
    ).unwrap();

    /// `name (type): description`
    static ref PARAM_TYPED: Regex = Regex::new(
        r"^(?:[-*+]\s*)?\**([*A-Za-z_$][\w$]*)\**\s*\(([^)]*)\)\s*(?:[:\-–—]\s*(.*))?$"
    ).unwrap();

    /// `name: description`
    static ref PARAM_PLAIN: Regex = Regex::new(
        r"^(?:[-*+]\s*)?\**([*A-Za-z_$][\w$]*)\**\s*[:\-–—]\s*(.*)$"
    ).unwrap();

    static ref DEFAULT_PHRASE: Regex = Regex::new(
        r"(?i)\bdefaults?\s*(?:to|is|=|:)?\s*`?([^`\s,;)]+?)`?[.,;)]?(?:\s|$)"
    ).unwrap();

    static ref BACKTICK_TOKEN: Regex = Regex::new(r"`([^`]+)`").unwrap();

    static ref RETURN_TYPED_LINE: Regex = Regex::new(
        r"^(?:[-*+]\s*)?([A-Za-z_][\w\[\], <>|.]*?)\s*:\s"
    ).unwrap();

    /// `` `name(args)` `` or `` `module.name(args)` ``
    static ref INLINE_CALL: Regex = Regex::new(
        r"`(?:[\w$]+\.)*([A-Za-z_$][\w$]*)\(([^)`]*)\)`"
    ).unwrap();
}

/// Section titles that are never function names.
static SECTION_TITLES: phf::Set<&'static str> = phf_set! {
    "parameters", "parameter", "params", "arguments", "args", "returns",
    "return", "example", "examples", "description", "usage", "notes", "note",
    "raises", "exceptions", "errors", "warnings", "warning", "overview",
    "introduction", "installation", "setup", "configuration", "summary",
    "contents", "license", "changelog", "contributing", "requirements",
    "features", "faq", "authors", "reference", "quickstart", "todo",
};

/// Multi-word section titles, compared after lowercasing.
const SECTION_PHRASES: &[&str] = &[
    "see also",
    "getting started",
    "api reference",
    "table of contents",
    "return value",
];

/// Leading words that mark a heading as prose.
static LEADING_PROSE: phf::Set<&'static str> = phf_set! {
    "a", "an", "the", "to", "for", "with", "in", "on", "of", "by", "from",
    "about", "how", "why", "what", "when", "into", "using",
};

/// Inline references that are logging or prose, not API.
static INLINE_NOISE: phf::Set<&'static str> = phf_set! {
    "print", "log", "console", "example",
};

pub struct MarkdownExtractor;

/// Which subsection a body line falls in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Subsection {
    Body,
    Parameters,
    Returns,
}

/// One heading-delimited section.
struct Section<'a> {
    title: &'a str,
    line: usize,
    /// (line number, text) of every line after the heading
    body: Vec<(usize, &'a str)>,
}

/// Heading text split into an identifier and optional inline parameters.
#[derive(Debug, PartialEq, Eq)]
struct HeadingName {
    name: String,
    inline_params: Option<String>,
}

/// What a function section's body yields.
#[derive(Default)]
struct SectionContent {
    parameters: Vec<Parameter>,
    saw_parameters: bool,
    return_type: Option<String>,
    documentation: Vec<String>,
    inline_refs: Vec<FunctionSignature>,
}

impl MarkdownExtractor {
    pub fn new() -> Self {
        Self
    }

    fn function_from_section(&self, section: &Section, heading: HeadingName, identifier: &str) -> Vec<FunctionSignature> {
        let content = parse_section_body(&section.body, identifier, true);

        let parameters = if content.saw_parameters {
            content.parameters
        } else {
            heading
                .inline_params
                .as_deref()
                .map(parse_inline_params)
                .unwrap_or_default()
        };

        let mut out = vec![FunctionSignature::new(heading.name, identifier, section.line)
            .with_parameters(parameters)
            .with_return_type(content.return_type)
            .with_documentation(Some(content.documentation.join("\n").trim().to_string()))];
        out.extend(content.inline_refs);
        out
    }

    /// Whole-file fallback named after the identifier.
    fn fallback(&self, text: &str, identifier: &str) -> Vec<FunctionSignature> {
        let Some(name) = fallback_name(identifier) else {
            return Vec::new();
        };
        let body: Vec<(usize, &str)> = text.lines().enumerate().map(|(i, l)| (i + 1, l)).collect();
        let content = parse_section_body(&body, identifier, false);

        vec![FunctionSignature::new(name, identifier, 1)
            .with_parameters(content.parameters)
            .with_return_type(content.return_type)
            .with_documentation(Some(text.trim().to_string()))]
    }
}

impl Default for MarkdownExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl SignatureExtractor for MarkdownExtractor {
    fn language_id(&self) -> &'static str {
        "markdown"
    }

    fn file_suffixes(&self) -> &'static [&'static str] {
        &[".md", ".markdown"]
    }

    fn source_kind(&self) -> SourceKind {
        SourceKind::Docs
    }

    fn extract(&self, text: &str, identifier: &str) -> Vec<FunctionSignature> {
        let sections = split_sections(text);

        let mut signatures = Vec::new();
        for section in &sections {
            if let Some(heading) = function_heading(section.title) {
                signatures.extend(self.function_from_section(section, heading, identifier));
            }
        }
        signatures.extend(fenced_signatures(text, identifier));

        if signatures.is_empty() {
            tracing::trace!(file = identifier, "no function headings, using file-level fallback");
            return self.fallback(text, identifier);
        }

        signatures.sort_by_key(|s| s.location.line);
        let mut seen = HashSet::new();
        signatures.retain(|s| seen.insert(s.match_key()));
        signatures
    }
}

/// Split into level-2 sections, ignoring `#` lines inside code fences.
fn split_sections(text: &str) -> Vec<Section<'_>> {
    let mut sections: Vec<Section> = Vec::new();
    let mut current: Option<Section> = None;
    let mut in_fence = false;

    for (idx, line) in text.lines().enumerate() {
        let line_no = idx + 1;
        let trimmed = line.trim_start();
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            in_fence = !in_fence;
        }

        if !in_fence {
            if let Some(caps) = HEADING.captures(line) {
                let level = caps[1].len();
                if level <= 2 {
                    sections.extend(current.take());
                    if level == 2 {
                        current = Some(Section {
                            title: caps.get(2).map(|m| m.as_str()).unwrap_or(""),
                            line: line_no,
                            body: Vec::new(),
                        });
                    }
                    continue;
                }
            }
        }

        if let Some(section) = current.as_mut() {
            section.body.push((line_no, line));
        }
    }
    sections.extend(current);
    sections
}

/// Code extractor for a fence info string such as `python`, `ts` or `{.java}`.
fn fence_extractor(info: &str) -> Option<Box<dyn SignatureExtractor>> {
    let tag = info
        .trim_start_matches('{')
        .trim_start_matches('.')
        .split(|c: char| c.is_whitespace() || c == ',' || c == '}')
        .next()
        .unwrap_or("")
        .to_lowercase();
    match tag.as_str() {
        #[cfg(feature = "tree-sitter")]
        "python" | "py" | "python3" => Some(Box::new(super::PythonExtractor::new())),
        "javascript" | "js" | "jsx" | "typescript" | "ts" | "tsx" | "mjs" => {
            Some(Box::new(super::JavaScriptExtractor::new()))
        }
        "java" => Some(Box::new(super::JavaExtractor::new())),
        _ => None,
    }
}

/// Signatures declared inside tagged code fences, with document line numbers.
fn fenced_signatures(text: &str, identifier: &str) -> Vec<FunctionSignature> {
    let mut signatures = Vec::new();
    // (marker, opening line, extractor, body)
    let mut open: Option<(&str, usize, Option<Box<dyn SignatureExtractor>>, Vec<&str>)> = None;

    for (idx, line) in text.lines().enumerate() {
        let trimmed = line.trim_start();
        let marker = if trimmed.starts_with("```") {
            "```"
        } else if trimmed.starts_with("~~~") {
            "~~~"
        } else {
            ""
        };

        match open.as_mut() {
            Some((open_marker, start, extractor, body)) => {
                if marker.is_empty() || marker != *open_marker {
                    body.push(line);
                    continue;
                }
                if let Some(extractor) = extractor {
                    let offset = *start;
                    signatures.extend(extractor.extract(&body.join("\n"), identifier).into_iter().map(
                        |mut sig| {
                            sig.location.line += offset;
                            sig
                        },
                    ));
                }
                open = None;
            }
            None if !marker.is_empty() => {
                let info = trimmed[marker.len()..].trim();
                open = Some((marker, idx + 1, fence_extractor(info), Vec::new()));
            }
            None => {}
        }
    }
    signatures
}

/// Apply the function-name heuristic to a heading.
fn function_heading(title: &str) -> Option<HeadingName> {
    let title = title.trim();
    if title.is_empty() || title.chars().count() > MAX_NAME_HEADING_LEN {
        return None;
    }

    let lower = title.to_lowercase();
    if SECTION_PHRASES.contains(&lower.as_str()) {
        return None;
    }
    if let Some(first) = lower.split_whitespace().next() {
        if LEADING_PROSE.contains(first) {
            return None;
        }
    }

    let text = title.trim_matches('`').trim();
    let (ident, inline_params) = match text.find('(') {
        Some(open) => {
            let close = text.rfind(')')?;
            if close < open {
                return None;
            }
            (
                text[..open].trim(),
                Some(text[open + 1..close].to_string()),
            )
        }
        None => (text, None),
    };

    if !IDENTIFIER.is_match(ident) || SECTION_TITLES.contains(ident.to_lowercase().as_str()) {
        return None;
    }

    let name = ident.rsplit('.').next().unwrap_or(ident).to_string();
    Some(HeadingName {
        name,
        inline_params,
    })
}

/// Walk a section body, tracking subsections and code fences.
fn parse_section_body(body: &[(usize, &str)], identifier: &str, collect_refs: bool) -> SectionContent {
    let mut content = SectionContent::default();
    let mut mode = Subsection::Body;
    let mut in_fence = false;

    for &(line_no, line) in body {
        let trimmed = line.trim();

        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            in_fence = !in_fence;
            if mode == Subsection::Body {
                content.documentation.push(line.to_string());
            }
            continue;
        }
        if in_fence {
            if mode == Subsection::Body {
                content.documentation.push(line.to_string());
            }
            continue;
        }

        if PARAMS_LABEL.is_match(trimmed) {
            mode = Subsection::Parameters;
            content.saw_parameters = true;
            continue;
        }
        if let Some(caps) = RETURNS_LABEL.captures(trimmed) {
            mode = Subsection::Returns;
            // `Returns: `float`` on one line
            if let Some(rest) = caps.get(1) {
                if content.return_type.is_none() {
                    content.return_type = return_type_of(rest.as_str());
                }
            }
            continue;
        }
        if HEADING.is_match(trimmed) {
            mode = Subsection::Body;
            content.documentation.push(line.to_string());
            continue;
        }

        match mode {
            Subsection::Parameters => {
                if let Some(param) = parse_param_line(trimmed) {
                    if !content.parameters.iter().any(|p| p.name == param.name) {
                        content.parameters.push(param);
                    }
                }
            }
            Subsection::Returns => {
                if content.return_type.is_none() && !trimmed.is_empty() {
                    content.return_type = return_type_of(trimmed);
                }
            }
            Subsection::Body => {
                content.documentation.push(line.to_string());
                if collect_refs {
                    content.inline_refs.extend(inline_refs(line, line_no, identifier));
                }
            }
        }
    }
    content
}

/// Parse one line of a Parameters subsection.
fn parse_param_line(line: &str) -> Option<Parameter> {
    if line.is_empty() {
        return None;
    }

    let (name, type_text, description) = if let Some(c) = PARAM_BACKTICK.captures(line) {
        (c[1].to_string(), c.get(2).map(|m| m.as_str()), c.get(3).map(|m| m.as_str()))
    } else if let Some(c) = PARAM_TYPED.captures(line) {
        (c[1].to_string(), c.get(2).map(|m| m.as_str()), c.get(3).map(|m| m.as_str()))
    } else if let Some(c) = PARAM_PLAIN.captures(line) {
        (c[1].to_string(), None, c.get(2).map(|m| m.as_str()))
    } else {
        return None;
    };

    let name = name.trim().to_string();
    let lower = name.to_lowercase();
    if name.is_empty() || lower == "none" || lower == "n/a" {
        return None;
    }

    let type_annotation = type_text.and_then(clean_param_type);
    let default = description.and_then(|d| {
        DEFAULT_PHRASE
            .captures(d)
            .map(|c| c[1].trim_end_matches(['.', ',', ';']).to_string())
            .filter(|v| !v.is_empty())
    });

    Some(Parameter {
        name,
        type_annotation,
        default,
    })
}

/// `float, optional` → `float`
fn clean_param_type(raw: &str) -> Option<String> {
    let parts: Vec<&str> = raw
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty() && !p.eq_ignore_ascii_case("optional"))
        .collect();
    let joined = parts.join(", ");
    let joined = joined.trim_matches('`').trim();
    if joined.is_empty() {
        None
    } else {
        Some(joined.to_string())
    }
}

/// First backticked token, otherwise the `type: description` form.
fn return_type_of(line: &str) -> Option<String> {
    if let Some(c) = BACKTICK_TOKEN.captures(line) {
        let token = c[1].trim().trim_end_matches(['.', ',', ';']).trim();
        return (!token.is_empty()).then(|| token.to_string());
    }
    RETURN_TYPED_LINE
        .captures(line)
        .map(|c| c[1].trim().to_string())
        .filter(|t| !t.is_empty())
}

fn parse_inline_params(raw: &str) -> Vec<Parameter> {
    split_top_level(raw, ',')
        .iter()
        .filter_map(|p| {
            let (binding, default) = match p.split_once('=') {
                Some((b, d)) => (b.trim(), Some(d.trim().to_string())),
                None => (p.as_str(), None),
            };
            let (name, ty) = match binding.split_once(':') {
                Some((n, t)) => (n.trim(), Some(t.trim().to_string())),
                None => (binding.trim(), None),
            };
            if name.is_empty() {
                return None;
            }
            Some(Parameter {
                name: name.to_string(),
                type_annotation: ty.filter(|t| !t.is_empty()),
                default: default.filter(|d| !d.is_empty()),
            })
        })
        .collect()
}

fn inline_refs(line: &str, line_no: usize, identifier: &str) -> Vec<FunctionSignature> {
    INLINE_CALL
        .captures_iter(line)
        .filter(|c| !INLINE_NOISE.contains(c[1].to_lowercase().as_str()))
        .map(|c| {
            FunctionSignature::new(&c[1], identifier, line_no)
                .with_parameters(parse_inline_params(&c[2]))
        })
        .collect()
}

/// File stem without directories, extension or conventional doc prefixes.
fn fallback_name(identifier: &str) -> Option<String> {
    let file = identifier.rsplit(['/', '\\']).next().unwrap_or(identifier);
    let stem = match file.rfind('.') {
        Some(dot) if dot > 0 => &file[..dot],
        _ => file,
    };
    let lower = stem.to_lowercase();
    let stripped = DOC_PREFIXES
        .iter()
        .find(|p| lower.starts_with(*p))
        .map(|p| &stem[p.len()..])
        .unwrap_or(stem);
    let name = stripped.trim();
    (!name.is_empty()).then(|| name.to_string())
}
