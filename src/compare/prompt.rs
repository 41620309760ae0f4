//! Prompt construction and reply parsing for deep comparisons.

use serde_json::Value;

use super::{Issue, Severity};
use crate::signature::FunctionSignature;

/// Build the comparison prompt for one pair.
pub fn build_prompt(code: &FunctionSignature, doc: &FunctionSignature) -> String {
    let code_params: Vec<String> = code
        .parameters
        .iter()
        .map(|p| {
            let mut rendered = format!("{}: {}", p.name, p.type_annotation.as_deref().unwrap_or("Any"));
            if let Some(default) = &p.default {
                rendered.push_str(&format!(" = {}", default));
            }
            rendered
        })
        .collect();
    let doc_params: Vec<String> = doc.parameters.iter().map(|p| p.to_string()).collect();

    format!(
        r#"You are checking whether documentation still describes the code it documents.

ACTUAL CODE:
Function: {code_name}({code_params})
Returns: {code_returns}
Docstring: {code_doc}
Location: {code_file}:{code_line}

DOCUMENTATION:
Function: {doc_name}
Parameters mentioned: {doc_params}
Return type: {doc_returns}
Description: {doc_doc}
Location: {doc_file}:{doc_line}

Judge SEMANTIC equivalence. Ignore cosmetic differences: naming conventions
(camelCase vs snake_case), wording and style, and optional detail the
documentation leaves out.

Only report:
1. Required parameters missing from the documentation
2. Documented parameters that do not exist in the code
3. Type mismatches that would cause runtime errors
4. Return type mismatches
5. Documented functionality the code does not provide

Respond with JSON only:
{{
  "confidence": 0-100,
  "issues": [
    {{
      "severity": "high/medium/low",
      "issue": "description of the problem",
      "code_has": "what the code shows",
      "docs_say": "what the documentation claims",
      "suggested_fix": "how to fix it"
    }}
  ]
}}"#,
        code_name = code.name,
        code_params = code_params.join(", "),
        code_returns = code.return_type.as_deref().unwrap_or("not specified"),
        code_doc = code.documentation.as_deref().unwrap_or("none"),
        code_file = code.location.file,
        code_line = code.location.line,
        doc_name = doc.name,
        doc_params = if doc_params.is_empty() {
            "none".to_string()
        } else {
            doc_params.join(", ")
        },
        doc_returns = doc.return_type.as_deref().unwrap_or("not specified"),
        doc_doc = doc.documentation.as_deref().unwrap_or("none"),
        doc_file = doc.location.file,
        doc_line = doc.location.line,
    )
}

/// Parsed service verdict.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reply {
    /// 0..=100
    pub confidence: u32,
    pub issues: Vec<Issue>,
}

/// Parse a service reply. Anything unusable yields the neutral reply
/// (confidence 0, no issues).
pub fn parse_reply(text: &str, function: &str) -> Reply {
    let Some(object) = first_json_object(text) else {
        tracing::debug!(function, "no JSON object in reply");
        return Reply::default();
    };
    let value: Value = match serde_json::from_str(object) {
        Ok(v) => v,
        Err(e) => {
            tracing::debug!(function, error = %e, "unparseable reply");
            return Reply::default();
        }
    };

    let confidence = value.get("confidence").map(confidence_of).unwrap_or(0);
    let issues = value
        .get("issues")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_object)
                .map(|item| {
                    let field = |keys: &[&str]| {
                        keys.iter()
                            .find_map(|k| item.get(*k).and_then(Value::as_str))
                            .map(str::trim)
                            .filter(|s| !s.is_empty())
                            .map(str::to_string)
                    };
                    Issue {
                        severity: Severity::from_reply(
                            item.get("severity").and_then(Value::as_str).unwrap_or(""),
                        ),
                        function: function.to_string(),
                        description: field(&["issue", "description"]).unwrap_or_default(),
                        code_snippet: field(&["code_has"]),
                        doc_snippet: field(&["docs_say"]),
                        suggested_fix: field(&["suggested_fix"]),
                    }
                })
                .collect()
        })
        .unwrap_or_default();

    Reply { confidence, issues }
}

/// Accepts `87`, `87.5` and `"87"`; clamps into 0..=100.
fn confidence_of(value: &Value) -> u32 {
    let raw = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').parse::<f64>().ok(),
        _ => None,
    };
    match raw {
        Some(v) if v.is_finite() => v.clamp(0.0, 100.0) as u32,
        _ => 0,
    }
}

/// The first balanced `{ ... }` in `text`, ignoring braces inside strings.
fn first_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}
