//! JSON API description extractor.
//!
//! Handles three shapes:
//! - OpenAPI / Swagger documents: one signature per path operation
//! - `package.json`: one `npm run <script>` entry per script
//! - anything else: nested objects carrying `url`, `endpoint` or `method`

use serde_json::{Map, Value};

use crate::extract::{SignatureExtractor, SourceKind};
use crate::signature::{FunctionSignature, Parameter};

/// OpenAPI path-item keys that are not HTTP operations.
const NON_OPERATION_KEYS: &[&str] = &["parameters", "servers", "summary", "description", "$ref"];

/// Keys marking a generic object as an endpoint definition.
const ENDPOINT_KEYS: &[&str] = &["url", "endpoint", "method"];

pub struct JsonExtractor;

impl JsonExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for JsonExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl SignatureExtractor for JsonExtractor {
    fn language_id(&self) -> &'static str {
        "json"
    }

    fn file_suffixes(&self) -> &'static [&'static str] {
        &[".json"]
    }

    fn source_kind(&self) -> SourceKind {
        SourceKind::Docs
    }

    fn extract(&self, text: &str, identifier: &str) -> Vec<FunctionSignature> {
        let root: Value = match serde_json::from_str(text) {
            Ok(v) => v,
            Err(e) => {
                tracing::debug!(file = identifier, error = %e, "invalid JSON");
                return Vec::new();
            }
        };
        let Some(object) = root.as_object() else {
            return Vec::new();
        };

        let locator = KeyLocator { text };
        let mut signatures = if is_openapi(object) {
            openapi_operations(object, &locator, identifier)
        } else if is_package_manifest(object) {
            package_scripts(object, &locator, identifier)
        } else {
            let mut out = Vec::new();
            generic_endpoints(object, &locator, identifier, &mut out);
            out
        };

        signatures.sort_by_key(|s| s.location.line);
        signatures
    }
}

/// Finds the line of a quoted key in the source text.
struct KeyLocator<'a> {
    text: &'a str,
}

impl KeyLocator<'_> {
    fn line_of(&self, key: &str) -> usize {
        let needle = format!("\"{}\"", key);
        match self.text.find(&needle) {
            Some(offset) => self.text[..offset].matches('\n').count() + 1,
            None => 1,
        }
    }
}

fn is_openapi(object: &Map<String, Value>) -> bool {
    ["openapi", "swagger", "paths"]
        .iter()
        .any(|k| object.contains_key(*k))
}

fn is_package_manifest(object: &Map<String, Value>) -> bool {
    object.contains_key("name")
        && (object.contains_key("scripts") || object.contains_key("dependencies"))
}

fn openapi_operations(
    object: &Map<String, Value>,
    locator: &KeyLocator,
    identifier: &str,
) -> Vec<FunctionSignature> {
    let Some(paths) = object.get("paths").and_then(Value::as_object) else {
        return Vec::new();
    };

    let mut out = Vec::new();
    for (path, item) in paths {
        let Some(methods) = item.as_object() else {
            continue;
        };
        // Path-level parameters apply to every operation.
        let shared: Vec<Parameter> = methods
            .get("parameters")
            .map(openapi_parameters)
            .unwrap_or_default();

        for (method, operation) in methods {
            if method.starts_with("x-") || NON_OPERATION_KEYS.contains(&method.as_str()) {
                continue;
            }
            let Some(operation) = operation.as_object() else {
                continue;
            };

            let name = operation
                .get("operationId")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("{} {}", method.to_uppercase(), path));

            let mut parameters = shared.clone();
            if let Some(params) = operation.get("parameters") {
                for p in openapi_parameters(params) {
                    parameters.retain(|existing| existing.name != p.name);
                    parameters.push(p);
                }
            }

            let documentation = ["summary", "description"]
                .iter()
                .find_map(|k| operation.get(*k).and_then(Value::as_str))
                .map(str::to_string);

            out.push(
                FunctionSignature::new(name, identifier, locator.line_of(path))
                    .with_parameters(parameters)
                    .with_return_type(success_type(operation))
                    .with_documentation(documentation),
            );
        }
    }
    out
}

fn openapi_parameters(value: &Value) -> Vec<Parameter> {
    let Some(list) = value.as_array() else {
        return Vec::new();
    };
    list.iter()
        .filter_map(Value::as_object)
        .map(|param| {
            let name = param
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or("param")
                .to_string();
            let schema = param.get("schema");
            let type_annotation = schema
                .and_then(|s| s.get("type"))
                .or_else(|| param.get("type"))
                .or_else(|| param.get("in"))
                .and_then(Value::as_str)
                .map(str::to_string);
            let default = schema
                .and_then(|s| s.get("default"))
                .or_else(|| param.get("default"))
                .map(render_scalar);
            Parameter {
                name,
                type_annotation,
                default,
            }
        })
        .collect()
}

/// Schema type of the 200/201 response, falling back to its description.
fn success_type(operation: &Map<String, Value>) -> Option<String> {
    let responses = operation.get("responses")?.as_object()?;
    let response = ["200", "201", "default"]
        .iter()
        .find_map(|code| responses.get(*code))?;

    let schema = response
        .get("content")
        .and_then(Value::as_object)
        .and_then(|content| content.values().next())
        .and_then(|media| media.get("schema"))
        .or_else(|| response.get("schema"));

    if let Some(schema) = schema {
        if let Some(reference) = schema.get("$ref").and_then(Value::as_str) {
            return reference.rsplit('/').next().map(str::to_string);
        }
        if let Some(ty) = schema.get("type").and_then(Value::as_str) {
            return Some(ty.to_string());
        }
    }
    response
        .get("description")
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn package_scripts(
    object: &Map<String, Value>,
    locator: &KeyLocator,
    identifier: &str,
) -> Vec<FunctionSignature> {
    let Some(scripts) = object.get("scripts").and_then(Value::as_object) else {
        return Vec::new();
    };
    scripts
        .iter()
        .map(|(name, command)| {
            FunctionSignature::new(format!("npm run {}", name), identifier, locator.line_of(name))
                .with_documentation(command.as_str().map(str::to_string))
        })
        .collect()
}

fn generic_endpoints(
    object: &Map<String, Value>,
    locator: &KeyLocator,
    identifier: &str,
    out: &mut Vec<FunctionSignature>,
) {
    for (key, value) in object {
        let Some(child) = value.as_object() else {
            continue;
        };
        if ENDPOINT_KEYS.iter().any(|k| child.contains_key(*k)) {
            let documentation = child.get("description").map(render_scalar);
            let parameters = child
                .get("params")
                .or_else(|| child.get("parameters"))
                .map(generic_parameters)
                .unwrap_or_default();
            out.push(
                FunctionSignature::new(key.clone(), identifier, locator.line_of(key))
                    .with_parameters(parameters)
                    .with_documentation(documentation),
            );
        } else {
            generic_endpoints(child, locator, identifier, out);
        }
    }
}

/// `["a", "b"]` or `{"a": "string"}` parameter listings.
fn generic_parameters(value: &Value) -> Vec<Parameter> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(name) => Some(Parameter::new(name.as_str())),
                Value::Object(obj) => obj
                    .get("name")
                    .and_then(Value::as_str)
                    .map(|name| Parameter {
                        name: name.to_string(),
                        type_annotation: obj.get("type").and_then(Value::as_str).map(str::to_string),
                        default: obj.get("default").map(render_scalar),
                    }),
                _ => None,
            })
            .collect(),
        Value::Object(obj) => obj
            .iter()
            .map(|(name, ty)| Parameter {
                name: name.clone(),
                type_annotation: ty.as_str().map(str::to_string),
                default: None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn render_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
