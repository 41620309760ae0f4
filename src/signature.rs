//! Function signature model shared by extractors, matcher and comparators.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single declared parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    /// Parameter name (never empty)
    pub name: String,
    /// Declared type annotation, verbatim
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_annotation: Option<String>,
    /// Default value expression, verbatim
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

impl Parameter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_annotation: None,
            default: None,
        }
    }

    pub fn typed(name: impl Into<String>, type_annotation: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_annotation: Some(type_annotation.into()),
            default: None,
        }
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// A parameter without a default must be supplied by every caller.
    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(ty) = &self.type_annotation {
            write!(f, ": {}", ty)?;
        }
        if let Some(default) = &self.default {
            write!(f, " = {}", default)?;
        }
        Ok(())
    }
}

/// Where a signature was declared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    /// File identifier as supplied to the extractor
    pub file: String,
    /// Line number (1-indexed)
    pub line: usize,
}

/// One function/method declaration, or one documented function reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionSignature {
    pub name: String,
    /// Parameters in declaration order
    pub parameters: Vec<Parameter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_type: Option<String>,
    /// Docstring, doc comment, or documentation section body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation: Option<String>,
    pub location: SourceLocation,
}

impl FunctionSignature {
    pub fn new(name: impl Into<String>, file: impl Into<String>, line: usize) -> Self {
        Self {
            name: name.into(),
            parameters: Vec::new(),
            return_type: None,
            documentation: None,
            location: SourceLocation {
                file: file.into(),
                line,
            },
        }
    }

    pub fn with_parameters(mut self, parameters: Vec<Parameter>) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn with_return_type(mut self, return_type: Option<String>) -> Self {
        self.return_type = return_type;
        self
    }

    pub fn with_documentation(mut self, documentation: Option<String>) -> Self {
        self.documentation = documentation.filter(|d| !d.trim().is_empty());
        self
    }

    /// Lowercased name used for exact matching.
    pub fn match_key(&self) -> String {
        self.name.to_lowercase()
    }

    /// Short `name(a, b, c)` rendering used in issue snippets.
    pub fn call_form(&self) -> String {
        let params: Vec<&str> = self.parameters.iter().map(|p| p.name.as_str()).collect();
        format!("{}({})", self.name, params.join(", "))
    }
}

impl fmt::Display for FunctionSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params: Vec<String> = self.parameters.iter().map(|p| p.to_string()).collect();
        write!(f, "{}({})", self.name, params.join(", "))?;
        if let Some(ret) = &self.return_type {
            write!(f, " -> {}", ret)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_full_signature() {
        let sig = FunctionSignature::new("calculate_total", "cart.py", 3)
            .with_parameters(vec![
                Parameter::typed("price", "float"),
                Parameter::new("quantity"),
                Parameter::typed("discount", "float").with_default("0.0"),
            ])
            .with_return_type(Some("float".to_string()));

        assert_eq!(
            sig.to_string(),
            "calculate_total(price: float, quantity, discount: float = 0.0) -> float"
        );
        assert_eq!(sig.call_form(), "calculate_total(price, quantity, discount)");
    }

    #[test]
    fn test_blank_documentation_is_dropped() {
        let sig = FunctionSignature::new("f", "a.py", 1).with_documentation(Some("  \n".into()));
        assert!(sig.documentation.is_none());
    }

    #[test]
    fn test_required_parameter() {
        assert!(Parameter::new("x").is_required());
        assert!(!Parameter::new("x").with_default("1").is_required());
    }
}
