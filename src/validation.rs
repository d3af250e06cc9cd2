//! Schema validation of the merged configuration.
//!
//! Validation is advisory. When no usable schema is available the result is
//! `valid` with a single warning instead of an error, so a missing or broken
//! schema never blocks loading configuration.

use std::path::Path;

use jsonschema::JSONSchema;
use jsonschema::error::{TypeKind, ValidationError, ValidationErrorKind};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    /// JSON pointer to the offending value, `/` for the root.
    pub path: String,
    pub message: String,
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<ValidationIssue>,
}

impl ValidationResult {
    pub fn ok() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
        }
    }

    /// Valid, with a warning explaining why nothing was checked.
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self {
            valid: true,
            errors: vec![ValidationIssue {
                path: String::new(),
                message: reason.into(),
                severity: Severity::Warning,
                suggestion: None,
            }],
        }
    }
}

/// Anything that can check a configuration value.
pub trait SchemaValidator {
    fn validate(&self, value: &Value) -> ValidationResult;
}

enum State {
    Ready(Box<JSONSchema>),
    Unavailable(String),
}

/// Validator backed by a local JSON Schema document.
pub struct JsonSchemaValidator {
    state: State,
}

impl JsonSchemaValidator {
    /// Load and compile a schema file. Failures are kept and reported as a
    /// warning on every validation.
    pub fn from_file(path: &Path) -> Self {
        let schema = std::fs::read_to_string(path)
            .map_err(|e| format!("cannot read schema {}: {e}", path.display()))
            .and_then(|text| {
                serde_json::from_str::<Value>(&text)
                    .map_err(|e| format!("cannot parse schema {}: {e}", path.display()))
            });

        match schema {
            Ok(schema) => Self::from_value(&schema),
            Err(reason) => Self::unavailable(reason),
        }
    }

    pub fn from_value(schema: &Value) -> Self {
        match JSONSchema::compile(schema) {
            Ok(compiled) => Self {
                state: State::Ready(Box::new(compiled)),
            },
            Err(e) => Self::unavailable(format!("cannot compile schema: {e}")),
        }
    }

    fn unavailable(reason: String) -> Self {
        tracing::warn!("[validation] {reason}");
        Self {
            state: State::Unavailable(reason),
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self.state, State::Ready(_))
    }
}

impl SchemaValidator for JsonSchemaValidator {
    fn validate(&self, value: &Value) -> ValidationResult {
        let compiled = match &self.state {
            State::Ready(compiled) => compiled,
            State::Unavailable(reason) => {
                return ValidationResult::skipped(format!("{reason}; skipping validation"));
            }
        };

        match compiled.validate(value) {
            Ok(()) => ValidationResult::ok(),
            Err(errors) => ValidationResult {
                valid: false,
                errors: errors.map(|error| to_issue(&error)).collect(),
            },
        }
    }
}

fn to_issue(error: &ValidationError<'_>) -> ValidationIssue {
    let path = error.instance_path.to_string();
    let path = if path.is_empty() { "/".to_string() } else { path };
    let suggestion = suggest(&error.kind, &path);

    ValidationIssue {
        path,
        message: error.to_string(),
        severity: Severity::Error,
        suggestion,
    }
}

fn suggest(kind: &ValidationErrorKind, path: &str) -> Option<String> {
    match kind {
        ValidationErrorKind::AdditionalProperties { unexpected } => Some(format!(
            "Remove unknown property {}",
            unexpected
                .iter()
                .map(|name| format!("\"{name}\""))
                .collect::<Vec<_>>()
                .join(", ")
        )),
        ValidationErrorKind::Required { property } => {
            let name = property.as_str().map_or_else(|| property.to_string(), str::to_string);
            Some(format!("Add required property \"{name}\""))
        }
        ValidationErrorKind::Type { kind } => {
            let expected = match kind {
                TypeKind::Single(single) => single.to_string(),
                TypeKind::Multiple(_) => "one of the allowed types".to_string(),
            };
            let at = if path == "/" { "root" } else { path };
            Some(format!("Change value at {at} to type {expected}"))
        }
        ValidationErrorKind::Enum { options } => Some(format!("Use one of: {options}")),
        _ => None,
    }
}
