//! Validation errors
//!
//! A [`TypeSystemError`] mirrors the shape of the value that failed: scalar
//! failures carry a single message, Object and Array failures carry one
//! [`ErrorDetail`] per failing field or index.

use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use std::fmt;
use thiserror::Error;

/// Message templates of a kind: `(code, template)`.
/// Templates may reference constraints as `{name}`.
pub(crate) type MessageTable = &'static [(&'static str, &'static str)];

/// Code used for failures that aggregate per-field errors
pub const AGGREGATE_CODE: &str = "invalid";

// =============================================================================
// Error Key
// =============================================================================

/// Location of a failure inside a composite value
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ErrorKey {
    /// An object property
    Field(String),
    /// An array position
    Index(usize),
}

impl fmt::Display for ErrorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKey::Field(name) => f.write_str(name),
            ErrorKey::Index(i) => write!(f, "{i}"),
        }
    }
}

impl Serialize for ErrorKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl From<&str> for ErrorKey {
    fn from(s: &str) -> Self {
        ErrorKey::Field(s.to_string())
    }
}

impl From<String> for ErrorKey {
    fn from(s: String) -> Self {
        ErrorKey::Field(s)
    }
}

impl From<usize> for ErrorKey {
    fn from(i: usize) -> Self {
        ErrorKey::Index(i)
    }
}

// =============================================================================
// Error Detail
// =============================================================================

/// Error tree: a leaf message or a mapping of field/index to nested detail
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ErrorDetail {
    Message(String),
    Fields(IndexMap<ErrorKey, ErrorDetail>),
}

impl ErrorDetail {
    /// Look up the detail recorded for one field or index
    pub fn get(&self, key: impl Into<ErrorKey>) -> Option<&ErrorDetail> {
        match self {
            ErrorDetail::Message(_) => None,
            ErrorDetail::Fields(fields) => fields.get(&key.into()),
        }
    }
}

impl fmt::Display for ErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorDetail::Message(message) => f.write_str(message),
            ErrorDetail::Fields(_) => {
                let rendered = serde_json::to_string(self).map_err(|_| fmt::Error)?;
                f.write_str(&rendered)
            }
        }
    }
}

impl From<&str> for ErrorDetail {
    fn from(s: &str) -> Self {
        ErrorDetail::Message(s.to_string())
    }
}

impl From<String> for ErrorDetail {
    fn from(s: String) -> Self {
        ErrorDetail::Message(s)
    }
}

// =============================================================================
// Type System Error
// =============================================================================

/// A value failed to validate against a type definition
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[error("{detail}")]
pub struct TypeSystemError {
    /// Kind that rejected the value (`"String"`, `"Object"`, ...)
    type_name: &'static str,
    /// Machine-readable code (`"maximum"`, `"required"`, ...)
    code: &'static str,
    detail: ErrorDetail,
}

impl TypeSystemError {
    pub fn new(type_name: &'static str, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            type_name,
            code,
            detail: ErrorDetail::Message(message.into()),
        }
    }

    /// Build an error from a kind's message table, interpolating `params`
    pub(crate) fn from_table(
        type_name: &'static str,
        table: MessageTable,
        code: &'static str,
        params: &[(&str, String)],
    ) -> Self {
        let template = table
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, t)| *t)
            .unwrap_or("Invalid value.");
        Self::new(type_name, code, render(template, params))
    }

    /// Build an aggregate error from per-field details
    pub fn aggregate(type_name: &'static str, errors: IndexMap<ErrorKey, ErrorDetail>) -> Self {
        Self::with_fields(type_name, AGGREGATE_CODE, errors)
    }

    pub fn with_fields(
        type_name: &'static str,
        code: &'static str,
        errors: IndexMap<ErrorKey, ErrorDetail>,
    ) -> Self {
        Self {
            type_name,
            code,
            detail: ErrorDetail::Fields(errors),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn code(&self) -> &'static str {
        self.code
    }

    pub fn detail(&self) -> &ErrorDetail {
        &self.detail
    }

    /// Single human-readable message
    pub fn message(&self) -> String {
        self.detail.to_string()
    }

    /// Per-field mapping, when the failure came from Object/Array aggregation
    pub fn errors(&self) -> Option<&IndexMap<ErrorKey, ErrorDetail>> {
        match &self.detail {
            ErrorDetail::Fields(fields) => Some(fields),
            ErrorDetail::Message(_) => None,
        }
    }

    pub fn into_detail(self) -> ErrorDetail {
        self.detail
    }
}

// =============================================================================
// Aggregation
// =============================================================================

/// Collects per-field failures of a composite value.
///
/// Every field is attempted first; [`ErrorAggregator::finish`] then raises a
/// single error carrying all of them, in the order they were recorded.
#[derive(Debug, Default)]
pub(crate) struct ErrorAggregator {
    errors: IndexMap<ErrorKey, ErrorDetail>,
}

impl ErrorAggregator {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(&mut self, key: impl Into<ErrorKey>, detail: impl Into<ErrorDetail>) {
        self.errors.insert(key.into(), detail.into());
    }

    pub(crate) fn record_error(&mut self, key: impl Into<ErrorKey>, error: TypeSystemError) {
        self.errors.insert(key.into(), error.into_detail());
    }

    pub(crate) fn finish(self, type_name: &'static str) -> Result<(), TypeSystemError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(TypeSystemError::aggregate(type_name, self.errors))
        }
    }
}

/// Replace `{name}` placeholders in a message template
pub(crate) fn render(template: &str, params: &[(&str, String)]) -> String {
    params.iter().fold(template.to_string(), |message, (name, value)| {
        message.replace(&format!("{{{name}}}"), value)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: MessageTable = &[("maximum", "Must be less than or equal to {maximum}.")];

    #[test]
    fn test_render_template() {
        let err = TypeSystemError::from_table("Integer", TABLE, "maximum", &[("maximum", "120".into())]);
        assert_eq!(err.code(), "maximum");
        assert_eq!(err.message(), "Must be less than or equal to 120.");
        assert!(err.errors().is_none());
    }

    #[test]
    fn test_aggregate_renders_as_mapping() {
        let mut agg = ErrorAggregator::new();
        agg.record(1usize, "Must have no more than 1 characters.");
        let err = agg.finish("Array").unwrap_err();
        assert_eq!(err.code(), AGGREGATE_CODE);
        assert_eq!(err.to_string(), r#"{"1":"Must have no more than 1 characters."}"#);
        assert_eq!(
            err.detail().get(1usize),
            Some(&ErrorDetail::from("Must have no more than 1 characters."))
        );
    }

    #[test]
    fn test_empty_aggregate_is_ok() {
        assert!(ErrorAggregator::new().finish("Object").is_ok());
    }

    #[test]
    fn test_nested_detail_serializes() {
        let mut inner = ErrorAggregator::new();
        inner.record("name", "This field is required.");
        let inner = inner.finish("Object").unwrap_err();

        let mut outer = ErrorAggregator::new();
        outer.record_error(0usize, inner);
        let err = outer.finish("Array").unwrap_err();
        assert_eq!(
            serde_json::to_value(err.detail()).unwrap(),
            serde_json::json!({"0": {"name": "This field is required."}})
        );
    }
}
