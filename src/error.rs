//! Error types for type validation and schema resolution

use indexmap::IndexMap;
use thiserror::Error;

use crate::types::TypeSystemError;

/// Result type for request-types operations
pub type Result<T> = std::result::Result<T, Error>;

/// Crate-wide errors
#[derive(Error, Debug)]
pub enum Error {
    /// A type definition is malformed (missing description, bad pattern, ...).
    /// Raised when the definition is built, never while validating.
    #[error("Invalid type definition: {0}")]
    Config(String),

    /// A raw string could not be interpreted as any allowed kind, or JSON text is malformed
    #[error("{0}")]
    Parse(String),

    /// A value failed a type constraint, or a composite value failed one or more fields
    #[error(transparent)]
    Type(#[from] TypeSystemError),

    /// A `$ref` could not be resolved or forms a cycle
    #[error("{0}")]
    Schema(String),

    #[error("Error loading schema file {path}: {reason}")]
    SchemaLoading { path: String, reason: String },

    /// A document failed validation against a schema
    #[error("{message}")]
    SchemaValidation {
        message: String,
        /// First instance-path segment -> violation message
        errors: IndexMap<String, String>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Per-field messages, when the failure came from aggregate validation
    pub fn field_errors(&self) -> Option<IndexMap<String, String>> {
        match self {
            Error::Type(e) => e.errors().map(|fields| {
                fields
                    .iter()
                    .map(|(key, detail)| (key.to_string(), detail.to_string()))
                    .collect()
            }),
            Error::SchemaValidation { errors, .. } => Some(errors.clone()),
            _ => None,
        }
    }
}
