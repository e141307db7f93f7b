//! Request Types
//!
//! Declarative, self-documenting request types for web handlers.
//!
//! ## Features
//!
//! - **Type Definitions**: String, Integer, Number, Boolean, Enum, Object and
//!   Array kinds with constraints, examples and descriptions
//! - **Coercion**: untyped query/form strings are parsed in a fixed priority
//!   order and validated into native JSON values
//! - **Aggregate Errors**: composite values report every failing field at once
//! - **Schema Documents**: YAML/JSON schemas with `$ref` resolution across
//!   files, cycle detection, and Draft 4 validation
//! - **Request Parameters**: coerce whole query strings and JSON bodies
//!   against a parameter descriptor
//!
//! ## Layout
//!
//! ```text
//! parsers   untyped string → JSON value
//! types     definitions, kinds, validation errors
//! schema    documents, $ref resolution, reference graph, store
//! params    request parameter descriptors and coercion
//! config    request-types.toml / REQUEST_TYPES__* settings
//! ```

pub mod config;
pub mod error;
pub mod params;
pub mod parsers;
pub mod schema;
pub mod types;

pub use config::TypesConfig;
pub use error::{Error, Result};
pub use params::{coerce_json_body, coerce_query_params, validate_response, RequestParam, RequestParams};
pub use parsers::{parse_json, parse_value, JsonKind};
pub use schema::{RefResolver, ReferenceGraph, Schema, SchemaStore};
pub use types::{
    CustomParser, ErrorDetail, ErrorKey, Kind, TypeBuilder, TypeDefinition, TypeSystemError,
    Validated,
};
