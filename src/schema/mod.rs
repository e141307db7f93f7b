//! Schema Documents
//!
//! A [`Schema`] is a loaded schema document (JSON or YAML) with a top-level
//! `definitions` mapping. It resolves references through its [`RefResolver`],
//! builds request-shaped schemas for a set of definitions, and validates
//! documents with a Draft 4 validator.

pub mod graph;
pub mod resolver;
pub mod store;

pub use graph::{ReferenceCycle, ReferenceGraph};
pub use resolver::{RefResolver, ResolutionScope};
pub use store::SchemaStore;

use indexmap::IndexMap;
use jsonschema::{Draft, JSONSchema};
use serde_json::{json, Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use url::Url;

use crate::error::{Error, Result};
use crate::parsers::parse_json;

/// Key used for violations of the document root
pub const OTHER_KEY: &str = "_other";

/// A loaded schema document
#[derive(Debug, Clone)]
pub struct Schema {
    document: Arc<Value>,
    schema_dir: Option<PathBuf>,
    resolver: RefResolver,
}

impl Schema {
    /// Wrap a document. Relative references resolve against `schema_dir`,
    /// or the filesystem root when there is none.
    pub fn new(document: Value, schema_dir: Option<&Path>) -> Result<Self> {
        let base_uri = match schema_dir {
            Some(dir) => Url::from_directory_path(dir).map_err(|()| {
                Error::Schema(format!("Schema directory must be absolute: {}", dir.display()))
            })?,
            None => Url::parse("file:///")
                .map_err(|e| Error::Schema(format!("Invalid base URI: {e}")))?,
        };
        let document = Arc::new(document);
        Ok(Self {
            resolver: RefResolver::new(base_uri, Arc::clone(&document)),
            document,
            schema_dir: schema_dir.map(Path::to_path_buf),
        })
    }

    /// Load a YAML or JSON schema file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let loading_error = |reason: String| {
            tracing::error!(path = %path.display(), %reason, "error loading schema file");
            Error::SchemaLoading {
                path: path.display().to_string(),
                reason,
            }
        };

        let path = fs::canonicalize(path).map_err(|e| loading_error(e.to_string()))?;
        let text = fs::read_to_string(&path).map_err(|e| loading_error(e.to_string()))?;
        let document: Value = serde_yaml::from_str(&text).map_err(|e| loading_error(e.to_string()))?;

        tracing::debug!(path = %path.display(), "loaded schema file");
        Self::new(document, path.parent())
    }

    /// Turn caching of documents loaded while resolving on or off
    pub fn with_document_cache(mut self, enabled: bool) -> Self {
        if !enabled {
            self.resolver = self.resolver.without_cache();
        }
        self
    }

    pub fn document(&self) -> &Value {
        &self.document
    }

    pub fn schema_dir(&self) -> Option<&Path> {
        self.schema_dir.as_deref()
    }

    pub fn resolver(&self) -> &RefResolver {
        &self.resolver
    }

    /// Names of the top-level definitions, in document order
    pub fn definition_names(&self) -> Vec<String> {
        self.document
            .get("definitions")
            .and_then(Value::as_object)
            .map(|defs| defs.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Resolve a reference within the schema, following `$ref` chains
    pub fn resolve(&self, reference: &str) -> Result<Value> {
        self.resolver.resolve(reference, None).map(|(_, node)| node)
    }

    /// Resolve the fragment of `reference` within `document`
    pub fn resolve_in(&self, reference: &str, document: &Value) -> Result<Value> {
        self.resolver
            .resolve(reference, Some(document))
            .map(|(_, node)| node)
    }

    /// Build an object schema whose properties are the named definitions.
    ///
    /// Every property is a `$ref` to `#/definitions/<name>` and the
    /// definitions of this document are embedded, so the result validates on
    /// its own.
    pub fn request_schema(&self, params: &[&str], required: &[&str]) -> Result<Value> {
        let definitions = self.resolve("#/definitions")?;
        let properties: Map<String, Value> = params
            .iter()
            .map(|name| {
                let pointer = name.replace('~', "~0").replace('/', "~1");
                (name.to_string(), json!({"$ref": format!("#/definitions/{pointer}")}))
            })
            .collect();

        Ok(json!({
            "additionalProperties": true,
            "definitions": definitions,
            "properties": properties,
            "required": required,
            "type": "object",
        }))
    }

    /// Compile a Draft 4 validator for `schema`, or for the whole document.
    ///
    /// References to other files are loaded through this schema's resolver.
    pub fn validator(&self, schema: Option<&Value>) -> Result<JSONSchema> {
        let schema = schema.unwrap_or(&self.document);
        JSONSchema::options()
            .with_draft(Draft::Draft4)
            .with_resolver(self.resolver.clone())
            .compile(schema)
            .map_err(|e| Error::Schema(format!("Invalid schema: {e}")))
    }

    /// Validate `value`, reporting every violation.
    ///
    /// Violations are keyed by the first segment of their instance path
    /// (`_other` for the root). The error message is the first violation.
    pub fn validate(&self, value: &Value, validator: &JSONSchema) -> Result<()> {
        let violations: Vec<(String, String)> = match validator.validate(value) {
            Ok(()) => return Ok(()),
            Err(errors) => errors
                .map(|e| (e.instance_path.to_string(), e.to_string()))
                .collect(),
        };

        let message = violations
            .first()
            .map(|(_, message)| message.clone())
            .unwrap_or_default();
        tracing::debug!(%message, count = violations.len(), "schema validation failed");

        let mut sorted = violations;
        sorted.sort_by(|a, b| a.0.cmp(&b.0));
        let mut errors = IndexMap::new();
        for (path, message) in sorted {
            let key = pointer_segments(&path)
                .into_iter()
                .next()
                .unwrap_or_else(|| OTHER_KEY.to_string());
            errors.insert(key, message);
        }

        Err(Error::SchemaValidation { message, errors })
    }

    /// Parse `json` and validate it
    pub fn validate_json(&self, json: &str, validator: &JSONSchema) -> Result<Value> {
        let value = parse_json(json)?;
        self.validate(&value, validator)?;
        Ok(value)
    }
}

/// Unescaped segments of a JSON pointer (`/a/0` → `["a", "0"]`)
pub(crate) fn pointer_segments(pointer: &str) -> Vec<String> {
    pointer
        .split('/')
        .skip(1)
        .map(|part| part.replace("~1", "/").replace("~0", "~"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn schema() -> Schema {
        Schema::new(
            json!({
                "definitions": {
                    "name": {"type": "string", "description": "A name", "maxLength": 5},
                    "age": {"type": "integer", "description": "An age", "minimum": 0},
                    "alias": {"$ref": "#/definitions/name"},
                }
            }),
            None,
        )
        .unwrap()
    }

    #[test]
    fn test_request_schema_shape() {
        let s = schema();
        let request = s.request_schema(&["name", "age"], &["name"]).unwrap();
        assert_eq!(request["type"], json!("object"));
        assert_eq!(request["additionalProperties"], json!(true));
        assert_eq!(request["required"], json!(["name"]));
        assert_eq!(
            request["properties"]["age"],
            json!({"$ref": "#/definitions/age"})
        );
        assert_eq!(request["definitions"]["alias"], json!({"$ref": "#/definitions/name"}));
    }

    #[test]
    fn test_validate_collects_all_violations() {
        let s = schema();
        let request = s.request_schema(&["name", "age"], &["name", "age"]).unwrap();
        let validator = s.validator(Some(&request)).unwrap();

        assert!(s.validate(&json!({"name": "bob", "age": 3}), &validator).is_ok());

        let err = s
            .validate(&json!({"name": "toolong", "age": -1}), &validator)
            .unwrap_err();
        let errors = err.field_errors().unwrap();
        assert_eq!(errors.keys().collect::<Vec<_>>(), vec!["age", "name"]);

        let err = s.validate(&json!({"name": "bob"}), &validator).unwrap_err();
        let errors = err.field_errors().unwrap();
        assert!(errors.contains_key(OTHER_KEY));
    }

    #[test]
    fn test_validate_json_parse_error() {
        let s = schema();
        let validator = s.validator(None).unwrap();
        let err = s.validate_json("{not json", &validator).unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
        assert_eq!(s.validate_json("{}", &validator).unwrap(), json!({}));
    }

    #[test]
    fn test_resolve_alias() {
        assert_eq!(
            schema().resolve("#/definitions/alias").unwrap()["description"],
            json!("A name")
        );
    }

    #[test]
    fn test_definition_names() {
        assert_eq!(schema().definition_names(), vec!["name", "age", "alias"]);
    }

    #[test]
    fn test_pointer_segments() {
        assert_eq!(pointer_segments(""), Vec::<String>::new());
        assert_eq!(pointer_segments("/a~1b/0"), vec!["a/b", "0"]);
    }
}
