//! Schema-backed kind
//!
//! A [`JsonSchemaType`] takes its constraints from one definition of a schema
//! document. Values are validated by wrapping them in a request-shaped
//! schema for that single definition.

use indexmap::IndexMap;
use jsonschema::JSONSchema;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

use super::error::{ErrorDetail, ErrorKey, TypeSystemError};
use super::{Kind, KindSpec, TypeDefinition};
use crate::error::{Error, Result};
use crate::parsers::JsonKind;
use crate::schema::{pointer_segments, Schema, OTHER_KEY};

const TYPE_NAME: &str = "JsonSchema";

pub struct JsonSchemaType {
    schema: Arc<Schema>,
    definition_key: String,
    request_schema: Value,
    validator: JSONSchema,
    json_types: Vec<JsonKind>,
}

impl fmt::Debug for JsonSchemaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonSchemaType")
            .field("definition_key", &self.definition_key)
            .field("schema_dir", &self.schema.schema_dir())
            .field("json_types", &self.json_types)
            .finish_non_exhaustive()
    }
}

impl JsonSchemaType {
    /// Build a definition for `definitions/<key>` of `schema`.
    ///
    /// The description, example and untyped-parsing kinds come from the
    /// definition, after following it when it is a reference.
    pub fn definition(schema: Arc<Schema>, key: &str) -> Result<TypeDefinition> {
        let request_schema = schema.request_schema(&[key], &[key])?;
        if request_schema["definitions"].get(key).is_none() {
            return Err(Error::Config(format!(
                "Definition `{key}` is not defined in the schema."
            )));
        }

        let pointer = key.replace('~', "~0").replace('/', "~1");
        let resolved = schema.resolve(&format!("#/definitions/{pointer}"))?;
        let description = resolved
            .get("description")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::Config(format!("Definition `{key}` is missing a description.")))?
            .to_string();

        let mut json_types = resolved
            .get("type")
            .map(JsonKind::from_schema_type)
            .unwrap_or_default();
        if json_types.is_empty() {
            json_types.push(JsonKind::String);
        }
        let example = resolved.get("example").cloned();

        let validator = schema.validator(Some(&request_schema))?;
        let kind = Self {
            schema,
            definition_key: key.to_string(),
            request_schema,
            validator,
            json_types,
        };

        if let Some(example) = &example {
            kind.validate(example).map_err(|e| {
                Error::Config(format!("example {example} of `{key}` does not validate: {e}"))
            })?;
        }

        tracing::debug!(definition = key, "built schema-backed type");
        Ok(TypeDefinition::from_kind(description, example, kind.into_kind()))
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn definition_key(&self) -> &str {
        &self.definition_key
    }

    /// Schema values are validated against: `{key: <definition>}`
    pub fn request_schema(&self) -> &Value {
        &self.request_schema
    }
}

impl KindSpec for JsonSchemaType {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn json_types(&self) -> Vec<JsonKind> {
        self.json_types.clone()
    }

    fn validate(&self, raw: &Value) -> std::result::Result<Value, TypeSystemError> {
        let mut wrapped = Map::new();
        wrapped.insert(self.definition_key.clone(), raw.clone());
        let instance = Value::Object(wrapped);

        let mut violations: Vec<(Vec<String>, String)> = match self.validator.validate(&instance) {
            Ok(()) => return Ok(raw.clone()),
            Err(errors) => errors
                .map(|e| (pointer_segments(&e.instance_path.to_string()), e.to_string()))
                .collect(),
        };

        let message = violations
            .first()
            .map(|(_, message)| message.clone())
            .unwrap_or_default();
        if violations.iter().all(|(path, _)| path.len() < 2) {
            return Err(TypeSystemError::new(TYPE_NAME, "schema", message));
        }

        violations.sort();
        let mut fields: IndexMap<ErrorKey, ErrorDetail> = IndexMap::new();
        for (path, message) in violations {
            let key = path.get(1).cloned().unwrap_or_else(|| OTHER_KEY.to_string());
            fields.insert(ErrorKey::Field(key), ErrorDetail::Message(message));
        }
        Err(TypeSystemError::with_fields(TYPE_NAME, "schema", fields))
    }

    fn into_kind(self) -> Kind {
        Kind::JsonSchema(Arc::new(self))
    }
}
