//! Request Parameters
//!
//! A [`RequestParams`] descriptor lists the parameters a request handler
//! takes, each with a [`TypeDefinition`]. The coercion entry points turn raw
//! request data into typed values, attempting every parameter and reporting
//! all failures in one aggregate error.

use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::config::TypesConfig;
use crate::error::{Error, Result};
use crate::parsers::parse_json_fields;
use crate::types::error::ErrorAggregator;
use crate::types::{TypeDefinition, TypeSystemError};

const TYPE_NAME: &str = "RequestParams";

const REQUIRED_MESSAGE: &str = "This field is required.";

// =============================================================================
// Descriptor
// =============================================================================

/// One declared parameter
#[derive(Debug, Clone)]
pub struct RequestParam {
    pub name: String,
    pub definition: TypeDefinition,
    pub required: bool,
}

impl RequestParam {
    /// Key the value is read from: the external name when declared
    pub fn source_name(&self) -> &str {
        self.definition.param_name().unwrap_or(&self.name)
    }
}

/// Ordered parameter list of a request handler
#[derive(Debug, Clone, Default)]
pub struct RequestParams {
    params: Vec<RequestParam>,
}

impl RequestParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_required(self, name: impl Into<String>, definition: TypeDefinition) -> Self {
        self.with(name, definition, true)
    }

    pub fn with_optional(self, name: impl Into<String>, definition: TypeDefinition) -> Self {
        self.with(name, definition, false)
    }

    fn with(mut self, name: impl Into<String>, definition: TypeDefinition, required: bool) -> Self {
        let param = RequestParam {
            name: name.into(),
            definition,
            required,
        };
        match self.params.iter_mut().find(|p| p.name == param.name) {
            Some(existing) => *existing = param,
            None => self.params.push(param),
        }
        self
    }

    /// A revised descriptor with `extra` parameters added.
    ///
    /// A parameter already declared under the same name is replaced in place.
    /// `self` is left untouched.
    pub fn with_params<I>(&self, extra: I) -> Self
    where
        I: IntoIterator<Item = RequestParam>,
    {
        extra
            .into_iter()
            .fold(self.clone(), |params, p| params.with(p.name, p.definition, p.required))
    }

    pub fn params(&self) -> &[RequestParam] {
        &self.params
    }

    pub fn get(&self, name: &str) -> Option<&RequestParam> {
        self.params.iter().find(|p| p.name == name)
    }

    pub fn all(&self) -> Vec<&str> {
        self.params.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn required(&self) -> Vec<&str> {
        self.params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect()
    }

    pub fn optional(&self) -> Vec<&str> {
        self.params
            .iter()
            .filter(|p| !p.required)
            .map(|p| p.name.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

// =============================================================================
// Coercion
// =============================================================================

/// Coerce every declared parameter, looking raw values up with `lookup`
fn coerce<F>(params: &RequestParams, mut lookup: F) -> Result<Map<String, Value>>
where
    F: FnMut(&RequestParam) -> Option<Result<Value>>,
{
    let mut values = Map::new();
    let mut errors = ErrorAggregator::new();

    for param in params.params() {
        match lookup(param) {
            Some(Ok(value)) => {
                values.insert(param.name.clone(), value);
            }
            Some(Err(Error::Type(e))) => errors.record_error(param.name.as_str(), e),
            Some(Err(e)) => errors.record(param.name.as_str(), e.to_string()),
            None => {
                if let Some(default) = param.definition.default() {
                    values.insert(param.name.clone(), default.clone());
                } else if param.required {
                    errors.record(param.name.as_str(), REQUIRED_MESSAGE);
                }
            }
        }
    }

    errors.finish(TYPE_NAME).map_err(|e| {
        tracing::debug!(error = %e, "request parameters do not validate");
        Error::Type(e)
    })?;
    Ok(values)
}

/// Coerce untyped query-string or form values.
///
/// Each value is parsed through its definition (custom parser, or the
/// fixed-priority untyped parser) and validated. Values are returned in
/// declaration order, keyed by parameter name.
pub fn coerce_query_params(
    raw: &HashMap<String, String>,
    params: &RequestParams,
) -> Result<Map<String, Value>> {
    coerce(params, |param| {
        raw.get(param.source_name())
            .map(|text| param.definition.parse_str(text, &param.name))
    })
}

/// Coerce the parameters of a JSON request body.
///
/// External names are mapped to parameter names first; values are then
/// validated as they are, without untyped parsing.
pub fn coerce_json_body(body: &str, params: &RequestParams) -> Result<Map<String, Value>> {
    let fields = params
        .params()
        .iter()
        .map(|p| (p.name.as_str(), p.definition.param_name()));
    let Value::Object(document) = parse_json_fields(body, fields)? else {
        return Err(Error::Parse("Request body must be a JSON object".to_string()));
    };

    coerce(params, |param| {
        document
            .get(&param.name)
            .map(|value| param.definition.validate(value).map_err(Error::from))
    })
}

/// Validate a handler's response.
///
/// Failures are always logged. They are only returned when the configuration
/// asks for it; otherwise the response is passed through unchanged.
pub fn validate_response(
    definition: &TypeDefinition,
    response: &Value,
    config: &TypesConfig,
) -> Result<Value> {
    check_response(definition, response, config.raise_response_validation_errors())
}

fn check_response(definition: &TypeDefinition, response: &Value, raise: bool) -> Result<Value> {
    match definition.validate(response) {
        Ok(value) => Ok(value),
        Err(e) => {
            tracing::warn!(
                definition = definition.description(),
                %response,
                error = %e,
                "response does not validate"
            );
            if raise {
                Err(response_error(response, e))
            } else {
                Ok(response.clone())
            }
        }
    }
}

fn response_error(response: &Value, e: TypeSystemError) -> Error {
    Error::Type(TypeSystemError::new(
        e.type_name(),
        e.code(),
        format!("Response `{response}` does not validate: {}", e.detail()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn params() -> RequestParams {
        RequestParams::new()
            .with_required("age", TypeDefinition::integer("age").minimum(1).build().unwrap())
            .with_optional(
                "user_id",
                TypeDefinition::integer("user")
                    .param_name("user-id")
                    .build()
                    .unwrap(),
            )
            .with_optional(
                "limit",
                TypeDefinition::integer("limit").default_value(20).build().unwrap(),
            )
    }

    #[test]
    fn test_name_lists() {
        let p = params();
        assert_eq!(p.all(), vec!["age", "user_id", "limit"]);
        assert_eq!(p.required(), vec!["age"]);
        assert_eq!(p.optional(), vec!["user_id", "limit"]);
    }

    #[test]
    fn test_with_params_returns_revised_copy() {
        let p = params();
        let flag = RequestParam {
            name: "verbose".into(),
            definition: TypeDefinition::boolean("verbose").build().unwrap(),
            required: false,
        };
        let revised = p.with_params([flag]);
        assert_eq!(revised.len(), 4);
        assert_eq!(p.len(), 3);
        assert!(revised.get("verbose").is_some());
    }

    #[test]
    fn test_query_params_coerced_with_external_names() {
        let raw = HashMap::from([
            ("age".to_string(), "45".to_string()),
            ("user-id".to_string(), "7".to_string()),
        ]);
        let values = coerce_query_params(&raw, &params()).unwrap();
        assert_eq!(
            Value::Object(values),
            json!({"age": 45, "user_id": 7, "limit": 20})
        );
    }

    #[test]
    fn test_query_params_aggregate_every_failure() {
        let raw = HashMap::from([("user-id".to_string(), "x".to_string())]);
        let err = coerce_query_params(&raw, &params()).unwrap_err();
        let errors = err.field_errors().unwrap();
        assert_eq!(errors["age"], "This field is required.");
        assert_eq!(errors["user_id"], "user_id must be a valid type (integer)");
    }

    #[test]
    fn test_json_body() {
        let values = coerce_json_body(r#"{"age": 3, "user-id": 9, "other": 1}"#, &params()).unwrap();
        assert_eq!(
            Value::Object(values),
            json!({"age": 3, "user_id": 9, "limit": 20})
        );

        let err = coerce_json_body(r#"{"age": 0}"#, &params()).unwrap_err();
        assert_eq!(
            err.field_errors().unwrap()["age"],
            "Must be greater than or equal to 1."
        );
        assert!(matches!(coerce_json_body("[1]", &params()), Err(Error::Parse(_))));
    }

    #[test]
    fn test_lenient_response_check_passes_value_through() {
        let definition = TypeDefinition::integer("count").build().unwrap();
        assert_eq!(
            check_response(&definition, &json!("nope"), false).unwrap(),
            json!("nope")
        );
        assert_eq!(check_response(&definition, &json!("3"), false).unwrap(), json!(3));
        assert!(check_response(&definition, &json!("nope"), true).is_err());
    }

    #[test]
    fn test_response_validation_can_raise() {
        let definition = TypeDefinition::integer("count").build().unwrap();
        let mut config = TypesConfig::default();
        config.validation.raise_response_validation_errors = true;
        let err = validate_response(&definition, &json!("nope"), &config).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Response `\"nope\"` does not validate: Must be a valid number."
        );
    }
}
