//! Type Definitions
//!
//! Declarative, immutable descriptions of request values. A [`TypeDefinition`]
//! pairs a description with one [`Kind`] and its constraints. Validating a raw
//! value through a definition either coerces it into the kind's native JSON
//! representation or fails with a [`TypeSystemError`].
//!
//! Definitions are built with a [`TypeBuilder`]:
//!
//! ```
//! use request_types::TypeDefinition;
//! use serde_json::json;
//!
//! let age = TypeDefinition::integer("Age of the user in years")
//!     .minimum(1)
//!     .maximum(120)
//!     .example(30)
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(age.validate(&json!("45")).unwrap(), json!(45));
//! assert_eq!(age.validate(&json!(200)).unwrap_err().code(), "maximum");
//! ```

pub mod array;
pub mod boolean;
pub mod enumeration;
pub mod error;
pub mod json_schema;
pub mod numeric;
pub mod object;
pub mod string;

pub use array::{ArrayType, Items};
pub use boolean::BooleanType;
pub use enumeration::EnumType;
pub use error::{ErrorDetail, ErrorKey, TypeSystemError};
pub use json_schema::JsonSchemaType;
pub use numeric::NumericType;
pub use object::ObjectType;
pub use string::{StringFormat, StringType};

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::parsers::{parse_value, JsonKind};

// =============================================================================
// Kind
// =============================================================================

/// Behaviour shared by every kind's constraint set
pub trait KindSpec: fmt::Debug + Send + Sync {
    /// Display name of the kind (`"String"`, `"Integer"`, ...)
    fn type_name(&self) -> &'static str;

    /// JSON kinds an untyped string may be parsed as before validation
    fn json_types(&self) -> Vec<JsonKind>;

    /// Validate `raw` and coerce it into the kind's native representation
    fn validate(&self, raw: &Value) -> std::result::Result<Value, TypeSystemError>;

    /// Example used when the definition does not declare one
    fn fallback_example(&self) -> Option<Value> {
        None
    }

    /// Definition-time consistency check of the constraints
    fn check(&self) -> std::result::Result<(), String> {
        Ok(())
    }

    fn into_kind(self) -> Kind
    where
        Self: Sized;
}

/// One of the fixed set of type categories, with its constraints
#[derive(Debug, Clone)]
pub enum Kind {
    String(StringType),
    Integer(NumericType),
    Number(NumericType),
    Boolean(BooleanType),
    Enum(EnumType),
    Object(ObjectType),
    Array(ArrayType),
    JsonSchema(Arc<JsonSchemaType>),
}

impl Kind {
    fn spec(&self) -> &dyn KindSpec {
        match self {
            Kind::String(t) => t,
            Kind::Integer(t) | Kind::Number(t) => t,
            Kind::Boolean(t) => t,
            Kind::Enum(t) => t,
            Kind::Object(t) => t,
            Kind::Array(t) => t,
            Kind::JsonSchema(t) => t.as_ref(),
        }
    }
}

// =============================================================================
// Custom Parser
// =============================================================================

/// Per-type override for turning an untyped string into a JSON value
#[derive(Clone)]
pub struct CustomParser(Arc<dyn Fn(&str) -> std::result::Result<Value, String> + Send + Sync>);

impl CustomParser {
    pub fn new<F>(parser: F) -> Self
    where
        F: Fn(&str) -> std::result::Result<Value, String> + Send + Sync + 'static,
    {
        Self(Arc::new(parser))
    }

    pub fn parse(&self, raw: &str) -> std::result::Result<Value, String> {
        (self.0)(raw)
    }
}

impl fmt::Debug for CustomParser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CustomParser(..)")
    }
}

// =============================================================================
// Type Definition
// =============================================================================

/// A named, immutable, parameterized kind
#[derive(Debug, Clone)]
pub struct TypeDefinition {
    description: String,
    example: Option<Value>,
    default: Option<Value>,
    param_name: Option<String>,
    parser: Option<CustomParser>,
    kind: Kind,
}

impl TypeDefinition {
    pub fn string(description: impl Into<String>) -> TypeBuilder<StringType> {
        TypeBuilder::new(description, StringType::default())
    }

    pub fn integer(description: impl Into<String>) -> TypeBuilder<NumericType> {
        TypeBuilder::new(description, NumericType::integer())
    }

    pub fn number(description: impl Into<String>) -> TypeBuilder<NumericType> {
        TypeBuilder::new(description, NumericType::number())
    }

    pub fn boolean(description: impl Into<String>) -> TypeBuilder<BooleanType> {
        TypeBuilder::new(description, BooleanType)
    }

    /// A string restricted to `values`; the first value is the default example
    pub fn enumeration<I, S>(description: impl Into<String>, values: I) -> TypeBuilder<EnumType>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        TypeBuilder::new(description, EnumType::new(values))
    }

    pub fn object(description: impl Into<String>) -> TypeBuilder<ObjectType> {
        TypeBuilder::new(description, ObjectType::default())
    }

    pub fn array(description: impl Into<String>) -> TypeBuilder<ArrayType> {
        TypeBuilder::new(description, ArrayType::default())
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn kind(&self) -> &Kind {
        &self.kind
    }

    pub fn type_name(&self) -> &'static str {
        self.kind.spec().type_name()
    }

    pub fn json_types(&self) -> Vec<JsonKind> {
        self.kind.spec().json_types()
    }

    /// Value used for a missing object property
    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// Alternate name the value is read from in requests
    pub fn param_name(&self) -> Option<&str> {
        self.param_name.as_deref()
    }

    pub fn parser(&self) -> Option<&CustomParser> {
        self.parser.as_ref()
    }

    /// Representative value for documentation
    pub fn example(&self) -> Option<Value> {
        self.example
            .clone()
            .or_else(|| self.kind.spec().fallback_example())
    }

    /// Validate `raw` and coerce it into the native representation
    pub fn validate(&self, raw: &Value) -> std::result::Result<Value, TypeSystemError> {
        self.kind.spec().validate(raw)
    }

    /// Validate `raw` and deserialize the coerced value into `T`
    pub fn validate_as<T: DeserializeOwned>(&self, raw: &Value) -> Result<Validated<T>> {
        let value = self.validate(raw)?;
        Ok(Validated {
            value: serde_json::from_value(value)?,
            type_name: self.type_name(),
            description: self.description.clone(),
        })
    }

    /// Turn an untyped string (query string, form value) into a JSON value.
    ///
    /// Uses the custom parser when one is declared, otherwise the fixed
    /// priority order of [`parse_value`] over [`TypeDefinition::json_types`].
    pub fn parse_untyped(&self, raw: &str, name: &str) -> Result<Value> {
        match &self.parser {
            Some(parser) => parser
                .parse(raw)
                .map_err(|reason| Error::Parse(format!("{name}: {reason}"))),
            None => parse_value(raw, &self.json_types(), name).map(|(_, value)| value),
        }
    }

    /// Parse an untyped string and validate the result
    pub fn parse_str(&self, raw: &str, name: &str) -> Result<Value> {
        let value = self.parse_untyped(raw, name)?;
        Ok(self.validate(&value)?)
    }

    pub(crate) fn from_kind(description: String, example: Option<Value>, kind: Kind) -> Self {
        Self {
            description,
            example,
            default: None,
            param_name: None,
            parser: None,
            kind,
        }
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Builder for a [`TypeDefinition`] of kind `K`
#[derive(Debug, Clone)]
pub struct TypeBuilder<K> {
    pub(crate) description: String,
    pub(crate) example: Option<Value>,
    pub(crate) default: Option<Value>,
    pub(crate) param_name: Option<String>,
    pub(crate) parser: Option<CustomParser>,
    pub(crate) kind: K,
    /// Problems found by setters, reported by `build`
    pub(crate) problems: Vec<String>,
}

impl<K: KindSpec> TypeBuilder<K> {
    fn new(description: impl Into<String>, kind: K) -> Self {
        Self {
            description: description.into(),
            example: None,
            default: None,
            param_name: None,
            parser: None,
            kind,
            problems: Vec::new(),
        }
    }

    pub fn example(mut self, example: impl Into<Value>) -> Self {
        self.example = Some(example.into());
        self
    }

    pub fn default_value(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn param_name(mut self, name: impl Into<String>) -> Self {
        self.param_name = Some(name.into());
        self
    }

    pub fn parser(mut self, parser: CustomParser) -> Self {
        self.parser = Some(parser);
        self
    }

    /// Check the definition and freeze it.
    ///
    /// Fails with [`Error::Config`] for a blank description, inconsistent
    /// constraints, or an example that does not validate to itself.
    pub fn build(self) -> Result<TypeDefinition> {
        if self.description.trim().is_empty() {
            return Err(Error::Config(format!(
                "{} type must define a description",
                self.kind.type_name()
            )));
        }
        if let Some(problem) = self.problems.into_iter().next() {
            return Err(Error::Config(problem));
        }
        self.kind.check().map_err(Error::Config)?;

        let definition = TypeDefinition {
            description: self.description,
            example: self.example,
            default: self.default,
            param_name: self.param_name,
            parser: self.parser,
            kind: self.kind.into_kind(),
        };

        if let Some(example) = &definition.example {
            match definition.validate(example) {
                Ok(coerced) if &coerced == example => {}
                Ok(coerced) => {
                    return Err(Error::Config(format!(
                        "example {example} of '{}' validates to a different value {coerced}",
                        definition.description
                    )))
                }
                Err(e) => {
                    return Err(Error::Config(format!(
                        "example {example} of '{}' does not validate: {e}",
                        definition.description
                    )))
                }
            }
        }

        Ok(definition)
    }
}

// =============================================================================
// Validated
// =============================================================================

/// A native value together with the definition that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct Validated<T> {
    value: T,
    type_name: &'static str,
    description: String,
}

impl<T> Validated<T> {
    pub fn into_inner(self) -> T {
        self.value
    }

    /// Kind of the definition the value was validated against
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Description of the definition the value was validated against
    pub fn description(&self) -> &str {
        &self.description
    }
}

impl<T> Deref for Validated<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_description_is_required() {
        let err = TypeDefinition::string("  ").build().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("must define a description"));
    }

    #[test]
    fn test_example_must_self_validate() {
        let err = TypeDefinition::integer("small")
            .maximum(10)
            .example(11)
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let err = TypeDefinition::string("trimmed").example(" padded ").build().unwrap_err();
        assert!(err.to_string().contains("different value"));
    }

    #[test]
    fn test_validate_as_wraps_provenance() {
        let name = TypeDefinition::string("A name").build().unwrap();
        let validated: Validated<String> = name.validate_as(&json!("  Ada ")).unwrap();
        assert_eq!(validated.as_str(), "Ada");
        assert_eq!(validated.type_name(), "String");
        assert_eq!(validated.description(), "A name");
        assert_eq!(validated.into_inner(), "Ada".to_string());
    }

    #[test]
    fn test_custom_parser_overrides_untyped_parsing() {
        let ids = TypeDefinition::array("Comma separated ids")
            .items(TypeDefinition::integer("id").build().unwrap())
            .parser(CustomParser::new(|raw| {
                raw.split(',')
                    .map(|part| part.trim().parse::<i64>().map(Value::from).map_err(|e| e.to_string()))
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map(Value::Array)
            }))
            .build()
            .unwrap();
        assert_eq!(ids.parse_str("1, 2,3", "ids").unwrap(), json!([1, 2, 3]));
        assert!(ids.parse_str("1,x", "ids").is_err());
    }

    #[test]
    fn test_parse_str_uses_priority_order() {
        let flag = TypeDefinition::boolean("flag").build().unwrap();
        assert_eq!(flag.parse_str("on", "flag").unwrap(), json!(true));
        assert_eq!(flag.parse_str("FALSE", "flag").unwrap(), json!(false));

        let limit = TypeDefinition::integer("limit").build().unwrap();
        let err = limit.parse_str("ten", "limit").unwrap_err();
        assert_eq!(err.to_string(), "limit must be a valid type (integer)");
    }
}
