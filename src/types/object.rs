//! Object kind
//!
//! Declared properties are coerced one by one in declaration order. Failures
//! are collected per key and raised once all properties were attempted.

use indexmap::IndexMap;
use serde_json::{Map, Value};

use super::error::{ErrorAggregator, MessageTable, TypeSystemError};
use super::{Kind, KindSpec, TypeBuilder, TypeDefinition};
use crate::parsers::JsonKind;

const TYPE_NAME: &str = "Object";

const MESSAGES: MessageTable = &[
    ("type", "Must be an object."),
    ("required", "This field is required."),
    (
        "additional_properties",
        "Additional properties are not allowed ({key} is not one of {properties}).",
    ),
    (
        "no_properties",
        "Additional properties are not allowed ({key} was unexpected).",
    ),
];

/// Constraints of an Object definition
#[derive(Debug, Clone)]
pub struct ObjectType {
    properties: IndexMap<String, TypeDefinition>,
    required: Vec<String>,
    additional_properties: bool,
}

impl Default for ObjectType {
    fn default() -> Self {
        Self {
            properties: IndexMap::new(),
            required: Vec::new(),
            additional_properties: true,
        }
    }
}

impl ObjectType {
    pub fn properties(&self) -> &IndexMap<String, TypeDefinition> {
        &self.properties
    }

    pub fn required(&self) -> &[String] {
        &self.required
    }

    pub fn additional_properties(&self) -> bool {
        self.additional_properties
    }

    fn is_required(&self, name: &str) -> bool {
        self.required.iter().any(|r| r == name)
    }

    fn additional_property_message(&self, key: &str) -> String {
        let code = if self.properties.is_empty() {
            "no_properties"
        } else {
            "additional_properties"
        };
        let properties = self
            .properties
            .keys()
            .map(|p| format!("'{p}'"))
            .collect::<Vec<_>>()
            .join(", ");
        TypeSystemError::from_table(
            TYPE_NAME,
            MESSAGES,
            code,
            &[("key", format!("'{key}'")), ("properties", properties)],
        )
        .message()
    }
}

impl KindSpec for ObjectType {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn json_types(&self) -> Vec<JsonKind> {
        vec![JsonKind::Object, JsonKind::String]
    }

    fn validate(&self, raw: &Value) -> Result<Value, TypeSystemError> {
        let Value::Object(input) = raw else {
            return Err(TypeSystemError::from_table(TYPE_NAME, MESSAGES, "type", &[]));
        };

        let mut output = Map::with_capacity(input.len());
        let mut errors = ErrorAggregator::new();

        for (name, definition) in &self.properties {
            match input.get(name) {
                Some(item) => match definition.validate(item) {
                    Ok(coerced) => {
                        output.insert(name.clone(), coerced);
                    }
                    Err(e) => errors.record_error(name.as_str(), e),
                },
                None => {
                    if let Some(default) = definition.default() {
                        output.insert(name.clone(), default.clone());
                    } else if self.is_required(name) {
                        let e = TypeSystemError::from_table(TYPE_NAME, MESSAGES, "required", &[]);
                        errors.record_error(name.as_str(), e);
                    }
                }
            }
        }

        for (key, value) in input {
            if self.properties.contains_key(key) {
                continue;
            }
            if self.additional_properties {
                output.insert(key.clone(), value.clone());
            } else {
                errors.record(key.as_str(), self.additional_property_message(key));
            }
        }

        errors.finish(TYPE_NAME)?;
        Ok(Value::Object(output))
    }

    fn fallback_example(&self) -> Option<Value> {
        let example: Map<String, Value> = self
            .properties
            .iter()
            .filter_map(|(name, definition)| definition.example().map(|e| (name.clone(), e)))
            .collect();
        if example.is_empty() {
            None
        } else {
            Some(Value::Object(example))
        }
    }

    fn check(&self) -> Result<(), String> {
        match self.required.iter().find(|r| !self.properties.contains_key(*r)) {
            Some(missing) => Err(format!("required property '{missing}' is not declared")),
            None => Ok(()),
        }
    }

    fn into_kind(self) -> Kind {
        Kind::Object(self)
    }
}

impl TypeBuilder<ObjectType> {
    pub fn property(mut self, name: impl Into<String>, definition: TypeDefinition) -> Self {
        self.kind.properties.insert(name.into(), definition);
        self
    }

    pub fn required<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.kind.required.extend(names.into_iter().map(Into::into));
        self
    }

    /// Whether keys outside `properties` are copied through (the default)
    /// or reported as errors
    pub fn additional_properties(mut self, allowed: bool) -> Self {
        self.kind.additional_properties = allowed;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::super::ErrorKey;
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn integer(description: &str) -> TypeDefinition {
        TypeDefinition::integer(description).build().unwrap()
    }

    #[test]
    fn test_required_property_missing() {
        let foo = TypeDefinition::object("foo")
            .property("bar", integer("bar"))
            .required(["bar"])
            .build()
            .unwrap();
        let err = foo.validate(&json!({})).unwrap_err();
        assert_eq!(err.code(), "invalid");
        assert_eq!(
            serde_json::to_value(err.detail()).unwrap(),
            json!({"bar": "This field is required."})
        );
    }

    #[test]
    fn test_properties_are_coerced() {
        let foo = TypeDefinition::object("foo")
            .property("bar", integer("bar"))
            .property("name", TypeDefinition::string("name").build().unwrap())
            .build()
            .unwrap();
        assert_eq!(
            foo.validate(&json!({"bar": "3", "name": " n ", "extra": [1]})).unwrap(),
            json!({"bar": 3, "name": "n", "extra": [1]})
        );
    }

    #[test]
    fn test_default_fills_missing_property() {
        let foo = TypeDefinition::object("foo")
            .property(
                "limit",
                TypeDefinition::integer("limit").default_value(10).build().unwrap(),
            )
            .required(["limit"])
            .build()
            .unwrap();
        assert_eq!(foo.validate(&json!({})).unwrap(), json!({"limit": 10}));
    }

    #[test]
    fn test_errors_are_aggregated_in_declaration_order() {
        let foo = TypeDefinition::object("foo")
            .property("a", integer("a"))
            .property("b", integer("b"))
            .property("c", integer("c"))
            .required(["c"])
            .build()
            .unwrap();
        let err = foo.validate(&json!({"b": "x", "a": "y"})).unwrap_err();
        let keys: Vec<String> = err.errors().unwrap().keys().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_additional_properties_not_allowed() {
        let foo = TypeDefinition::object("foo")
            .property("name", TypeDefinition::string("name").build().unwrap())
            .property("id", integer("id"))
            .additional_properties(false)
            .build()
            .unwrap();
        let err = foo
            .validate(&json!({"name": "x", "cat": 1, "dog": 2}))
            .unwrap_err();
        let errors = err.errors().unwrap();
        assert_eq!(errors.len(), 2);
        assert_eq!(
            errors.get(&ErrorKey::from("cat")).unwrap().to_string(),
            "Additional properties are not allowed ('cat' is not one of 'name', 'id')."
        );
        assert!(errors.contains_key(&ErrorKey::from("dog")));
    }

    #[test]
    fn test_additional_properties_without_declared_properties() {
        let empty = TypeDefinition::object("empty")
            .additional_properties(false)
            .build()
            .unwrap();
        assert_eq!(empty.validate(&json!({})).unwrap(), json!({}));
        let err = empty.validate(&json!({"x": 1})).unwrap_err();
        assert_eq!(
            err.errors().unwrap().get(&ErrorKey::from("x")).unwrap().to_string(),
            "Additional properties are not allowed ('x' was unexpected)."
        );
    }

    #[test]
    fn test_not_an_object() {
        let foo = TypeDefinition::object("foo").build().unwrap();
        let err = foo.validate(&json!([1])).unwrap_err();
        assert_eq!(err.code(), "type");
        assert_eq!(err.message(), "Must be an object.");
    }

    #[test]
    fn test_required_must_be_declared() {
        let err = TypeDefinition::object("foo").required(["ghost"]).build().unwrap_err();
        assert!(err.to_string().contains("'ghost'"));
    }

    #[test]
    fn test_example_built_from_properties() {
        let foo = TypeDefinition::object("foo")
            .property("id", TypeDefinition::integer("id").example(1).build().unwrap())
            .property(
                "color",
                TypeDefinition::enumeration("color", ["red", "blue"]).build().unwrap(),
            )
            .build()
            .unwrap();
        assert_eq!(foo.example(), Some(json!({"id": 1, "color": "red"})));
    }
}
