//! Enum kind: a string restricted to an ordered list of values

use serde_json::Value;

use super::error::{MessageTable, TypeSystemError};
use super::{Kind, KindSpec};
use crate::parsers::JsonKind;

const TYPE_NAME: &str = "Enum";

const MESSAGES: MessageTable = &[("invalid", "Must be a valid choice.")];

#[derive(Debug, Clone, Default)]
pub struct EnumType {
    values: Vec<String>,
}

impl EnumType {
    pub fn new<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Allowed values, in declaration order
    pub fn values(&self) -> &[String] {
        &self.values
    }
}

impl KindSpec for EnumType {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn json_types(&self) -> Vec<JsonKind> {
        vec![JsonKind::String]
    }

    fn validate(&self, raw: &Value) -> Result<Value, TypeSystemError> {
        match raw {
            Value::String(s) if self.values.iter().any(|v| v == s) => Ok(raw.clone()),
            _ => Err(TypeSystemError::from_table(TYPE_NAME, MESSAGES, "invalid", &[])),
        }
    }

    fn fallback_example(&self) -> Option<Value> {
        self.values.first().cloned().map(Value::String)
    }

    fn check(&self) -> Result<(), String> {
        if self.values.is_empty() {
            return Err("enum must declare at least one value".to_string());
        }
        Ok(())
    }

    fn into_kind(self) -> Kind {
        Kind::Enum(self)
    }
}
