//! Boolean kind

use serde_json::Value;

use super::error::{MessageTable, TypeSystemError};
use super::{Kind, KindSpec};
use crate::parsers::JsonKind;

const TYPE_NAME: &str = "Boolean";

const MESSAGES: MessageTable = &[("type", "Must be a valid boolean.")];

/// Boolean kind. Has no constraints of its own.
#[derive(Debug, Clone, Copy, Default)]
pub struct BooleanType;

/// Case-insensitive string forms accepted for booleans
fn from_str(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "true" | "on" | "1" => Some(true),
        "false" | "off" | "0" | "" => Some(false),
        _ => None,
    }
}

impl KindSpec for BooleanType {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    // `string` lets `on`/`off`/`1`/`0` reach the string table below
    fn json_types(&self) -> Vec<JsonKind> {
        vec![JsonKind::Boolean, JsonKind::String]
    }

    fn validate(&self, raw: &Value) -> Result<Value, TypeSystemError> {
        let value = match raw {
            Value::Bool(b) => Some(*b),
            Value::String(s) => from_str(s),
            Value::Number(n) => n.as_f64().map(|f| f != 0.0),
            Value::Null => Some(false),
            Value::Array(_) | Value::Object(_) => None,
        };
        value
            .map(Value::Bool)
            .ok_or_else(|| TypeSystemError::from_table(TYPE_NAME, MESSAGES, "type", &[]))
    }

    fn into_kind(self) -> Kind {
        Kind::Boolean(self)
    }
}
