//! Untyped Value Parsing
//!
//! Converts untyped parameter strings (query strings, form values) into JSON
//! values. A string can often be read as several kinds at once (`"1"` is a
//! boolean-looking, integer, number and string value), so kinds are always
//! attempted in a fixed priority order, least ambiguous first:
//!
//! `null` → `boolean` → `integer` → `number` → `array` → `object` → `string`
//!
//! The order in which a caller lists the allowed kinds never matters.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

// =============================================================================
// JSON Kinds
// =============================================================================

/// Primitive JSON kind a raw string may be parsed as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JsonKind {
    Null,
    Boolean,
    Integer,
    Number,
    Array,
    Object,
    String,
}

impl JsonKind {
    /// Disambiguation order used by [`parse_value`]
    pub const PRIORITY: [JsonKind; 7] = [
        JsonKind::Null,
        JsonKind::Boolean,
        JsonKind::Integer,
        JsonKind::Number,
        JsonKind::Array,
        JsonKind::Object,
        JsonKind::String,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JsonKind::Null => "null",
            JsonKind::Boolean => "boolean",
            JsonKind::Integer => "integer",
            JsonKind::Number => "number",
            JsonKind::Array => "array",
            JsonKind::Object => "object",
            JsonKind::String => "string",
        }
    }

    /// Read the `type` keyword of a schema node (a string or a list of strings)
    pub fn from_schema_type(value: &Value) -> Vec<JsonKind> {
        match value {
            Value::String(s) => s.parse().into_iter().collect(),
            Value::Array(items) => items
                .iter()
                .filter_map(|v| v.as_str())
                .filter_map(|s| s.parse().ok())
                .collect(),
            _ => Vec::new(),
        }
    }
}

impl FromStr for JsonKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "null" => Ok(JsonKind::Null),
            "boolean" => Ok(JsonKind::Boolean),
            "integer" => Ok(JsonKind::Integer),
            "number" => Ok(JsonKind::Number),
            "array" => Ok(JsonKind::Array),
            "object" => Ok(JsonKind::Object),
            "string" => Ok(JsonKind::String),
            other => Err(Error::Parse(format!("Unknown JSON type: {other}"))),
        }
    }
}

impl fmt::Display for JsonKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Per-kind parsers
// =============================================================================

/// Outcome of one parse attempt
enum Attempt {
    Parsed(Value),
    /// The value does not look like this kind at all
    NotThisKind,
    /// The value looks like this kind but is malformed
    Malformed(String),
}

fn parse_boolean(value: &str) -> Attempt {
    match value.to_lowercase().as_str() {
        "true" => Attempt::Parsed(Value::Bool(true)),
        "false" => Attempt::Parsed(Value::Bool(false)),
        _ => Attempt::NotThisKind,
    }
}

fn parse_integer(value: &str) -> Attempt {
    match value.trim().parse::<i64>() {
        Ok(n) => Attempt::Parsed(Value::from(n)),
        Err(_) => Attempt::NotThisKind,
    }
}

fn parse_number(value: &str) -> Attempt {
    // NaN and infinities have no JSON representation
    match value.trim().parse::<f64>() {
        Ok(n) if n.is_finite() => Attempt::Parsed(Value::from(n)),
        _ => Attempt::NotThisKind,
    }
}

fn parse_container(value: &str, opening: char) -> Attempt {
    let value = value.trim_start();
    if !value.starts_with(opening) {
        return Attempt::NotThisKind;
    }
    match serde_json::from_str::<Value>(value) {
        Ok(parsed) => Attempt::Parsed(parsed),
        Err(e) => Attempt::Malformed(e.to_string()),
    }
}

fn attempt(kind: JsonKind, value: &str) -> Attempt {
    match kind {
        JsonKind::Null if value.is_empty() => Attempt::Parsed(Value::Null),
        JsonKind::Null => Attempt::NotThisKind,
        JsonKind::Boolean => parse_boolean(value),
        JsonKind::Integer => parse_integer(value),
        JsonKind::Number => parse_number(value),
        JsonKind::Array => parse_container(value, '['),
        JsonKind::Object => parse_container(value, '{'),
        JsonKind::String => Attempt::Parsed(Value::String(value.to_string())),
    }
}

fn allowed_list(allowed: &[JsonKind]) -> String {
    allowed
        .iter()
        .map(JsonKind::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

// =============================================================================
// Entry points
// =============================================================================

/// Parse an untyped string into the first allowed kind it can represent.
///
/// `name` is only used in the error message (e.g. the parameter name).
/// A malformed `[...]`/`{...}` literal is reported with the JSON parser's
/// message when it was the last kind left to try; otherwise parsing moves on.
pub fn parse_value(value: &str, allowed: &[JsonKind], name: &str) -> Result<(JsonKind, Value)> {
    let candidates: Vec<JsonKind> = JsonKind::PRIORITY
        .into_iter()
        .filter(|kind| allowed.contains(kind))
        .collect();

    for (pos, kind) in candidates.iter().enumerate() {
        match attempt(*kind, value) {
            Attempt::Parsed(parsed) => return Ok((*kind, parsed)),
            Attempt::NotThisKind => {}
            Attempt::Malformed(reason) => {
                tracing::debug!(param = name, kind = %kind, %reason, "malformed value");
                if pos + 1 == candidates.len() {
                    return Err(Error::Parse(format!(
                        "{name} must be a valid type ({}): {reason}",
                        allowed_list(allowed)
                    )));
                }
            }
        }
    }

    Err(Error::Parse(format!(
        "{name} must be a valid type ({})",
        allowed_list(allowed)
    )))
}

/// Same as [`parse_value`] for raw bytes, which are decoded as UTF-8 first
pub fn parse_bytes_value(value: &[u8], allowed: &[JsonKind], name: &str) -> Result<(JsonKind, Value)> {
    let value = std::str::from_utf8(value)
        .map_err(|e| Error::Parse(format!("{name} is not valid UTF-8: {e}")))?;
    parse_value(value, allowed, name)
}

/// Parse a value as JSON, reporting failures as [`Error::Parse`]
pub fn parse_json(value: &str) -> Result<Value> {
    serde_json::from_str(value).map_err(|e| {
        let message = format!("Error parsing JSON: {e}");
        tracing::debug!("{message}");
        Error::Parse(message)
    })
}

/// Parse a JSON document and re-key its top-level mapping.
///
/// `fields` yields `(field_name, external_name)` pairs. Wherever an external
/// name is declared and present in the document, its value is moved to the
/// field name. Every other key is kept as is.
pub fn parse_json_fields<'a, I>(value: &str, fields: I) -> Result<Value>
where
    I: IntoIterator<Item = (&'a str, Option<&'a str>)>,
{
    let parsed = parse_json(value)?;
    let Value::Object(mut raw) = parsed else {
        return Ok(parsed);
    };

    let mut renamed = Map::with_capacity(raw.len());
    for (field, external) in fields {
        if let Some(external) = external {
            if let Some(v) = raw.remove(external) {
                renamed.insert(field.to_string(), v);
            }
        }
    }
    for (key, v) in raw {
        renamed.entry(key).or_insert(v);
    }
    Ok(Value::Object(renamed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_null_only_for_empty_string() {
        let allowed = [JsonKind::Null, JsonKind::String];
        assert_eq!(parse_value("", &allowed, "v").unwrap(), (JsonKind::Null, Value::Null));
        assert_eq!(
            parse_value("x", &allowed, "v").unwrap(),
            (JsonKind::String, json!("x"))
        );
    }

    #[test]
    fn test_boolean_case_insensitive() {
        let allowed = [JsonKind::Boolean];
        assert_eq!(parse_value("TRUE", &allowed, "v").unwrap().1, json!(true));
        assert_eq!(parse_value("False", &allowed, "v").unwrap().1, json!(false));
        assert!(parse_value("on", &allowed, "v").is_err());
    }

    #[test]
    fn test_priority_ignores_declared_order() {
        let allowed = [JsonKind::String, JsonKind::Number, JsonKind::Integer];
        assert_eq!(
            parse_value("0", &allowed, "v").unwrap(),
            (JsonKind::Integer, json!(0))
        );
        assert_eq!(
            parse_value("1.5", &allowed, "v").unwrap(),
            (JsonKind::Number, json!(1.5))
        );
        assert_eq!(
            parse_value("abc", &allowed, "v").unwrap(),
            (JsonKind::String, json!("abc"))
        );
    }

    #[test]
    fn test_digit_strings_are_integers() {
        let allowed = [JsonKind::Integer, JsonKind::Number, JsonKind::String];
        for digits in ["0", "7", "42", "000123", "9876543210"] {
            let (kind, _) = parse_value(digits, &allowed, "v").unwrap();
            assert_eq!(kind, JsonKind::Integer, "{digits}");
        }
    }

    #[test]
    fn test_array_and_object() {
        let allowed = [JsonKind::Array, JsonKind::Object, JsonKind::String];
        assert_eq!(
            parse_value("  [1, 2]", &allowed, "v").unwrap(),
            (JsonKind::Array, json!([1, 2]))
        );
        assert_eq!(
            parse_value(r#"{"a": 1}"#, &allowed, "v").unwrap(),
            (JsonKind::Object, json!({"a": 1}))
        );
        // Malformed array falls through to string when string is allowed
        assert_eq!(
            parse_value("[1,", &allowed, "v").unwrap(),
            (JsonKind::String, json!("[1,"))
        );
    }

    #[test]
    fn test_malformed_last_kind_reports_json_error() {
        let err = parse_value("[1,", &[JsonKind::Array], "ids").unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("ids must be a valid type (array): "), "{message}");
    }

    #[test]
    fn test_no_match_names_value_and_kinds() {
        let err = parse_value("abc", &[JsonKind::Integer, JsonKind::Null], "limit").unwrap_err();
        assert_eq!(err.to_string(), "limit must be a valid type (integer, null)");
    }

    #[test]
    fn test_bytes_are_decoded() {
        let (kind, value) = parse_bytes_value("héllo".as_bytes(), &[JsonKind::String], "v").unwrap();
        assert_eq!(kind, JsonKind::String);
        assert_eq!(value, json!("héllo"));
        assert!(parse_bytes_value(&[0xff, 0xfe], &[JsonKind::String], "v").is_err());
    }

    #[test]
    fn test_parse_json_error() {
        let err = parse_json("bad json").unwrap_err();
        assert!(err.to_string().starts_with("Error parsing JSON"));
    }

    #[test]
    fn test_parse_json_fields_rekeys_external_names() {
        let parsed = parse_json_fields(
            r#"{"user-id": 3, "name": "x", "other": true}"#,
            [("user_id", Some("user-id")), ("name", None)],
        )
        .unwrap();
        assert_eq!(parsed, json!({"user_id": 3, "name": "x", "other": true}));
    }

    #[test]
    fn test_schema_type_keyword() {
        assert_eq!(JsonKind::from_schema_type(&json!("integer")), vec![JsonKind::Integer]);
        assert_eq!(
            JsonKind::from_schema_type(&json!(["string", "null"])),
            vec![JsonKind::String, JsonKind::Null]
        );
    }
}
