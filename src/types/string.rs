//! String kind
//!
//! Checks run in a fixed order and the first failure wins: length, pattern,
//! then format. Every format yields the trimmed string itself; the temporal
//! formats are only parsed as a check. Use
//! [`TypeDefinition::validate_as`](super::TypeDefinition::validate_as) with a
//! `chrono` type to get the parsed value.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use super::error::{MessageTable, TypeSystemError};
use super::{Kind, KindSpec, TypeBuilder};
use crate::error::Error;
use crate::parsers::JsonKind;

const TYPE_NAME: &str = "String";

const MESSAGES: MessageTable = &[
    ("type", "Must be a string."),
    ("blank", "Must not be blank."),
    ("max_length", "Must have no more than {max_length} characters."),
    ("min_length", "Must have at least {min_length} characters."),
    ("pattern", "Must match the pattern /{pattern}/."),
];

/// Formats a string value can be checked against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StringFormat {
    /// `YYYY-MM-DD`
    Date,
    /// ISO 8601 date and time, with or without an offset
    DateTime,
    /// Anything containing an `@`
    Email,
    /// `HH:MM:SS`
    Time,
    /// An absolute URI
    Uri,
}

impl StringFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            StringFormat::Date => "date",
            StringFormat::DateTime => "date-time",
            StringFormat::Email => "email",
            StringFormat::Time => "time",
            StringFormat::Uri => "uri",
        }
    }

    /// Check `value`, returning the underlying parser's message on failure
    fn check(&self, value: &str) -> Result<(), String> {
        match self {
            StringFormat::Date => NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .map(|_| ())
                .map_err(|e| format!("time data '{value}' does not match format '%Y-%m-%d': {e}")),
            StringFormat::DateTime => {
                if DateTime::parse_from_rfc3339(value).is_ok() {
                    return Ok(());
                }
                NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
                    .map(|_| ())
                    .map_err(|e| format!("Unable to parse datetime string '{value}': {e}"))
            }
            StringFormat::Email if value.contains('@') => Ok(()),
            StringFormat::Email => Err("Not a valid email address.".to_string()),
            StringFormat::Time => NaiveTime::parse_from_str(value, "%H:%M:%S")
                .map(|_| ())
                .map_err(|e| format!("time data '{value}' does not match format '%H:%M:%S': {e}")),
            StringFormat::Uri => url::Url::parse(value)
                .map(|_| ())
                .map_err(|e| format!("'{value}' is not a valid 'URI': {e}")),
        }
    }
}

impl FromStr for StringFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s {
            "date" => Ok(StringFormat::Date),
            "date-time" => Ok(StringFormat::DateTime),
            "email" => Ok(StringFormat::Email),
            "time" => Ok(StringFormat::Time),
            "uri" => Ok(StringFormat::Uri),
            other => Err(Error::Config(format!("unsupported string format '{other}'"))),
        }
    }
}

impl fmt::Display for StringFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Constraints of a String definition
#[derive(Debug, Clone)]
pub struct StringType {
    min_length: Option<usize>,
    max_length: Option<usize>,
    pattern: Option<Regex>,
    format: Option<StringFormat>,
    trim_whitespace: bool,
}

impl Default for StringType {
    fn default() -> Self {
        Self {
            min_length: None,
            max_length: None,
            pattern: None,
            format: None,
            trim_whitespace: true,
        }
    }
}

impl StringType {
    pub fn min_length(&self) -> Option<usize> {
        self.min_length
    }

    pub fn max_length(&self) -> Option<usize> {
        self.max_length
    }

    pub fn pattern(&self) -> Option<&str> {
        self.pattern.as_ref().map(Regex::as_str)
    }

    pub fn format(&self) -> Option<StringFormat> {
        self.format
    }

    pub fn trims_whitespace(&self) -> bool {
        self.trim_whitespace
    }

    fn error(&self, code: &'static str) -> TypeSystemError {
        let params = [
            ("min_length", self.min_length.unwrap_or_default().to_string()),
            ("max_length", self.max_length.unwrap_or_default().to_string()),
            ("pattern", self.pattern().unwrap_or_default().to_string()),
        ];
        TypeSystemError::from_table(TYPE_NAME, MESSAGES, code, &params)
    }
}

impl KindSpec for StringType {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn json_types(&self) -> Vec<JsonKind> {
        vec![JsonKind::String]
    }

    fn validate(&self, raw: &Value) -> Result<Value, TypeSystemError> {
        let value = match raw {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Null | Value::Array(_) | Value::Object(_) => return Err(self.error("type")),
        };
        let value = if self.trim_whitespace {
            value.trim().to_string()
        } else {
            value
        };

        let length = value.chars().count();
        if let Some(min_length) = self.min_length {
            if length < min_length {
                return Err(if min_length == 1 {
                    self.error("blank")
                } else {
                    self.error("min_length")
                });
            }
        }
        if let Some(max_length) = self.max_length {
            if length > max_length {
                return Err(self.error("max_length"));
            }
        }
        if let Some(pattern) = &self.pattern {
            if !pattern.is_match(&value) {
                return Err(self.error("pattern"));
            }
        }
        if let Some(format) = self.format {
            format
                .check(&value)
                .map_err(|message| TypeSystemError::new(TYPE_NAME, "format", message))?;
        }

        Ok(Value::String(value))
    }

    fn check(&self) -> Result<(), String> {
        match (self.min_length, self.max_length) {
            (Some(min), Some(max)) if min > max => Err(format!(
                "min_length {min} is greater than max_length {max}"
            )),
            _ => Ok(()),
        }
    }

    fn into_kind(self) -> Kind {
        Kind::String(self)
    }
}

impl TypeBuilder<StringType> {
    pub fn min_length(mut self, min_length: usize) -> Self {
        self.kind.min_length = Some(min_length);
        self
    }

    pub fn max_length(mut self, max_length: usize) -> Self {
        self.kind.max_length = Some(max_length);
        self
    }

    /// Regular expression the value must contain a match for
    pub fn pattern(mut self, pattern: &str) -> Self {
        match Regex::new(pattern) {
            Ok(regex) => self.kind.pattern = Some(regex),
            Err(e) => self.problems.push(format!("invalid pattern /{pattern}/: {e}")),
        }
        self
    }

    pub fn format(mut self, format: StringFormat) -> Self {
        self.kind.format = Some(format);
        self
    }

    pub fn trim_whitespace(mut self, trim: bool) -> Self {
        self.kind.trim_whitespace = trim;
        self
    }
}
