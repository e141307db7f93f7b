//! Array kind

use serde_json::{Number, Value};
use std::collections::{BTreeMap, HashSet};

use super::error::{ErrorAggregator, MessageTable, TypeSystemError};
use super::{Kind, KindSpec, TypeBuilder, TypeDefinition};
use crate::parsers::JsonKind;

const TYPE_NAME: &str = "Array";

const MESSAGES: MessageTable = &[
    ("type", "Must be a list."),
    ("min_items", "Not enough items."),
    ("max_items", "Too many items."),
    ("unique_items", "This item is not unique."),
];

fn error(code: &'static str) -> TypeSystemError {
    TypeSystemError::from_table(TYPE_NAME, MESSAGES, code, &[])
}

/// Item typing of an array
#[derive(Debug, Clone)]
pub enum Items {
    /// Every element has this type
    Single(Box<TypeDefinition>),
    /// Element `i` has type `i` (tuple-like)
    Positional(Vec<TypeDefinition>),
}

/// Constraints of an Array definition
#[derive(Debug, Clone, Default)]
pub struct ArrayType {
    items: Option<Items>,
    additional_items: bool,
    min_items: usize,
    max_items: Option<usize>,
    unique_items: bool,
}

impl ArrayType {
    pub fn items(&self) -> Option<&Items> {
        self.items.as_ref()
    }

    pub fn min_items(&self) -> usize {
        self.min_items
    }

    pub fn max_items(&self) -> Option<usize> {
        self.max_items
    }

    pub fn unique_items(&self) -> bool {
        self.unique_items
    }

    /// Type for the element at `pos`, if any
    fn item_type(&self, pos: usize) -> Option<&TypeDefinition> {
        match &self.items {
            Some(Items::Single(definition)) => Some(definition),
            Some(Items::Positional(definitions)) => definitions.get(pos),
            None => None,
        }
    }
}

impl KindSpec for ArrayType {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn json_types(&self) -> Vec<JsonKind> {
        vec![JsonKind::Array, JsonKind::String]
    }

    fn validate(&self, raw: &Value) -> Result<Value, TypeSystemError> {
        // Strings are never iterated as characters
        let Value::Array(input) = raw else {
            return Err(error("type"));
        };

        if let Some(Items::Positional(definitions)) = &self.items {
            if input.len() < definitions.len() {
                return Err(error("min_items"));
            }
            if input.len() > definitions.len() && !self.additional_items {
                return Err(error("max_items"));
            }
        }
        if input.len() < self.min_items {
            return Err(error("min_items"));
        }
        if self.max_items.is_some_and(|max| input.len() > max) {
            return Err(error("max_items"));
        }

        let mut output = Vec::with_capacity(input.len());
        let mut errors = ErrorAggregator::new();
        let mut seen = HashSet::new();

        for (pos, item) in input.iter().enumerate() {
            let coerced = match self.item_type(pos) {
                Some(definition) => match definition.validate(item) {
                    Ok(coerced) => coerced,
                    Err(e) => {
                        errors.record_error(pos, e);
                        continue;
                    }
                },
                None => item.clone(),
            };

            if self.unique_items && !seen.insert(Identity::of(&coerced)) {
                errors.record_error(pos, error("unique_items"));
                continue;
            }

            output.push(coerced);
        }

        errors.finish(TYPE_NAME)?;
        Ok(Value::Array(output))
    }

    fn fallback_example(&self) -> Option<Value> {
        match &self.items {
            Some(Items::Single(definition)) => definition.example().map(|e| Value::Array(vec![e])),
            Some(Items::Positional(definitions)) => definitions
                .iter()
                .map(TypeDefinition::example)
                .collect::<Option<Vec<_>>>()
                .map(Value::Array),
            None => None,
        }
    }

    fn check(&self) -> Result<(), String> {
        match self.max_items {
            Some(max) if self.min_items > max => Err(format!(
                "min_items {} is greater than max_items {max}",
                self.min_items
            )),
            _ => Ok(()),
        }
    }

    fn into_kind(self) -> Kind {
        Kind::Array(self)
    }
}

impl TypeBuilder<ArrayType> {
    /// Type applied to every element
    pub fn items(mut self, definition: TypeDefinition) -> Self {
        self.kind.items = Some(Items::Single(Box::new(definition)));
        self
    }

    /// One type per position
    pub fn positional_items(mut self, definitions: Vec<TypeDefinition>) -> Self {
        self.kind.items = Some(Items::Positional(definitions));
        self
    }

    /// Allow elements past the positional types; they are kept unvalidated
    pub fn additional_items(mut self, allowed: bool) -> Self {
        self.kind.additional_items = allowed;
        self
    }

    pub fn min_items(mut self, min_items: usize) -> Self {
        self.kind.min_items = min_items;
        self
    }

    pub fn max_items(mut self, max_items: usize) -> Self {
        self.kind.max_items = Some(max_items);
        self
    }

    pub fn unique_items(mut self, unique: bool) -> Self {
        self.kind.unique_items = unique;
        self
    }
}

/// Equality key of a coerced item.
///
/// Numbers compare by value (`1`, `1.0` and a parsed `"1"` are one item) and
/// objects ignore key order.
#[derive(Debug, PartialEq, Eq, Hash)]
enum Identity {
    Null,
    Bool(bool),
    Int(i128),
    Float(u64),
    String(String),
    Array(Vec<Identity>),
    Object(BTreeMap<String, Identity>),
}

impl Identity {
    fn of(value: &Value) -> Self {
        match value {
            Value::Null => Identity::Null,
            Value::Bool(b) => Identity::Bool(*b),
            Value::Number(n) => Self::number(n),
            Value::String(s) => Identity::String(s.clone()),
            Value::Array(items) => Identity::Array(items.iter().map(Self::of).collect()),
            Value::Object(map) => Identity::Object(
                map.iter()
                    .map(|(key, value)| (key.clone(), Self::of(value)))
                    .collect(),
            ),
        }
    }

    fn number(n: &Number) -> Self {
        if let Some(i) = n.as_i64() {
            return Identity::Int(i128::from(i));
        }
        if let Some(u) = n.as_u64() {
            return Identity::Int(i128::from(u));
        }
        match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() < 1e38 => Identity::Int(f as i128),
            Some(f) => Identity::Float(f.to_bits()),
            None => Identity::Null,
        }
    }
}
