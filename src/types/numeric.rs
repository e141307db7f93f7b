//! Integer and Number kinds
//!
//! Both kinds share one constraint set; the `integer` flag selects the native
//! representation. Bounds are kept as `f64`; integral bounds are compared
//! exactly against integer values.

use serde_json::{Number, Value};
use std::cmp::Ordering;

use super::error::{MessageTable, TypeSystemError};
use super::{Kind, KindSpec, TypeBuilder};
use crate::parsers::JsonKind;

const MESSAGES: MessageTable = &[
    ("type", "Must be a valid number."),
    ("finite", "Must be a finite number."),
    ("minimum", "Must be greater than or equal to {minimum}."),
    ("exclusive_minimum", "Must be greater than {minimum}."),
    ("maximum", "Must be less than or equal to {maximum}."),
    ("exclusive_maximum", "Must be less than {maximum}."),
    ("multiple_of", "Must be a multiple of {multiple_of}."),
];

/// Render a bound the way users wrote it: `120`, not `120.0`
pub(crate) fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// Constraints of an Integer or Number definition
#[derive(Debug, Clone, Default)]
pub struct NumericType {
    integer: bool,
    minimum: Option<f64>,
    maximum: Option<f64>,
    exclusive_minimum: bool,
    exclusive_maximum: bool,
    multiple_of: Option<f64>,
}

impl NumericType {
    pub fn integer() -> Self {
        Self {
            integer: true,
            ..Self::default()
        }
    }

    pub fn number() -> Self {
        Self::default()
    }

    pub fn is_integer(&self) -> bool {
        self.integer
    }

    pub fn minimum(&self) -> Option<f64> {
        self.minimum
    }

    pub fn maximum(&self) -> Option<f64> {
        self.maximum
    }

    pub fn multiple_of(&self) -> Option<f64> {
        self.multiple_of
    }

    fn error(&self, code: &'static str) -> TypeSystemError {
        let render = |bound: Option<f64>| bound.map(format_number).unwrap_or_default();
        let params = [
            ("minimum", render(self.minimum)),
            ("maximum", render(self.maximum)),
            ("multiple_of", render(self.multiple_of)),
        ];
        TypeSystemError::from_table(self.type_name(), MESSAGES, code, &params)
    }

    /// Coerce into the native representation, returning it with its numeric view
    fn coerce(&self, raw: &Value) -> Result<(Value, Native), TypeSystemError> {
        if self.integer {
            let n = match raw {
                Value::Number(n) => match n.as_i64() {
                    Some(i) => Some(i),
                    None => n
                        .as_f64()
                        .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                        .map(|f| f as i64),
                },
                Value::String(s) => s.trim().parse::<i64>().ok(),
                _ => None,
            };
            return n
                .map(|i| (Value::from(i), Native::Int(i)))
                .ok_or_else(|| self.error("type"));
        }

        match raw {
            Value::Number(n) => {
                let native = match n.as_i64() {
                    Some(i) => Native::Int(i),
                    None => Native::Float(n.as_f64().ok_or_else(|| self.error("type"))?),
                };
                Ok((raw.clone(), native))
            }
            Value::String(s) => {
                let f = s.trim().parse::<f64>().map_err(|_| self.error("type"))?;
                let n = Number::from_f64(f).ok_or_else(|| self.error("finite"))?;
                Ok((Value::Number(n), Native::Float(f)))
            }
            _ => Err(self.error("type")),
        }
    }
}

/// Coerced value, kept as `i64` whenever it is one so large integers stay exact
#[derive(Debug, Clone, Copy)]
enum Native {
    Int(i64),
    Float(f64),
}

impl Native {
    fn is_finite(self) -> bool {
        match self {
            Native::Int(_) => true,
            Native::Float(f) => f.is_finite(),
        }
    }

    /// Compare against a bound; integral bounds compare exactly
    fn compare(self, bound: f64) -> Option<Ordering> {
        match (self, integral(bound)) {
            (Native::Int(i), Some(b)) => Some(i.cmp(&b)),
            (Native::Int(i), None) => (i as f64).partial_cmp(&bound),
            (Native::Float(f), _) => f.partial_cmp(&bound),
        }
    }

    fn is_multiple_of(self, multiple_of: f64) -> bool {
        match (self, integral(multiple_of)) {
            (Native::Int(i), Some(m)) => i % m == 0,
            (Native::Float(f), Some(m)) => f % (m as f64) == 0.0,
            // Reciprocal product avoids float modulo artifacts (0.3 % 0.1)
            (Native::Int(i), None) => ((i as f64) * (1.0 / multiple_of)).fract() == 0.0,
            (Native::Float(f), None) => (f * (1.0 / multiple_of)).fract() == 0.0,
        }
    }
}

/// `n` as an `i64` when it is integral and representable
fn integral(n: f64) -> Option<i64> {
    (n.fract() == 0.0 && n.abs() < i64::MAX as f64).then_some(n as i64)
}

impl KindSpec for NumericType {
    fn type_name(&self) -> &'static str {
        if self.integer {
            "Integer"
        } else {
            "Number"
        }
    }

    fn json_types(&self) -> Vec<JsonKind> {
        if self.integer {
            vec![JsonKind::Integer]
        } else {
            vec![JsonKind::Number]
        }
    }

    fn validate(&self, raw: &Value) -> Result<Value, TypeSystemError> {
        let (value, n) = self.coerce(raw)?;

        if !n.is_finite() {
            return Err(self.error("finite"));
        }
        if let Some(minimum) = self.minimum {
            match n.compare(minimum) {
                Some(Ordering::Less | Ordering::Equal) if self.exclusive_minimum => {
                    return Err(self.error("exclusive_minimum"))
                }
                Some(Ordering::Less) | None => return Err(self.error("minimum")),
                _ => {}
            }
        }
        if let Some(maximum) = self.maximum {
            match n.compare(maximum) {
                Some(Ordering::Greater | Ordering::Equal) if self.exclusive_maximum => {
                    return Err(self.error("exclusive_maximum"))
                }
                Some(Ordering::Greater) | None => return Err(self.error("maximum")),
                _ => {}
            }
        }
        if let Some(multiple_of) = self.multiple_of {
            if !n.is_multiple_of(multiple_of) {
                return Err(self.error("multiple_of"));
            }
        }

        Ok(value)
    }

    fn check(&self) -> Result<(), String> {
        if let (Some(min), Some(max)) = (self.minimum, self.maximum) {
            if min > max {
                return Err(format!(
                    "minimum {} is greater than maximum {}",
                    format_number(min),
                    format_number(max)
                ));
            }
        }
        match self.multiple_of {
            Some(m) if m <= 0.0 || !m.is_finite() => Err(format!(
                "multiple_of must be a positive number, got {}",
                format_number(m)
            )),
            _ => Ok(()),
        }
    }

    fn into_kind(self) -> Kind {
        if self.integer {
            Kind::Integer(self)
        } else {
            Kind::Number(self)
        }
    }
}

impl TypeBuilder<NumericType> {
    pub fn minimum(mut self, minimum: impl Into<f64>) -> Self {
        self.kind.minimum = Some(minimum.into());
        self
    }

    pub fn maximum(mut self, maximum: impl Into<f64>) -> Self {
        self.kind.maximum = Some(maximum.into());
        self
    }

    pub fn exclusive_minimum(mut self, exclusive: bool) -> Self {
        self.kind.exclusive_minimum = exclusive;
        self
    }

    pub fn exclusive_maximum(mut self, exclusive: bool) -> Self {
        self.kind.exclusive_maximum = exclusive;
        self
    }

    pub fn multiple_of(mut self, multiple_of: impl Into<f64>) -> Self {
        self.kind.multiple_of = Some(multiple_of.into());
        self
    }
}
