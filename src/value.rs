use std::{cmp::Ordering, collections::HashMap};

use rust_decimal::{Decimal, prelude::FromPrimitive};

/// A dynamic value flowing through query evaluation.
///
/// Frontmatter fields, literals in a query and function results all share
/// this type. Integers and floats are kept apart, as in JSON sources that
/// distinguish `2` from `2.5`.
///
/// # Examples
///
/// ```
/// use vaultql::Value;
///
/// let tags = Value::Array(vec![Value::String("project".into())]);
/// assert!(tags.is_truthy());
/// assert!(!Value::Integer(0).is_truthy());
/// assert!(!Value::Null.is_truthy());
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Missing or explicitly empty value
    #[default]
    Null,

    Boolean(bool),

    Float(f64),

    Integer(i64),

    String(String),

    Array(Vec<Value>),

    Object(HashMap<String, Value>),
}

impl Value {
    /// Truthiness used when a value stands alone as a predicate:
    /// non-null, non-empty, non-zero and not `false`.
    pub fn is_truthy(&self) -> bool {
        use Value::*;
        match self {
            Null => false,
            Boolean(b) => *b,
            Float(n) => *n != 0.0 && !n.is_nan(),
            Integer(n) => *n != 0,
            String(s) => !s.is_empty(),
            Array(arr) => !arr.is_empty(),
            Object(obj) => !obj.is_empty(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Get as float
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Integer(n) => Some(*n as f64),
            Value::Float(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Display form used for string functions and group labels
    pub fn as_string(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::Float(n) => n.to_string(),
            Value::Integer(n) => n.to_string(),
            Value::Boolean(b) => b.to_string(),
            Value::Null => "null".to_string(),
            Value::Array(arr) => arr
                .iter()
                .map(Value::as_string)
                .collect::<Vec<_>>()
                .join(", "),
            Value::Object(_) => format!("{:?}", self),
        }
    }

    /// Human-readable type name, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Array(items.into_iter().map(Into::into).collect())
    }
}

/// Compares an integer with a float, exactly when the float fits a decimal.
fn compare_mixed(a: i64, b: f64) -> Option<Ordering> {
    if let Some(ad) = Decimal::from_i64(a)
        && let Some(bd) = Decimal::from_f64(b)
    {
        return Some(ad.cmp(&bd));
    }
    (a as f64).partial_cmp(&b)
}

/// Orders two values of compatible types.
///
/// Numbers compare across integer/float, strings lexicographically, booleans
/// `false < true`. Anything else is not comparable and yields `None`.
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
        (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
        (Value::Integer(a), Value::Float(b)) => compare_mixed(*a, *b),
        (Value::Float(a), Value::Integer(b)) => compare_mixed(*b, *a).map(Ordering::reverse),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

/// Equality with numeric coercion between integers and floats.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Integer(_), Value::Float(_)) | (Value::Float(_), Value::Integer(_)) => {
            compare_values(a, b) == Some(Ordering::Equal)
        }
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y))
        }
        _ => a == b,
    }
}
