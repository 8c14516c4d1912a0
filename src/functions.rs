//! Functions callable from WHERE clauses.
//!
//! The executor depends only on [`FunctionCatalog`]. [`FunctionRegistry`] is
//! a name → handler table filled once (usually via
//! [`FunctionRegistry::with_builtins`]) and read-only afterwards.

use std::collections::HashMap;

use chrono::{Duration, Local, NaiveDateTime};
use regex::Regex;
use rust_decimal::{
    Decimal,
    prelude::{FromPrimitive, ToPrimitive},
};

use crate::{
    executor::{EvalError, contains_value},
    metadata::{QueryMetadata, format_date, parse_date},
    value::Value,
};

/// Function-call collaborator consumed by the executor.
pub trait FunctionCatalog {
    fn has_function(&self, name: &str) -> bool;

    /// Invokes `name` with already resolved arguments.
    fn call(&self, name: &str, metadata: &QueryMetadata, args: &[Value]) -> Result<Value, EvalError>;
}

/// Signature of a registered function.
pub type FunctionHandler = fn(&QueryMetadata, &[Value]) -> Result<Value, EvalError>;

/// Case-insensitive name → handler table.
#[derive(Clone, Default)]
pub struct FunctionRegistry {
    handlers: HashMap<String, FunctionHandler>,
}

impl std::fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.handlers.keys().collect();
        names.sort();
        f.debug_struct("FunctionRegistry").field("functions", &names).finish()
    }
}

impl FunctionRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in catalog.
    pub fn with_builtins() -> Self {
        Self::new()
            .register("length", fn_length)
            .register("lower", fn_lower)
            .register("upper", fn_upper)
            .register("contains", fn_contains)
            .register("startswith", fn_startswith)
            .register("endswith", fn_endswith)
            .register("matches", fn_matches)
            .register("default", fn_default)
            .register("round", fn_round)
            .register("date", fn_date)
            .register("dateadd", fn_dateadd)
    }

    /// Adds or replaces `name`.
    pub fn register(mut self, name: &str, handler: FunctionHandler) -> Self {
        self.handlers.insert(name.to_lowercase(), handler);
        self
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }
}

impl FunctionCatalog for FunctionRegistry {
    fn has_function(&self, name: &str) -> bool {
        self.handlers.contains_key(&name.to_lowercase())
    }

    fn call(&self, name: &str, metadata: &QueryMetadata, args: &[Value]) -> Result<Value, EvalError> {
        let handler = self
            .handlers
            .get(&name.to_lowercase())
            .ok_or_else(|| EvalError::UnknownFunction(name.to_string()))?;
        handler(metadata, args)
    }
}

fn function_error(name: &str, message: impl Into<String>) -> EvalError {
    EvalError::Function {
        name: name.to_string(),
        message: message.into(),
    }
}

fn expect_args<'a>(
    name: &str,
    args: &'a [Value],
    min: usize,
    max: usize,
) -> Result<&'a [Value], EvalError> {
    if args.len() < min || args.len() > max {
        let expected = if min == max {
            min.to_string()
        } else {
            format!("{} to {}", min, max)
        };
        return Err(function_error(
            name,
            format!("expected {} argument(s), got {}", expected, args.len()),
        ));
    }
    Ok(args)
}

fn expect_string<'a>(name: &str, value: &'a Value) -> Result<&'a str, EvalError> {
    value.as_str().ok_or_else(|| {
        EvalError::TypeError(format!("{}() requires string, got {}", name, value.type_name()))
    })
}

/// length(x) - element count of arrays/objects, characters of strings, 0 for null
fn fn_length(_: &QueryMetadata, args: &[Value]) -> Result<Value, EvalError> {
    let args = expect_args("length", args, 1, 1)?;
    let len = match &args[0] {
        Value::Null => 0,
        Value::String(s) => s.chars().count(),
        Value::Array(items) => items.len(),
        Value::Object(map) => map.len(),
        other => {
            return Err(function_error(
                "length",
                format!("requires string or array, got {}", other.type_name()),
            ));
        }
    };
    Ok(Value::Integer(len as i64))
}

fn fn_lower(_: &QueryMetadata, args: &[Value]) -> Result<Value, EvalError> {
    let args = expect_args("lower", args, 1, 1)?;
    match &args[0] {
        Value::Null => Ok(Value::Null),
        value => Ok(Value::String(expect_string("lower", value)?.to_lowercase())),
    }
}

fn fn_upper(_: &QueryMetadata, args: &[Value]) -> Result<Value, EvalError> {
    let args = expect_args("upper", args, 1, 1)?;
    match &args[0] {
        Value::Null => Ok(Value::Null),
        value => Ok(Value::String(expect_string("upper", value)?.to_uppercase())),
    }
}

/// contains(haystack, needle) - same matching rules as the CONTAINS operator
fn fn_contains(_: &QueryMetadata, args: &[Value]) -> Result<Value, EvalError> {
    let args = expect_args("contains", args, 2, 2)?;
    Ok(Value::Boolean(contains_value(&args[0], &args[1])))
}

fn fn_startswith(_: &QueryMetadata, args: &[Value]) -> Result<Value, EvalError> {
    let args = expect_args("startswith", args, 2, 2)?;
    if args[0].is_null() {
        return Ok(Value::Boolean(false));
    }
    let s = expect_string("startswith", &args[0])?;
    let prefix = expect_string("startswith", &args[1])?;
    Ok(Value::Boolean(s.starts_with(prefix)))
}

fn fn_endswith(_: &QueryMetadata, args: &[Value]) -> Result<Value, EvalError> {
    let args = expect_args("endswith", args, 2, 2)?;
    if args[0].is_null() {
        return Ok(Value::Boolean(false));
    }
    let s = expect_string("endswith", &args[0])?;
    let suffix = expect_string("endswith", &args[1])?;
    Ok(Value::Boolean(s.ends_with(suffix)))
}

/// matches(text, pattern) - regular-expression search
fn fn_matches(_: &QueryMetadata, args: &[Value]) -> Result<Value, EvalError> {
    let args = expect_args("matches", args, 2, 2)?;
    if args[0].is_null() {
        return Ok(Value::Boolean(false));
    }
    let s = expect_string("matches", &args[0])?;
    let pattern = expect_string("matches", &args[1])?;
    let re = Regex::new(pattern)
        .map_err(|e| function_error("matches", format!("invalid pattern: {}", e)))?;
    Ok(Value::Boolean(re.is_match(s)))
}

/// default(value, fallback) - fallback when value is null
fn fn_default(_: &QueryMetadata, args: &[Value]) -> Result<Value, EvalError> {
    let args = expect_args("default", args, 2, 2)?;
    if args[0].is_null() {
        Ok(args[1].clone())
    } else {
        Ok(args[0].clone())
    }
}

/// round(number, digits?) - decimal rounding, half away from zero
fn fn_round(_: &QueryMetadata, args: &[Value]) -> Result<Value, EvalError> {
    let args = expect_args("round", args, 1, 2)?;
    let digits = match args.get(1) {
        None => 0,
        Some(Value::Integer(n)) if *n >= 0 => u32::try_from(*n)
            .map_err(|_| function_error("round", format!("digits out of range: {}", n)))?,
        Some(other) => {
            return Err(function_error(
                "round",
                format!("digits must be a non-negative integer, got {}", other.type_name()),
            ));
        }
    };

    match &args[0] {
        Value::Null => Ok(Value::Null),
        Value::Integer(n) => Ok(Value::Integer(*n)),
        Value::Float(n) => {
            let Some(d) = Decimal::from_f64(*n) else {
                return Ok(Value::Float(*n));
            };
            let rounded = d.round_dp_with_strategy(
                digits,
                rust_decimal::RoundingStrategy::MidpointAwayFromZero,
            );
            if digits == 0
                && let Some(r) = rounded.to_i64()
            {
                return Ok(Value::Integer(r));
            }
            Ok(rounded.to_f64().map(Value::Float).unwrap_or(Value::Float(*n)))
        }
        other => Err(function_error(
            "round",
            format!("requires number, got {}", other.type_name()),
        )),
    }
}

fn resolve_date(name: &str, value: &Value) -> Result<Option<NaiveDateTime>, EvalError> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) if s.eq_ignore_ascii_case("now") => Ok(Some(Local::now().naive_local())),
        Value::String(s) if s.eq_ignore_ascii_case("today") => {
            Ok(Local::now().date_naive().and_hms_opt(0, 0, 0))
        }
        Value::String(s) => Ok(parse_date(s)),
        other => Err(function_error(
            name,
            format!("requires date string, got {}", other.type_name()),
        )),
    }
}

/// date(x) - canonical date-time string; accepts `today` and `now`
fn fn_date(_: &QueryMetadata, args: &[Value]) -> Result<Value, EvalError> {
    let args = expect_args("date", args, 1, 1)?;
    Ok(resolve_date("date", &args[0])?
        .map(|d| Value::String(format_date(&d)))
        .unwrap_or(Value::Null))
}

/// dateadd(date, days) - shifts a date by whole days
fn fn_dateadd(_: &QueryMetadata, args: &[Value]) -> Result<Value, EvalError> {
    let args = expect_args("dateadd", args, 2, 2)?;
    let days = match &args[1] {
        Value::Integer(n) => *n,
        other => {
            return Err(function_error(
                "dateadd",
                format!("days must be an integer, got {}", other.type_name()),
            ));
        }
    };
    let Some(date) = resolve_date("dateadd", &args[0])? else {
        return Ok(Value::Null);
    };
    let shifted = Duration::try_days(days)
        .and_then(|delta| date.checked_add_signed(delta))
        .ok_or_else(|| function_error("dateadd", "date out of range"))?;
    Ok(Value::String(format_date(&shifted)))
}
