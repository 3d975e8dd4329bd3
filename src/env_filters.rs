//! Typed coercion of loosely typed environment and configuration values.
//!
//! Every mode maps invalid input to `None`; callers treat absence as "use
//! the default" and never as a hard failure.

use serde_json::Value;

/// Coercion mode applied to a raw value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    /// Permissive boolean-string parsing; empty input is invalid.
    Bool,
    /// Numeric input (or boolean, mapped to 0/1).
    Int,
    /// Scalar-only, control characters stripped.
    String,
    /// Numeric becomes an integer, everything else falls back to boolean.
    IntOrBool,
    /// Octal file mode: integers already in `[0, 0o777]` pass through,
    /// numeric strings are interpreted as octal.
    OctalMode,
}

/// A successfully coerced value.
#[derive(Debug, Clone, PartialEq)]
pub enum Filtered {
    Bool(bool),
    Int(i64),
    Str(String),
}

pub fn filter(mode: FilterMode, raw: &Value) -> Option<Filtered> {
    match mode {
        FilterMode::Bool => filter_bool(raw).map(Filtered::Bool),
        FilterMode::Int => filter_int(raw).map(Filtered::Int),
        FilterMode::String => filter_string(raw).map(Filtered::Str),
        FilterMode::IntOrBool => numeric_i64(raw)
            .map(Filtered::Int)
            .or_else(|| filter_bool(raw).map(Filtered::Bool)),
        FilterMode::OctalMode => filter_octal_mode(raw).map(Filtered::Int),
    }
}

fn filter_bool(raw: &Value) -> Option<bool> {
    match raw {
        Value::Bool(flag) => Some(*flag),
        Value::Number(n) => match n.as_i64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        },
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return None;
            }
            match s.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Some(true),
                "0" | "false" | "no" | "off" => Some(false),
                _ => None,
            }
        }
        _ => None,
    }
}

fn numeric_i64(raw: &Value) -> Option<i64> {
    match raw {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn filter_int(raw: &Value) -> Option<i64> {
    numeric_i64(raw).or_else(|| match raw {
        Value::Bool(flag) => Some(i64::from(*flag)),
        _ => None,
    })
}

fn filter_string(raw: &Value) -> Option<String> {
    let text = match raw {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(flag) => flag.to_string(),
        _ => return None,
    };
    Some(text.chars().filter(|ch| !ch.is_control()).collect())
}

fn filter_octal_mode(raw: &Value) -> Option<i64> {
    let mode = match raw {
        Value::Number(n) => n.as_i64()?,
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return None;
            }
            i64::from_str_radix(s, 8).ok()?
        }
        _ => return None,
    };
    (0..=0o777).contains(&mode).then_some(mode)
}
