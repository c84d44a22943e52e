//! Identifier normalization and fixed-width formatting.
//!
//! Module and variable identifiers arrive in mixed shapes: plain numbers
//! (`7`, `"1500"`), and letter-prefixed codes (`"m001"`, `"s12"`). The helpers
//! here turn them into strings that compare consistently as plain strings.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

/// Letters followed by digits, whole string.
static ALPHA_NUMERIC_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z]+)([0-9]+)$").expect("valid identifier regex"));

/// Result of a numeric coercion attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Coerced<T> {
    /// The value coerced to a finite number.
    Number(f64),
    /// The value could not be coerced and is handed back as-is.
    Unchanged(T),
}

impl<T> Coerced<T> {
    /// The numeric value, if coercion succeeded.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Coerced::Number(n) => Some(*n),
            Coerced::Unchanged(_) => None,
        }
    }
}

/// Try to coerce a string to a finite number.
///
/// Empty and whitespace-only strings, unparsable text, and non-finite
/// results (`"inf"`, `"NaN"`) are returned unchanged.
pub fn try_convert_str(value: &str) -> Coerced<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Coerced::Unchanged(value);
    }
    match trimmed.parse::<f64>() {
        Ok(n) if n.is_finite() => Coerced::Number(n),
        _ => Coerced::Unchanged(value),
    }
}

/// Try to coerce a JSON value to a finite number.
///
/// Numbers and numeric strings convert; `null`, booleans, arrays, objects,
/// and anything that does not yield a finite number come back unchanged.
/// Never fails.
pub fn try_convert_to_number(value: &Value) -> Coerced<&Value> {
    match value {
        Value::Number(n) => match n.as_f64() {
            Some(f) if f.is_finite() => Coerced::Number(f),
            _ => Coerced::Unchanged(value),
        },
        Value::String(s) => match try_convert_str(s) {
            Coerced::Number(n) => Coerced::Number(n),
            Coerced::Unchanged(_) => Coerced::Unchanged(value),
        },
        _ => Coerced::Unchanged(value),
    }
}

fn width_for(value: f64) -> usize {
    if value < 1_000.0 {
        3
    } else if value < 10_000.0 {
        4
    } else if value < 100_000.0 {
        5
    } else {
        6
    }
}

fn plain_number(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value == f64::INFINITY {
        "Infinity".to_string()
    } else if value == f64::NEG_INFINITY {
        "-Infinity".to_string()
    } else if value == 0.0 {
        // collapses -0
        "0".to_string()
    } else {
        format!("{value}")
    }
}

/// Zero-pad a non-negative number to a width chosen by magnitude.
///
/// | range              | width |
/// |--------------------|-------|
/// | `[0, 1000)`        | 3     |
/// | `[1000, 10000)`    | 4     |
/// | `[10000, 100000)`  | 5     |
/// | `[100000, ∞)`      | 6     |
///
/// Negative and non-finite input is returned in plain form, unpadded.
pub fn format_fixed_width(value: f64) -> String {
    let text = plain_number(value);
    if !value.is_finite() || value < 0.0 {
        return text;
    }
    let width = width_for(value);
    format!("{text:0>width$}")
}

fn plain_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Format an identifier value as a fixed-width string when it is numeric,
/// or as its plain string form otherwise.
pub fn format_identifier_value(value: &Value) -> String {
    match try_convert_to_number(value) {
        Coerced::Number(n) => format_fixed_width(n),
        Coerced::Unchanged(v) => plain_string(v),
    }
}

/// String form of [`format_identifier_value`].
///
/// Pure digit strings are padded directly so long identifiers keep every
/// digit instead of passing through `f64`.
pub fn format_identifier_str(value: &str) -> String {
    if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) {
        let digits = value.trim_start_matches('0');
        let digits = if digits.is_empty() { "0" } else { digits };
        let width = match digits.len() {
            0..=3 => 3,
            4 => 4,
            5 => 5,
            _ => 6,
        };
        return format!("{digits:0>width$}");
    }
    match try_convert_str(value) {
        Coerced::Number(n) => format_fixed_width(n),
        Coerced::Unchanged(v) => v.to_string(),
    }
}

/// Rewrite a letters-then-digits identifier into an all-digit string.
///
/// Each letter becomes its three-digit character code and the numeric
/// suffix is appended verbatim, so `"m001"` becomes `"109001"` and sorts
/// before `"s001"` (`"115001"`). Anything else is returned unchanged.
pub fn normalize_alpha_numeric_id(id: &str) -> Cow<'_, str> {
    let Some(caps) = ALPHA_NUMERIC_ID.captures(id) else {
        return Cow::Borrowed(id);
    };
    let letters = &caps[1];
    let digits = &caps[2];

    let mut out = String::with_capacity(letters.len() * 3 + digits.len());
    for b in letters.bytes() {
        out.push_str(&format!("{b:03}"));
    }
    out.push_str(digits);
    Cow::Owned(out)
}

/// Sort key for a heterogeneous identifier: normalized, then fixed-width
/// formatted when numeric.
pub fn identifier_sort_key(id: &str) -> String {
    format_identifier_str(&normalize_alpha_numeric_id(id))
}
