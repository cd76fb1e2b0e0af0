//! Conversion of free text into typed cell values.
//!
//! Coercion never fails: text that does not parse as the column's type is
//! kept as `Value::Text`.

use super::table::{Column, DataType, Value};

/// Tokens that always denote a missing value, compared case-insensitively.
pub const MISSING_TOKENS: [&str; 5] = ["nan", "na", "<na>", "none", ""];

pub fn is_missing_token(text: &str) -> bool {
    MISSING_TOKENS
        .iter()
        .any(|token| text.eq_ignore_ascii_case(token))
}

/// Boolean reading of a token, shared by coercion and condition matching.
pub fn parse_bool_token(text: &str) -> Option<bool> {
    match text.to_ascii_lowercase().as_str() {
        "true" | "1" | "t" | "yes" => Some(true),
        "false" | "0" | "f" | "no" => Some(false),
        _ => None,
    }
}

pub fn parse_number(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok()
}

/// Spellings such as `-nan` or `+NaN` that parse as a float NaN.
pub fn is_nan_text(text: &str) -> bool {
    parse_number(text).is_some_and(f64::is_nan)
}

/// Best-guess value for text headed into a brand-new column.
pub fn infer_type(text: &str) -> Value {
    let trimmed = text.trim();
    if let Ok(i) = trimmed.parse::<i64>() {
        return Value::Integer(i);
    }
    if let Ok(f) = trimmed.parse::<f64>() {
        return if f.is_nan() {
            Value::Missing
        } else {
            Value::Float(f)
        };
    }
    if trimmed.eq_ignore_ascii_case("true") {
        return Value::Boolean(true);
    }
    if trimmed.eq_ignore_ascii_case("false") {
        return Value::Boolean(false);
    }
    Value::Text(text.to_string())
}

/// Type a new column should take given the raw values about to be written
/// into it.
pub fn infer_column_type<'a>(texts: impl IntoIterator<Item = &'a str>) -> DataType {
    let values: Vec<Value> = texts
        .into_iter()
        .filter(|t| !is_missing_token(t) && !is_nan_text(t))
        .map(infer_type)
        .collect();
    DataType::infer_from(&values)
}

pub fn cast_for_column(text: &str, column: &Column) -> Value {
    cast_to(text, column.data_type)
}

/// Cast `text` toward `data_type`, falling back to the original text.
pub fn cast_to(text: &str, data_type: DataType) -> Value {
    if is_missing_token(text) || is_nan_text(text) {
        return Value::Missing;
    }

    let fallback = || Value::Text(text.to_string());
    match data_type {
        DataType::Unknown => infer_type(text),
        DataType::Integer => {
            let trimmed = text.trim();
            if let Ok(i) = trimmed.parse::<i64>() {
                return Value::Integer(i);
            }
            // "10.0" is accepted and truncated
            match trimmed.parse::<f64>() {
                Ok(f) if f.is_finite() => Value::Integer(f.trunc() as i64),
                _ => fallback(),
            }
        }
        DataType::Float => parse_number(text).map(Value::Float).unwrap_or_else(fallback),
        DataType::Boolean => parse_bool_token(text)
            .map(Value::Boolean)
            .unwrap_or_else(fallback),
        DataType::Text => fallback(),
    }
}
