//! Type resolution
//!
//! Turns stored option text into native values. The order is fixed:
//!
//! 1. numeric-looking text becomes a number
//! 2. valid JSON is decoded (objects are resolved recursively)
//! 3. boolean tokens become booleans
//! 4. anything else stays a string
//!
//! Numbers are checked first so `"1"` and `"0"` stay numeric instead of
//! being read as booleans. Numeric text that would not print back the same
//! as a number (`"02134"`, `"1.10"`, integers wider than 64 bits) is kept as
//! the original string.

use serde_json::{Map, Number, Value};

use crate::models::StoredValue;

const TRUE_TOKENS: &[&str] = &["true", "yes", "on"];
const FALSE_TOKENS: &[&str] = &["false", "no", "off"];

/// Resolve a memoized value
pub fn resolve(value: &StoredValue) -> Value {
    match value {
        StoredValue::Text(text) => resolve_text(text),
        StoredValue::Typed(typed) => resolve_value(typed),
    }
}

/// Resolve raw stored text
pub fn resolve_text(text: &str) -> Value {
    if is_numeric(text) {
        return exact_number(text)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(text.to_string()));
    }

    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Value::Object(resolve_map(&map)),
        Ok(Value::String(decoded)) => parse_bool_token(&decoded)
            .map(Value::Bool)
            .unwrap_or(Value::String(decoded)),
        Ok(decoded) => decoded,
        Err(_) => parse_bool_token(text)
            .map(Value::Bool)
            .unwrap_or_else(|| Value::String(text.to_string())),
    }
}

/// Resolve an already structured value
///
/// Strings go through the text pipeline and objects are walked; numbers,
/// booleans, arrays and null pass through untouched.
pub fn resolve_value(value: &Value) -> Value {
    match value {
        Value::String(text) => resolve_text(text),
        Value::Object(map) => Value::Object(resolve_map(map)),
        other => other.clone(),
    }
}

fn resolve_map(map: &Map<String, Value>) -> Map<String, Value> {
    map.iter()
        .map(|(key, value)| (key.clone(), resolve_value(value)))
        .collect()
}

/// Check if text looks like a decimal number
///
/// Accepts an optional sign, digits with an optional fraction (or a bare
/// fraction like `.5`), and an optional exponent. Surrounding whitespace is
/// ignored.
fn is_numeric(text: &str) -> bool {
    let bytes = text.trim().as_bytes();
    let mut pos = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        pos += 1;
    }

    let int_digits = count_digits(&bytes[pos..]);
    pos += int_digits;

    let mut frac_digits = 0;
    if bytes.get(pos) == Some(&b'.') {
        pos += 1;
        frac_digits = count_digits(&bytes[pos..]);
        pos += frac_digits;
    }

    if int_digits == 0 && frac_digits == 0 {
        return false;
    }

    if matches!(bytes.get(pos), Some(b'e' | b'E')) {
        pos += 1;
        if matches!(bytes.get(pos), Some(b'+' | b'-')) {
            pos += 1;
        }
        let exp_digits = count_digits(&bytes[pos..]);
        if exp_digits == 0 {
            return false;
        }
        pos += exp_digits;
    }

    pos == bytes.len()
}

fn count_digits(bytes: &[u8]) -> usize {
    bytes.iter().take_while(|b| b.is_ascii_digit()).count()
}

/// Parse numeric text only when the number prints back to the same text
fn exact_number(text: &str) -> Option<Number> {
    let text = text.trim();
    let number = serde_json::from_str::<Number>(text).ok()?;
    (number.to_string() == text).then_some(number)
}

fn parse_bool_token(text: &str) -> Option<bool> {
    let token = text.trim().to_ascii_lowercase();
    if TRUE_TOKENS.contains(&token.as_str()) {
        Some(true)
    } else if FALSE_TOKENS.contains(&token.as_str()) {
        Some(false)
    } else {
        None
    }
}
