//! Loosely typed truthiness
//!
//! Checkboxes, query strings and JSON bodies all encode "yes" differently; this folds them
//! into a plain `bool`.

use serde_json::Value;

/// Representations that count as `true`, compared case-insensitively
const TRUTHY: [&str; 6] = ["true", "t", "yes", "y", "on", "1"];

/// Coerce any value into a boolean
///
/// The value is rendered as a string first, anything not in the truthy table is `false`.
///
/// ```rust
/// use serde_json::json;
/// use tag_alias_request::truthy::truthy;
///
/// assert!(truthy(&json!("on")));
/// assert!(truthy(&json!(1)));
/// assert!(!truthy(&json!(null)));
/// ```
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(value) => *value,
        Value::Number(number) => is_truthy_str(&number.to_string()),
        Value::String(string) => is_truthy_str(string),
        Value::Array(_) | Value::Object(_) => false,
    }
}

fn is_truthy_str(value: &str) -> bool {
    TRUTHY
        .iter()
        .any(|truthy| truthy.eq_ignore_ascii_case(value))
}
