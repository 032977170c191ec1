//! Redaction of configured secret keys before values reach log output.

use serde_json::Value;

/// Replacement string for redacted values.
pub const REDACTED: &str = "[redacted]";

/// Recursively replace the value of any key named in `keys`.
///
/// Matching is case-insensitive on the key name; nested objects and
/// arrays are walked.
pub fn redact_value(value: &mut Value, keys: &[String]) {
    match value {
        Value::Object(map) => {
            for (key, entry) in map.iter_mut() {
                if keys.iter().any(|k| k.eq_ignore_ascii_case(key)) {
                    *entry = Value::String(REDACTED.to_string());
                } else {
                    redact_value(entry, keys);
                }
            }
        }
        Value::Array(items) => {
            for item in items.iter_mut() {
                redact_value(item, keys);
            }
        }
        _ => {}
    }
}

/// Redacted clone of a value, for logging.
pub fn redacted(value: &Value, keys: &[String]) -> Value {
    let mut out = value.clone();
    redact_value(&mut out, keys);
    out
}

#[cfg(test)]
#[path = "redact.test.rs"]
mod tests;
