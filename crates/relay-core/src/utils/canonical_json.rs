//! Deterministic JSON rendering for cache keys.
//!
//! Object keys are emitted in sorted order at every depth, so `{"a":1,"b":2}` and
//! `{"b":2,"a":1}` render identically regardless of how `serde_json::Map` is configured
//! (the `preserve_order` feature of a dependent crate would otherwise leak insertion
//! order into cache keys).
//!
//! Strings are escaped with `serde_json`'s own escaper; non-ASCII text is written as-is.

use serde_json::Value;
use std::{cell::RefCell, fmt::Write};

thread_local! {
    /// Scratch buffer reused across renders on the same thread.
    static RENDER_BUFFER: RefCell<String> = RefCell::new(String::with_capacity(256));
}

/// Renders `value` as compact JSON with recursively sorted object keys.
///
/// # Example
///
/// ```
/// use relay_core::utils::canonical_json::to_canonical_string;
/// use serde_json::json;
///
/// let a = json!({"limit": 10, "tag": "steem"});
/// let b = json!({"tag": "steem", "limit": 10});
/// assert_eq!(to_canonical_string(&a), to_canonical_string(&b));
/// assert_eq!(to_canonical_string(&a), r#"{"limit":10,"tag":"steem"}"#);
/// ```
#[must_use]
pub fn to_canonical_string(value: &Value) -> String {
    RENDER_BUFFER.with(|buffer| {
        let mut buffer = buffer.borrow_mut();
        buffer.clear();
        write_canonical(value, &mut buffer);
        buffer.clone()
    })
}

/// Appends the canonical rendering of `value` to `out`.
pub fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(true) => out.push_str("true"),
        Value::Bool(false) => out.push_str("false"),
        Value::Number(n) => {
            // Writing into a String cannot fail
            let _ = write!(out, "{n}");
        }
        Value::String(s) => write_string(s, out),
        Value::Array(items) => {
            out.push('[');
            for (idx, item) in items.iter().enumerate() {
                if idx > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort_unstable();

            out.push('{');
            for (idx, key) in keys.into_iter().enumerate() {
                if idx > 0 {
                    out.push(',');
                }
                write_string(key, out);
                out.push(':');
                if let Some(item) = map.get(key) {
                    write_canonical(item, out);
                }
            }
            out.push('}');
        }
    }
}

fn write_string(s: &str, out: &mut String) {
    match serde_json::to_string(s) {
        Ok(escaped) => out.push_str(&escaped),
        // Serializing a &str is infallible; keep a quoted fallback rather than panicking
        Err(_) => {
            out.push('"');
            out.push_str(s);
            out.push('"');
        }
    }
}
