// src/model/fields.rs
//! Lenient accessors for raw API objects.
//!
//! flickr is inconsistent about types: numbers arrive as strings or numbers,
//! text fields arrive as strings or `{"_content": ..}` objects.

use chrono::{DateTime, Utc};
use serde_json::Value;

/// A text field, with NUL characters removed.
pub(super) fn text(data: &Value, key: &str) -> Option<String> {
    let value = data.get(key)?;
    let raw = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Object(map) => map.get("_content")?.as_str()?.to_string(),
        _ => return None,
    };
    Some(strip_nul(&raw))
}

pub(super) fn integer(data: &Value, key: &str) -> Option<i64> {
    match data.get(key)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub(super) fn float(data: &Value, key: &str) -> Option<f64> {
    match data.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// A unix timestamp in seconds.
pub(super) fn unix_timestamp(data: &Value, key: &str) -> Option<DateTime<Utc>> {
    integer(data, key).and_then(|secs| DateTime::from_timestamp(secs, 0))
}

pub(super) fn strip_nul(value: &str) -> String {
    value.replace('\0', "")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_accepts_strings_numbers_and_content_objects() {
        let data = json!({
            "title": "harbour\u{0}",
            "server": 65535,
            "description": {"_content": "sunset"},
            "flag": true
        });
        assert_eq!(text(&data, "title").as_deref(), Some("harbour"));
        assert_eq!(text(&data, "server").as_deref(), Some("65535"));
        assert_eq!(text(&data, "description").as_deref(), Some("sunset"));
        assert_eq!(text(&data, "flag"), None);
        assert_eq!(text(&data, "missing"), None);
    }

    #[test]
    fn test_numbers_parse_from_strings() {
        let data = json!({"a": "16", "b": 4, "c": "60.17", "d": "x"});
        assert_eq!(integer(&data, "a"), Some(16));
        assert_eq!(integer(&data, "b"), Some(4));
        assert_eq!(float(&data, "c"), Some(60.17));
        assert_eq!(integer(&data, "d"), None);
    }
}
