// Cerabridge - Shift accumulator engine for ceramic line telemetry
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Best-effort JSON field extraction.
//!
//! Gateway payloads are loosely schema'd: a missing or mistyped numeric
//! field reads as 0 and processing continues. Only a payload that is not
//! JSON at all is rejected.

use serde_json::Value;

use crate::error::Result;

/// Parse an inbound data payload.
pub fn parse(text: &str) -> Result<Value> {
    Ok(serde_json::from_str(text)?)
}

/// Integer field with the schema-gap default of 0.
pub fn int_field(msg: &Value, key: &str) -> i64 {
    msg.get(key).and_then(Value::as_i64).unwrap_or(0)
}

/// Raw PLC word: the integer field truncated to 16 bits.
pub fn word(msg: &Value, key: &str) -> u16 {
    int_field(msg, key) as u16
}

/// Whether the key is present at all, regardless of type.
pub fn has_field(msg: &Value, key: &str) -> bool {
    msg.get(key).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse("not json").is_err());
        assert!(parse(r#"{"lineID":1}"#).is_ok());
    }

    #[test]
    fn test_int_field_defaults() {
        let msg = json!({"a": 7, "b": "text", "c": 1.5});
        assert_eq!(int_field(&msg, "a"), 7);
        assert_eq!(int_field(&msg, "b"), 0);
        assert_eq!(int_field(&msg, "c"), 0);
        assert_eq!(int_field(&msg, "missing"), 0);
    }

    #[test]
    fn test_word_truncates() {
        let msg = json!({"w": 0x18005, "n": -1});
        assert_eq!(word(&msg, "w"), 0x8005);
        assert_eq!(word(&msg, "n"), 0xFFFF);
        assert_eq!(word(&msg, "missing"), 0);
    }

    #[test]
    fn test_has_field() {
        let msg = json!({"boxesQ1": 0});
        assert!(has_field(&msg, "boxesQ1"));
        assert!(!has_field(&msg, "cajaCalidad"));
    }
}
