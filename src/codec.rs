use serde::Serialize;

/// Acknowledgement sent back to the peer after every processed envelope.
/// Field order matters: the peer matches on the exact serialized shape.
#[derive(Debug, Serialize)]
pub struct ProcessedAck {
    pub status: String,
    pub symbol: String,
    pub action: String,
}

impl ProcessedAck {
    pub fn new(symbol: String, action: String) -> Self {
        Self {
            status: "processed".to_string(),
            symbol,
            action,
        }
    }
}

/// Extracts a string field from a flat envelope of the shape
/// `{"key":"value", ...}` by scanning for the literal `"key":"` pattern
/// and reading up to the next quote.
///
/// This is deliberately a narrow happy-path extractor, not a JSON parser.
/// Known limitations (kept on purpose, matching the wire contract):
/// - escaped quotes inside values truncate the result
/// - unquoted values (numbers, booleans) and nested objects are not found
/// - a key that is a suffix of another key can match the wrong field
pub fn extract_field(envelope: &str, key: &str) -> Option<String> {
    let pattern = format!("\"{}\":\"", key);
    let start = envelope.find(&pattern)? + pattern.len();
    let rest = &envelope[start..];
    let end = rest.find('"')?;
    Some(rest[..end].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_field_present() {
        let envelope = r#"{"action":"SUBSCRIBE","symbol":"GBPUSD"}"#;
        assert_eq!(extract_field(envelope, "symbol"), Some("GBPUSD".to_string()));
        assert_eq!(extract_field(envelope, "action"), Some("SUBSCRIBE".to_string()));
    }

    #[test]
    fn test_extract_field_absent() {
        let envelope = r#"{"foo":"bar"}"#;
        assert_eq!(extract_field(envelope, "symbol"), None);
    }

    #[test]
    fn test_extract_field_missing_closing_quote() {
        let envelope = r#"{"symbol":"EURUSD"#;
        assert_eq!(extract_field(envelope, "symbol"), None);
    }

    #[test]
    fn test_extract_field_empty_value() {
        let envelope = r#"{"symbol":""}"#;
        assert_eq!(extract_field(envelope, "symbol"), Some(String::new()));
    }

    #[test]
    fn test_extract_field_extra_fields_ignored() {
        let envelope = r#"{"action":"SUBSCRIBE","symbol":"EURUSD","nonce":"abc123"}"#;
        assert_eq!(extract_field(envelope, "symbol"), Some("EURUSD".to_string()));
    }

    #[test]
    fn test_ack_serializes_to_fixed_shape() {
        let ack = ProcessedAck::new("EURUSD".to_string(), "SUBSCRIBE".to_string());
        let json = serde_json::to_string(&ack).unwrap();
        assert_eq!(
            json,
            r#"{"status":"processed","symbol":"EURUSD","action":"SUBSCRIBE"}"#
        );
    }
}
