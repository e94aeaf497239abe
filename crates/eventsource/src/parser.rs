//! Line classifier
//!
//! Turns one raw protocol line into a [`LineRecord`]. Only single-line
//! `data:` fields are understood; `event:`, `id:` and `retry:` fields fall
//! through to [`LineRecord::Unrecognized`].

use tracing::{debug, trace, warn};

use crate::error::DecodeError;

/// Marker of a keep-alive line
pub const HEARTBEAT_MARKER: &str = ":heartbeat";

/// Marker of a payload line
pub const DATA_MARKER: &str = "data:";

/// Decoded payload of a `data:` line
pub type Payload = serde_json::Value;

/// Decoder for the text following the `data:` marker
pub trait PayloadDecoder: Send + Sync {
    fn decode(&self, text: &str) -> Result<Payload, DecodeError>;
}

/// Decodes payloads as JSON
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDecoder;

impl PayloadDecoder for JsonDecoder {
    fn decode(&self, text: &str) -> Result<Payload, DecodeError> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Classification of a single protocol line
#[derive(Debug, Clone, PartialEq)]
pub enum LineRecord {
    /// Empty line, empty payload, or payload that failed to decode
    Blank,
    /// Keep-alive signal
    Heartbeat,
    /// Successfully decoded payload
    Data(Payload),
    /// Anything else, kept verbatim for logging
    Unrecognized(String),
}

/// Classify one line
///
/// Decode failures are logged and reported as [`LineRecord::Blank`] so that
/// one malformed line never ends the stream.
pub fn classify(line: &str, decoder: &dyn PayloadDecoder) -> LineRecord {
    if line.is_empty() {
        return LineRecord::Blank;
    }

    if line.starts_with(HEARTBEAT_MARKER) {
        trace!("Got heartbeat");
        return LineRecord::Heartbeat;
    }

    if let Some(rest) = line.strip_prefix(DATA_MARKER) {
        let text = rest.trim();
        if text.is_empty() {
            return LineRecord::Blank;
        }

        return match decoder.decode(text) {
            Ok(payload) => LineRecord::Data(payload),
            Err(e) => {
                let preview = if text.len() > 100 {
                    format!("{}...", truncate(text, 100))
                } else {
                    text.to_string()
                };
                warn!(error = %e, data = %preview, "Failed parsing payload");
                LineRecord::Blank
            }
        };
    }

    debug!(line = %line, "Got something else");
    LineRecord::Unrecognized(line.to_string())
}

/// Cut `text` to at most `max` bytes on a char boundary
fn truncate(text: &str, max: usize) -> &str {
    let mut end = max.min(text.len());
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn run(line: &str) -> LineRecord {
        classify(line, &JsonDecoder)
    }

    #[test]
    fn test_blank_line() {
        assert_eq!(run(""), LineRecord::Blank);
    }

    #[test]
    fn test_heartbeat() {
        assert_eq!(run(":heartbeat"), LineRecord::Heartbeat);
        assert_eq!(run(":heartbeat 1700000000"), LineRecord::Heartbeat);
    }

    #[test]
    fn test_data_line() {
        assert_eq!(run(r#"data: {"x":1}"#), LineRecord::Data(json!({"x": 1})));
    }

    #[test]
    fn test_data_marker_spacing() {
        // The marker is stripped by its own length, not a fixed offset
        assert_eq!(run(r#"data:{"x":1}"#), LineRecord::Data(json!({"x": 1})));
        assert_eq!(run("data:   [1, 2]  "), LineRecord::Data(json!([1, 2])));
        assert_eq!(run("data:\t42"), LineRecord::Data(json!(42)));
    }

    #[test]
    fn test_empty_payload_is_blank() {
        assert_eq!(run("data:"), LineRecord::Blank);
        assert_eq!(run("data:    "), LineRecord::Blank);
    }

    #[test]
    fn test_malformed_payload_is_blank() {
        assert_eq!(run("data: {not valid json}"), LineRecord::Blank);
    }

    #[test]
    fn test_other_lines_unrecognized() {
        assert_eq!(
            run("event: update"),
            LineRecord::Unrecognized("event: update".to_string())
        );
        assert_eq!(
            run(": comment"),
            LineRecord::Unrecognized(": comment".to_string())
        );
    }

    #[test]
    fn test_custom_decoder() {
        struct Upper;
        impl PayloadDecoder for Upper {
            fn decode(&self, text: &str) -> Result<Payload, DecodeError> {
                Ok(Payload::String(text.to_uppercase()))
            }
        }

        assert_eq!(classify("data: abc", &Upper), LineRecord::Data(json!("ABC")));
    }

    #[test]
    fn test_truncate_char_boundary() {
        assert_eq!(truncate("héllo", 2), "h");
        assert_eq!(truncate("abc", 10), "abc");
    }
}
