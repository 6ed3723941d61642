//! Envelope codec - raw message body to `StatEvent`

use crate::error::{IngestError, IngestResult};
use crate::models::StatEvent;

#[derive(Debug, Clone, Copy, Default)]
pub struct EnvelopeCodec;

impl EnvelopeCodec {
    pub fn new() -> Self {
        Self
    }

    /// Decode one UTF-8 JSON envelope
    pub fn decode(&self, bytes: &[u8]) -> IngestResult<StatEvent> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| IngestError::Decode(format!("body is not UTF-8: {}", e)))?;

        if text.trim().is_empty() {
            return Err(IngestError::Decode("empty body".to_string()));
        }

        Ok(serde_json::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::models::StatEventType;

    #[test]
    fn test_decode_detection_envelope() {
        let body = br#"{"type":"OBJECT_DETECTION","attributes":{"userId":"u1","score":0.5}}"#;
        let event = EnvelopeCodec::new().decode(body).unwrap();

        assert_eq!(event.event_type, StatEventType::ObjectDetection);
        assert_eq!(event.attributes["userId"], "u1");
        assert_eq!(event.attributes["score"], 0.5);
    }

    #[test]
    fn test_decode_other_type() {
        let body = br#"{"type":"VIDEO_CLASSIFICATION","attributes":{}}"#;
        let event = EnvelopeCodec::new().decode(body).unwrap();
        assert_eq!(event.event_type, StatEventType::VideoClassification);
    }

    #[test]
    fn test_missing_or_null_attributes_is_empty() {
        let codec = EnvelopeCodec::new();
        let a = codec.decode(br#"{"type":"OBJECT_TRACKING"}"#).unwrap();
        let b = codec.decode(br#"{"type":"OBJECT_TRACKING","attributes":null}"#).unwrap();
        assert!(a.attributes.is_empty());
        assert!(b.attributes.is_empty());
    }

    #[test]
    fn test_extra_fields_ignored() {
        let body = br#"{"type":"OBJECT_DETECTION","attributes":{},"emittedAt":123}"#;
        assert!(EnvelopeCodec::new().decode(body).is_ok());
    }

    #[test]
    fn test_decode_failures() {
        let codec = EnvelopeCodec::new();
        let bad: [&[u8]; 6] = [
            b"",
            b"not json",
            br#"{"attributes":{}}"#,
            br#"{"type":"SOMETHING_ELSE","attributes":{}}"#,
            br#"{"type":"OBJECT_DETECTION","attributes":[1,2]}"#,
            &[0xff, 0xfe, 0x00],
        ];

        for body in bad {
            let err = codec.decode(body).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Decode, "body {:?}", body);
        }
    }
}
