//! Envelope encoding and decoding.
//!
//! One envelope carries one whole file. All integers are little-endian and
//! all text is UTF-16LE, with lengths counted in bytes:
//!
//! ```text
//!  0                   4                   8                   12
//! +-------------------+-------------------+-------------------+
//! | session_id (i32)  | file_size (u32)   | name_len (u32)    |
//! +-------------------+-------------------+-------------------+
//! | path_len (u32)    | params_len (u32)  | file_name ...     |
//! +-------------------+-------------------+-------------------+
//! | file_path ...     | params (JSON) ... | content ...       |
//! +-------------------+-------------------+-------------------+
//! ```
//!
//! The content has no length field: it is everything after the header.
//! `file_size` is carried as declared metadata and is never checked against
//! the content length.

use serde_json::Value;

use crate::error::EnvelopeError;

/// Fixed part of the envelope header in bytes
pub const ENVELOPE_HEADER_SIZE: usize = 20;

/// Fixed header fields plus the declared text lengths
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvelopeHeader {
    /// Sender's session id
    pub session_id: i32,
    /// Declared file size
    pub file_size: u32,
    /// Byte length of the UTF-16LE file name
    pub file_name_len: u32,
    /// Byte length of the UTF-16LE file path
    pub file_path_len: u32,
    /// Byte length of the UTF-16LE params JSON, 0 if absent
    pub params_len: u32,
}

impl EnvelopeHeader {
    /// Parse the fixed 20-byte header
    ///
    /// Only the fixed part is checked here; [`Envelope::decode`] checks the
    /// declared lengths against the buffer.
    pub fn parse(data: &[u8]) -> Result<Self, EnvelopeError> {
        if data.len() < ENVELOPE_HEADER_SIZE {
            return Err(EnvelopeError::TooShort {
                expected: ENVELOPE_HEADER_SIZE,
                actual: data.len(),
            });
        }

        let word = |at: usize| [data[at], data[at + 1], data[at + 2], data[at + 3]];

        Ok(Self {
            session_id: i32::from_le_bytes(word(0)),
            file_size: u32::from_le_bytes(word(4)),
            file_name_len: u32::from_le_bytes(word(8)),
            file_path_len: u32::from_le_bytes(word(12)),
            params_len: u32::from_le_bytes(word(16)),
        })
    }

    /// Full header length: fixed part plus all text fields
    #[must_use]
    pub fn header_len(&self) -> u64 {
        ENVELOPE_HEADER_SIZE as u64
            + u64::from(self.file_name_len)
            + u64::from(self.file_path_len)
            + u64::from(self.params_len)
    }
}

/// A decoded or to-be-encoded file transfer envelope
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    /// Sender's session id
    pub session_id: i32,
    /// Declared file size
    pub file_size: u32,
    /// Base name of the file
    pub file_name: String,
    /// Scheme-qualified path of the file
    pub file_path: String,
    /// Caller metadata
    ///
    /// When encoding, this is serialized as JSON text. When decoding, it is
    /// the received text wrapped as a JSON string literal (see
    /// [`unwrap_params`] to recover the structured value).
    pub params: Option<Value>,
    /// File content
    pub content: Vec<u8>,
}

impl Envelope {
    /// Encode into the wire layout
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::FieldTooLarge`] if a text field does not fit
    /// its 32-bit length slot, or [`EnvelopeError::Params`] if params cannot
    /// be serialized.
    pub fn encode(&self) -> Result<Vec<u8>, EnvelopeError> {
        let file_name = encode_utf16le(&self.file_name);
        let file_path = encode_utf16le(&self.file_path);
        let params = match &self.params {
            Some(value) => {
                let json = serde_json::to_string(value)
                    .map_err(|e| EnvelopeError::Params(e.to_string()))?;
                encode_utf16le(&json)
            }
            None => Vec::new(),
        };

        let name_len = field_len("fileName", &file_name)?;
        let path_len = field_len("filePath", &file_path)?;
        let params_len = field_len("params", &params)?;

        let mut buf = Vec::with_capacity(
            ENVELOPE_HEADER_SIZE
                + file_name.len()
                + file_path.len()
                + params.len()
                + self.content.len(),
        );

        // Fixed header
        buf.extend_from_slice(&self.session_id.to_le_bytes());
        buf.extend_from_slice(&self.file_size.to_le_bytes());
        buf.extend_from_slice(&name_len.to_le_bytes());
        buf.extend_from_slice(&path_len.to_le_bytes());
        buf.extend_from_slice(&params_len.to_le_bytes());

        // Text fields
        buf.extend_from_slice(&file_name);
        buf.extend_from_slice(&file_path);
        buf.extend_from_slice(&params);

        // Content
        buf.extend_from_slice(&self.content);

        Ok(buf)
    }

    /// Decode from the wire layout
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::TooShort`] if the fixed header is incomplete
    /// and [`EnvelopeError::FieldOverflow`] if a declared length runs past
    /// the end of `data`.
    pub fn decode(data: &[u8]) -> Result<Self, EnvelopeError> {
        let header = EnvelopeHeader::parse(data)?;
        let mut reader = FieldReader::new(data, ENVELOPE_HEADER_SIZE);

        let file_name = decode_utf16le(reader.take("fileName", header.file_name_len)?);
        let file_path = decode_utf16le(reader.take("filePath", header.file_path_len)?);
        let params_bytes = reader.take("params", header.params_len)?;

        let params = if params_bytes.is_empty() {
            None
        } else {
            let text = decode_utf16le(params_bytes);
            let literal =
                serde_json::to_string(&text).map_err(|e| EnvelopeError::Params(e.to_string()))?;
            Some(Value::String(literal))
        };

        Ok(Self {
            session_id: header.session_id,
            file_size: header.file_size,
            file_name,
            file_path,
            params,
            content: reader.rest().to_vec(),
        })
    }
}

/// Recover the sender's structured params from a decoded envelope's params.
///
/// Decoding wraps the received JSON text in a JSON string literal; this
/// reverses both layers. Returns `None` if the value is not in that shape.
#[must_use]
pub fn unwrap_params(value: &Value) -> Option<Value> {
    let Value::String(literal) = value else {
        return None;
    };
    let text: String = serde_json::from_str(literal).ok()?;
    serde_json::from_str(&text).ok()
}

/// Bounds-checked sequential reader over the variable part of an envelope
struct FieldReader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> FieldReader<'a> {
    fn new(data: &'a [u8], offset: usize) -> Self {
        Self { data, offset }
    }

    fn take(&mut self, field: &'static str, length: u32) -> Result<&'a [u8], EnvelopeError> {
        let length = length as usize;
        let available = self.data.len() - self.offset;
        if length > available {
            return Err(EnvelopeError::FieldOverflow {
                field,
                offset: self.offset,
                length,
                available,
            });
        }

        let slice = &self.data[self.offset..self.offset + length];
        self.offset += length;
        Ok(slice)
    }

    fn rest(&self) -> &'a [u8] {
        &self.data[self.offset..]
    }
}

fn field_len(field: &'static str, bytes: &[u8]) -> Result<u32, EnvelopeError> {
    u32::try_from(bytes.len()).map_err(|_| EnvelopeError::FieldTooLarge {
        field,
        length: bytes.len(),
    })
}

/// Encode text as UTF-16LE bytes
#[must_use]
pub fn encode_utf16le(text: &str) -> Vec<u8> {
    text.encode_utf16().flat_map(u16::to_le_bytes).collect()
}

/// Decode UTF-16LE bytes
///
/// Unpaired surrogates become U+FFFD and a trailing odd byte is dropped.
#[must_use]
pub fn decode_utf16le(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    String::from_utf16_lossy(&units)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn note_envelope() -> Envelope {
        Envelope {
            session_id: 7,
            file_size: 10,
            file_name: "note.txt".to_string(),
            file_path: "data://note.txt".to_string(),
            params: None,
            content: b"0123456789".to_vec(),
        }
    }

    #[test]
    fn test_envelope_roundtrip() {
        let original = note_envelope();
        let encoded = original.encode().unwrap();
        let decoded = Envelope::decode(&encoded).unwrap();

        assert_eq!(decoded, original);
    }

    #[test]
    fn test_envelope_size_without_params() {
        let encoded = note_envelope().encode().unwrap();

        // 20 header + 16 name + 30 path + 10 content
        assert_eq!(encoded.len(), 76);
    }

    #[test]
    fn test_exact_layout() {
        let envelope = Envelope {
            session_id: -2,
            file_size: 0x0102_0304,
            file_name: "a".to_string(),
            file_path: "data://a".to_string(),
            params: Some(json!(1)),
            content: vec![0xEE, 0xFF],
        };
        let encoded = envelope.encode().unwrap();

        assert_eq!(&encoded[0..4], &[0xFE, 0xFF, 0xFF, 0xFF]);
        assert_eq!(&encoded[4..8], &[0x04, 0x03, 0x02, 0x01]);
        assert_eq!(&encoded[8..12], &[2, 0, 0, 0]);
        assert_eq!(&encoded[12..16], &[16, 0, 0, 0]);
        assert_eq!(&encoded[16..20], &[2, 0, 0, 0]);
        assert_eq!(&encoded[20..22], &[b'a', 0]);
        assert_eq!(&encoded[22..38], encode_utf16le("data://a").as_slice());
        assert_eq!(&encoded[38..40], &[b'1', 0]);
        assert_eq!(&encoded[40..], &[0xEE, 0xFF]);
    }

    #[test]
    fn test_params_decode_as_string_literal() {
        let mut envelope = note_envelope();
        envelope.params = Some(json!({"kind": "photo", "n": 3}));

        let decoded = Envelope::decode(&envelope.encode().unwrap()).unwrap();

        let expected_text = r#"{"kind":"photo","n":3}"#;
        let expected_literal = serde_json::to_string(expected_text).unwrap();
        assert_eq!(decoded.params, Some(Value::String(expected_literal)));
        assert_ne!(decoded.params, envelope.params);

        assert_eq!(
            unwrap_params(decoded.params.as_ref().unwrap()),
            envelope.params
        );
    }

    #[test]
    fn test_params_length_counts_bytes() {
        let mut envelope = note_envelope();
        envelope.params = Some(json!("é"));
        let encoded = envelope.encode().unwrap();
        let header = EnvelopeHeader::parse(&encoded).unwrap();

        // "\"é\"" is three UTF-16 code units
        assert_eq!(header.params_len, 6);
        assert_eq!(header.header_len(), 20 + 16 + 30 + 6);
    }

    #[test]
    fn test_non_bmp_text() {
        let mut envelope = note_envelope();
        envelope.file_name = "🎵.mp3".to_string();
        envelope.file_path = "data://🎵.mp3".to_string();
        let encoded = envelope.encode().unwrap();
        let header = EnvelopeHeader::parse(&encoded).unwrap();

        // surrogate pair (4 bytes) + ".mp3" (8 bytes)
        assert_eq!(header.file_name_len, 12);
        assert_eq!(Envelope::decode(&encoded).unwrap().file_name, "🎵.mp3");
    }

    #[test]
    fn test_content_length_ignores_file_size() {
        let mut envelope = note_envelope();
        envelope.file_size = 9999;
        let decoded = Envelope::decode(&envelope.encode().unwrap()).unwrap();

        assert_eq!(decoded.file_size, 9999);
        assert_eq!(decoded.content, b"0123456789");
    }

    #[test]
    fn test_empty_content() {
        let mut envelope = note_envelope();
        envelope.content.clear();
        let decoded = Envelope::decode(&envelope.encode().unwrap()).unwrap();
        assert!(decoded.content.is_empty());
    }

    #[test]
    fn test_envelope_too_short() {
        assert_eq!(
            Envelope::decode(&[0u8; 10]),
            Err(EnvelopeError::TooShort {
                expected: 20,
                actual: 10
            })
        );
    }

    #[test]
    fn test_name_length_overflow() {
        let mut encoded = note_envelope().encode().unwrap();
        encoded[8..12].copy_from_slice(&u32::MAX.to_le_bytes());

        assert!(matches!(
            Envelope::decode(&encoded),
            Err(EnvelopeError::FieldOverflow {
                field: "fileName",
                offset: 20,
                ..
            })
        ));
    }

    #[test]
    fn test_params_length_overflow() {
        let mut encoded = note_envelope().encode().unwrap();
        // 10 content bytes remain after the path; claim 11 bytes of params
        encoded[16..20].copy_from_slice(&11u32.to_le_bytes());

        assert_eq!(
            Envelope::decode(&encoded),
            Err(EnvelopeError::FieldOverflow {
                field: "params",
                offset: 66,
                length: 11,
                available: 10,
            })
        );
    }

    #[test]
    fn test_header_only() {
        let mut encoded = vec![0u8; ENVELOPE_HEADER_SIZE];
        encoded[0..4].copy_from_slice(&5i32.to_le_bytes());
        let decoded = Envelope::decode(&encoded).unwrap();

        assert_eq!(decoded.session_id, 5);
        assert!(decoded.file_name.is_empty());
        assert!(decoded.file_path.is_empty());
        assert!(decoded.params.is_none());
        assert!(decoded.content.is_empty());
    }

    #[test]
    fn test_lossy_text() {
        // unpaired high surrogate followed by an odd trailing byte
        assert_eq!(decode_utf16le(&[0x00, 0xD8, 0x41]), "\u{FFFD}");
        assert_eq!(decode_utf16le(&encode_utf16le("ok")), "ok");
    }

    #[test]
    fn test_unwrap_params_rejects_other_shapes() {
        assert_eq!(unwrap_params(&json!({"a": 1})), None);
        assert_eq!(unwrap_params(&json!("not a literal")), None);
    }
}
