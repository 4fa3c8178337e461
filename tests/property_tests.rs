//! Property-based tests for Tether
//!
//! Uses proptest to verify invariants across large input spaces.

use proptest::prelude::*;

// ============================================================================
// Envelope Encoding/Decoding Properties
// ============================================================================

mod envelope_properties {
    use super::*;
    use serde_json::{Map, Value};
    use tether_core::envelope::{encode_utf16le, unwrap_params};
    use tether_core::{ENVELOPE_HEADER_SIZE, Envelope, EnvelopeHeader};

    fn params_strategy() -> impl Strategy<Value = Option<Value>> {
        prop::option::of(
            prop::collection::btree_map("[a-zA-Z0-9_ äöü🎵]{1,12}", any::<i64>(), 0..6).prop_map(
                |entries| {
                    Value::Object(
                        entries
                            .into_iter()
                            .map(|(k, v)| (k, Value::from(v)))
                            .collect::<Map<_, _>>(),
                    )
                },
            ),
        )
    }

    fn envelope_strategy() -> impl Strategy<Value = Envelope> {
        (
            any::<i32>(),
            "\\PC{0,24}",
            "\\PC{0,48}",
            params_strategy(),
            prop::collection::vec(any::<u8>(), 0..512),
        )
            .prop_map(|(session_id, file_name, file_path, params, content)| Envelope {
                session_id,
                file_size: content.len() as u32,
                file_name,
                file_path,
                params,
                content,
            })
    }

    proptest! {
        /// Decoding an encoded envelope recovers every field; params come
        /// back wrapped as a string literal of the encoded JSON text
        #[test]
        fn envelope_roundtrip(envelope in envelope_strategy()) {
            let encoded = envelope.encode().unwrap();
            let decoded = Envelope::decode(&encoded).unwrap();

            prop_assert_eq!(decoded.session_id, envelope.session_id);
            prop_assert_eq!(decoded.file_size, envelope.file_size);
            prop_assert_eq!(&decoded.file_name, &envelope.file_name);
            prop_assert_eq!(&decoded.file_path, &envelope.file_path);
            prop_assert_eq!(&decoded.content, &envelope.content);

            match (&envelope.params, &decoded.params) {
                (None, None) => {}
                (Some(sent), Some(received)) => {
                    prop_assert!(received.is_string());
                    let unwrapped = unwrap_params(received);
                    prop_assert_eq!(unwrapped.as_ref(), Some(sent));
                }
                (sent, received) => {
                    prop_assert!(false, "params mismatch: {:?} vs {:?}", sent, received);
                }
            }
        }

        /// Header lengths are the UTF-16LE byte lengths of the text fields
        #[test]
        fn header_lengths_match_fields(envelope in envelope_strategy()) {
            let encoded = envelope.encode().unwrap();
            let header = EnvelopeHeader::parse(&encoded).unwrap();

            prop_assert_eq!(header.file_name_len as usize, encode_utf16le(&envelope.file_name).len());
            prop_assert_eq!(header.file_path_len as usize, encode_utf16le(&envelope.file_path).len());
            prop_assert_eq!(header.file_name_len % 2, 0);
            prop_assert_eq!(header.file_path_len % 2, 0);
            prop_assert_eq!(header.params_len == 0, envelope.params.is_none());
            prop_assert_eq!(
                header.header_len() as usize + envelope.content.len(),
                encoded.len()
            );
        }

        /// Any strict prefix that cuts into the header or text fields fails
        /// cleanly instead of panicking
        #[test]
        fn truncated_envelope_rejected(envelope in envelope_strategy(), cut in any::<prop::sample::Index>()) {
            let encoded = envelope.encode().unwrap();
            let header = EnvelopeHeader::parse(&encoded).unwrap();
            let text_end = header.header_len() as usize;
            prop_assume!(text_end > 0);

            let at = cut.index(text_end);
            prop_assert!(Envelope::decode(&encoded[..at]).is_err());
        }

        /// Decoding arbitrary bytes never panics
        #[test]
        fn decode_arbitrary_bytes(data in prop::collection::vec(any::<u8>(), 0..256)) {
            let result = Envelope::decode(&data);
            if data.len() < ENVELOPE_HEADER_SIZE {
                prop_assert!(result.is_err());
            }
        }
    }
}

// ============================================================================
// Path Resolution Properties
// ============================================================================

mod path_properties {
    use super::*;
    use tether_core::{Namespace, resolve};

    proptest! {
        /// Inputs without a recognized scheme are always rejected
        #[test]
        fn unprefixed_paths_rejected(raw in "\\PC{0,40}") {
            let trimmed = raw.trim();
            prop_assume!(!trimmed.starts_with("assets://") && !trimmed.starts_with("data://"));
            prop_assert!(resolve(&raw).is_err());
        }

        /// A recognized scheme is stripped and the remainder kept verbatim
        #[test]
        fn prefixed_paths_stripped(
            assets in any::<bool>(),
            rest in "[a-zA-Z0-9_./ -]{0,40}[a-zA-Z0-9_.]",
        ) {
            let (scheme, namespace) = if assets {
                ("assets://", Namespace::Assets)
            } else {
                ("data://", Namespace::Data)
            };

            let resolved = resolve(&format!("{scheme}{rest}")).unwrap();
            prop_assert_eq!(resolved.namespace, namespace);
            prop_assert_eq!(&resolved.path, &rest);
            prop_assert_eq!(resolved.qualified(), format!("{scheme}{rest}"));
        }

        /// Surrounding whitespace does not change the result
        #[test]
        fn whitespace_padding_trimmed(
            rest in "[a-z0-9/]{0,20}[a-z0-9]",
            left in "[ \t\n]{0,4}",
            right in "[ \t\n]{0,4}",
        ) {
            let bare = resolve(&format!("data://{rest}")).unwrap();
            let padded = resolve(&format!("{left}data://{rest}{right}")).unwrap();
            prop_assert_eq!(bare, padded);
        }

        /// File names never contain a separator
        #[test]
        fn file_name_has_no_separator(rest in "[a-z/]{0,30}") {
            let resolved = resolve(&format!("data://{rest}")).unwrap();
            prop_assert!(!resolved.file_name().contains('/'));
            prop_assert!(rest.trim_end_matches('/').ends_with(resolved.file_name()));
        }
    }
}
