//! Fuzz target for envelope encode/decode
//!
//! Structured input: every field of an encoded envelope must survive
//! decoding, and params must come back wrapped as a string literal.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use serde_json::Value;
use tether_core::Envelope;
use tether_core::envelope::unwrap_params;

#[derive(Debug, Arbitrary)]
struct Input {
    session_id: i32,
    file_name: String,
    file_path: String,
    params: Option<String>,
    content: Vec<u8>,
}

fuzz_target!(|input: Input| {
    let envelope = Envelope {
        session_id: input.session_id,
        file_size: input.content.len() as u32,
        file_name: input.file_name,
        file_path: input.file_path,
        params: input.params.map(Value::String),
        content: input.content,
    };

    let encoded = envelope.encode().expect("small envelopes always encode");
    let decoded = Envelope::decode(&encoded).expect("encoded envelope must decode");

    assert_eq!(decoded.session_id, envelope.session_id);
    assert_eq!(decoded.file_name, envelope.file_name);
    assert_eq!(decoded.file_path, envelope.file_path);
    assert_eq!(decoded.content, envelope.content);
    assert_eq!(
        decoded.params.as_ref().and_then(unwrap_params),
        envelope.params
    );
});
