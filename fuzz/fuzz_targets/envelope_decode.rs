//! Fuzz target for envelope decoding
//!
//! The decoder must reject malformed input with an error, never a panic.

#![no_main]

use libfuzzer_sys::fuzz_target;
use tether_core::{Envelope, EnvelopeHeader};

fuzz_target!(|data: &[u8]| {
    let header = EnvelopeHeader::parse(data);

    if let Ok(envelope) = Envelope::decode(data) {
        // A successful decode implies the declared lengths fit the buffer
        let header = header.expect("decode succeeded without a header");
        assert!(header.header_len() <= data.len() as u64);
        assert_eq!(
            envelope.content.len() as u64,
            data.len() as u64 - header.header_len()
        );
        assert_eq!(envelope.params.is_none(), header.params_len == 0);
    }
});
