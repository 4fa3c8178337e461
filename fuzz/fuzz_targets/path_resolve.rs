//! Fuzz target for scheme-qualified path resolution

#![no_main]

use libfuzzer_sys::fuzz_target;
use tether_core::resolve;

fuzz_target!(|data: &[u8]| {
    let Ok(raw) = std::str::from_utf8(data) else {
        return;
    };

    match resolve(raw) {
        Ok(resolved) => {
            // Resolution is idempotent on its own output
            let again = resolve(&resolved.qualified()).expect("qualified path must resolve");
            assert_eq!(again.namespace, resolved.namespace);
            assert!(!resolved.file_name().contains('/'));
        }
        Err(_) => {
            let trimmed = raw.trim();
            assert!(!trimmed.starts_with("assets://") && !trimmed.starts_with("data://"));
        }
    }
});
