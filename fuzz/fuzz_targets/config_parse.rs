//! Fuzz target for transfer configuration parsing
//!
//! Arbitrary TOML must either fail to parse or yield a config whose
//! validation does not panic.

#![no_main]

use libfuzzer_sys::fuzz_target;
use tether_core::TransferConfig;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(config) = toml::from_str::<TransferConfig>(text) {
        let _ = config.validate();
    }
});
