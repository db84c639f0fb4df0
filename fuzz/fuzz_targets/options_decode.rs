//! Fuzz target for the PPP option list decoder.
//!
//! Arbitrary bytes must either decode into a list that re-encodes to the
//! same bytes, or fail with a structured error. Never panic.

#![no_main]

use libfuzzer_sys::fuzz_target;
use trunkline_proto::options;

fuzz_target!(|data: &[u8]| {
    if let Ok(decoded) = options::decode_options(data) {
        let mut wire = Vec::new();
        options::encode_options(&decoded, &mut wire).expect("decoded options re-encode");
        assert_eq!(wire, data);
    }
});
