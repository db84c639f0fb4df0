//! Fuzz target for the HDLC escape layer.
//!
//! Two properties:
//! - `unescape` of arbitrary bytes never panics; a truncated escape pair
//!   is a structured error.
//! - `unescape(escape(data, map))` is the identity for every data/map
//!   pair.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use trunkline_proto::hdlc;

#[derive(Debug, Arbitrary)]
struct Input {
    data: Vec<u8>,
    asyncmap: u32,
}

fuzz_target!(|input: Input| {
    // Arbitrary bytes: must never panic.
    let _ = hdlc::unescape(&input.data);

    // Round trip: must be the identity.
    let mut escaped = Vec::new();
    hdlc::escape(&input.data, input.asyncmap, &mut escaped);
    let restored = hdlc::unescape(&escaped).expect("escaped data always unescapes");
    assert_eq!(restored, input.data);
});
