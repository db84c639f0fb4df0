//! Fuzz target for the control-packet decoder.
//!
//! Arbitrary PPP payloads must decode to a packet that re-encodes to the
//! identical bytes, or fail with a structured error. Never panic.

#![no_main]

use libfuzzer_sys::fuzz_target;
use trunkline_proto::ControlPacket;

fuzz_target!(|data: &[u8]| {
    if let Ok(packet) = ControlPacket::decode(data) {
        assert_eq!(packet.to_vec(), data);
    }
});
