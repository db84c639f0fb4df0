//! Fuzz target for the full receive pipeline decoders: outer F5 header,
//! HDLC unescape, inner PPP header under every compression combination.
//!
//! All decode errors must be structured. Never panic, never over-read.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use trunkline_proto::{OuterHeader, RxOptions, framing, hdlc};

#[derive(Debug, Arbitrary)]
struct Input {
    datagram: Vec<u8>,
    accomp: bool,
    pfcomp: bool,
    hdlc_framed: bool,
}

fuzz_target!(|input: Input| {
    let Ok((_, frame)) = OuterHeader::parse(&input.datagram) else {
        return;
    };

    let unescaped;
    let frame = if input.hdlc_framed {
        match hdlc::unescape(frame) {
            Ok(bytes) => {
                unescaped = bytes;
                unescaped.as_slice()
            }
            Err(_) => return,
        }
    } else {
        frame
    };

    let opts = RxOptions { accomp: input.accomp, pfcomp: input.pfcomp };
    if let Ok(inner) = framing::decode_ppp(frame, &opts) {
        // The decoded regions always partition the frame.
        assert_eq!(inner.header_len + inner.payload.len(), frame.len());
        assert!(inner.header_len >= 1 && inner.header_len <= 4);
    }
});
