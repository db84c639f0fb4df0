//! Inner PPP header framing and full tunnel encapsulation.
//!
//! The uncompressed inner header is `FF 03` (address, control) followed by
//! a two-byte big-endian protocol number. Two negotiated compressions can
//! shrink it: ACCOMP omits the address/control pair and PFCOMP sends a
//! single protocol byte when the value allows it. LCP frames are exempt
//! from both on send, since they are the frames that negotiate the
//! compressions in the first place.

use crate::{
    errors::{Result, WireError},
    hdlc,
    outer::OuterHeader,
    packet::{MAX_PPP_HEADER, Packet},
    proto::Protocol,
};

/// Address byte of an uncompressed PPP frame.
pub const ADDRESS: u8 = 0xFF;

/// Control byte of an uncompressed PPP frame.
pub const CONTROL: u8 = 0x03;

/// Outer encapsulation selected for the tunnel session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encapsulation {
    /// Raw F5 framing: outer header, then the PPP frame verbatim.
    F5Raw,
    /// F5 framing with HDLC byte stuffing applied to the PPP frame.
    F5Hdlc,
}

impl Encapsulation {
    /// Outer header bytes prepended to every datagram.
    #[must_use]
    pub fn header_len(self) -> usize {
        OuterHeader::SIZE
    }
}

/// Sender-side framing options: our negotiated `out` set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TxOptions {
    /// Omit the address/control pair on non-LCP frames.
    pub accomp: bool,
    /// Send single-byte protocol numbers when the value allows.
    pub pfcomp: bool,
    /// Async control character map for HDLC escaping of non-LCP frames.
    pub asyncmap: u32,
}

/// Receiver-side framing options: what the peer may have compressed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RxOptions {
    /// Peer may omit the address/control pair.
    pub accomp: bool,
    /// Peer may send single-byte protocol numbers.
    pub pfcomp: bool,
}

/// A decoded inner frame.
#[derive(Debug, PartialEq, Eq)]
pub struct InnerFrame<'a> {
    /// Raw 16-bit PPP protocol number. The dispatcher decides whether it
    /// is one this core carries.
    pub protocol: u16,
    /// Bytes following the protocol field.
    pub payload: &'a [u8],
    /// Observed address+control+protocol byte count (1..=4), feeding the
    /// receive-alignment hint.
    pub header_len: usize,
}

/// Inner header bytes for `protocol` under `opts`.
///
/// Returns the header buffer and the number of bytes used. LCP frames
/// always carry the full four bytes regardless of negotiated compression.
#[must_use]
pub fn ppp_header(protocol: Protocol, opts: &TxOptions) -> ([u8; MAX_PPP_HEADER], usize) {
    let raw = protocol.to_u16();
    let lcp = protocol == Protocol::Lcp;
    let mut header = [0u8; MAX_PPP_HEADER];
    let mut n = 0;

    if lcp || !opts.accomp {
        header[0] = ADDRESS;
        header[1] = CONTROL;
        n = 2;
    }

    if !lcp && opts.pfcomp && raw < 0x100 && raw & 1 == 1 {
        header[n] = raw as u8;
        n += 1;
    } else {
        header[n..n + 2].copy_from_slice(&raw.to_be_bytes());
        n += 2;
    }

    (header, n)
}

/// Decode the inner PPP header of `frame`.
///
/// `FF 03` is consumed when present. When absent it is tolerated only if
/// the peer negotiated ACCOMP. A single odd leading byte is taken as a
/// compressed protocol field only if the peer negotiated PFCOMP.
///
/// # Errors
///
/// - [`WireError::MalformedHeader`] when the address/control pair is
///   missing and ACCOMP is not in the incoming option set
/// - [`WireError::TooShort`] when the frame ends inside the header
pub fn decode_ppp<'a>(frame: &'a [u8], opts: &RxOptions) -> Result<InnerFrame<'a>> {
    let mut p = 0;

    if frame.len() >= 2 && frame[0] == ADDRESS && frame[1] == CONTROL {
        p = 2;
    } else if !opts.accomp {
        return Err(WireError::MalformedHeader);
    }

    let first = *frame
        .get(p)
        .ok_or(WireError::TooShort { expected: p + 1, actual: frame.len() })?;

    let protocol = if opts.pfcomp && first & 1 == 1 {
        p += 1;
        u16::from(first)
    } else {
        let second = *frame
            .get(p + 1)
            .ok_or(WireError::TooShort { expected: p + 2, actual: frame.len() })?;
        p += 2;
        u16::from_be_bytes([first, second])
    };

    Ok(InnerFrame { protocol, payload: &frame[p..], header_len: p })
}

/// Encapsulate `packet` for the tunnel.
///
/// Raw encapsulation prepends the inner header and then the outer header
/// backwards into the packet headroom, leaving the payload in place. HDLC
/// encapsulation escapes the whole PPP frame (header and payload) into a
/// rebuilt buffer, then leads with the outer header; LCP frames escape
/// under [`hdlc::ASYNCMAP_ALL`] because the peer has not learned our
/// asyncmap yet.
///
/// # Errors
///
/// [`WireError::FrameOverflow`] if the PPP frame cannot be described by
/// the 16-bit outer length field.
pub fn encapsulate(
    packet: &mut Packet,
    protocol: Protocol,
    opts: &TxOptions,
    encap: Encapsulation,
) -> Result<()> {
    let (header, n) = ppp_header(protocol, opts);

    match encap {
        Encapsulation::F5Raw => {
            let frame_len = n + packet.payload_len();
            let len = u16::try_from(frame_len)
                .map_err(|_| WireError::FrameOverflow { len: frame_len })?;
            packet.prepend(&header[..n])?;
            packet.prepend(&OuterHeader::new(len).to_bytes())?;
        }
        Encapsulation::F5Hdlc => {
            let asyncmap =
                if protocol == Protocol::Lcp { hdlc::ASYNCMAP_ALL } else { opts.asyncmap };
            let frame_len = hdlc::escaped_len(&header[..n], asyncmap)
                + hdlc::escaped_len(packet.payload(), asyncmap);
            let len = u16::try_from(frame_len)
                .map_err(|_| WireError::FrameOverflow { len: frame_len })?;

            let mut buf = Vec::with_capacity(OuterHeader::SIZE + frame_len);
            buf.extend_from_slice(&OuterHeader::new(len).to_bytes());
            hdlc::escape(&header[..n], asyncmap, &mut buf);
            hdlc::escape(packet.payload(), asyncmap, &mut buf);
            packet.set_wire(buf);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lcp_always_gets_the_full_header() {
        let opts = TxOptions { accomp: true, pfcomp: true, asyncmap: 0 };
        let (header, n) = ppp_header(Protocol::Lcp, &opts);
        assert_eq!(&header[..n], &[0xFF, 0x03, 0xC0, 0x21]);
    }

    #[test]
    fn accomp_drops_address_control() {
        let opts = TxOptions { accomp: true, pfcomp: false, asyncmap: 0 };
        let (header, n) = ppp_header(Protocol::Ipcp, &opts);
        assert_eq!(&header[..n], &[0x80, 0x21]);
    }

    #[test]
    fn pfcomp_shrinks_only_small_odd_protocols() {
        let opts = TxOptions { accomp: false, pfcomp: true, asyncmap: 0 };

        // IPv4 (0x0021) fits in one byte.
        let (header, n) = ppp_header(Protocol::Ipv4, &opts);
        assert_eq!(&header[..n], &[0xFF, 0x03, 0x21]);

        // IPCP (0x8021) does not.
        let (header, n) = ppp_header(Protocol::Ipcp, &opts);
        assert_eq!(&header[..n], &[0xFF, 0x03, 0x80, 0x21]);
    }

    #[test]
    fn decode_requires_address_control_without_accomp() {
        let opts = RxOptions::default();
        assert_eq!(decode_ppp(&[0x00, 0x21, 0xAA], &opts), Err(WireError::MalformedHeader));

        let frame = decode_ppp(&[0xFF, 0x03, 0x00, 0x21, 0xAA], &opts).unwrap();
        assert_eq!(frame.protocol, 0x0021);
        assert_eq!(frame.payload, &[0xAA]);
        assert_eq!(frame.header_len, 4);
    }

    #[test]
    fn decode_compressed_header() {
        let opts = RxOptions { accomp: true, pfcomp: true };
        let frame = decode_ppp(&[0x21, 0xAA, 0xBB], &opts).unwrap();
        assert_eq!(frame.protocol, 0x0021);
        assert_eq!(frame.payload, &[0xAA, 0xBB]);
        assert_eq!(frame.header_len, 1);
    }

    #[test]
    fn decode_even_first_byte_reads_two() {
        // PFCOMP negotiated, but 0x80 is even: two-byte protocol.
        let opts = RxOptions { accomp: true, pfcomp: true };
        let frame = decode_ppp(&[0x80, 0x21], &opts).unwrap();
        assert_eq!(frame.protocol, 0x8021);
        assert_eq!(frame.header_len, 2);
    }

    #[test]
    fn decode_truncated_header() {
        let opts = RxOptions::default();
        assert!(matches!(
            decode_ppp(&[0xFF, 0x03, 0xC0], &opts),
            Err(WireError::TooShort { .. })
        ));
    }

    #[test]
    fn raw_encapsulation_prepends_in_place() {
        let mut packet = Packet::control(Protocol::Lcp, &[9, 1, 0, 8, 1, 2, 3, 4]);
        let payload = packet.payload().to_vec();
        encapsulate(&mut packet, Protocol::Lcp, &TxOptions::default(), Encapsulation::F5Raw)
            .unwrap();

        let wire = packet.as_wire();
        assert_eq!(&wire[..4], &[0xF5, 0x00, 0x00, 0x0C]);
        assert_eq!(&wire[4..8], &[0xFF, 0x03, 0xC0, 0x21]);
        assert_eq!(&wire[8..], payload.as_slice());
    }

    #[test]
    fn hdlc_encapsulation_escapes_the_frame() {
        // Body contains 0x01, which the all-ones asyncmap must escape.
        let mut packet = Packet::control(Protocol::Lcp, &[0x01]);
        encapsulate(&mut packet, Protocol::Lcp, &TxOptions::default(), Encapsulation::F5Hdlc)
            .unwrap();

        // Control byte 0x03 escapes too; 0xFF, 0xC0 and 0x21 pass through.
        let wire = packet.as_wire();
        assert_eq!(&wire[..4], &[0xF5, 0x00, 0x00, 0x07]);
        assert_eq!(&wire[4..], &[0xFF, 0x7D, 0x23, 0xC0, 0x21, 0x7D, 0x21]);
    }
}
