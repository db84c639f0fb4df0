//! Owned packet buffers with reserved encapsulation headroom.

use crate::{
    errors::{Result, WireError},
    outer::OuterHeader,
    proto::Protocol,
};

/// Largest possible inner PPP header: address, control, two protocol bytes.
pub const MAX_PPP_HEADER: usize = 4;

/// Headroom reserved in front of every payload so the framer can prepend
/// the outer and inner headers without moving the payload.
pub const HEADROOM: usize = OuterHeader::SIZE + MAX_PPP_HEADER;

/// A packet owned by exactly one stage of the pipeline.
///
/// The payload sits at a fixed offset into an owned buffer; encapsulation
/// headers are written backwards into the headroom, so a send never copies
/// the payload. Control-path packets carry the PPP protocol number to be
/// stamped at send time; data packets are stamped by inspecting the IP
/// version nibble instead.
///
/// # Invariants
///
/// - `head <= HEADROOM`: the head offset only ever moves backwards from
///   the initial headroom as headers are prepended.
/// - The bytes in `HEADROOM..` are the payload and are never moved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    buf: Vec<u8>,
    head: usize,
    protocol: Option<Protocol>,
}

impl Packet {
    /// Packet around a copied payload, headroom reserved.
    #[must_use]
    pub fn from_payload(payload: &[u8]) -> Self {
        let mut buf = Vec::with_capacity(HEADROOM + payload.len());
        buf.resize(HEADROOM, 0);
        buf.extend_from_slice(payload);
        Self { buf, head: HEADROOM, protocol: None }
    }

    /// Control-path packet carrying its protocol stamp.
    #[must_use]
    pub fn control(protocol: Protocol, payload: &[u8]) -> Self {
        let mut packet = Self::from_payload(payload);
        packet.protocol = Some(protocol);
        packet
    }

    /// Protocol stamp for control-path packets. `None` on the data path.
    #[must_use]
    pub fn protocol(&self) -> Option<Protocol> {
        self.protocol
    }

    /// Payload bytes, excluding any prepended headers.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.buf[HEADROOM..]
    }

    /// Payload length.
    #[must_use]
    pub fn payload_len(&self) -> usize {
        self.buf.len() - HEADROOM
    }

    /// The wire image: prepended headers followed by the payload.
    #[must_use]
    pub fn as_wire(&self) -> &[u8] {
        &self.buf[self.head..]
    }

    /// Wire image length.
    #[must_use]
    pub fn wire_len(&self) -> usize {
        self.buf.len() - self.head
    }

    /// Write `bytes` backwards into the headroom.
    ///
    /// # Errors
    ///
    /// [`WireError::NoHeadroom`] if the remaining headroom cannot hold
    /// `bytes`. With the fixed [`HEADROOM`] reservation this only fires on
    /// a framing logic error, never on well-formed traffic.
    pub fn prepend(&mut self, bytes: &[u8]) -> Result<()> {
        if bytes.len() > self.head {
            return Err(WireError::NoHeadroom { need: bytes.len(), have: self.head });
        }
        let start = self.head - bytes.len();
        self.buf[start..self.head].copy_from_slice(bytes);
        self.head = start;
        Ok(())
    }

    /// Replace the wire image wholesale.
    ///
    /// HDLC escaping expands the frame, so the escaped rendition cannot be
    /// built in place; the framer swaps in the rebuilt buffer here.
    pub(crate) fn set_wire(&mut self, buf: Vec<u8>) {
        self.buf = buf;
        self.head = 0;
    }
}
