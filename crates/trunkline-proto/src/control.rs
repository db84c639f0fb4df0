//! Control-protocol packets: the Configure/Terminate/Echo family.
//!
//! LCP, IPCP and IP6CP all share the same packet layout inside the PPP
//! payload: `code:u8 id:u8 length:be16` followed by options or data, where
//! `length` covers all four header bytes plus the body.

use bytes::{BufMut, Bytes};

use crate::{
    errors::{Result, WireError},
    proto::Code,
};

/// Header bytes before the option/data region.
pub const CONTROL_HEADER_LEN: usize = 4;

/// A parsed control packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlPacket {
    /// Packet code.
    pub code: Code,
    /// Exchange identifier, echoed by replies.
    pub id: u8,
    /// Bytes after the four header bytes: options for the Configure
    /// family, ASCII reason text for Terminate, magic-number data for Echo.
    pub body: Bytes,
}

impl ControlPacket {
    /// Construct a packet.
    #[must_use]
    pub fn new(code: Code, id: u8, body: impl Into<Bytes>) -> Self {
        Self { code, id, body: body.into() }
    }

    /// Append the wire encoding to `dst`.
    pub fn encode(&self, dst: &mut impl BufMut) {
        dst.put_u8(self.code.to_u8());
        dst.put_u8(self.id);
        dst.put_u16((CONTROL_HEADER_LEN + self.body.len()) as u16);
        dst.put_slice(&self.body);
    }

    /// Wire encoding as an owned buffer.
    #[must_use]
    pub fn to_vec(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(CONTROL_HEADER_LEN + self.body.len());
        self.encode(&mut out);
        out
    }

    /// Parse a control packet from a PPP payload.
    ///
    /// The embedded `length` must equal the payload length exactly; frames
    /// whose outer accounting disagrees with the control header are
    /// rejected before any option parsing happens.
    ///
    /// # Errors
    ///
    /// - [`WireError::TooShort`] if the four header bytes are missing
    /// - [`WireError::UnknownCode`] for codes outside 1..=11
    /// - [`WireError::ControlLengthMismatch`] if `length` disagrees with
    ///   the payload size
    pub fn decode(payload: &[u8]) -> Result<Self> {
        if payload.len() < CONTROL_HEADER_LEN {
            return Err(WireError::TooShort {
                expected: CONTROL_HEADER_LEN,
                actual: payload.len(),
            });
        }

        let code = Code::from_u8(payload[0]).ok_or(WireError::UnknownCode(payload[0]))?;
        let claimed = u16::from_be_bytes([payload[2], payload[3]]) as usize;
        if claimed != payload.len() {
            return Err(WireError::ControlLengthMismatch { claimed, actual: payload.len() });
        }

        Ok(Self {
            code,
            id: payload[1],
            body: Bytes::copy_from_slice(&payload[CONTROL_HEADER_LEN..]),
        })
    }
}
