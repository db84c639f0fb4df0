//! Error types for the Trunkline wire layer.
//!
//! Decode errors carry the numbers a log line needs (claimed vs actual
//! sizes, offending bytes). Whether an error is fatal for the session or
//! merely drops the frame is decided by the session layer, not here.

use thiserror::Error;

/// Result alias for wire-layer operations.
pub type Result<T> = std::result::Result<T, WireError>;

/// Errors produced while encoding or decoding tunnel wire formats.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WireError {
    /// Fewer bytes than the format requires.
    #[error("datagram too short: expected at least {expected} bytes, got {actual}")]
    TooShort {
        /// Minimum bytes the format requires.
        expected: usize,
        /// Bytes actually available.
        actual: usize,
    },

    /// Outer header magic bytes are not `F5 00`.
    #[error("bad outer header magic {found:#06x}")]
    BadMagic {
        /// The two leading bytes as received.
        found: u16,
    },

    /// Outer header length disagrees with the received datagram.
    #[error("outer length {claimed} does not match received payload of {actual} bytes")]
    LengthMismatch {
        /// Length claimed by the outer header.
        claimed: usize,
        /// PPP frame bytes actually received.
        actual: usize,
    },

    /// PPP frame lacks the `FF 03` prefix and ACCOMP was not negotiated.
    #[error("PPP frame lacks address/control bytes and ACCOMP is not negotiated")]
    MalformedHeader,

    /// HDLC frame ended in the middle of an escape pair.
    #[error("truncated escape sequence at end of HDLC frame")]
    TruncatedEscape,

    /// Option list violated the TLV bounds walk.
    #[error("malformed option list at offset {offset}")]
    MalformedOptions {
        /// Byte offset of the violating option header.
        offset: usize,
    },

    /// Option value cannot be represented in a one-byte length field.
    #[error("option value too long: {len} bytes")]
    OptionTooLong {
        /// Offending value length.
        len: usize,
    },

    /// Control packet `length` field disagrees with the PPP payload.
    #[error("control packet length {claimed} disagrees with payload of {actual} bytes")]
    ControlLengthMismatch {
        /// Length claimed by the control header.
        claimed: usize,
        /// PPP payload bytes actually present.
        actual: usize,
    },

    /// Control packet code outside the RFC 1661 range we handle.
    #[error("unknown control code {0}")]
    UnknownCode(u8),

    /// Packet headroom cannot hold the headers being prepended.
    #[error("insufficient packet headroom: need {need}, have {have}")]
    NoHeadroom {
        /// Header bytes to prepend.
        need: usize,
        /// Headroom bytes remaining.
        have: usize,
    },

    /// Encapsulated frame exceeds the 16-bit outer length field.
    #[error("frame of {len} bytes exceeds the outer length field")]
    FrameOverflow {
        /// Frame size that did not fit.
        len: usize,
    },
}
