//! Error types for the Trunkline session layer.
//!
//! Only fatal conditions surface as errors: soft conditions (outer header
//! mismatch, undecodable HDLC frames, data frames outside the network
//! phase) are logged and dropped inside the session without interrupting
//! the mainloop. Transport-level failures are recovered locally via
//! reconnect and become errors only when reconnecting itself fails.

use thiserror::Error;
use trunkline_proto::{Code, Protocol, WireError};

use crate::phase::Phase;

/// Fatal session errors. Each one ends the session.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Datagram smaller than the minimum any valid frame can occupy.
    #[error("short packet received ({actual} bytes)")]
    ShortPacket {
        /// Bytes actually received.
        actual: usize,
    },

    /// PPP frame that cannot be decoded under the negotiated options.
    #[error("malformed PPP frame: {0}")]
    MalformedPpp(WireError),

    /// Configure-Request carrying malformed or unrecognised options.
    ///
    /// The whole request is rejected rather than answered with a
    /// Configure-Reject; the peer is expected to speak only the options
    /// this core knows.
    #[error("invalid options in {protocol:?} configure request")]
    InvalidOptions {
        /// Negotiation protocol the request arrived on.
        protocol: Protocol,
    },

    /// PPP protocol number outside the five this core carries.
    #[error("unsupported PPP protocol {protocol:#06x}")]
    UnsupportedProtocol {
        /// Raw protocol number from the inner header.
        protocol: u16,
    },

    /// The peer refused negotiation (Configure-Nak/Reject, Code-Reject or
    /// Protocol-Reject). Option refinement is not implemented, so any
    /// refusal is terminal.
    #[error("peer rejected {protocol:?} negotiation with {code:?}")]
    Rejected {
        /// Negotiation protocol the refusal arrived on.
        protocol: Protocol,
        /// Refusal code received.
        code: Code,
    },

    /// The phase machine reached a state this core does not support.
    #[error("unexpected phase {phase}")]
    UnexpectedPhase {
        /// The offending phase.
        phase: Phase,
    },

    /// Transport failed and could not be re-established.
    #[error("transport failure: {0}")]
    Transport(String),
}
