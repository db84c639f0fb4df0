//! Wire formats for the Trunkline PPP tunnel core.
//!
//! Everything in this crate is byte-exact encoding and decoding with no
//! session state: the HDLC escape layer, the PPP option (TLV) codec, the
//! F5 outer encapsulation header, the inner PPP header with its two field
//! compressions, and the control-packet header shared by LCP, IPCP and
//! IP6CP. The negotiation state machine that drives these formats lives in
//! `trunkline-core`.
//!
//! # Components
//!
//! - [`Packet`]: owned payload buffer with reserved encapsulation headroom
//! - [`OuterHeader`]: the 4-byte F5 tunnel header
//! - [`ControlPacket`]: `code id length body` control-protocol packets
//! - [`hdlc`]: RFC 1662 byte stuffing governed by a 32-bit asyncmap
//! - [`options`]: PPP configuration option lists
//! - [`framing`]: inner PPP header framing and full tunnel encapsulation

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod control;
mod errors;
pub mod framing;
pub mod hdlc;
pub mod options;
mod outer;
mod packet;
mod proto;

pub use control::{CONTROL_HEADER_LEN, ControlPacket};
pub use errors::{Result, WireError};
pub use framing::{Encapsulation, InnerFrame, RxOptions, TxOptions};
pub use options::ConfigOption;
pub use outer::OuterHeader;
pub use packet::{HEADROOM, MAX_PPP_HEADER, Packet};
pub use proto::{Code, Protocol};
