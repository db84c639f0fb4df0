//! Sans-IO PPP negotiation engine and tunnel mainloop.
//!
//! [`PppSession`] is a pure state machine in the action style: it consumes
//! decapsulated datagrams and time, and returns actions for the driver to
//! execute. All I/O lives in [`TunnelDriver`], which owns the non-blocking
//! transport, the control and data queues, and the keepalive engine, and
//! implements the contractual per-tick ordering. This split keeps protocol
//! logic deterministic and directly testable with virtual time.
//!
//! # Components
//!
//! - [`PppSession`]: phase machine, NCP records, configure exchange
//! - [`TunnelDriver`]: mainloop tick over transport, queues and keepalive
//! - [`Environment`]: time and randomness abstraction for deterministic
//!   testing
//! - [`TunnelTransport`] / [`KeepaliveTimer`]: collaborator seams consumed
//!   by the driver

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod driver;
mod env;
mod error;
mod keepalive;
mod link;
mod ncp;
mod negotiate;
mod phase;
mod queue;
mod session;
mod transport;

pub use driver::{TickOutcome, TunnelDriver};
pub use env::{Environment, SystemEnv};
pub use error::SessionError;
pub use keepalive::{KeepaliveTimer, KeepaliveVerdict};
pub use link::{IpConfig, LinkOptions, OptionFlags};
pub use ncp::{Ncp, NcpProgress};
pub use phase::Phase;
pub use queue::PacketQueue;
pub use session::{
    DEFAULT_MTU, DEFAULT_RETRANSMIT_INTERVAL, PppSession, SessionAction, SessionConfig,
};
pub use transport::TunnelTransport;
