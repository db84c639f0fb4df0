//! PPP link phase machine.
//!
//! ```text
//! ┌──────┐      ┌───────────┐  LCP converged  ┌────────┐  NCPs converged  ┌─────────┐
//! │ Dead │─────>│ Establish │────────────────>│ Opened │─────────────────>│ Network │
//! └──────┘      └───────────┘                 └────────┘                  └─────────┘
//!                     │                            │                           │
//!                     └────────────┬───────────────┴───────────────────────────┘
//!                                  ↓  Terminate-Request/Ack, fatal error
//!                            ┌───────────┐
//!                            │ Terminate │
//!                            └───────────┘
//! ```
//!
//! Progress is monotonic: the only backward edge is the jump from any
//! phase to `Terminate`. `Authenticate` exists in the RFC 1661 graph but
//! is unsupported here; reaching it ends the session.

use std::fmt;

/// Phase of the PPP link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    /// No activity yet; left on the first mainloop tick.
    Dead,
    /// LCP negotiation in progress.
    Establish,
    /// LCP converged; network control protocols negotiating.
    Opened,
    /// Authentication would run here. Unsupported: reaching this phase is
    /// a protocol error.
    Authenticate,
    /// All wanted NCPs converged; IP traffic flows in both directions.
    Network,
    /// Session over; the mainloop reports end-of-session.
    Terminate,
}

impl Phase {
    /// Human-readable phase name, used in transition logs.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Dead => "DEAD",
            Self::Establish => "ESTABLISH",
            Self::Opened => "OPENED",
            Self::Authenticate => "AUTHENTICATE",
            Self::Network => "NETWORK",
            Self::Terminate => "TERMINATE",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
