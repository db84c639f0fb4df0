//! The keepalive / dead-peer-detection engine consumed by the mainloop.
//!
//! Timer policy lives outside this core: the engine watches receive
//! activity and hands down one verdict per tick. The mainloop only
//! executes the verdicts — an idle-link Discard-Request for
//! [`KeepaliveVerdict::Keepalive`], an Echo-Request probe for
//! [`KeepaliveVerdict::Dpd`], and a reconnect for the rest.

use std::time::Duration;

/// Per-tick decision from the keepalive engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeepaliveVerdict {
    /// Nothing to do.
    Idle,
    /// The link has been quiet: send a keepalive if no traffic is queued.
    Keepalive,
    /// The peer has been quiet: probe it with an Echo-Request.
    Dpd,
    /// The outer transport wants a fresh connection.
    Rekey,
    /// The peer failed dead-peer detection.
    PeerDead,
}

/// Keepalive engine interface.
pub trait KeepaliveTimer<I> {
    /// Record receive activity. The mainloop calls this before
    /// dispatching every received frame.
    fn note_rx(&mut self, now: I);

    /// The verdict for this tick.
    fn verdict(&mut self, now: I) -> KeepaliveVerdict;

    /// Time until this engine next wants to run, used to narrow the
    /// caller's sleep. `None` when it has no pending deadline.
    fn next_deadline(&self, now: I) -> Option<Duration>;
}
