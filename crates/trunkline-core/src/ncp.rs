//! Per-protocol negotiation records.
//!
//! Each of LCP, IPCP and IP6CP tracks its exchange progress as a small
//! bitfield plus the identifier and timestamp of our own outgoing
//! Configure-Request. A protocol is *converged* once a Configure-Ack has
//! been both sent and received.

use std::{ops::Sub, time::Duration};

/// Identifier stamped on every first Configure-Request of each protocol.
///
/// Retransmits reuse it rather than incrementing, matching the observable
/// behavior of deployed peers.
pub const FIRST_REQUEST_ID: u8 = 1;

/// Exchange progress flags for one negotiation protocol.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NcpProgress(u8);

impl NcpProgress {
    const CONF_REQ_SENT: u8 = 1 << 0;
    const CONF_REQ_RECEIVED: u8 = 1 << 1;
    const CONF_ACK_SENT: u8 = 1 << 2;
    const CONF_ACK_RECEIVED: u8 = 1 << 3;
    const TERM_REQ_SENT: u8 = 1 << 4;
    const TERM_REQ_RECEIVED: u8 = 1 << 5;
    const TERM_ACK_SENT: u8 = 1 << 6;
    const TERM_ACK_RECEIVED: u8 = 1 << 7;

    /// No progress yet.
    #[must_use]
    pub fn new() -> Self {
        Self(0)
    }

    /// We have sent a Configure-Request.
    #[must_use]
    pub fn conf_req_sent(self) -> bool {
        self.0 & Self::CONF_REQ_SENT != 0
    }

    /// Record that we sent a Configure-Request.
    pub fn set_conf_req_sent(&mut self) {
        self.0 |= Self::CONF_REQ_SENT;
    }

    /// The peer has sent us a Configure-Request.
    #[must_use]
    pub fn conf_req_received(self) -> bool {
        self.0 & Self::CONF_REQ_RECEIVED != 0
    }

    /// Record a received Configure-Request.
    pub fn set_conf_req_received(&mut self) {
        self.0 |= Self::CONF_REQ_RECEIVED;
    }

    /// We have acknowledged the peer's request.
    #[must_use]
    pub fn conf_ack_sent(self) -> bool {
        self.0 & Self::CONF_ACK_SENT != 0
    }

    /// Record that we sent a Configure-Ack.
    pub fn set_conf_ack_sent(&mut self) {
        self.0 |= Self::CONF_ACK_SENT;
    }

    /// The peer has acknowledged our request.
    #[must_use]
    pub fn conf_ack_received(self) -> bool {
        self.0 & Self::CONF_ACK_RECEIVED != 0
    }

    /// Record a received Configure-Ack.
    pub fn set_conf_ack_received(&mut self) {
        self.0 |= Self::CONF_ACK_RECEIVED;
    }

    /// We have asked the peer to close.
    #[must_use]
    pub fn term_req_sent(self) -> bool {
        self.0 & Self::TERM_REQ_SENT != 0
    }

    /// Record that we sent a Terminate-Request.
    pub fn set_term_req_sent(&mut self) {
        self.0 |= Self::TERM_REQ_SENT;
    }

    /// The peer has asked us to close.
    #[must_use]
    pub fn term_req_received(self) -> bool {
        self.0 & Self::TERM_REQ_RECEIVED != 0
    }

    /// Record a received Terminate-Request.
    pub fn set_term_req_received(&mut self) {
        self.0 |= Self::TERM_REQ_RECEIVED;
    }

    /// We have acknowledged the peer's close.
    #[must_use]
    pub fn term_ack_sent(self) -> bool {
        self.0 & Self::TERM_ACK_SENT != 0
    }

    /// Record that we sent a Terminate-Ack.
    pub fn set_term_ack_sent(&mut self) {
        self.0 |= Self::TERM_ACK_SENT;
    }

    /// The peer has acknowledged our close.
    #[must_use]
    pub fn term_ack_received(self) -> bool {
        self.0 & Self::TERM_ACK_RECEIVED != 0
    }

    /// Record a received Terminate-Ack.
    pub fn set_term_ack_received(&mut self) {
        self.0 |= Self::TERM_ACK_RECEIVED;
    }

    /// Converged: a Configure-Ack has been both sent and received.
    #[must_use]
    pub fn converged(self) -> bool {
        self.conf_ack_sent() && self.conf_ack_received()
    }
}

/// Negotiation record for one protocol.
///
/// # Invariants
///
/// - `conf_req_sent()` implies `last_request` is set, and `request_id`
///   equals the id used in that request until superseded.
#[derive(Debug, Clone, Copy)]
pub struct Ncp<I> {
    /// Exchange progress flags.
    pub progress: NcpProgress,
    /// Identifier carried by our outgoing Configure-Request.
    pub request_id: u8,
    /// When we last emitted a Configure-Request.
    pub last_request: Option<I>,
}

impl<I> Ncp<I>
where
    I: Copy + Ord + Sub<Output = Duration>,
{
    /// Fresh record with no progress.
    #[must_use]
    pub fn new() -> Self {
        Self { progress: NcpProgress::new(), request_id: 0, last_request: None }
    }

    /// Converged in both directions.
    #[must_use]
    pub fn converged(&self) -> bool {
        self.progress.converged()
    }

    /// A Configure-Request is due: no acknowledgement yet and either no
    /// request was ever sent or the retransmit interval has elapsed.
    #[must_use]
    pub fn request_due(&self, now: I, interval: Duration) -> bool {
        if self.progress.conf_ack_received() {
            return false;
        }
        match self.last_request {
            None => true,
            Some(last) => now - last >= interval,
        }
    }

    /// Time remaining until the next retransmit. Zero when already due.
    #[must_use]
    pub fn time_until_due(&self, now: I, interval: Duration) -> Duration {
        match self.last_request {
            None => Duration::ZERO,
            Some(last) => interval.saturating_sub(now - last),
        }
    }

    /// Record the emission of a Configure-Request.
    pub fn note_request_sent(&mut self, now: I) {
        self.progress.set_conf_req_sent();
        self.request_id = FIRST_REQUEST_ID;
        self.last_request = Some(now);
    }
}

impl<I> Default for Ncp<I>
where
    I: Copy + Ord + Sub<Output = Duration>,
{
    fn default() -> Self {
        Self::new()
    }
}
