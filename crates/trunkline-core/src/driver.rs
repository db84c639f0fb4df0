//! The tunnel mainloop.
//!
//! `TunnelDriver` owns the session, the transport, the keepalive engine
//! and the three packet queues, and advances everything by one step per
//! [`TunnelDriver::tick`]. The ordering inside a tick is contractual:
//!
//! 1. reconnect if the transport needs it;
//! 2. evaluate phase transitions and enqueue due Configure-Requests;
//! 3. drain readable frames and dispatch them;
//! 4. retry a stalled outbound write with the identical bytes;
//! 5. execute the keepalive verdict;
//! 6. dequeue one packet — control before data — frame it and write.

use std::{io, time::Duration};

use tracing::{debug, info};
use trunkline_proto::{Packet, Protocol, framing};

use crate::{
    env::Environment,
    error::SessionError,
    keepalive::{KeepaliveTimer, KeepaliveVerdict},
    phase::Phase,
    queue::PacketQueue,
    session::{DEFAULT_MTU, PppSession, SessionAction},
    transport::TunnelTransport,
};

/// Floor for the per-tick read buffer; the negotiated MTU can only raise
/// it.
const READ_FLOOR: usize = 16384;

/// Result of one mainloop tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing happened; the caller may sleep until the next deadline.
    Idle,
    /// Frames moved or state advanced.
    Progress,
    /// The session is over; the caller should tear the transport down.
    Shutdown,
}

/// An outbound wire image pinned across ticks.
///
/// The TLS engine underneath may demand that a stalled write be retried
/// with exactly the same bytes, so the buffer is never rebuilt or moved
/// while unsent bytes remain.
#[derive(Debug)]
struct PendingWrite {
    wire: Vec<u8>,
    sent: usize,
}

/// The mainloop over one PPP tunnel session.
pub struct TunnelDriver<T, K, E>
where
    T: TunnelTransport,
    K: KeepaliveTimer<E::Instant>,
    E: Environment,
{
    session: PppSession<E::Instant>,
    env: E,
    transport: T,
    keepalive: K,
    control: PacketQueue,
    egress: PacketQueue,
    ingress: PacketQueue,
    pending: Option<PendingWrite>,
    needs_reconnect: bool,
    alt_data_transport: bool,
}

impl<T, K, E> TunnelDriver<T, K, E>
where
    T: TunnelTransport,
    K: KeepaliveTimer<E::Instant>,
    E: Environment,
{
    /// Build a driver around a fresh session.
    pub fn new(session: PppSession<E::Instant>, transport: T, keepalive: K, env: E) -> Self {
        Self {
            session,
            env,
            transport,
            keepalive,
            control: PacketQueue::new(),
            egress: PacketQueue::new(),
            ingress: PacketQueue::new(),
            pending: None,
            needs_reconnect: false,
            alt_data_transport: false,
        }
    }

    /// The session, for phase and option reads.
    #[must_use]
    pub fn session(&self) -> &PppSession<E::Instant> {
        &self.session
    }

    /// Current phase, for the embedding UX.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.session.phase()
    }

    /// Quit reason, once the session has one.
    #[must_use]
    pub fn quit_reason(&self) -> Option<&str> {
        self.session.quit_reason()
    }

    /// Queue an outbound IP packet from the tun device.
    pub fn enqueue_data(&mut self, packet: Packet) {
        self.egress.push_back(packet);
    }

    /// Take the next tunneled IP packet delivered by the peer.
    pub fn next_ingress(&mut self) -> Option<Packet> {
        self.ingress.pop_front()
    }

    /// Tell the driver whether an alternate transport owns data flow
    /// (e.g. a parallel DTLS channel). While true, the egress queue is
    /// left alone and idle-link keepalives ignore it.
    pub fn set_alt_data_transport(&mut self, owned_elsewhere: bool) {
        self.alt_data_transport = owned_elsewhere;
    }

    /// Narrow the caller's sleep to the earliest pending deadline: the
    /// next Configure-Request retransmit or the keepalive engine's own
    /// timer.
    #[must_use]
    pub fn timeout_hint(&self, now: E::Instant) -> Option<Duration> {
        match (self.session.next_deadline(now), self.keepalive.next_deadline(now)) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (Some(a), None) => Some(a),
            (None, Some(b)) => Some(b),
            (None, None) => None,
        }
    }

    /// Run one mainloop tick.
    ///
    /// `readable` is the caller's poll result for the transport; the
    /// driver drains frames until the transport would block.
    ///
    /// # Errors
    ///
    /// Fatal session errors end the session; [`Self::quit_reason`] may
    /// carry the peer-visible reason.
    pub fn tick(&mut self, readable: bool, now: E::Instant) -> Result<TickOutcome, SessionError> {
        let mut progress = false;

        // 1. Reconnect a torn transport before anything else.
        if self.needs_reconnect {
            self.transport
                .reconnect()
                .map_err(|err| SessionError::Transport(err.to_string()))?;
            info!("transport reconnected");
            self.needs_reconnect = false;
            progress = true;
        }

        // 2. Phase transitions and due Configure-Requests.
        let actions = self.session.tick(&self.env, now)?;
        progress |= !actions.is_empty();
        self.apply(actions);
        if self.session.phase() == Phase::Terminate {
            return Ok(TickOutcome::Shutdown);
        }

        // 3. Drain inbound frames.
        if readable {
            progress |= self.drain_rx(now)?;
        }

        // 4. Retry a stalled write with the identical bytes.
        if self.pending.is_some() {
            progress |= self.flush_pending();
        }

        // 5. Keepalive verdict.
        match self.keepalive.verdict(now) {
            KeepaliveVerdict::Idle => {}
            KeepaliveVerdict::Keepalive => {
                let data_idle = self.alt_data_transport || self.egress.is_empty();
                if self.control.is_empty() && data_idle && self.pending.is_none() {
                    let probe = self.session.keepalive_probe();
                    self.control.push_back(probe);
                    progress = true;
                }
            }
            KeepaliveVerdict::Dpd => {
                let probe = self.session.dpd_probe();
                self.control.push_back(probe);
                progress = true;
            }
            KeepaliveVerdict::Rekey | KeepaliveVerdict::PeerDead => {
                debug!("keepalive engine requested a fresh transport");
                self.needs_reconnect = true;
                return Ok(TickOutcome::Progress);
            }
        }

        // 6. Send one packet: control first, then data once the link
        // carries traffic and no alternate transport owns it.
        if self.pending.is_none() {
            let next = if self.control.is_empty() {
                if self.session.phase() == Phase::Network && !self.alt_data_transport {
                    self.egress.pop_front()
                } else {
                    None
                }
            } else {
                self.control.pop_front()
            };

            if let Some(packet) = next {
                self.transmit(packet)?;
                progress = true;
            }
        }

        Ok(if progress { TickOutcome::Progress } else { TickOutcome::Idle })
    }

    fn apply(&mut self, actions: Vec<SessionAction>) {
        for action in actions {
            match action {
                SessionAction::SendControl(packet) => self.control.push_back(packet),
                SessionAction::DeliverData(packet) => self.ingress.push_back(packet),
            }
        }
    }

    /// Read frames until the transport would block. Returns whether any
    /// frame arrived.
    fn drain_rx(&mut self, now: E::Instant) -> Result<bool, SessionError> {
        let mtu = usize::from(self.session.ip_config().mtu.unwrap_or(DEFAULT_MTU));
        let mut buf = vec![0u8; READ_FLOOR.max(mtu)];
        let mut progress = false;

        loop {
            match self.transport.recv(&mut buf) {
                Ok(0) => {
                    debug!("transport closed by peer, scheduling reconnect");
                    self.needs_reconnect = true;
                    break;
                }
                Ok(n) => {
                    progress = true;
                    // Receive activity is recorded before dispatch.
                    self.keepalive.note_rx(now);
                    let actions = self.session.handle_datagram(&buf[..n])?;
                    self.apply(actions);
                    if self.session.phase() == Phase::Terminate {
                        break;
                    }
                }
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => break,
                Err(err) => {
                    debug!(%err, "transport read failed, scheduling reconnect");
                    self.needs_reconnect = true;
                    break;
                }
            }
        }

        Ok(progress)
    }

    /// Push the pinned wire image. Returns whether bytes moved.
    fn flush_pending(&mut self) -> bool {
        let Some(pending) = self.pending.as_mut() else {
            return false;
        };

        match self.transport.send(&pending.wire[pending.sent..]) {
            Ok(n) => {
                pending.sent += n;
                if pending.sent == pending.wire.len() {
                    self.pending = None;
                }
                n > 0
            }
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => false,
            Err(err) => {
                debug!(%err, "transport write failed, scheduling reconnect");
                self.needs_reconnect = true;
                false
            }
        }
    }

    /// Frame and write one packet, pinning the bytes on a stall.
    fn transmit(&mut self, mut packet: Packet) -> Result<(), SessionError> {
        let protocol = packet.protocol().unwrap_or_else(|| data_protocol(packet.payload()));

        framing::encapsulate(
            &mut packet,
            protocol,
            &self.session.tx_options(),
            self.session.encapsulation(),
        )
        .map_err(SessionError::MalformedPpp)?;

        let wire = packet.as_wire().to_vec();
        match self.transport.send(&wire) {
            Ok(n) if n == wire.len() => {}
            Ok(n) => self.pending = Some(PendingWrite { wire, sent: n }),
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
                self.pending = Some(PendingWrite { wire, sent: 0 });
            }
            Err(err) => {
                debug!(%err, "transport write failed, scheduling reconnect");
                self.pending = Some(PendingWrite { wire, sent: 0 });
                self.needs_reconnect = true;
            }
        }

        Ok(())
    }
}

/// Stamp a data packet by its IP version nibble.
fn data_protocol(payload: &[u8]) -> Protocol {
    if payload.first().is_some_and(|byte| byte >> 4 == 6) {
        Protocol::Ipv6
    } else {
        Protocol::Ipv4
    }
}
