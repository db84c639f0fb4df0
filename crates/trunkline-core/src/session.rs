//! The PPP session state machine.
//!
//! `PppSession` uses the action pattern: methods take decapsulated bytes
//! and the current time, and return actions for the driver to execute.
//! This keeps the state machine pure (no I/O) and makes negotiation
//! directly testable with virtual clocks.
//!
//! Generic over `I` (the instant type) so production runs on
//! [`std::time::Instant`] while tests drive a virtual clock.

use std::{ops::Sub, time::Duration};

use bytes::Bytes;
use tracing::{debug, info};
use trunkline_proto::{
    Code, ControlPacket, Encapsulation, OuterHeader, Packet, Protocol, RxOptions, TxOptions,
    framing, hdlc,
};

use crate::{
    env::Environment,
    error::SessionError,
    link::{IpConfig, LinkOptions},
    ncp::Ncp,
    negotiate,
    phase::Phase,
};

/// How long to wait before retransmitting an unanswered
/// Configure-Request. There is no retry cap; a truly stuck session is
/// killed by the dead-peer detection layer.
pub const DEFAULT_RETRANSMIT_INTERVAL: Duration = Duration::from_secs(3);

/// MTU offered in LCP requests when the outer layer supplies none.
pub const DEFAULT_MTU: u16 = 1300;

/// Smallest datagram any valid frame can occupy. Shorter reads are fatal.
const MIN_DATAGRAM: usize = 8;

/// Actions returned by the session state machine.
///
/// The driver executes these: control packets go onto the control queue,
/// data packets onto the ingress queue. Fatal conditions are errors, not
/// actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    /// Queue this control packet for transmission.
    SendControl(Packet),

    /// Hand this tunneled IP packet to the ingress queue.
    DeliverData(Packet),
}

/// Session tunables.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Configure-Request retransmit interval.
    pub retransmit_interval: Duration,
    /// MTU offered when the IP configuration carries none.
    pub default_mtu: u16,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { retransmit_interval: DEFAULT_RETRANSMIT_INTERVAL, default_mtu: DEFAULT_MTU }
    }
}

/// The PPP session: phase machine, per-protocol negotiation records and
/// the negotiated option sets for both directions.
///
/// # Invariants
///
/// - The phase only moves forward along the graph in [`Phase`], except
///   that any phase may jump to `Terminate`.
/// - `Network` is entered only when LCP and every wanted NCP are
///   converged.
/// - The outgoing magic number is chosen on the first LCP request and
///   never changes for the lifetime of the session.
#[derive(Debug)]
pub struct PppSession<I>
where
    I: Copy + Ord + Sub<Output = Duration>,
{
    encap: Encapsulation,
    want_ipv4: bool,
    want_ipv6: bool,
    phase: Phase,
    lcp: Ncp<I>,
    ipcp: Ncp<I>,
    ip6cp: Ncp<I>,
    out: LinkOptions,
    inn: LinkOptions,
    ip: IpConfig,
    config: SessionConfig,
    next_id: u8,
    exp_ppp_header: usize,
    quit_reason: Option<String>,
}

impl<I> PppSession<I>
where
    I: Copy + Ord + Sub<Output = Duration>,
{
    /// Create a session in [`Phase::Dead`].
    #[must_use]
    pub fn new(
        encap: Encapsulation,
        want_ipv4: bool,
        want_ipv6: bool,
        ip: IpConfig,
        config: SessionConfig,
    ) -> Self {
        let mut out = LinkOptions::default();
        // We offer both field compressions in every LCP request and frame
        // accordingly once past LCP (which is itself exempt).
        out.flags.set_accomp();
        out.flags.set_pfcomp();

        Self {
            encap,
            want_ipv4,
            want_ipv6,
            phase: Phase::Dead,
            lcp: Ncp::new(),
            ipcp: Ncp::new(),
            ip6cp: Ncp::new(),
            out,
            inn: LinkOptions::default(),
            ip,
            config,
            next_id: 0,
            exp_ppp_header: 4,
            quit_reason: None,
        }
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Selected outer encapsulation.
    #[must_use]
    pub fn encapsulation(&self) -> Encapsulation {
        self.encap
    }

    /// Quit reason captured from the peer or a fatal condition.
    #[must_use]
    pub fn quit_reason(&self) -> Option<&str> {
        self.quit_reason.as_deref()
    }

    /// Host IP configuration, including any MTU the peer supplied.
    #[must_use]
    pub fn ip_config(&self) -> &IpConfig {
        &self.ip
    }

    /// Options we apply to outgoing frames.
    #[must_use]
    pub fn outgoing(&self) -> &LinkOptions {
        &self.out
    }

    /// Options the peer announced for frames it sends us.
    #[must_use]
    pub fn incoming(&self) -> &LinkOptions {
        &self.inn
    }

    /// Header size of the last received data frame (1..=4), used to
    /// pre-align receive buffers.
    #[must_use]
    pub fn expected_header_len(&self) -> usize {
        self.exp_ppp_header
    }

    /// Whether a negotiation protocol has converged. Always false for
    /// data protocols.
    #[must_use]
    pub fn converged(&self, protocol: Protocol) -> bool {
        match protocol {
            Protocol::Lcp => self.lcp.converged(),
            Protocol::Ipcp => self.ipcp.converged(),
            Protocol::Ip6cp => self.ip6cp.converged(),
            Protocol::Ipv4 | Protocol::Ipv6 => false,
        }
    }

    /// Framing options for transmissions.
    #[must_use]
    pub fn tx_options(&self) -> TxOptions {
        TxOptions {
            accomp: self.out.flags.accomp(),
            pfcomp: self.out.flags.pfcomp(),
            asyncmap: self.out.asyncmap,
        }
    }

    /// Framing options for reception, per the peer's announcements.
    #[must_use]
    pub fn rx_options(&self) -> RxOptions {
        RxOptions { accomp: self.inn.flags.accomp(), pfcomp: self.inn.flags.pfcomp() }
    }

    /// Evaluate phase transitions and emit any due Configure-Requests.
    ///
    /// Called once per mainloop tick, before I/O.
    ///
    /// # Errors
    ///
    /// [`SessionError::UnexpectedPhase`] if the machine lands in a phase
    /// this core does not support (authentication).
    pub fn tick<E: Environment>(
        &mut self,
        env: &E,
        now: I,
    ) -> Result<Vec<SessionAction>, SessionError> {
        let mut actions = Vec::new();

        if self.phase == Phase::Dead {
            self.advance(Phase::Establish);
        }

        if self.phase == Phase::Establish {
            if self.lcp.converged() {
                self.advance(Phase::Opened);
            } else if self.lcp.request_due(now, self.config.retransmit_interval) {
                actions.push(self.configure_request(Protocol::Lcp, env, now));
            }
        }

        if self.phase == Phase::Opened {
            let mut all_converged = true;
            for (wanted, protocol) in
                [(self.want_ipv4, Protocol::Ipcp), (self.want_ipv6, Protocol::Ip6cp)]
            {
                if !wanted || self.ncp(protocol).converged() {
                    continue;
                }
                all_converged = false;
                if self.ncp(protocol).request_due(now, self.config.retransmit_interval) {
                    actions.push(self.configure_request(protocol, env, now));
                }
            }
            if all_converged {
                self.advance(Phase::Network);
            }
        }

        if self.phase == Phase::Authenticate {
            // RFC 1661 has this phase; this core does not.
            self.quit_reason = Some("Unexpected state".to_string());
            self.advance(Phase::Terminate);
            return Err(SessionError::UnexpectedPhase { phase: Phase::Authenticate });
        }

        Ok(actions)
    }

    /// Time until the next Configure-Request retransmit. `None` when no
    /// retransmit is pending in the current phase.
    #[must_use]
    pub fn next_deadline(&self, now: I) -> Option<Duration> {
        let interval = self.config.retransmit_interval;
        let mut pending: Vec<&Ncp<I>> = Vec::new();

        match self.phase {
            Phase::Dead | Phase::Establish => pending.push(&self.lcp),
            Phase::Opened => {
                if self.want_ipv4 {
                    pending.push(&self.ipcp);
                }
                if self.want_ipv6 {
                    pending.push(&self.ip6cp);
                }
            }
            Phase::Authenticate | Phase::Network | Phase::Terminate => {}
        }

        pending
            .into_iter()
            .filter(|ncp| !ncp.progress.conf_ack_received())
            .map(|ncp| ncp.time_until_due(now, interval))
            .min()
    }

    /// Process one transport datagram: outer decapsulation, optional
    /// HDLC unescape, inner header, then dispatch by protocol.
    ///
    /// Soft conditions (bad outer header, undecodable HDLC, data outside
    /// the network phase) drop the frame and return no actions.
    ///
    /// # Errors
    ///
    /// Every error returned here is fatal for the session; where the
    /// protocol defines one, [`Self::quit_reason`] is set before
    /// returning.
    pub fn handle_datagram(&mut self, datagram: &[u8]) -> Result<Vec<SessionAction>, SessionError> {
        if datagram.len() < MIN_DATAGRAM {
            self.quit_reason = Some("Short packet received".to_string());
            return Err(SessionError::ShortPacket { actual: datagram.len() });
        }

        let (_, frame) = match OuterHeader::parse(datagram) {
            Ok(parsed) => parsed,
            Err(err) => {
                debug!(%err, "dropping datagram with bad outer header");
                return Ok(Vec::new());
            }
        };

        let unescaped;
        let frame = match self.encap {
            Encapsulation::F5Raw => frame,
            Encapsulation::F5Hdlc => match hdlc::unescape(frame) {
                Ok(bytes) => {
                    unescaped = bytes;
                    unescaped.as_slice()
                }
                Err(err) => {
                    debug!(%err, "dropping undecodable HDLC frame");
                    return Ok(Vec::new());
                }
            },
        };

        let inner =
            framing::decode_ppp(frame, &self.rx_options()).map_err(SessionError::MalformedPpp)?;

        let Some(protocol) = Protocol::from_u16(inner.protocol) else {
            return Err(SessionError::UnsupportedProtocol { protocol: inner.protocol });
        };

        if protocol.is_control() {
            let packet =
                ControlPacket::decode(inner.payload).map_err(SessionError::MalformedPpp)?;
            return self.handle_control(protocol, packet);
        }

        if self.phase != Phase::Network {
            debug!(phase = %self.phase, protocol = ?protocol, "dropping data frame outside network phase");
            return Ok(Vec::new());
        }

        if inner.header_len != self.exp_ppp_header {
            debug!(
                observed = inner.header_len,
                expected = self.exp_ppp_header,
                "updating receive alignment hint"
            );
            self.exp_ppp_header = inner.header_len;
        }

        Ok(vec![SessionAction::DeliverData(Packet::from_payload(inner.payload))])
    }

    /// Discard-Request keepalive for an otherwise idle link.
    pub fn keepalive_probe(&mut self) -> Packet {
        let id = self.take_id();
        control_packet(Protocol::Lcp, &ControlPacket::new(Code::DiscardRequest, id, Bytes::new()))
    }

    /// Echo-Request probe carrying our magic number, for dead-peer
    /// detection.
    pub fn dpd_probe(&mut self) -> Packet {
        let id = self.take_id();
        let magic = self.out.magic.unwrap_or([0; 4]);
        control_packet(
            Protocol::Lcp,
            &ControlPacket::new(Code::EchoRequest, id, magic.to_vec()),
        )
    }

    fn handle_control(
        &mut self,
        protocol: Protocol,
        packet: ControlPacket,
    ) -> Result<Vec<SessionAction>, SessionError> {
        match packet.code {
            Code::ConfigureRequest => {
                negotiate::absorb(protocol, &packet.body, &mut self.inn, &mut self.ip)?;
                {
                    let ncp = self.ncp_mut(protocol);
                    ncp.progress.set_conf_req_received();
                    ncp.progress.set_conf_ack_sent();
                }
                // Echo the exact option bytes back under the same id.
                let ack = ControlPacket::new(Code::ConfigureAck, packet.id, packet.body);
                Ok(vec![SessionAction::SendControl(control_packet(protocol, &ack))])
            }

            Code::ConfigureAck => {
                // The echoed options and id are deliberately not verified.
                self.ncp_mut(protocol).progress.set_conf_ack_received();
                Ok(Vec::new())
            }

            Code::EchoRequest => {
                if matches!(self.phase, Phase::Opened | Phase::Network) {
                    let magic = self.out.magic.unwrap_or([0; 4]);
                    let reply = ControlPacket::new(Code::EchoReply, packet.id, magic.to_vec());
                    Ok(vec![SessionAction::SendControl(control_packet(protocol, &reply))])
                } else {
                    debug!(phase = %self.phase, "dropping echo request before link open");
                    Ok(Vec::new())
                }
            }

            Code::EchoReply | Code::DiscardRequest => Ok(Vec::new()),

            Code::TerminateRequest => {
                {
                    let ncp = self.ncp_mut(protocol);
                    ncp.progress.set_term_req_received();
                    ncp.progress.set_term_ack_sent();
                }
                let ack = ControlPacket::new(Code::TerminateAck, packet.id, Bytes::new());
                let action = SessionAction::SendControl(control_packet(protocol, &ack));
                self.capture_quit_reason(&packet.body);
                self.advance(Phase::Terminate);
                Ok(vec![action])
            }

            Code::TerminateAck => {
                self.ncp_mut(protocol).progress.set_term_ack_received();
                self.capture_quit_reason(&packet.body);
                self.advance(Phase::Terminate);
                Ok(Vec::new())
            }

            Code::ConfigureNak | Code::ConfigureReject | Code::CodeReject | Code::ProtocolReject => {
                // Option refinement is not implemented; any refusal is
                // terminal.
                Err(SessionError::Rejected { protocol, code: packet.code })
            }
        }
    }

    fn configure_request<E: Environment>(
        &mut self,
        protocol: Protocol,
        env: &E,
        now: I,
    ) -> SessionAction {
        let body = match protocol {
            Protocol::Lcp => {
                let magic = self.ensure_magic(env);
                negotiate::lcp_request(&self.ip, magic, self.config.default_mtu)
            }
            Protocol::Ipcp => negotiate::ipcp_request(&self.ip),
            Protocol::Ip6cp => negotiate::ip6cp_request(&self.ip),
            Protocol::Ipv4 | Protocol::Ipv6 => unreachable!("data protocols do not negotiate"),
        };

        let ncp = self.ncp_mut(protocol);
        ncp.note_request_sent(now);
        let request = ControlPacket::new(Code::ConfigureRequest, ncp.request_id, body);
        SessionAction::SendControl(control_packet(protocol, &request))
    }

    /// Choose the outgoing magic number once, on the first LCP request.
    fn ensure_magic<E: Environment>(&mut self, env: &E) -> [u8; 4] {
        if let Some(magic) = self.out.magic {
            return magic;
        }
        let mut word = match self.inn.magic {
            Some(peer) => !u32::from_be_bytes(peer),
            None => env.random_u32(),
        };
        if word == 0 {
            word = 1;
        }
        let magic = word.to_be_bytes();
        self.out.magic = Some(magic);
        magic
    }

    fn capture_quit_reason(&mut self, body: &[u8]) {
        if !body.is_empty() {
            self.quit_reason = Some(String::from_utf8_lossy(body).into_owned());
        }
    }

    fn advance(&mut self, next: Phase) {
        info!(from = %self.phase, to = %next, "ppp phase transition");
        self.phase = next;
    }

    fn ncp(&self, protocol: Protocol) -> &Ncp<I> {
        match protocol {
            Protocol::Lcp => &self.lcp,
            Protocol::Ipcp => &self.ipcp,
            Protocol::Ip6cp => &self.ip6cp,
            Protocol::Ipv4 | Protocol::Ipv6 => unreachable!("data protocols have no NCP record"),
        }
    }

    fn ncp_mut(&mut self, protocol: Protocol) -> &mut Ncp<I> {
        match protocol {
            Protocol::Lcp => &mut self.lcp,
            Protocol::Ipcp => &mut self.ipcp,
            Protocol::Ip6cp => &mut self.ip6cp,
            Protocol::Ipv4 | Protocol::Ipv6 => unreachable!("data protocols have no NCP record"),
        }
    }

    fn take_id(&mut self) -> u8 {
        self.next_id = self.next_id.wrapping_add(1);
        if self.next_id == 0 {
            self.next_id = 1;
        }
        self.next_id
    }
}

fn control_packet(protocol: Protocol, packet: &ControlPacket) -> Packet {
    Packet::control(protocol, &packet.to_vec())
}
