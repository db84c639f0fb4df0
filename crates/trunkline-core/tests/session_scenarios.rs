//! End-to-end scenarios for the tunnel mainloop: bring-up, data flow,
//! keepalives, termination, HDLC escaping, and the write-stall contract.

mod common;

use common::{
    SharedKeepalive, SharedTransport, TestEnv, WriteScript, shared_keepalive, shared_transport, t,
};
use trunkline_core::{
    Environment, IpConfig, KeepaliveVerdict, Phase, PppSession, SessionConfig, TickOutcome,
    TunnelDriver,
};
use trunkline_proto::{
    Code, ControlPacket, Encapsulation, OuterHeader, Packet, Protocol, RxOptions, framing, hdlc,
};

type Driver = TunnelDriver<SharedTransport, SharedKeepalive, TestEnv>;

fn driver_for(
    encap: Encapsulation,
    want_ipv6: bool,
) -> (Driver, SharedTransport, SharedKeepalive) {
    let session =
        PppSession::new(encap, true, want_ipv6, IpConfig::default(), SessionConfig::default());
    let transport = shared_transport();
    let keepalive = shared_keepalive();
    let driver = TunnelDriver::new(session, transport.clone(), keepalive.clone(), TestEnv);
    (driver, transport, keepalive)
}

/// Decode a captured raw-F5 wire image. Our sender compresses non-LCP
/// headers, so the decode accepts both compressed and full forms.
fn decode_wire(wire: &[u8]) -> (u16, Vec<u8>) {
    let (_, frame) = OuterHeader::parse(wire).expect("outer header");
    let inner = framing::decode_ppp(frame, &RxOptions { accomp: true, pfcomp: true })
        .expect("inner header");
    (inner.protocol, inner.payload.to_vec())
}

fn wire_protocol(wire: &[u8]) -> u16 {
    decode_wire(wire).0
}

fn decode_control(wire: &[u8]) -> ControlPacket {
    let (_, payload) = decode_wire(wire);
    ControlPacket::decode(&payload).expect("control packet")
}

/// Peer-side framing: full outer header, full PPP header, no compression.
fn peer_frame(protocol: Protocol, payload: &[u8]) -> Vec<u8> {
    let raw = protocol.to_u16();
    let mut frame = vec![0xFF, 0x03];
    frame.extend_from_slice(&raw.to_be_bytes());
    frame.extend_from_slice(payload);

    let mut datagram = vec![0xF5, 0x00];
    datagram.extend_from_slice(&(frame.len() as u16).to_be_bytes());
    datagram.extend(frame);
    datagram
}

fn peer_control(protocol: Protocol, code: Code, id: u8, body: &[u8]) -> Vec<u8> {
    peer_frame(protocol, &ControlPacket::new(code, id, body.to_vec()).to_vec())
}

/// Walk a fresh driver to the Network phase over IPCP.
fn bring_up(driver: &mut Driver, transport: &SharedTransport) {
    driver.tick(false, t(0)).unwrap(); // our LCP request goes out

    transport
        .borrow_mut()
        .rx
        .push_back(peer_control(Protocol::Lcp, Code::ConfigureRequest, 1, &[]));
    transport.borrow_mut().rx.push_back(peer_control(Protocol::Lcp, Code::ConfigureAck, 1, &[]));
    driver.tick(true, t(1)).unwrap();

    driver.tick(false, t(1)).unwrap(); // Opened; IPCP request goes out
    assert_eq!(driver.phase(), Phase::Opened);

    transport
        .borrow_mut()
        .rx
        .push_back(peer_control(Protocol::Ipcp, Code::ConfigureRequest, 1, &[]));
    transport.borrow_mut().rx.push_back(peer_control(Protocol::Ipcp, Code::ConfigureAck, 1, &[]));
    driver.tick(true, t(2)).unwrap();

    driver.tick(false, t(2)).unwrap();
    assert_eq!(driver.phase(), Phase::Network);
}

#[test]
fn clean_lcp_bring_up() {
    let (mut driver, transport, _) = driver_for(Encapsulation::F5Raw, false);

    // Peer Configure-Request id=1: MRU 1500, magic 0x11223344.
    let datagram = hex::decode("f5000012ff03c0210101000e010405dc050611223344").unwrap();
    transport.borrow_mut().rx.push_back(datagram);

    let outcome = driver.tick(true, t(0)).unwrap();
    assert_eq!(outcome, TickOutcome::Progress);
    assert_eq!(driver.phase(), Phase::Establish);

    // The peer's options were absorbed.
    assert_eq!(driver.session().incoming().magic, Some([0x11, 0x22, 0x33, 0x44]));
    assert_eq!(driver.session().incoming().magic_word(), 0x1122_3344);
    assert_eq!(driver.session().ip_config().mtu, Some(1500));

    // First write: our own Configure-Request, queued before the read,
    // with the full LCP header (never compressed).
    let first = transport.borrow().attempts[0].clone();
    assert_eq!(&first[4..8], &[0xFF, 0x03, 0xC0, 0x21]);
    let request = decode_control(&first);
    assert_eq!(request.code, Code::ConfigureRequest);
    assert_eq!(request.id, 1);

    // Second tick flushes the Configure-Ack echoing the peer's options.
    driver.tick(false, t(0)).unwrap();
    let ack = decode_control(&transport.borrow().attempts[1]);
    assert_eq!(ack.code, Code::ConfigureAck);
    assert_eq!(ack.id, 1);
    assert_eq!(&ack.body[..], hex::decode("010405dc050611223344").unwrap().as_slice());
}

#[test]
fn phase_advances_to_network_and_delivers_data() {
    let (mut driver, transport, _) = driver_for(Encapsulation::F5Raw, false);
    bring_up(&mut driver, &transport);

    // An inbound IPv4 packet lands on the ingress queue byte-identical.
    let payload = [0x45, 0x00, 0x00, 0x14, 0xDE, 0xAD, 0xBE, 0xEF];
    transport.borrow_mut().rx.push_back(peer_frame(Protocol::Ipv4, &payload));
    driver.tick(true, t(3)).unwrap();

    let delivered = driver.next_ingress().expect("packet delivered");
    assert_eq!(delivered.payload(), &payload);
    assert!(driver.next_ingress().is_none());
}

#[test]
fn egress_data_held_until_network() {
    let (mut driver, transport, _) = driver_for(Encapsulation::F5Raw, false);

    // Queued before the link is up: must not be sent during bring-up.
    driver.enqueue_data(Packet::from_payload(&[0x45, 0x00, 0x00, 0x14]));
    driver.tick(false, t(0)).unwrap();
    for wire in &transport.borrow().attempts {
        assert_ne!(wire_protocol(wire), 0x0021, "data leaked before network phase");
    }

    bring_up(&mut driver, &transport);
    driver.tick(false, t(3)).unwrap();

    let last = transport.borrow().attempts.last().unwrap().clone();
    assert_eq!(wire_protocol(&last), 0x0021);
}

#[test]
fn ipv6_nibble_selects_the_protocol() {
    let (mut driver, transport, _) = driver_for(Encapsulation::F5Raw, false);
    bring_up(&mut driver, &transport);

    driver.enqueue_data(Packet::from_payload(&[0x60, 0x00, 0x00, 0x00]));
    driver.tick(false, t(3)).unwrap();
    let last = transport.borrow().attempts.last().unwrap().clone();
    assert_eq!(wire_protocol(&last), 0x0057);
}

#[test]
fn dpd_verdict_sends_echo_request_with_magic() {
    let (mut driver, transport, keepalive) = driver_for(Encapsulation::F5Raw, false);
    bring_up(&mut driver, &transport);
    let magic = driver.session().outgoing().magic.unwrap();

    keepalive.borrow_mut().verdicts.push_back(KeepaliveVerdict::Dpd);
    driver.tick(false, t(10)).unwrap();

    let probe = decode_control(transport.borrow().attempts.last().unwrap());
    assert_eq!(probe.code, Code::EchoRequest);
    assert_eq!(&probe.body[..], &magic);
}

#[test]
fn keepalive_verdict_respects_queued_traffic() {
    let (mut driver, transport, keepalive) = driver_for(Encapsulation::F5Raw, false);
    bring_up(&mut driver, &transport);
    let before = transport.borrow().attempts.len();

    // Data is queued: the idle-link keepalive is suppressed and the data
    // frame goes out instead.
    driver.enqueue_data(Packet::from_payload(&[0x45, 0x00, 0x00, 0x14]));
    keepalive.borrow_mut().verdicts.push_back(KeepaliveVerdict::Keepalive);
    driver.tick(false, t(10)).unwrap();
    assert_eq!(wire_protocol(&transport.borrow().attempts[before]), 0x0021);

    // Quiet queues: the Discard-Request goes out.
    keepalive.borrow_mut().verdicts.push_back(KeepaliveVerdict::Keepalive);
    driver.tick(false, t(20)).unwrap();
    let probe = decode_control(transport.borrow().attempts.last().unwrap());
    assert_eq!(probe.code, Code::DiscardRequest);
}

#[test]
fn control_takes_priority_over_data() {
    let (mut driver, transport, keepalive) = driver_for(Encapsulation::F5Raw, false);
    bring_up(&mut driver, &transport);
    let before = transport.borrow().attempts.len();

    // Both queues non-empty in the same tick.
    driver.enqueue_data(Packet::from_payload(&[0x45, 0x00, 0x00, 0x14]));
    keepalive.borrow_mut().verdicts.push_back(KeepaliveVerdict::Dpd);
    driver.tick(false, t(10)).unwrap();
    driver.tick(false, t(10)).unwrap();

    let attempts = transport.borrow().attempts.clone();
    assert_eq!(wire_protocol(&attempts[before]), 0xC021, "control frame first");
    assert_eq!(wire_protocol(&attempts[before + 1]), 0x0021, "data frame second");
}

#[test]
fn terminate_request_acks_then_shuts_down() {
    let (mut driver, transport, _) = driver_for(Encapsulation::F5Raw, false);
    driver.tick(false, t(0)).unwrap();

    transport
        .borrow_mut()
        .rx
        .push_back(peer_control(Protocol::Lcp, Code::TerminateRequest, 2, b"bye"));
    let outcome = driver.tick(true, t(1)).unwrap();
    assert_eq!(outcome, TickOutcome::Progress);

    // The Terminate-Ack was flushed before shutdown.
    let ack = decode_control(transport.borrow().attempts.last().unwrap());
    assert_eq!(ack.code, Code::TerminateAck);
    assert_eq!(ack.id, 2);
    assert_eq!(driver.quit_reason(), Some("bye"));

    assert_eq!(driver.tick(false, t(1)).unwrap(), TickOutcome::Shutdown);
}

#[test]
fn hdlc_encapsulation_escapes_control_bytes() {
    let (mut driver, transport, _) = driver_for(Encapsulation::F5Hdlc, false);
    driver.tick(false, t(0)).unwrap();

    let wire = transport.borrow().attempts[0].clone();
    assert_eq!(&wire[..2], &[0xF5, 0x00]);

    // The Configure-Request code byte 0x01 must appear as its escape
    // pair under the all-ones LCP asyncmap.
    let frame = &wire[4..];
    assert!(
        frame.windows(2).any(|pair| pair == [0x7D, 0x21]),
        "expected escaped 0x01 in {frame:02X?}"
    );

    // The unescaped frame is a normal LCP Configure-Request.
    let unescaped = hdlc::unescape(frame).unwrap();
    assert_eq!(&unescaped[..4], &[0xFF, 0x03, 0xC0, 0x21]);
    let request = ControlPacket::decode(&unescaped[4..]).unwrap();
    assert_eq!(request.code, Code::ConfigureRequest);
}

#[test]
fn stalled_write_is_retried_byte_identical() {
    let (mut driver, transport, _) = driver_for(Encapsulation::F5Raw, false);
    transport.borrow_mut().writes.push_back(WriteScript::WouldBlock);

    driver.tick(false, t(0)).unwrap(); // LCP request stalls
    driver.tick(false, t(1)).unwrap(); // retried from step 4

    let attempts = transport.borrow().attempts.clone();
    assert_eq!(attempts.len(), 2);
    assert_eq!(attempts[0], attempts[1], "stalled write must retry the same bytes");
}

#[test]
fn partial_write_resumes_where_it_stopped() {
    let (mut driver, transport, _) = driver_for(Encapsulation::F5Raw, false);
    transport.borrow_mut().writes.push_back(WriteScript::Partial(5));

    driver.tick(false, t(0)).unwrap();
    driver.tick(false, t(1)).unwrap();

    let attempts = transport.borrow().attempts.clone();
    assert_eq!(attempts.len(), 2);
    assert_eq!(attempts[1], attempts[0][5..].to_vec());
}

#[test]
fn failed_write_schedules_a_reconnect() {
    let (mut driver, transport, _) = driver_for(Encapsulation::F5Raw, false);
    transport.borrow_mut().writes.push_back(WriteScript::Fail);

    driver.tick(false, t(0)).unwrap();
    assert_eq!(transport.borrow().reconnects, 0);

    driver.tick(false, t(1)).unwrap();
    assert_eq!(transport.borrow().reconnects, 1);
}

#[test]
fn peer_dead_verdict_reconnects() {
    let (mut driver, transport, keepalive) = driver_for(Encapsulation::F5Raw, false);
    bring_up(&mut driver, &transport);

    keepalive.borrow_mut().verdicts.push_back(KeepaliveVerdict::PeerDead);
    driver.tick(false, t(30)).unwrap();
    driver.tick(false, t(30)).unwrap();
    assert_eq!(transport.borrow().reconnects, 1);
}

#[test]
fn alternate_data_transport_starves_the_egress_queue() {
    let (mut driver, transport, _) = driver_for(Encapsulation::F5Raw, false);
    bring_up(&mut driver, &transport);
    driver.set_alt_data_transport(true);

    let before = transport.borrow().attempts.len();
    driver.enqueue_data(Packet::from_payload(&[0x45, 0x00, 0x00, 0x14]));
    driver.tick(false, t(3)).unwrap();
    driver.tick(false, t(4)).unwrap();
    assert_eq!(transport.borrow().attempts.len(), before);
}

#[test]
fn timeout_hint_tracks_the_retransmit_deadline() {
    let (mut driver, _, _) = driver_for(Encapsulation::F5Raw, false);
    driver.tick(false, t(0)).unwrap();

    assert_eq!(driver.timeout_hint(t(1)), Some(std::time::Duration::from_secs(2)));

    // TestEnv entropy is fixed; the chosen magic is deterministic.
    assert_eq!(TestEnv.random_u32(), 0x5A5A_5A5A);
    assert_eq!(driver.session().outgoing().magic, Some([0x5A, 0x5A, 0x5A, 0x5A]));
}
