//! Fuzz target for the session dispatcher.
//!
//! Feeds arbitrary datagram sequences into a live session. The session
//! may end with a structured error, but must never panic and must never
//! enter the network phase without full convergence.

#![no_main]

use std::{ops::Sub, time::Duration};

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use trunkline_core::{Environment, IpConfig, Phase, PppSession, SessionConfig};
use trunkline_proto::{Encapsulation, Protocol};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct FuzzInstant(u64);

impl Sub for FuzzInstant {
    type Output = Duration;

    fn sub(self, rhs: Self) -> Duration {
        Duration::from_millis(self.0 - rhs.0)
    }
}

#[derive(Clone)]
struct FuzzEnv;

impl Environment for FuzzEnv {
    type Instant = FuzzInstant;

    fn now(&self) -> FuzzInstant {
        FuzzInstant(0)
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        buffer.fill(0x42);
    }
}

#[derive(Debug, Arbitrary)]
struct Input {
    hdlc_framed: bool,
    want_ipv6: bool,
    datagrams: Vec<Vec<u8>>,
}

fuzz_target!(|input: Input| {
    let encap = if input.hdlc_framed { Encapsulation::F5Hdlc } else { Encapsulation::F5Raw };
    let mut session: PppSession<FuzzInstant> =
        PppSession::new(encap, true, input.want_ipv6, IpConfig::default(), SessionConfig::default());

    let mut clock = 0u64;
    for datagram in &input.datagrams {
        clock += 1;
        if session.tick(&FuzzEnv, FuzzInstant(clock)).is_err() {
            break;
        }

        if session.handle_datagram(datagram).is_err() {
            break;
        }

        if session.phase() == Phase::Network {
            assert!(session.converged(Protocol::Lcp));
        }
    }
});
