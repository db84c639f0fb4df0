//! Scripted collaborators for driving the tunnel mainloop
//! deterministically: a loopback transport with programmable write
//! behavior, a keepalive engine fed from a verdict script, and a virtual
//! clock.

#![allow(dead_code)]

use std::{cell::RefCell, collections::VecDeque, io, ops::Sub, rc::Rc, time::Duration};

use trunkline_core::{Environment, KeepaliveTimer, KeepaliveVerdict, TunnelTransport};

/// Virtual instant measured from the start of the test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TestInstant(pub Duration);

impl Sub for TestInstant {
    type Output = Duration;

    fn sub(self, rhs: Self) -> Duration {
        self.0 - rhs.0
    }
}

/// Shorthand for a test instant at `secs` seconds.
pub fn t(secs: u64) -> TestInstant {
    TestInstant(Duration::from_secs(secs))
}

/// Deterministic environment: fixed clock origin, constant entropy.
#[derive(Clone)]
pub struct TestEnv;

impl Environment for TestEnv {
    type Instant = TestInstant;

    fn now(&self) -> TestInstant {
        TestInstant(Duration::ZERO)
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        buffer.fill(0x5A);
    }
}

/// One scripted response to a transport write.
#[derive(Debug, Clone, Copy)]
pub enum WriteScript {
    /// Accept the whole buffer.
    Accept,
    /// Refuse with `WouldBlock`.
    WouldBlock,
    /// Accept only the first `n` bytes.
    Partial(usize),
    /// Fail with a connection error.
    Fail,
}

/// In-memory loopback transport.
///
/// Reads pop from `rx`; writes consult the `writes` script (accepting by
/// default) and every attempt's bytes are recorded for byte-identity
/// assertions.
#[derive(Debug, Default)]
pub struct ScriptTransport {
    pub rx: VecDeque<Vec<u8>>,
    pub writes: VecDeque<WriteScript>,
    pub attempts: Vec<Vec<u8>>,
    pub reconnects: usize,
}

/// Shared handle so tests keep access after the driver takes ownership.
#[derive(Debug, Clone)]
pub struct SharedTransport(Rc<RefCell<ScriptTransport>>);

impl std::ops::Deref for SharedTransport {
    type Target = RefCell<ScriptTransport>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Fresh shared transport.
pub fn shared_transport() -> SharedTransport {
    SharedTransport(Rc::new(RefCell::new(ScriptTransport::default())))
}

impl TunnelTransport for SharedTransport {
    fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut inner = self.borrow_mut();
        match inner.rx.pop_front() {
            Some(datagram) => {
                buf[..datagram.len()].copy_from_slice(&datagram);
                Ok(datagram.len())
            }
            None => Err(io::ErrorKind::WouldBlock.into()),
        }
    }

    fn send(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut inner = self.borrow_mut();
        inner.attempts.push(buf.to_vec());
        match inner.writes.pop_front().unwrap_or(WriteScript::Accept) {
            WriteScript::Accept => Ok(buf.len()),
            WriteScript::WouldBlock => Err(io::ErrorKind::WouldBlock.into()),
            WriteScript::Partial(n) => Ok(n.min(buf.len())),
            WriteScript::Fail => Err(io::ErrorKind::ConnectionReset.into()),
        }
    }

    fn reconnect(&mut self) -> io::Result<()> {
        self.borrow_mut().reconnects += 1;
        Ok(())
    }
}

/// Keepalive engine replaying a fixed verdict script, idle afterwards.
#[derive(Debug, Default)]
pub struct ScriptKeepalive {
    pub verdicts: VecDeque<KeepaliveVerdict>,
    pub rx_notes: usize,
}

/// Shared handle to a scripted keepalive engine.
#[derive(Debug, Clone)]
pub struct SharedKeepalive(Rc<RefCell<ScriptKeepalive>>);

impl std::ops::Deref for SharedKeepalive {
    type Target = RefCell<ScriptKeepalive>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Fresh shared keepalive engine.
pub fn shared_keepalive() -> SharedKeepalive {
    SharedKeepalive(Rc::new(RefCell::new(ScriptKeepalive::default())))
}

impl KeepaliveTimer<TestInstant> for SharedKeepalive {
    fn note_rx(&mut self, _now: TestInstant) {
        self.borrow_mut().rx_notes += 1;
    }

    fn verdict(&mut self, _now: TestInstant) -> KeepaliveVerdict {
        self.borrow_mut().verdicts.pop_front().unwrap_or(KeepaliveVerdict::Idle)
    }

    fn next_deadline(&self, _now: TestInstant) -> Option<Duration> {
        None
    }
}
