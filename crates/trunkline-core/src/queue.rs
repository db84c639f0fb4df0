//! FIFO packet queues shared with the outer layers.
//!
//! Producers (the tun reader, UI events) enqueue; the mainloop dequeues.
//! Ownership of each [`Packet`] transfers cleanly on the handoff — the
//! core never holds a packet shared with another writer.

use std::collections::VecDeque;

use trunkline_proto::Packet;

/// A strict-FIFO packet queue with head peek.
#[derive(Debug, Default)]
pub struct PacketQueue {
    inner: VecDeque<Packet>,
}

impl PacketQueue {
    /// Empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self { inner: VecDeque::new() }
    }

    /// Enqueue at the tail.
    pub fn push_back(&mut self, packet: Packet) {
        self.inner.push_back(packet);
    }

    /// Dequeue from the head.
    pub fn pop_front(&mut self) -> Option<Packet> {
        self.inner.pop_front()
    }

    /// Peek at the head without dequeuing.
    #[must_use]
    pub fn peek(&self) -> Option<&Packet> {
        self.inner.front()
    }

    /// Number of queued packets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// True when nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
