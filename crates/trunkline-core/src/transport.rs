//! The non-blocking byte transport consumed by the mainloop.

use std::io;

/// A non-blocking, datagram-oriented byte pipe with a reconnect
/// capability — in production the TLS or DTLS tunnel.
///
/// Both directions follow the `std::io` non-blocking contract:
/// [`io::ErrorKind::WouldBlock`] means try again next tick. The underlying
/// TLS engine may require that a stalled write be retried with exactly the
/// same bytes; the driver honors that by pinning the in-flight buffer.
pub trait TunnelTransport {
    /// Read one whole datagram into `buf`, returning its length.
    ///
    /// `Ok(0)` means the peer closed the transport.
    ///
    /// # Errors
    ///
    /// [`io::ErrorKind::WouldBlock`] when no datagram is ready; any other
    /// error makes the driver schedule a reconnect.
    fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Write `buf`, returning how many bytes were consumed.
    ///
    /// # Errors
    ///
    /// [`io::ErrorKind::WouldBlock`] when the transport cannot accept the
    /// write; the driver will retry the identical bytes.
    fn send(&mut self, buf: &[u8]) -> io::Result<usize>;

    /// Tear down and re-establish the transport.
    ///
    /// # Errors
    ///
    /// A failure here is fatal for the session.
    fn reconnect(&mut self) -> io::Result<()>;
}
