pub mod udp;

pub use udp::*;

#[cfg(test)]
pub(crate) mod scripted;

use std::io;
use std::net::SocketAddr;

/// Outcome of a non-blocking send attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Bytes accepted by the transport.
    Sent(usize),
    /// Transient: the transport cannot take more data right now.
    BackPressured,
    /// Transient: no peer is attached yet.
    NotConnected,
    /// Transient: the transport is reorganizing, try again shortly.
    AdminAction,
    /// Fatal: this session is closed.
    Closed,
    /// Fatal: the session's position limit was exceeded.
    PositionExceeded,
}

impl SendOutcome {
    /// Fatal outcomes end the role's session.
    pub fn is_fatal(self) -> bool {
        matches!(self, SendOutcome::Closed | SendOutcome::PositionExceeded)
    }

    pub fn is_sent(self) -> bool {
        matches!(self, SendOutcome::Sent(_))
    }
}

/// Datagram transport boundary driven by the role loops.
///
/// Implementations never block: `send` reports back-pressure instead of
/// waiting, and `poll` only delivers datagrams that are already
/// available. Unexpected I/O errors surface as `Err` and are fatal.
pub trait Transport: Send {
    /// Send to the session peer.
    fn send(&mut self, buf: &[u8]) -> io::Result<SendOutcome>;

    /// Send to an explicit peer, for replies.
    fn send_to(&mut self, buf: &[u8], peer: SocketAddr) -> io::Result<SendOutcome>;

    /// Deliver pending datagrams to `handler`, at most `max_items` of
    /// them. Returns the number delivered.
    fn poll(
        &mut self,
        handler: &mut dyn FnMut(&[u8], SocketAddr),
        max_items: usize,
    ) -> io::Result<usize>;

    fn local_addr(&self) -> io::Result<SocketAddr>;
}
