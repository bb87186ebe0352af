use std::io;
use std::net::{SocketAddr, UdpSocket};

use socket2::{Domain, Protocol, Socket, Type};
use tracing::trace;

use super::{SendOutcome, Transport};

/// Largest datagram a poll pass will accept.
const RECV_BUF_LEN: usize = 1 << 16;

/// Plain non-blocking UDP datagram transport.
///
/// Emitters connect the socket to the responder so replies and ICMP
/// rejections map back onto it; responders stay unconnected and answer
/// whatever source each probe came from.
pub struct UdpTransport {
    socket: UdpSocket,
    peer: Option<SocketAddr>,
    recv_buf: Vec<u8>,
}

impl UdpTransport {
    /// Bind a responder-side socket on `local`.
    pub fn bind(local: SocketAddr) -> io::Result<Self> {
        Ok(Self {
            socket: make_socket(local)?,
            peer: None,
            recv_buf: vec![0; RECV_BUF_LEN],
        })
    }

    /// Bind an ephemeral emitter-side socket connected to `peer`.
    pub fn connect(peer: SocketAddr) -> io::Result<Self> {
        let local: SocketAddr = if peer.is_ipv4() {
            ([0, 0, 0, 0], 0).into()
        } else {
            (std::net::Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = make_socket(local)?;
        socket.connect(peer)?;
        Ok(Self {
            socket,
            peer: Some(peer),
            recv_buf: vec![0; RECV_BUF_LEN],
        })
    }
}

fn make_socket(local: SocketAddr) -> io::Result<UdpSocket> {
    let domain = if local.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };
    let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    socket.bind(&local.into())?;
    socket.set_nonblocking(true)?;
    Ok(socket.into())
}

/// Map non-blocking send results onto the outcome taxonomy. Error kinds
/// outside it stay errors and are treated as fatal by the roles.
fn map_send(result: io::Result<usize>) -> io::Result<SendOutcome> {
    match result {
        Ok(n) => Ok(SendOutcome::Sent(n)),
        Err(e) => match e.kind() {
            io::ErrorKind::WouldBlock => Ok(SendOutcome::BackPressured),
            io::ErrorKind::ConnectionRefused | io::ErrorKind::NotConnected => {
                Ok(SendOutcome::NotConnected)
            }
            io::ErrorKind::Interrupted => Ok(SendOutcome::AdminAction),
            io::ErrorKind::BrokenPipe => Ok(SendOutcome::Closed),
            _ => Err(e),
        },
    }
}

impl Transport for UdpTransport {
    fn send(&mut self, buf: &[u8]) -> io::Result<SendOutcome> {
        match self.peer {
            Some(_) => map_send(self.socket.send(buf)),
            None => Ok(SendOutcome::NotConnected),
        }
    }

    fn send_to(&mut self, buf: &[u8], peer: SocketAddr) -> io::Result<SendOutcome> {
        map_send(self.socket.send_to(buf, peer))
    }

    fn poll(
        &mut self,
        handler: &mut dyn FnMut(&[u8], SocketAddr),
        max_items: usize,
    ) -> io::Result<usize> {
        let mut delivered = 0;
        for _ in 0..max_items {
            match self.socket.recv_from(&mut self.recv_buf) {
                Ok((len, peer)) => {
                    handler(&self.recv_buf[..len], peer);
                    delivered += 1;
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::ConnectionReset => {
                    // ICMP rejection surfaced on a connected socket; the
                    // send path will report NotConnected on its own.
                    trace!("recv raised connection reset, ignoring");
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(delivered)
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }
}
