//! In-memory transport for role loop tests.

use std::collections::VecDeque;
use std::io;
use std::net::SocketAddr;

use super::{SendOutcome, Transport};

/// Transport whose inbound queue and send outcomes are scripted by the
/// test.
pub(crate) struct ScriptedTransport {
    pub inbound: VecDeque<(Vec<u8>, SocketAddr)>,
    pub sent: Vec<Vec<u8>>,
    pub sent_to: Vec<(Vec<u8>, SocketAddr)>,
    pub outcome: SendOutcome,
    local: SocketAddr,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self {
            inbound: VecDeque::new(),
            sent: Vec::new(),
            sent_to: Vec::new(),
            outcome: SendOutcome::Sent(0),
            local: ([127, 0, 0, 1], 4000).into(),
        }
    }

    pub fn push_inbound(&mut self, data: &[u8], peer: SocketAddr) {
        self.inbound.push_back((data.to_vec(), peer));
    }
}

impl Transport for ScriptedTransport {
    fn send(&mut self, buf: &[u8]) -> io::Result<SendOutcome> {
        self.sent.push(buf.to_vec());
        Ok(match self.outcome {
            SendOutcome::Sent(_) => SendOutcome::Sent(buf.len()),
            other => other,
        })
    }

    fn send_to(&mut self, buf: &[u8], peer: SocketAddr) -> io::Result<SendOutcome> {
        self.sent_to.push((buf.to_vec(), peer));
        Ok(match self.outcome {
            SendOutcome::Sent(_) => SendOutcome::Sent(buf.len()),
            other => other,
        })
    }

    fn poll(
        &mut self,
        handler: &mut dyn FnMut(&[u8], SocketAddr),
        max_items: usize,
    ) -> io::Result<usize> {
        let mut delivered = 0;
        while delivered < max_items {
            let Some((data, peer)) = self.inbound.pop_front() else {
                break;
            };
            handler(&data, peer);
            delivered += 1;
        }
        Ok(delivered)
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        Ok(self.local)
    }
}
