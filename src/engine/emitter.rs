use anyhow::{Result, bail};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::FRAGMENT_LIMIT;
use super::idle::IdleStrategy;
use super::render_store_lines;
use crate::clock::monotonic_nanos;
use crate::config::Config;
use crate::congestion::{CongestionControl, ObservedControl, PacedRttControl};
use crate::probe::{PROBE_LEN, decode_probe, encode_probe};
use crate::report::{StatusGate, StatusSender};
use crate::state::RttStore;
use crate::transport::{SendOutcome, Transport};

/// Emits timestamp probes at a fixed cadence and computes round-trip
/// time from the replies the responder echoes back.
pub struct Emitter<T: Transport> {
    config: Config,
    transport: T,
    control: ObservedControl<PacedRttControl>,
    store: Arc<RttStore>,
    status: StatusSender,
    cancel: CancellationToken,
    gate: StatusGate,
    sent: u64,
    received: u64,
}

impl<T: Transport> Emitter<T> {
    pub fn new(
        config: &Config,
        transport: T,
        store: Arc<RttStore>,
        status: StatusSender,
        cancel: CancellationToken,
    ) -> Self {
        let control = ObservedControl::new(
            PacedRttControl::new(config.probe_interval),
            store.clone(),
            config.peer,
        );
        Self {
            config: config.clone(),
            transport,
            control,
            store,
            status,
            cancel,
            gate: StatusGate::new(config.status_interval),
            sent: 0,
            received: 0,
        }
    }

    /// Run until cancelled or the transport fails fatally.
    pub async fn run(mut self) -> Result<()> {
        let peer = self.config.peer;
        let mut idle = IdleStrategy::new(self.config.idle_policy);
        let mut next_send = Instant::now();

        debug!(%peer, stream = self.config.stream_id, "emitter starting");

        loop {
            if self.cancel.is_cancelled() {
                break;
            }

            let mut work = self.poll_replies()?;

            let now = Instant::now();
            if now >= next_send {
                if self.try_send_probe()? {
                    work += 1;
                }
                next_send = now + self.config.probe_interval;
            }

            if self.gate.ready(Instant::now()) {
                self.status.emit(format!(
                    "[STATUS][PUB] peer: {}, stream: {}, probes sent: {}, replies: {}",
                    peer, self.config.stream_id, self.sent, self.received
                ));
                for line in render_store_lines(&self.store) {
                    self.status.emit(line);
                }
            }

            idle.idle(work).await;
        }

        debug!(sent = self.sent, replies = self.received, "emitter stopped");
        Ok(())
    }

    /// Send one probe if the congestion boundary allows it. Transient
    /// rejections are reported and abandoned; the next probe supersedes
    /// the lost one. Fatal outcomes end the session.
    fn try_send_probe(&mut self) -> Result<bool> {
        // One clock capture per attempt keeps the eligibility basis and
        // the embedded timestamp consistent.
        let now_nanos = monotonic_nanos();
        if !self.control.should_measure_rtt(now_nanos) {
            return Ok(false);
        }

        let mut buf = [0u8; PROBE_LEN];
        encode_probe(&mut buf, now_nanos);

        match self.transport.send(&buf)? {
            SendOutcome::Sent(_) => {
                self.sent += 1;
                self.control.on_rtt_measurement_sent(now_nanos);
                Ok(true)
            }
            outcome if outcome.is_fatal() => {
                bail!("probe send failed: {outcome:?}");
            }
            outcome => {
                self.status.emit(format!(
                    "[PUB] send rejected: {:?}, probes sent: {}",
                    outcome, self.sent
                ));
                Ok(false)
            }
        }
    }

    /// Drain echoed replies, bounded by the fragment limit.
    fn poll_replies(&mut self) -> Result<usize> {
        let Self {
            transport,
            control,
            status,
            received,
            ..
        } = self;

        let mut handler = |data: &[u8], peer: SocketAddr| {
            let send_nanos = match decode_probe(data) {
                Ok(ts) => ts,
                Err(e) => {
                    debug!(%peer, %e, "discarding malformed reply");
                    return;
                }
            };
            let now_nanos = monotonic_nanos();
            let rtt_nanos = now_nanos - send_nanos;
            *received += 1;
            control.on_rtt_measurement(now_nanos, rtt_nanos, peer);
            status.emit(format!(
                "[RTT] reply #{} from {}: {:.3} ms",
                received,
                peer,
                rtt_nanos as f64 / 1e6
            ));
        };

        Ok(transport.poll(&mut handler, FRAGMENT_LIMIT)?)
    }
}
