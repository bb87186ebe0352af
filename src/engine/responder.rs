use anyhow::{Result, bail};
use std::collections::HashMap;
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
use crate::probe::{PROBE_LEN, decode_probe};
use crate::report::{StatusGate, StatusSender};
use crate::state::RttStore;
use crate::transport::{SendOutcome, Transport};

/// Receives probes, reports the embedded-timestamp delta, and echoes
/// each probe back to its source unchanged.
///
/// The reported delta is only meaningful when emitter and responder
/// share a clock; the emitter's reply-based figure is the authoritative
/// round trip.
pub struct Responder<T: Transport> {
    config: Config,
    transport: T,
    controls: HashMap<SocketAddr, ObservedControl<PacedRttControl>>,
    store: Arc<RttStore>,
    status: StatusSender,
    cancel: CancellationToken,
    gate: StatusGate,
    received: u64,
    echoed: u64,
}

impl<T: Transport> Responder<T> {
    pub fn new(
        config: &Config,
        transport: T,
        store: Arc<RttStore>,
        status: StatusSender,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            config: config.clone(),
            transport,
            controls: HashMap::new(),
            store,
            status,
            cancel,
            gate: StatusGate::new(config.status_interval),
            received: 0,
            echoed: 0,
        }
    }

    /// Run until cancelled or the transport fails fatally.
    pub async fn run(mut self) -> Result<()> {
        let local = self.transport.local_addr()?;
        let mut idle = IdleStrategy::new(self.config.idle_policy);

        debug!(%local, stream = self.config.stream_id, "responder starting");

        loop {
            if self.cancel.is_cancelled() {
                break;
            }

            let work = self.process_inbound()?;

            if self.gate.ready(Instant::now()) {
                self.status.emit(format!(
                    "[STATUS][SUB] listening on {}, stream: {}, probes received: {}, echoed: {}",
                    local, self.config.stream_id, self.received, self.echoed
                ));
                for line in render_store_lines(&self.store) {
                    self.status.emit(line);
                }
            }

            idle.idle(work).await;
        }

        debug!(received = self.received, echoed = self.echoed, "responder stopped");
        Ok(())
    }

    /// One poll pass: decode and report each valid probe, then echo it
    /// back to its source. Echoes are sent after the poll so the
    /// transport is not re-entered from its own delivery handler.
    fn process_inbound(&mut self) -> Result<usize> {
        let mut echoes: Vec<([u8; PROBE_LEN], SocketAddr)> = Vec::new();

        let Self {
            transport,
            controls,
            store,
            status,
            received,
            config,
            ..
        } = self;

        let mut handler = |data: &[u8], peer: SocketAddr| {
            let send_nanos = match decode_probe(data) {
                Ok(ts) => ts,
                Err(e) => {
                    debug!(%peer, %e, "discarding malformed probe");
                    return;
                }
            };

            let now_nanos = monotonic_nanos();
            let delta_nanos = now_nanos - send_nanos;
            *received += 1;

            controls
                .entry(peer)
                .or_insert_with(|| {
                    ObservedControl::new(
                        PacedRttControl::new(config.probe_interval),
                        store.clone(),
                        peer,
                    )
                })
                .on_rtt_measurement(now_nanos, delta_nanos, peer);

            status.emit(format!(
                "[RTT] probe #{} from {}: {:.3} ms",
                received,
                peer,
                delta_nanos as f64 / 1e6
            ));

            let mut echo = [0u8; PROBE_LEN];
            echo.copy_from_slice(&data[..PROBE_LEN]);
            echoes.push((echo, peer));
        };

        let delivered = transport.poll(&mut handler, FRAGMENT_LIMIT)?;
        drop(handler);

        for (echo, peer) in echoes {
            match self.transport.send_to(&echo, peer)? {
                SendOutcome::Sent(_) => self.echoed += 1,
                outcome if outcome.is_fatal() => {
                    bail!("echo send failed: {outcome:?}");
                }
                outcome => {
                    // No retry; the peer's next probe supersedes this echo.
                    self.status.emit(format!(
                        "[SUB] echo rejected: {:?}, peer: {}",
                        outcome, peer
                    ));
                }
            }
        }

        Ok(delivered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Mode;
    use crate::engine::idle::IdlePolicy;
    use crate::probe::encode_probe;
    use crate::report::StatusReporter;
    use crate::transport::scripted::ScriptedTransport;
    use std::time::Duration;

    fn test_config() -> Config {
        Config {
            mode: Mode::Sub,
            peer: ([127, 0, 0, 1], 20121).into(),
            stream_id: 1001,
            status_interval: Duration::from_secs(1),
            probe_interval: Duration::from_millis(1),
            idle_policy: IdlePolicy::Backoff,
            debug: false,
        }
    }

    fn test_responder(
        transport: ScriptedTransport,
        store: Arc<RttStore>,
        status: StatusSender,
    ) -> Responder<ScriptedTransport> {
        Responder::new(&test_config(), transport, store, status, CancellationToken::new())
    }

    #[tokio::test]
    async fn valid_probe_is_recorded_and_echoed() {
        let reporter = StatusReporter::start(64);
        let store = Arc::new(RttStore::new());
        let mut transport = ScriptedTransport::new();

        let peer: SocketAddr = ([127, 0, 0, 1], 33000).into();
        let mut probe = [0u8; PROBE_LEN];
        encode_probe(&mut probe, monotonic_nanos());
        transport.push_inbound(&probe, peer);

        let mut responder = test_responder(transport, store.clone(), reporter.sender());
        assert_eq!(responder.process_inbound().unwrap(), 1);

        assert_eq!(responder.received, 1);
        assert_eq!(responder.echoed, 1);
        assert_eq!(responder.transport.sent_to, vec![(probe.to_vec(), peer)]);

        let sample = store.get(peer).unwrap();
        assert_eq!(sample.observed, 1);
        reporter.shutdown(Duration::from_millis(100)).await;
    }

    #[tokio::test]
    async fn malformed_probe_is_dropped_silently() {
        let reporter = StatusReporter::start(64);
        let store = Arc::new(RttStore::new());
        let mut transport = ScriptedTransport::new();
        transport.push_inbound(&[0xFF; 4], ([127, 0, 0, 1], 33001).into());

        let mut responder = test_responder(transport, store.clone(), reporter.sender());
        assert_eq!(responder.process_inbound().unwrap(), 1);

        assert_eq!(responder.received, 0);
        assert_eq!(responder.echoed, 0);
        assert!(responder.transport.sent_to.is_empty());
        assert!(store.is_empty());
        reporter.shutdown(Duration::from_millis(100)).await;
    }

    #[tokio::test]
    async fn probes_from_distinct_peers_get_distinct_records() {
        let reporter = StatusReporter::start(64);
        let store = Arc::new(RttStore::new());
        let mut transport = ScriptedTransport::new();

        let mut probe = [0u8; PROBE_LEN];
        encode_probe(&mut probe, monotonic_nanos());
        for port in [33002, 33003, 33004] {
            transport.push_inbound(&probe, ([127, 0, 0, 1], port).into());
        }

        let mut responder = test_responder(transport, store.clone(), reporter.sender());
        assert_eq!(responder.process_inbound().unwrap(), 3);

        assert_eq!(store.len(), 3);
        assert_eq!(responder.controls.len(), 3);
        reporter.shutdown(Duration::from_millis(100)).await;
    }

    #[tokio::test]
    async fn rejected_echo_is_abandoned_not_retried() {
        let reporter = StatusReporter::start(64);
        let store = Arc::new(RttStore::new());
        let mut transport = ScriptedTransport::new();
        transport.outcome = SendOutcome::BackPressured;

        let peer: SocketAddr = ([127, 0, 0, 1], 33005).into();
        let mut probe = [0u8; PROBE_LEN];
        encode_probe(&mut probe, monotonic_nanos());
        transport.push_inbound(&probe, peer);

        let mut responder = test_responder(transport, store.clone(), reporter.sender());
        assert_eq!(responder.process_inbound().unwrap(), 1);

        assert_eq!(responder.received, 1);
        assert_eq!(responder.echoed, 0);
        // Exactly one send attempt for the rejected echo.
        assert_eq!(responder.transport.sent_to.len(), 1);
        reporter.shutdown(Duration::from_millis(100)).await;
    }

    #[tokio::test]
    async fn fatal_echo_outcome_ends_the_session() {
        let reporter = StatusReporter::start(64);
        let store = Arc::new(RttStore::new());
        let mut transport = ScriptedTransport::new();
        transport.outcome = SendOutcome::PositionExceeded;

        let mut probe = [0u8; PROBE_LEN];
        encode_probe(&mut probe, monotonic_nanos());
        transport.push_inbound(&probe, ([127, 0, 0, 1], 33006).into());

        let mut responder = test_responder(transport, store, reporter.sender());
        assert!(responder.process_inbound().is_err());
        reporter.shutdown(Duration::from_millis(100)).await;
    }
}
