use std::net::SocketAddr;
use std::sync::Arc;

use super::CongestionControl;
use crate::state::RttStore;

/// Pass-through wrapper mirroring one peer session's congestion
/// feedback events into an [`RttStore`].
///
/// The wrapped controller keeps full authority: every call is forwarded
/// and its answer returned unchanged. The store update is a side effect
/// only; store operations are infallible, so nothing here can perturb
/// the control path.
#[derive(Debug)]
pub struct ObservedControl<C> {
    inner: C,
    store: Arc<RttStore>,
    peer: SocketAddr,
}

impl<C> ObservedControl<C> {
    pub fn new(inner: C, store: Arc<RttStore>, peer: SocketAddr) -> Self {
        Self { inner, store, peer }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    pub fn into_inner(self) -> C {
        self.inner
    }
}

impl<C: CongestionControl> CongestionControl for ObservedControl<C> {
    fn should_measure_rtt(&mut self, now_nanos: i64) -> bool {
        let eligible = self.inner.should_measure_rtt(now_nanos);
        self.store.record_eligibility_check(self.peer);
        eligible
    }

    fn on_rtt_measurement(&mut self, now_nanos: i64, rtt_nanos: i64, peer: SocketAddr) {
        self.inner.on_rtt_measurement(now_nanos, rtt_nanos, peer);
        // Mirror under the peer the transport reported, which for a
        // multi-homed session may differ from the session peer.
        self.store.record_observed_rtt(peer, rtt_nanos);
    }

    fn on_rtt_measurement_sent(&mut self, now_nanos: i64) {
        self.inner.on_rtt_measurement_sent(now_nanos);
        self.store.record_sent_marker(self.peer);
    }
}
