pub mod observer;

pub use observer::*;

use std::net::SocketAddr;
use std::time::Duration;

/// RTT-related hooks a transport's congestion control unit exposes for
/// one peer session.
///
/// The transport drives these synchronously from its own threads: an
/// eligibility query before it probes, an observation when a fresh RTT
/// arrives, and a marker when a probe actually went out.
pub trait CongestionControl: Send {
    /// Should RTT be measured right now?
    fn should_measure_rtt(&mut self, now_nanos: i64) -> bool;

    /// A fresh RTT measurement arrived for `peer`.
    fn on_rtt_measurement(&mut self, now_nanos: i64, rtt_nanos: i64, peer: SocketAddr);

    /// An RTT probe was dispatched.
    fn on_rtt_measurement_sent(&mut self, now_nanos: i64);
}

/// Baseline controller that paces RTT probes at a fixed interval and
/// keeps the most recent measurement.
#[derive(Debug, Clone)]
pub struct PacedRttControl {
    probe_interval_nanos: i64,
    last_probe_nanos: Option<i64>,
    last_rtt_nanos: Option<i64>,
}

impl PacedRttControl {
    pub fn new(probe_interval: Duration) -> Self {
        Self {
            probe_interval_nanos: probe_interval.as_nanos() as i64,
            last_probe_nanos: None,
            last_rtt_nanos: None,
        }
    }

    /// Most recent measurement this controller has seen.
    pub fn last_rtt_nanos(&self) -> Option<i64> {
        self.last_rtt_nanos
    }
}

impl CongestionControl for PacedRttControl {
    fn should_measure_rtt(&mut self, now_nanos: i64) -> bool {
        match self.last_probe_nanos {
            None => true,
            Some(last) => now_nanos - last >= self.probe_interval_nanos,
        }
    }

    fn on_rtt_measurement(&mut self, _now_nanos: i64, rtt_nanos: i64, _peer: SocketAddr) {
        self.last_rtt_nanos = Some(rtt_nanos);
    }

    fn on_rtt_measurement_sent(&mut self, now_nanos: i64) {
        self.last_probe_nanos = Some(now_nanos);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer() -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], 20121))
    }

    #[test]
    fn first_probe_is_always_eligible() {
        let mut cc = PacedRttControl::new(Duration::from_millis(100));
        assert!(cc.should_measure_rtt(0));
    }

    #[test]
    fn probes_are_paced_by_the_interval() {
        let mut cc = PacedRttControl::new(Duration::from_millis(100));
        cc.on_rtt_measurement_sent(0);

        assert!(!cc.should_measure_rtt(50_000_000));
        assert!(cc.should_measure_rtt(100_000_000));
    }

    #[test]
    fn keeps_the_latest_measurement() {
        let mut cc = PacedRttControl::new(Duration::from_millis(100));
        assert_eq!(cc.last_rtt_nanos(), None);
        cc.on_rtt_measurement(1, 300, peer());
        cc.on_rtt_measurement(2, 150, peer());
        assert_eq!(cc.last_rtt_nanos(), Some(150));
    }
}
