use parking_lot::RwLock;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::Duration;

/// Sentinel for "no RTT observed yet for this peer".
pub const RTT_NEVER_OBSERVED: i64 = -1;

/// Per-peer RTT slot plus event counters.
///
/// Fields are individually atomic: the congestion feedback path updates
/// them without taking any lock once the slot exists, and readers never
/// see a torn record. Counters only ever grow; the RTT value is
/// overwritten, never aggregated.
#[derive(Debug)]
struct PeerRecord {
    last_rtt_nanos: AtomicI64,
    observed: AtomicU64,
    sent: AtomicU64,
    eligibility_checks: AtomicU64,
}

impl PeerRecord {
    fn new() -> Self {
        Self {
            last_rtt_nanos: AtomicI64::new(RTT_NEVER_OBSERVED),
            observed: AtomicU64::new(0),
            sent: AtomicU64::new(0),
            eligibility_checks: AtomicU64::new(0),
        }
    }

    fn sample(&self) -> RttSample {
        RttSample {
            last_rtt_nanos: self.last_rtt_nanos.load(Ordering::Relaxed),
            observed: self.observed.load(Ordering::Relaxed),
            sent: self.sent.load(Ordering::Relaxed),
            eligibility_checks: self.eligibility_checks.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of one peer's record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RttSample {
    /// Last observed RTT in nanoseconds, [`RTT_NEVER_OBSERVED`] if none.
    pub last_rtt_nanos: i64,
    pub observed: u64,
    pub sent: u64,
    pub eligibility_checks: u64,
}

impl RttSample {
    /// Last observed RTT, if the peer has ever reported one.
    pub fn last_rtt(&self) -> Option<Duration> {
        (self.last_rtt_nanos >= 0).then(|| Duration::from_nanos(self.last_rtt_nanos as u64))
    }
}

/// Concurrent map of peer identity to last observed RTT and counters.
///
/// Written from the transport's congestion feedback path, read from
/// low-frequency reporting paths; the asymmetry is deliberate and the
/// write side is what gets optimized. Inserting a previously unseen
/// peer takes the write lock briefly; every other write is atomic under
/// a read guard, so unrelated peers never block each other.
#[derive(Debug, Default)]
pub struct RttStore {
    peers: RwLock<HashMap<SocketAddr, Arc<PeerRecord>>>,
}

impl RttStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, peer: SocketAddr) -> Arc<PeerRecord> {
        if let Some(rec) = self.peers.read().get(&peer) {
            return rec.clone();
        }
        self.peers
            .write()
            .entry(peer)
            .or_insert_with(|| Arc::new(PeerRecord::new()))
            .clone()
    }

    /// Record a fresh RTT observation for `peer`. Last value wins.
    pub fn record_observed_rtt(&self, peer: SocketAddr, rtt_nanos: i64) {
        let rec = self.slot(peer);
        rec.last_rtt_nanos.store(rtt_nanos, Ordering::Relaxed);
        rec.observed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record that an RTT probe was dispatched towards `peer`.
    pub fn record_sent_marker(&self, peer: SocketAddr) {
        self.slot(peer).sent.fetch_add(1, Ordering::Relaxed);
    }

    /// Record that the transport asked whether RTT should be measured.
    pub fn record_eligibility_check(&self, peer: SocketAddr) {
        self.slot(peer).eligibility_checks.fetch_add(1, Ordering::Relaxed);
    }

    /// Current sample for one peer, if it has ever been recorded.
    pub fn get(&self, peer: SocketAddr) -> Option<RttSample> {
        self.peers.read().get(&peer).map(|rec| rec.sample())
    }

    /// Point-in-time copy of every peer record.
    ///
    /// Iteration order is not stable. The read lock is only held while
    /// cloning the slot list, not while the records are loaded.
    pub fn snapshot(&self) -> Vec<(SocketAddr, RttSample)> {
        let slots: Vec<(SocketAddr, Arc<PeerRecord>)> = self
            .peers
            .read()
            .iter()
            .map(|(addr, rec)| (*addr, rec.clone()))
            .collect();

        slots
            .into_iter()
            .map(|(addr, rec)| (addr, rec.sample()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.peers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.read().is_empty()
    }
}
