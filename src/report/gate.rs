use std::time::{Duration, Instant};

/// Minimum spacing the gate enforces, even when configured as zero.
pub const MIN_STATUS_INTERVAL: Duration = Duration::from_secs(1);

/// Minimum-interval gate for periodic status lines.
///
/// [`StatusGate::ready`] answers true at most once per interval. A
/// configured interval of zero means "rate unspecified", not "as fast
/// as possible", and is coerced to the one-second floor.
#[derive(Debug)]
pub struct StatusGate {
    interval: Duration,
    last_emit: Option<Instant>,
}

impl StatusGate {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: interval.max(MIN_STATUS_INTERVAL),
            last_emit: None,
        }
    }

    pub fn from_secs(secs: u64) -> Self {
        Self::new(Duration::from_secs(secs))
    }

    /// Effective interval after the floor is applied.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// True when enough time has elapsed since the last accepted emit.
    /// Answering true counts as an emit.
    pub fn ready(&mut self, now: Instant) -> bool {
        match self.last_emit {
            Some(last) if now.duration_since(last) < self.interval => false,
            _ => {
                self.last_emit = Some(now);
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_interval_is_coerced_to_the_floor() {
        let gate = StatusGate::from_secs(0);
        assert_eq!(gate.interval(), MIN_STATUS_INTERVAL);
    }

    #[test]
    fn configured_interval_survives_above_the_floor() {
        let gate = StatusGate::from_secs(5);
        assert_eq!(gate.interval(), Duration::from_secs(5));
    }

    #[test]
    fn first_call_is_always_ready() {
        let mut gate = StatusGate::from_secs(5);
        assert!(gate.ready(Instant::now()));
    }

    #[test]
    fn emits_at_most_floor_d_over_i_plus_one() {
        let mut gate = StatusGate::from_secs(2);
        let start = Instant::now();

        // Events every 100ms over 10 seconds of synthetic time.
        let mut emitted = 0;
        for tick in 0..=100u64 {
            if gate.ready(start + Duration::from_millis(tick * 100)) {
                emitted += 1;
            }
        }

        // floor(10 / 2) + 1: t = 0, 2, 4, 6, 8, 10.
        assert_eq!(emitted, 6);
    }

    #[test]
    fn floored_gate_never_emits_faster_than_once_per_second() {
        let mut gate = StatusGate::from_secs(0);
        let start = Instant::now();

        let mut emitted = 0;
        for tick in 0..1_000u64 {
            if gate.ready(start + Duration::from_millis(tick * 10)) {
                emitted += 1;
            }
        }

        // 10 seconds of events at 100 Hz, floor of 1s.
        assert!(emitted <= 11, "emitted {emitted} status lines");
    }
}
