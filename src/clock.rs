//! Process-wide monotonic clock in integer nanoseconds.

use std::sync::LazyLock;
use std::time::Instant;

static ANCHOR: LazyLock<Instant> = LazyLock::new(Instant::now);

/// Nanoseconds elapsed since an arbitrary per-process anchor.
///
/// Monotonic and cheap; readings are only comparable within the same
/// process. This is the timebase embedded in probe messages and used
/// for every RTT computation.
pub fn monotonic_nanos() -> i64 {
    ANCHOR.elapsed().as_nanos() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn never_goes_backwards() {
        let a = monotonic_nanos();
        let b = monotonic_nanos();
        assert!(b >= a);
        assert!(a >= 0);
    }
}
