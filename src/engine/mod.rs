pub mod emitter;
pub mod idle;
pub mod responder;

pub use emitter::*;
pub use idle::*;
pub use responder::*;

use crate::state::RttStore;

/// Most datagrams a single transport poll may deliver.
pub const FRAGMENT_LIMIT: usize = 10;

/// Render one line per peer record for the periodic status tick.
pub(crate) fn render_store_lines(store: &RttStore) -> Vec<String> {
    store
        .snapshot()
        .into_iter()
        .map(|(peer, sample)| {
            let rtt = match sample.last_rtt() {
                Some(d) => format!("{:.3} ms", d.as_secs_f64() * 1e3),
                None => "n/a".to_string(),
            };
            format!(
                "[CC] peer: {}, last rtt: {}, observed: {}, sent: {}, eligibility checks: {}",
                peer, rtt, sample.observed, sample.sent, sample.eligibility_checks
            )
        })
        .collect()
}
