use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tracing::debug;

/// One pre-rendered status line awaiting output.
#[derive(Debug)]
pub struct StatusEvent {
    pub line: String,
    pub enqueued_at: Instant,
}

/// Producer handle for status lines.
///
/// Cloneable and non-blocking: when the queue is saturated the line is
/// dropped and counted, so a slow console can never stall the
/// measurement path.
#[derive(Debug, Clone)]
pub struct StatusSender {
    tx: mpsc::Sender<StatusEvent>,
    dropped: Arc<AtomicU64>,
}

impl StatusSender {
    /// Enqueue a line for the drain worker.
    pub fn emit(&self, line: String) {
        let event = StatusEvent {
            line,
            enqueued_at: Instant::now(),
        };
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                // One immediate retry, then give up. Monitoring is best
                // effort; losing a line beats back-pressuring a poll loop.
                if self.tx.try_send(event).is_err() {
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                }
            }
            Err(TrySendError::Closed(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Lines dropped so far because the queue was saturated or closed.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Single background worker draining status lines to stdout.
///
/// Started explicitly, stopped explicitly; constructing other
/// components never spawns it as a side effect.
pub struct StatusReporter {
    sender: StatusSender,
    worker: JoinHandle<()>,
}

impl StatusReporter {
    /// Spawn the drain worker over a queue of `capacity` events.
    pub fn start(capacity: usize) -> Self {
        let (tx, mut rx) = mpsc::channel::<StatusEvent>(capacity);
        let worker = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                println!("{}", event.line);
            }
            debug!("status reporter drained");
        });

        Self {
            sender: StatusSender {
                tx,
                dropped: Arc::new(AtomicU64::new(0)),
            },
            worker,
        }
    }

    pub fn sender(&self) -> StatusSender {
        self.sender.clone()
    }

    /// Stop the worker, waiting up to `timeout` for it to drain.
    ///
    /// The worker exits once the queue closes and empties, which
    /// requires every [`StatusSender`] clone to be dropped first.
    /// Timing out is not an error: pending lines may be lost and the
    /// caller proceeds with shutdown either way.
    pub async fn shutdown(self, timeout: Duration) {
        let StatusReporter { sender, worker } = self;
        drop(sender);
        if tokio::time::timeout(timeout, worker).await.is_err() {
            debug!(?timeout, "status reporter did not drain in time");
        }
    }
}
