//! Global outbound-request gate shared by the whole worker pool.

use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::time::MissedTickBehavior;

/// Capacity gate bounding outbound requests per second across all workers.
///
/// `capacity` tokens exist. [`RequestGate::acquire`] consumes one, waiting
/// while the pool is empty; a background task restores the pool to full
/// capacity once per second, never above it. Handles are cheap clones of one
/// shared gate: construct it once at startup and hand a clone to every
/// worker. The refill task exits after the last handle is dropped.
#[derive(Clone)]
pub struct RequestGate {
    inner: Arc<GateInner>,
}

struct GateInner {
    permits: Semaphore,
    capacity: usize,
}

impl RequestGate {
    /// Spawn the refill task on the current runtime. `per_second` is clamped
    /// to at least one token.
    pub fn new(per_second: u32) -> Self {
        let capacity = per_second.max(1) as usize;
        let inner = Arc::new(GateInner {
            permits: Semaphore::new(capacity),
            capacity,
        });
        tokio::spawn(refill(Arc::downgrade(&inner)));
        Self { inner }
    }

    /// Wait for and consume one request token.
    ///
    /// There is no cancellation path: a bounded universe means every waiter
    /// is eventually admitted by a refill tick.
    pub async fn acquire(&self) {
        self.inner
            .permits
            .acquire()
            .await
            .expect("gate semaphore is never closed")
            .forget();
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Tokens currently available; used by tests and diagnostics.
    pub fn available(&self) -> usize {
        self.inner.permits.available_permits()
    }
}

async fn refill(gate: Weak<GateInner>) {
    let mut tick = tokio::time::interval(Duration::from_secs(1));
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick of an interval completes immediately.
    tick.tick().await;

    loop {
        tick.tick().await;
        let Some(gate) = gate.upgrade() else { break };
        let available = gate.permits.available_permits();
        if available < gate.capacity {
            gate.permits.add_permits(gate.capacity - available);
        }
    }
}
