//! Pool-wide spacing between analyzer dispatches.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep_until};

/// Shared rate limiter enforcing a minimum gap between consecutive dispatches.
///
/// The gap is measured across every worker holding the gate, not per worker.
/// Waiters queue on a fair mutex, so dispatch order follows arrival order.
#[derive(Debug)]
pub struct DispatchGate {
    gap: Duration,
    last_dispatch: Mutex<Option<Instant>>,
}

impl DispatchGate {
    /// Creates a gate with the given minimum gap.
    #[must_use]
    pub const fn new(gap: Duration) -> Self {
        Self {
            gap,
            last_dispatch: Mutex::const_new(None),
        }
    }

    /// Returns the configured gap.
    #[must_use]
    pub const fn gap(&self) -> Duration {
        self.gap
    }

    /// Waits until at least `gap` has passed since the previous dispatch and
    /// records the current instant as the new dispatch time.
    pub async fn acquire(&self) {
        let mut last = self.last_dispatch.lock().await;
        if !self.gap.is_zero()
            && let Some(ready_at) = last.and_then(|previous| previous.checked_add(self.gap))
        {
            sleep_until(ready_at).await;
        }
        *last = Some(Instant::now());
    }
}
