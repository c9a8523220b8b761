//! Per-device keep-alive rate gate.
//!
//! Some boxes stop pushing realtime data unless a switch command is sent
//! periodically, but the vendor throttles accounts that ping too often. The
//! gate remembers the last ping per device and lets one through at most once
//! per interval. The clock is injectable so the throttle window is testable.

use super::VendorSession;

use std::collections::HashMap;
use std::sync::Mutex;

type Clock = Box<dyn Fn() -> i64 + Send + Sync>;

pub struct KeepAliveGate {
    min_interval_ms: i64,
    last_sent: Mutex<HashMap<String, i64>>,
    clock: Clock,
}

impl KeepAliveGate {
    pub fn new(min_interval_ms: i64) -> Self {
        Self::with_clock(
            min_interval_ms,
            Box::new(|| chrono::Utc::now().timestamp_millis()),
        )
    }

    pub fn with_clock(min_interval_ms: i64, clock: Clock) -> Self {
        Self {
            min_interval_ms,
            last_sent: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// Whether a ping for `box_id` is due; records the ping when it is.
    pub fn try_acquire(&self, box_id: &str) -> bool {
        let now = (self.clock)();
        let mut last = match self.last_sent.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        let due = now - last.get(box_id).copied().unwrap_or(0) >= self.min_interval_ms;
        if due {
            last.insert(box_id.to_string(), now);
        }
        due
    }

    /// Send the keep-alive switch if the gate allows it.
    ///
    /// Failures are non-critical: the device merely keeps its previous push
    /// cadence, so they are logged and swallowed.
    pub async fn keep_alive(&self, session: &dyn VendorSession, box_id: &str) {
        if !self.try_acquire(box_id) {
            return;
        }
        if let Err(e) = session.send_switch(box_id).await {
            tracing::warn!("keep-alive ping failed for box {}: {}", box_id, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::sync::Arc;

    fn gate_at(interval: i64, now: Arc<AtomicI64>) -> KeepAliveGate {
        KeepAliveGate::with_clock(interval, Box::new(move || now.load(Ordering::SeqCst)))
    }

    #[test]
    fn test_gate_throttles_per_device() {
        let now = Arc::new(AtomicI64::new(1_000_000));
        let gate = gate_at(60_000, now.clone());

        assert!(gate.try_acquire("box-1"));
        assert!(!gate.try_acquire("box-1"));
        // A different device has its own window.
        assert!(gate.try_acquire("box-2"));

        now.store(1_000_000 + 59_999, Ordering::SeqCst);
        assert!(!gate.try_acquire("box-1"));

        now.store(1_000_000 + 60_000, Ordering::SeqCst);
        assert!(gate.try_acquire("box-1"));
    }
}
