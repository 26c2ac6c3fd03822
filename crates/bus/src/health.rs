use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

/// Shared liveness state updated by the consumer loops and read by the
/// health endpoint. Consumer lag is surfaced here only, never on the data
/// path.
#[derive(Debug, Default)]
pub struct BusHealth {
    running: AtomicBool,
    last_event_at: Mutex<Option<DateTime<Utc>>>,
}

/// Point-in-time view of the bus consumer state.
#[derive(Debug, Clone, serde::Serialize)]
pub struct BusHealthSnapshot {
    pub running: bool,
    pub last_event_at: Option<DateTime<Utc>>,
}

impl BusHealth {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::Relaxed);
    }

    pub(crate) fn record_event(&self) {
        *self.last_event_at.lock().expect("health lock poisoned") = Some(Utc::now());
    }

    /// Snapshot for the health endpoint.
    #[must_use]
    pub fn snapshot(&self) -> BusHealthSnapshot {
        BusHealthSnapshot {
            running: self.running.load(Ordering::Relaxed),
            last_event_at: *self.last_event_at.lock().expect("health lock poisoned"),
        }
    }
}
