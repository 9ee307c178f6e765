use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

// Relaxed counters: cheap enough for the hot path, read as a best-effort
// snapshot only.
#[derive(Default)]
pub(crate) struct Counters {
    pub submitted: AtomicU64,
    pub mapped: AtomicU64,
    pub reduced: AtomicU64,
    pub map_errors: AtomicU64,
    pub reduce_errors: AtomicU64,
}

impl Counters {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            submitted: self.submitted.load(Ordering::Relaxed),
            mapped: self.mapped.load(Ordering::Relaxed),
            reduced: self.reduced.load(Ordering::Relaxed),
            map_errors: self.map_errors.load(Ordering::Relaxed),
            reduce_errors: self.reduce_errors.load(Ordering::Relaxed),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct StatsSnapshot {
    pub submitted: u64,
    pub mapped: u64,
    pub reduced: u64,
    pub map_errors: u64,
    pub reduce_errors: u64,
}
