//! Optimistic pending writes
//!
//! The UI applies a rating to the screen before the store round trip
//! resolves. Rather than mutating display state and hoping, in-flight
//! values live in this queue keyed by performance id: applied before the
//! store call, confirmed (dropped) once the store acknowledges, rolled back
//! if the write fails so the caller can restore what was on screen.

use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

/// A rating pair awaiting store confirmation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingRating {
    pub star: f64,
    pub like: f64,
}

/// In-flight optimistic ratings, keyed by performance id.
#[derive(Default)]
pub struct PendingWrites {
    inner: Mutex<HashMap<Uuid, PendingRating>>,
}

impl PendingWrites {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an optimistic value ahead of the store round trip. A second
    /// apply for the same performance replaces the first (latest wins).
    pub fn apply(&self, performance_id: Uuid, star: f64, like: f64) {
        self.inner
            .lock()
            .unwrap()
            .insert(performance_id, PendingRating { star, like });
    }

    /// The store acknowledged the write; the value is no longer pending.
    pub fn confirm(&self, performance_id: Uuid) -> Option<PendingRating> {
        self.inner.lock().unwrap().remove(&performance_id)
    }

    /// The write failed; returns the abandoned value so the caller can
    /// reconcile the display against what is actually persisted.
    pub fn rollback(&self, performance_id: Uuid) -> Option<PendingRating> {
        self.inner.lock().unwrap().remove(&performance_id)
    }

    /// The optimistic value to display while the write is in flight.
    pub fn get(&self, performance_id: Uuid) -> Option<PendingRating> {
        self.inner.lock().unwrap().get(&performance_id).copied()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().is_empty()
    }
}
