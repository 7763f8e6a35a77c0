//! In-flight dig-circle tracking, keyed by edit origin.

use std::collections::HashMap;

use parking_lot::Mutex;

use super::DigOrigin;

/// Largest radius currently in flight per edit origin.
#[derive(Debug, Default)]
pub(super) struct DigTracker {
    in_flight: Mutex<HashMap<DigOrigin, f32>>,
}

impl DigTracker {
    pub(super) fn can_admit(&self, origin: DigOrigin, radius: f32) -> bool {
        // A NaN entry would never match on unreserve.
        if !radius.is_finite() || radius < 0.0 {
            return false;
        }
        match self.in_flight.lock().get(&origin) {
            Some(&current) => radius > current,
            None => true,
        }
    }

    pub(super) fn reserve(&self, origin: DigOrigin, radius: f32) {
        let mut map = self.in_flight.lock();
        let entry = map.entry(origin).or_insert(radius);
        if radius > *entry {
            *entry = radius;
        }
    }

    pub(super) fn unreserve(&self, origin: DigOrigin, radius: f32) {
        let mut map = self.in_flight.lock();
        if map.get(&origin) == Some(&radius) {
            map.remove(&origin);
        } else {
            tracing::trace!(?origin, radius, "stale dig unreserve ignored");
        }
    }

    pub(super) fn in_flight(&self, origin: DigOrigin) -> Option<f32> {
        self.in_flight.lock().get(&origin).copied()
    }

    pub(super) fn is_empty(&self) -> bool {
        self.in_flight.lock().is_empty()
    }
}
