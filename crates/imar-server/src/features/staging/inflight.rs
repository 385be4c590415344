//! In-flight operation guard
//!
//! A shared set of staged-record identifiers with a promote or delete
//! currently pending. Holding a guard rejects a double-submit on the same
//! row early with a clear error; the correctness guarantee itself is the
//! staging store's atomic `take`, which resolves any race that slips past
//! this set.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

/// Shared set of record ids with an operation in progress.
#[derive(Debug, Clone, Default)]
pub struct InFlight {
    ids: Arc<Mutex<HashSet<i64>>>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `id` as in flight. Returns `None` if it already is.
    ///
    /// The returned guard clears the mark on drop, including on early
    /// returns and panics within the operation.
    pub fn begin(&self, id: i64) -> Option<InFlightGuard> {
        let mut ids = self.lock();
        if ids.insert(id) {
            Some(InFlightGuard {
                ids: Arc::clone(&self.ids),
                id,
            })
        } else {
            None
        }
    }

    /// Whether `id` currently has an operation pending.
    pub fn contains(&self, id: i64) -> bool {
        self.lock().contains(&id)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashSet<i64>> {
        self.ids.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Clears the in-flight mark for one id when dropped.
#[derive(Debug)]
pub struct InFlightGuard {
    ids: Arc<Mutex<HashSet<i64>>>,
    id: i64,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let mut ids = self.ids.lock().unwrap_or_else(PoisonError::into_inner);
        ids.remove(&self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_begin_on_same_id_is_refused() {
        let inflight = InFlight::new();
        let guard = inflight.begin(7);
        assert!(guard.is_some());
        assert!(inflight.begin(7).is_none());
        assert!(inflight.begin(8).is_some());
    }

    #[test]
    fn test_drop_releases_the_id() {
        let inflight = InFlight::new();
        {
            let _guard = inflight.begin(7);
            assert!(inflight.contains(7));
        }
        assert!(!inflight.contains(7));
        assert!(inflight.begin(7).is_some());
    }
}
