//! Best-effort cancellation.
//!
//! There is no preemptive cancellation of an in-flight provider call: the
//! flag is checked between steps, so a step already dispatched always runs
//! to completion and its resource is tracked before the flag is honoured.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Cancellation flags for in-flight requests.
#[derive(Clone, Default)]
pub struct CancelRegistry {
    inner: Arc<Mutex<HashMap<Uuid, Arc<AtomicBool>>>>,
}

impl CancelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a request, returning its flag.
    pub fn register(&self, request_id: Uuid) -> CancelFlag {
        let flag = Arc::new(AtomicBool::new(false));
        self.inner
            .lock()
            .expect("cancel registry poisoned")
            .insert(request_id, flag.clone());
        CancelFlag(flag)
    }

    /// Request cancellation. Returns false when the request is unknown or
    /// already finished.
    pub fn cancel(&self, request_id: Uuid) -> bool {
        match self
            .inner
            .lock()
            .expect("cancel registry poisoned")
            .get(&request_id)
        {
            Some(flag) => {
                flag.store(true, Ordering::SeqCst);
                true
            }
            None => false,
        }
    }

    pub fn release(&self, request_id: Uuid) {
        self.inner
            .lock()
            .expect("cancel registry poisoned")
            .remove(&request_id);
    }
}

/// Flag checked between steps by a handler.
#[derive(Clone)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_round_trip() {
        let registry = CancelRegistry::new();
        let id = Uuid::new_v4();

        let flag = registry.register(id);
        assert!(!flag.is_cancelled());

        assert!(registry.cancel(id));
        assert!(flag.is_cancelled());

        registry.release(id);
        assert!(!registry.cancel(id));
    }
}
