//! Connectivity signal
//!
//! The platform owns detection; the client only needs a boolean and a
//! transition event, which the embedding surface delivers by calling
//! `SyncCoordinator::handle_connectivity_change`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Boolean online/offline signal
pub trait Connectivity {
    fn is_online(&self) -> bool;
}

/// A connectivity flag shared with whatever layer watches the network
#[derive(Clone, Default)]
pub struct SharedConnectivity {
    online: Arc<AtomicBool>,
}

impl SharedConnectivity {
    #[must_use]
    pub fn new(online: bool) -> Self {
        Self {
            online: Arc::new(AtomicBool::new(online)),
        }
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::Relaxed);
    }
}

impl Connectivity for SharedConnectivity {
    fn is_online(&self) -> bool {
        self.online.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_flag_toggles() {
        let connectivity = SharedConnectivity::new(false);
        assert!(!connectivity.is_online());

        connectivity.set_online(true);
        assert!(connectivity.is_online());

        let clone = connectivity.clone();
        clone.set_online(false);
        assert!(!connectivity.is_online());
    }
}
