//! Network conditions consulted before speculative downloads

use std::sync::atomic::{AtomicBool, Ordering};

/// Reports whether the device is on an unmetered connection
///
/// Preloading only proceeds on unmetered networks when the configuration
/// requires it. Platform integrations implement this over their own
/// connectivity APIs.
pub trait NetworkPolicy: Send + Sync {
    fn is_unmetered(&self) -> bool;
}

/// Policy with a fixed, externally updated answer
#[derive(Debug)]
pub struct StaticNetworkPolicy {
    unmetered: AtomicBool,
}

impl StaticNetworkPolicy {
    pub fn new(unmetered: bool) -> Self {
        Self {
            unmetered: AtomicBool::new(unmetered),
        }
    }

    pub fn unmetered() -> Self {
        Self::new(true)
    }

    pub fn metered() -> Self {
        Self::new(false)
    }

    /// Update the reported state after a connectivity change
    pub fn set_unmetered(&self, unmetered: bool) {
        self.unmetered.store(unmetered, Ordering::Release);
    }
}

impl Default for StaticNetworkPolicy {
    fn default() -> Self {
        Self::unmetered()
    }
}

impl NetworkPolicy for StaticNetworkPolicy {
    fn is_unmetered(&self) -> bool {
        self.unmetered.load(Ordering::Acquire)
    }
}
