//! Cooperative shutdown flag.
//!
//! The interrupt handler is the only writer. Everything else polls the flag
//! at loop and retry boundaries; it never interrupts a sleep or a valve
//! sequence in progress.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared, cloneable shutdown request.
#[derive(Debug, Clone, Default)]
pub struct ShutdownFlag(Arc<AtomicBool>);

impl ShutdownFlag {
    /// A flag that has not been raised.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the flag. Further calls have no effect.
    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether shutdown was requested.
    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_state() {
        let flag = ShutdownFlag::new();
        let handler_copy = flag.clone();
        assert!(!flag.is_requested());
        handler_copy.request();
        handler_copy.request();
        assert!(flag.is_requested());
    }
}
