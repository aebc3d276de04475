//! # Shutdown flag
//!
//! A single flag shared by all tasks. Setting it from anywhere (Ctrl-C
//! handler, a task which lost its connection) makes every task wind down
//! at the end of its current cycle.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    flag: Arc<AtomicBool>,
}

/// Requests shutdown when dropped, also during a panic unwind.
#[derive(Debug)]
pub struct ShutdownGuard {
    shutdown: Shutdown,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask every task to stop. Requesting more than once has no further
    /// effect.
    pub fn request(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// A guard which requests shutdown when it goes out of scope. Hold one
    /// for the lifetime of a task so the other tasks follow it down.
    pub fn guard(&self) -> ShutdownGuard {
        ShutdownGuard {
            shutdown: self.clone(),
        }
    }

    /// Install a Ctrl-C (and termination signal) handler which requests
    /// shutdown.
    pub fn install_ctrlc_handler(&self) -> Result<(), ctrlc::Error> {
        let flag = self.clone();
        ctrlc::set_handler(move || {
            log::info!("Interrupt received, shutting down");
            flag.request();
        })
    }
}

impl Drop for ShutdownGuard {
    fn drop(&mut self) {
        self.shutdown.request();
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_shared_flag() {
        let a = Shutdown::new();
        let b = a.clone();
        assert!(!b.is_requested());
        a.request();
        assert!(b.is_requested());
    }

    #[test]
    fn test_guard_requests_on_exit() {
        let shutdown = Shutdown::new();

        let guard = shutdown.guard();
        assert!(!shutdown.is_requested());
        drop(guard);
        assert!(shutdown.is_requested());
    }

    #[test]
    fn test_guard_requests_on_panic() {
        let shutdown = Shutdown::new();
        let guard = shutdown.guard();

        let jh = std::thread::spawn(move || {
            let _guard = guard;
            panic!("task failed");
        });

        assert!(jh.join().is_err());
        assert!(shutdown.is_requested());
    }
}
