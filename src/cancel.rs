//! Cooperative cancellation, fed by SIGINT.
//!
//! The poller and sequencer check the flag between units of work; nothing
//! interrupts a step mid-flight. The signal handler only flips an atomic.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

static SIGINT_HIT: AtomicBool = AtomicBool::new(false);

extern "C" fn on_sigint(_signal: libc::c_int) {
    SIGINT_HIT.store(true, Ordering::SeqCst);
}

/// Install the process-wide SIGINT handler. Call once from `main`.
pub fn install_sigint_handler() {
    let handler = on_sigint as extern "C" fn(libc::c_int) as usize;
    unsafe {
        libc::signal(libc::SIGINT, handler as libc::sighandler_t);
    }
}

/// Whether SIGINT has been observed since the handler was installed.
pub fn interrupted() -> bool {
    SIGINT_HIT.load(Ordering::SeqCst)
}

/// Shareable cancellation flag. A fresh flag observes SIGINT plus any
/// explicit `cancel()` calls, so tests can drive cancellation without
/// touching process signal state.
#[derive(Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst) || interrupted()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_flag_is_not_cancelled() {
        let flag = CancelFlag::new();
        assert!(!flag.is_cancelled());
    }

    #[test]
    fn cancel_is_visible_through_clones() {
        let flag = CancelFlag::new();
        let other = flag.clone();
        flag.cancel();
        assert!(other.is_cancelled());
    }
}
