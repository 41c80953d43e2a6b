//! Single-flight guard for run-loop passes.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

/// Called once when the pass a caller joined has finished.
pub type RunCallback = Box<dyn FnOnce() + Send + 'static>;

#[derive(Default)]
struct RunState {
    is_running: bool,
    callbacks: Vec<RunCallback>,
}

/// Coalesces run requests into at most one active pass.
#[derive(Default)]
pub struct RunRequestManager {
    state: Mutex<RunState>,
}

impl RunRequestManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `on_complete` and claim the pass if nobody holds it.
    ///
    /// Returns `true` when a pass is already running; the caller must not
    /// start another one.
    pub fn start_request(&self, on_complete: RunCallback) -> bool {
        let mut state = self.lock_state();
        state.callbacks.push(on_complete);
        let was_running = state.is_running;
        state.is_running = true;
        debug!(was_running, waiting = state.callbacks.len(), "run requested");
        was_running
    }

    /// Release the pass and notify everybody who was waiting on it.
    pub fn request_complete(&self) {
        let callbacks = {
            let mut state = self.lock_state();
            state.is_running = false;
            std::mem::take(&mut state.callbacks)
        };
        debug!(notified = callbacks.len(), "run complete");
        for callback in callbacks {
            callback();
        }
    }

    pub fn is_running(&self) -> bool {
        self.lock_state().is_running
    }

    fn lock_state(&self) -> MutexGuard<'_, RunState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
