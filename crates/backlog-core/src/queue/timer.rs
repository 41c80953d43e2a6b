//! Debounce timer with at most one pending callback.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::debug;

#[derive(Default)]
struct TimerState {
    /// Bumped on every schedule and cancel, so a stale wake-up does nothing.
    generation: u64,
    pending: Option<JoinHandle<()>>,
}

pub struct SingleScheduleTimer {
    runtime: Handle,
    state: Arc<Mutex<TimerState>>,
}

impl SingleScheduleTimer {
    pub fn new(runtime: Handle) -> Self {
        Self {
            runtime,
            state: Arc::new(Mutex::new(TimerState::default())),
        }
    }

    /// Run `f` after `delay` unless a callback is already pending.
    ///
    /// Returns `false` when one was pending; its deadline is kept.
    pub fn schedule_if_not_already<F>(&self, delay: Duration, f: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        let mut state = lock(&self.state);
        if state.pending.is_some() {
            return false;
        }

        state.generation += 1;
        let generation = state.generation;
        let shared = self.state.clone();
        state.pending = Some(self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            {
                let mut state = lock(&shared);
                if state.generation != generation {
                    return;
                }
                state.pending = None;
            }
            debug!(?delay, "scheduled run fired");
            f();
        }));
        debug!(?delay, "run scheduled");
        true
    }

    /// Drop the pending callback, if any. Returns whether one was pending.
    pub fn cancel(&self) -> bool {
        let mut state = lock(&self.state);
        state.generation += 1;
        match state.pending.take() {
            Some(handle) => {
                handle.abort();
                debug!("scheduled run cancelled");
                true
            }
            None => false,
        }
    }

    pub fn is_scheduled(&self) -> bool {
        lock(&self.state).pending.is_some()
    }
}

impl Drop for SingleScheduleTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

fn lock(state: &Mutex<TimerState>) -> MutexGuard<'_, TimerState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}
