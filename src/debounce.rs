use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use tokio::runtime::Handle;

use crate::error::{Error, Result};

type Callback = Box<dyn FnOnce() + Send>;

#[derive(Default)]
struct DebounceState {
    pending: bool,
    latest: Option<Callback>,
}

/// Collapses bursts of `schedule` calls into one run of the newest callback.
///
/// At most one timer is armed at a time. Calls made while it is armed only
/// replace the callback it will run; they never extend the window.
#[derive(Clone)]
pub struct Debouncer {
    delay: Duration,
    handle: Handle,
    state: Arc<Mutex<DebounceState>>,
}

fn lock(state: &Mutex<DebounceState>) -> MutexGuard<'_, DebounceState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Debouncer {
    pub fn new(delay: Duration) -> Result<Self> {
        let handle = Handle::try_current().map_err(|_| Error::NoRuntime)?;
        Ok(Self::with_handle(delay, handle))
    }

    pub fn with_handle(delay: Duration, handle: Handle) -> Self {
        Self {
            delay,
            handle,
            state: Arc::new(Mutex::new(DebounceState::default())),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn is_pending(&self) -> bool {
        lock(&self.state).pending
    }

    pub fn schedule(&self, callback: impl FnOnce() + Send + 'static) {
        let mut state = lock(&self.state);
        state.latest = Some(Box::new(callback));
        if state.pending {
            return;
        }
        state.pending = true;
        drop(state);

        let shared = Arc::clone(&self.state);
        let delay = self.delay;
        self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            // Cleared before running so the callback itself may re-arm.
            let callback = {
                let mut state = lock(&shared);
                state.pending = false;
                state.latest.take()
            };
            if let Some(callback) = callback {
                callback();
            }
        });
    }
}

impl std::fmt::Debug for Debouncer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Debouncer")
            .field("delay", &self.delay)
            .field("pending", &self.is_pending())
            .finish()
    }
}
