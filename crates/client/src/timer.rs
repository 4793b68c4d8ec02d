//! Cancelable delayed tasks.
//!
//! Every timer the core arms is a [`TimerHandle`] owned by the component that
//! armed it. Re-arming is cancel-then-reschedule; dropping the handle cancels.

use std::time::Duration;

use tokio::task::AbortHandle;

/// Owned handle to a scheduled task. Must be created inside a tokio runtime.
#[must_use = "dropping a TimerHandle cancels the timer"]
#[derive(Debug)]
pub struct TimerHandle {
    abort: AbortHandle,
}

impl TimerHandle {
    /// Cancel the task if it has not fired yet.
    pub fn cancel(self) {
        drop(self);
    }

    pub fn is_finished(&self) -> bool {
        self.abort.is_finished()
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.abort.abort();
    }
}

/// Run `task` once after `delay`.
pub fn schedule(delay: Duration, task: impl FnOnce() + Send + 'static) -> TimerHandle {
    let handle = tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        task();
    });
    TimerHandle {
        abort: handle.abort_handle(),
    }
}
