//! One-shot deadline timer facility.

use std::fmt;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::error::AcquisitionError;

/// Callback invoked when an armed deadline fires.
///
/// Runs in the timer's restricted context: it must be fast and must
/// not block. The scheduler's callback only submits the pre-registered
/// toggle task to the dispatcher.
pub type TimerCallback = Arc<dyn Fn() + Send + Sync>;

/// "Fire a callback once, at or after now + delta" semantics.
///
/// The callback executes in a restricted context (must not block, must
/// be fast). Re-arming replaces the pending deadline; there is never
/// more than one deadline outstanding.
pub trait ClockTimer: Send + Sync {
    /// Install the callback and schedule the first deadline.
    fn arm(&self, delta: Duration, callback: TimerCallback);

    /// Schedule a new deadline for the installed callback.
    ///
    /// Ignored after [`cancel`](Self::cancel) so that an in-flight
    /// toggle finishing during teardown cannot resurrect the timer.
    fn rearm(&self, delta: Duration);

    /// Drop any pending deadline and block until no callback is
    /// running. After `cancel` returns the callback will never fire
    /// again.
    fn cancel(&self);
}

#[derive(Default)]
struct TimerState {
    deadline: Option<Instant>,
    callback: Option<TimerCallback>,
    firing: bool,
    cancelled: bool,
    shutdown: bool,
}

struct TimerShared {
    state: Mutex<TimerState>,
    cond: Condvar,
}

/// Reference [`ClockTimer`] backed by a dedicated thread.
///
/// The worker sleeps on a condvar until the armed deadline, invokes
/// the callback outside the lock, and goes back to sleep. `cancel`
/// clears the deadline and waits out any callback that is mid-flight.
pub struct ThreadTimer {
    shared: Arc<TimerShared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl ThreadTimer {
    /// Spawn the timer worker thread.
    ///
    /// # Errors
    ///
    /// Returns an [`AcquisitionError`] if the thread cannot be
    /// spawned.
    pub fn spawn() -> Result<Arc<Self>, AcquisitionError> {
        let shared = Arc::new(TimerShared {
            state: Mutex::new(TimerState::default()),
            cond: Condvar::new(),
        });

        let worker_shared = Arc::clone(&shared);
        let worker = thread::Builder::new()
            .name("pinbeat-timer".into())
            .spawn(move || Self::worker_main(&worker_shared))
            .map_err(|e| AcquisitionError::new("clock timer", e.to_string()))?;

        Ok(Arc::new(Self {
            shared,
            worker: Mutex::new(Some(worker)),
        }))
    }

    fn worker_main(shared: &TimerShared) {
        loop {
            let callback = {
                let mut state = shared.state.lock();
                loop {
                    if state.shutdown {
                        return;
                    }
                    match state.deadline {
                        Some(deadline) => {
                            let now = Instant::now();
                            if now >= deadline {
                                state.deadline = None;
                                state.firing = true;
                                break state.callback.clone();
                            }
                            let _ = shared.cond.wait_for(&mut state, deadline - now);
                        }
                        None => shared.cond.wait(&mut state),
                    }
                }
            };

            if let Some(callback) = callback {
                callback();
            }

            let mut state = shared.state.lock();
            state.firing = false;
            shared.cond.notify_all();
        }
    }
}

impl ClockTimer for ThreadTimer {
    fn arm(&self, delta: Duration, callback: TimerCallback) {
        let mut state = self.shared.state.lock();
        state.callback = Some(callback);
        state.cancelled = false;
        state.deadline = Some(Instant::now() + delta);
        self.shared.cond.notify_all();
    }

    fn rearm(&self, delta: Duration) {
        let mut state = self.shared.state.lock();
        if state.cancelled || state.shutdown {
            return;
        }
        state.deadline = Some(Instant::now() + delta);
        self.shared.cond.notify_all();
    }

    fn cancel(&self) {
        // Dropping the callback breaks the reference cycle
        // timer -> callback -> toggle task -> timer; the drop happens
        // outside the lock in case it cascades into other teardown.
        let callback = {
            let mut state = self.shared.state.lock();
            state.cancelled = true;
            state.deadline = None;
            let callback = state.callback.take();
            while state.firing {
                self.shared.cond.wait(&mut state);
            }
            callback
        };
        drop(callback);
    }
}

impl Drop for ThreadTimer {
    fn drop(&mut self) {
        {
            let mut state = self.shared.state.lock();
            state.shutdown = true;
            state.deadline = None;
            self.shared.cond.notify_all();
        }
        if let Some(worker) = self.worker.lock().take() {
            let _ = worker.join();
        }
    }
}

impl fmt::Debug for ThreadTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("ThreadTimer")
            .field("armed", &state.deadline.is_some())
            .field("firing", &state.firing)
            .field("cancelled", &state.cancelled)
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_callback() -> (Arc<AtomicUsize>, TimerCallback) {
        let count = Arc::new(AtomicUsize::new(0));
        let callback = {
            let count = Arc::clone(&count);
            Arc::new(move || {
                count.fetch_add(1, Ordering::SeqCst);
            }) as TimerCallback
        };
        (count, callback)
    }

    #[test]
    fn test_armed_deadline_fires_once() {
        let timer = ThreadTimer::spawn().unwrap();
        let (count, callback) = counting_callback();

        timer.arm(Duration::from_millis(10), callback);
        thread::sleep(Duration::from_millis(100));

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_rearm_fires_again() {
        let timer = ThreadTimer::spawn().unwrap();
        let (count, callback) = counting_callback();

        timer.arm(Duration::from_millis(5), callback);
        thread::sleep(Duration::from_millis(60));
        timer.rearm(Duration::from_millis(5));
        thread::sleep(Duration::from_millis(60));

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_cancel_prevents_pending_fire() {
        let timer = ThreadTimer::spawn().unwrap();
        let (count, callback) = counting_callback();

        timer.arm(Duration::from_secs(10), callback);
        timer.cancel();
        thread::sleep(Duration::from_millis(30));

        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_rearm_after_cancel_is_ignored() {
        let timer = ThreadTimer::spawn().unwrap();
        let (count, callback) = counting_callback();

        timer.arm(Duration::from_millis(5), callback);
        thread::sleep(Duration::from_millis(60));
        timer.cancel();
        timer.rearm(Duration::from_millis(5));
        thread::sleep(Duration::from_millis(60));

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let timer = ThreadTimer::spawn().unwrap();
        timer.cancel();
        timer.cancel();
    }

    #[test]
    fn test_drop_joins_worker() {
        let timer = ThreadTimer::spawn().unwrap();
        let (_, callback) = counting_callback();
        timer.arm(Duration::from_secs(60), callback);
        drop(timer);
    }
}
