//! The cancelable toggle work item.

use std::fmt;

use parking_lot::{Condvar, Mutex};

#[derive(Debug, Default)]
struct TaskState {
    cancelled: bool,
    running: bool,
}

/// A work item registered once and submitted to the dispatcher many
/// times.
///
/// Submission hands the dispatcher a cheap `Arc` clone of the task, so
/// the restricted timer callback allocates nothing. The task can be
/// cancelled synchronously during teardown: after
/// [`cancel_sync`](Self::cancel_sync) returns, no execution is in
/// flight and later [`run`](Self::run) calls (from work already queued
/// at cancellation time) are no-ops.
pub struct CancellableTask {
    job: Box<dyn Fn() + Send + Sync>,
    state: Mutex<TaskState>,
    done: Condvar,
}

impl CancellableTask {
    /// Register a new task around the given job.
    #[must_use]
    pub fn new(job: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            job: Box::new(job),
            state: Mutex::new(TaskState::default()),
            done: Condvar::new(),
        }
    }

    /// Execute the job unless the task has been cancelled.
    ///
    /// Called by the dispatcher from its single worker slot; the
    /// single-worker guarantee means `run` is never re-entered.
    pub fn run(&self) {
        {
            let mut state = self.state.lock();
            if state.cancelled {
                return;
            }
            state.running = true;
        }

        (self.job)();

        let mut state = self.state.lock();
        state.running = false;
        self.done.notify_all();
    }

    /// Cancel the task and block until any in-flight execution has
    /// finished.
    ///
    /// An execution that has already begun always runs to completion;
    /// cancellation only suppresses future runs.
    pub fn cancel_sync(&self) {
        let mut state = self.state.lock();
        state.cancelled = true;
        while state.running {
            self.done.wait(&mut state);
        }
    }

    /// Whether the task has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.state.lock().cancelled
    }
}

impl fmt::Debug for CancellableTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("CancellableTask")
            .field("cancelled", &state.cancelled)
            .field("running", &state.running)
            .finish()
    }
}
