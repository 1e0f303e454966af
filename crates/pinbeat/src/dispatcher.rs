//! Deferred task dispatcher: a single-worker FIFO queue.

use std::fmt;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{Sender, TrySendError};
use parking_lot::Mutex;

use crate::error::{AcquisitionError, DispatchError};
use crate::task::CancellableTask;

/// Submission queue depth. One toggle is ever pending at a time, so
/// this only needs headroom for shutdown races.
const QUEUE_DEPTH: usize = 16;

/// A single-worker queue that runs submitted tasks in an unrestricted
/// context, strictly one at a time, preserving submission order.
pub trait Dispatcher: Send + Sync {
    /// Queue a task for execution. Non-blocking; safe to call from a
    /// restricted context.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::QueueFull`] if the bounded queue is at
    /// capacity, or [`DispatchError::ShutDown`] after
    /// [`shutdown`](Self::shutdown).
    fn submit(&self, task: Arc<CancellableTask>) -> Result<(), DispatchError>;

    /// Stop accepting work, drain the queue, and block until the
    /// worker has stopped. Idempotent.
    fn shutdown(&self);
}

/// Reference [`Dispatcher`] backed by a crossbeam channel and one
/// worker thread.
pub struct WorkerDispatcher {
    tx: Mutex<Option<Sender<Arc<CancellableTask>>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl WorkerDispatcher {
    /// Spawn the dispatcher worker thread.
    ///
    /// # Errors
    ///
    /// Returns an [`AcquisitionError`] if the thread cannot be
    /// spawned.
    pub fn spawn() -> Result<Arc<Self>, AcquisitionError> {
        let (tx, rx) = crossbeam::channel::bounded::<Arc<CancellableTask>>(QUEUE_DEPTH);

        let worker = thread::Builder::new()
            .name("pinbeat-dispatch".into())
            .spawn(move || {
                for task in rx {
                    task.run();
                }
            })
            .map_err(|e| AcquisitionError::new("dispatcher", e.to_string()))?;

        Ok(Arc::new(Self {
            tx: Mutex::new(Some(tx)),
            worker: Mutex::new(Some(worker)),
        }))
    }
}

impl Dispatcher for WorkerDispatcher {
    fn submit(&self, task: Arc<CancellableTask>) -> Result<(), DispatchError> {
        let tx = self.tx.lock();
        let Some(tx) = tx.as_ref() else {
            return Err(DispatchError::ShutDown);
        };
        tx.try_send(task).map_err(|e| match e {
            TrySendError::Full(_) => DispatchError::QueueFull,
            TrySendError::Disconnected(_) => DispatchError::ShutDown,
        })
    }

    fn shutdown(&self) {
        // Dropping the sender closes the channel; the worker drains
        // whatever was queued before the close, then exits.
        drop(self.tx.lock().take());
        if let Some(worker) = self.worker.lock().take() {
            let _ = worker.join();
        }
    }
}

impl Drop for WorkerDispatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for WorkerDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerDispatcher")
            .field("accepting", &self.tx.lock().is_some())
            .finish()
    }
}
