//! Ordered resource teardown.
//!
//! Every resource acquired during startup registers itself here, and
//! teardown releases the stack in strict reverse order. This keeps the
//! release ordering an explicit, testable contract instead of an
//! implicit drop-order side effect.

use std::fmt;
use std::sync::Arc;

use crate::dispatcher::Dispatcher;
use crate::task::CancellableTask;
use crate::timer::ClockTimer;

/// An acquired resource awaiting release.
///
/// `release` must block until the resource is fully quiesced: a timer
/// until no callback is pending or running, a task until no execution
/// is in flight, a dispatcher until its queue is drained and the
/// worker stopped.
pub trait Resource: Send {
    /// Short name for teardown logging.
    fn name(&self) -> &'static str;

    /// Release the resource, blocking until it is quiesced.
    fn release(&self);
}

/// Stack of acquired resources, released in reverse acquisition order
/// exactly once.
///
/// Supports partial-initialization unwind: tearing down a guard that
/// never acquired a given resource simply skips it, and tearing down
/// twice releases nothing the second time.
#[derive(Default)]
pub struct LifecycleGuard {
    stack: Vec<Box<dyn Resource>>,
}

impl LifecycleGuard {
    /// Create an empty guard.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an acquired resource. Resources are released in the
    /// reverse of the order they were acquired.
    pub fn acquire(&mut self, resource: Box<dyn Resource>) {
        tracing::debug!(resource = resource.name(), "resource acquired");
        self.stack.push(resource);
    }

    /// Release every acquired resource in reverse order.
    ///
    /// Each entry is popped before release, so no resource can be
    /// released twice even if `teardown` is called again.
    pub fn teardown(&mut self) {
        while let Some(resource) = self.stack.pop() {
            tracing::debug!(resource = resource.name(), "releasing resource");
            resource.release();
        }
    }

    /// Number of resources currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stack.len()
    }

    /// True if no resources are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }
}

impl Drop for LifecycleGuard {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl fmt::Debug for LifecycleGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleGuard")
            .field("held", &self.stack.iter().map(|r| r.name()).collect::<Vec<_>>())
            .finish()
    }
}

/// Guard entry for the deferred task dispatcher.
pub(crate) struct DispatcherResource(pub(crate) Arc<dyn Dispatcher>);

impl Resource for DispatcherResource {
    fn name(&self) -> &'static str {
        "dispatcher"
    }

    fn release(&self) {
        self.0.shutdown();
    }
}

/// Guard entry for the registered toggle task.
pub(crate) struct TaskResource(pub(crate) Arc<CancellableTask>);

impl Resource for TaskResource {
    fn name(&self) -> &'static str {
        "toggle task"
    }

    fn release(&self) {
        self.0.cancel_sync();
    }
}

/// Guard entry for the armed clock timer.
pub(crate) struct TimerResource(pub(crate) Arc<dyn ClockTimer>);

impl Resource for TimerResource {
    fn name(&self) -> &'static str {
        "clock timer"
    }

    fn release(&self) {
        self.0.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    struct FakeResource {
        name: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    impl Resource for FakeResource {
        fn name(&self) -> &'static str {
            self.name
        }

        fn release(&self) {
            self.log.lock().push(self.name);
        }
    }

    fn fake(name: &'static str, log: &Arc<Mutex<Vec<&'static str>>>) -> Box<dyn Resource> {
        Box::new(FakeResource {
            name,
            log: Arc::clone(log),
        })
    }

    #[test]
    fn test_teardown_releases_in_reverse_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut guard = LifecycleGuard::new();

        guard.acquire(fake("dispatcher", &log));
        guard.acquire(fake("toggle task", &log));
        guard.acquire(fake("clock timer", &log));
        assert_eq!(guard.len(), 3);

        guard.teardown();

        assert_eq!(*log.lock(), vec!["clock timer", "toggle task", "dispatcher"]);
        assert!(guard.is_empty());
    }

    #[test]
    fn test_double_teardown_releases_once() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut guard = LifecycleGuard::new();

        guard.acquire(fake("dispatcher", &log));
        guard.teardown();
        guard.teardown();

        assert_eq!(*log.lock(), vec!["dispatcher"]);
    }

    #[test]
    fn test_teardown_of_empty_guard_is_noop() {
        let mut guard = LifecycleGuard::new();
        guard.teardown();
        assert!(guard.is_empty());
    }

    #[test]
    fn test_partial_unwind_skips_unacquired() {
        // Only the dispatcher made it before the failure; the timer
        // was never acquired and must not see a release.
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut guard = LifecycleGuard::new();

        guard.acquire(fake("dispatcher", &log));
        guard.teardown();

        assert_eq!(*log.lock(), vec!["dispatcher"]);
    }

    #[test]
    fn test_drop_runs_teardown() {
        let log = Arc::new(Mutex::new(Vec::new()));
        {
            let mut guard = LifecycleGuard::new();
            guard.acquire(fake("dispatcher", &log));
            guard.acquire(fake("clock timer", &log));
        }
        assert_eq!(*log.lock(), vec!["clock timer", "dispatcher"]);
    }
}
