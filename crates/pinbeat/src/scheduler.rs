//! The pulse scheduler: toggle algorithm, startup, and teardown.
//!
//! Control flow once running:
//!
//! ```text
//! ClockTimer deadline fires (restricted context)
//!        │  submit pre-registered toggle task, nothing else
//!        ▼
//! Dispatcher worker slot (unrestricted context)
//!        │  flip level → sink.set_level() → measure cost → re-arm
//!        ▼
//! ClockTimer armed for (phase - write cost), cycle repeats
//! ```
//!
//! The re-arm delay compensates for the latency of the current
//! hardware write only. Queuing delay between timer fire and task
//! start is not corrected, so sustained scheduling pressure can drift
//! the waveform slowly; this is an accepted limitation, not a bug.

use std::fmt;
use std::sync::{Arc, OnceLock};
use std::time::Instant;

use parking_lot::Mutex;

use crate::config::PulseConfig;
use crate::dispatcher::{Dispatcher, WorkerDispatcher};
use crate::error::{AcquisitionError, SinkError};
use crate::lifecycle::{DispatcherResource, LifecycleGuard, TaskResource, TimerResource};
use crate::sink::OutputSink;
use crate::task::CancellableTask;
use crate::timer::{ClockTimer, ThreadTimer, TimerCallback};

/// Observation hook for per-toggle hardware write failures.
///
/// Called at most once per failed write, from the dispatcher worker.
pub type SinkErrorHook = Arc<dyn Fn(&SinkError) + Send + Sync>;

type TimerFactory = Box<dyn FnOnce() -> Result<Arc<dyn ClockTimer>, AcquisitionError>>;
type DispatcherFactory = Box<dyn FnOnce() -> Result<Arc<dyn Dispatcher>, AcquisitionError>>;

/// Current output level. Owned exclusively by the scheduler and
/// mutated only inside the dispatcher's single execution slot.
#[derive(Debug)]
struct PulseState {
    level: bool,
}

/// Shared state of a running heartbeat: waveform parameters, output
/// level, and the sink.
struct PulseCore {
    config: PulseConfig,
    state: Mutex<PulseState>,
    sink: Mutex<Box<dyn OutputSink>>,
    on_sink_error: Option<SinkErrorHook>,
}

impl PulseCore {
    /// The toggle task body. Runs in the dispatcher's worker slot, so
    /// it may block in `set_level`.
    fn toggle(&self, timer: &dyn ClockTimer) {
        let started = Instant::now();

        let level = {
            let mut state = self.state.lock();
            state.level = !state.level;
            state.level
        };

        let result = self.sink.lock().set_level(level);
        let elapsed = started.elapsed();

        if let Err(err) = result {
            tracing::warn!(%err, level, "heartbeat write failed, waveform keeps running");
            if let Some(hook) = &self.on_sink_error {
                hook(&err);
            }
        }

        // The phase starting now belongs to the level just driven:
        // active -> pulse width, inactive -> rest. Subtracting the
        // write cost keeps the emitted period accurate; clamped at
        // zero so a slow write never schedules into the past.
        let phase = if level {
            self.config.pulse_width()
        } else {
            self.config.rest()
        };
        timer.rearm(phase.saturating_sub(elapsed));
    }
}

/// Builder for a [`Heartbeat`].
///
/// The clock timer and dispatcher default to the thread-backed
/// reference facilities; tests inject recording or failing factories
/// through [`timer`](Self::timer) and [`dispatcher`](Self::dispatcher).
#[derive(Default)]
pub struct HeartbeatBuilder {
    timer: Option<TimerFactory>,
    dispatcher: Option<DispatcherFactory>,
    on_sink_error: Option<SinkErrorHook>,
}

impl HeartbeatBuilder {
    /// Override the clock timer facility.
    #[must_use]
    pub fn timer(
        mut self,
        factory: impl FnOnce() -> Result<Arc<dyn ClockTimer>, AcquisitionError> + 'static,
    ) -> Self {
        self.timer = Some(Box::new(factory));
        self
    }

    /// Override the deferred task dispatcher.
    #[must_use]
    pub fn dispatcher(
        mut self,
        factory: impl FnOnce() -> Result<Arc<dyn Dispatcher>, AcquisitionError> + 'static,
    ) -> Self {
        self.dispatcher = Some(Box::new(factory));
        self
    }

    /// Observe per-toggle hardware write failures.
    ///
    /// Each failed write is surfaced here exactly once; the waveform
    /// continues regardless.
    #[must_use]
    pub fn on_sink_error(mut self, hook: impl Fn(&SinkError) + Send + Sync + 'static) -> Self {
        self.on_sink_error = Some(Arc::new(hook));
        self
    }

    /// Start the heartbeat.
    ///
    /// Acquisition order is dispatcher, then toggle-task registration,
    /// then timer; the first deadline is armed at `now + pulse_width`
    /// because the sink is already driven active. If any acquisition
    /// step fails, everything acquired before it is released in
    /// reverse order before the error is returned, and no pulse is
    /// ever emitted.
    ///
    /// # Errors
    ///
    /// Returns an [`AcquisitionError`] if a facility fails to
    /// initialize.
    pub fn start(
        self,
        config: PulseConfig,
        sink: Box<dyn OutputSink>,
    ) -> Result<Heartbeat, AcquisitionError> {
        let mut guard = LifecycleGuard::new();

        let dispatcher_factory = self.dispatcher.unwrap_or_else(|| Box::new(default_dispatcher));
        let dispatcher = match dispatcher_factory() {
            Ok(dispatcher) => dispatcher,
            Err(err) => {
                guard.teardown();
                return Err(err);
            }
        };
        guard.acquire(Box::new(DispatcherResource(Arc::clone(&dispatcher))));

        let core = Arc::new(PulseCore {
            config,
            // Matches the hardware sink's initial driven state.
            state: Mutex::new(PulseState { level: true }),
            sink: Mutex::new(sink),
            on_sink_error: self.on_sink_error,
        });

        // The toggle task re-arms the timer, but the timer is acquired
        // after the task; the slot is filled in between.
        let timer_slot: Arc<OnceLock<Arc<dyn ClockTimer>>> = Arc::new(OnceLock::new());
        let task = Arc::new(CancellableTask::new({
            let core = Arc::clone(&core);
            let timer_slot = Arc::clone(&timer_slot);
            move || {
                if let Some(timer) = timer_slot.get() {
                    core.toggle(timer.as_ref());
                }
            }
        }));
        guard.acquire(Box::new(TaskResource(Arc::clone(&task))));

        let timer_factory = self.timer.unwrap_or_else(|| Box::new(default_timer));
        let timer = match timer_factory() {
            Ok(timer) => timer,
            Err(err) => {
                guard.teardown();
                return Err(err);
            }
        };
        if timer_slot.set(Arc::clone(&timer)).is_err() {
            guard.teardown();
            return Err(AcquisitionError::new(
                "clock timer",
                "toggle task already bound to a timer",
            ));
        }
        guard.acquire(Box::new(TimerResource(Arc::clone(&timer))));

        // Restricted-context callback: clone the registered task and
        // hand it to the dispatcher, nothing else.
        let callback: TimerCallback = {
            let dispatcher = Arc::clone(&dispatcher);
            let task = Arc::clone(&task);
            Arc::new(move || {
                if let Err(err) = dispatcher.submit(Arc::clone(&task)) {
                    tracing::warn!(%err, "failed to queue heartbeat toggle");
                }
            })
        };

        // Level starts active, so the pulse phase elapses first.
        timer.arm(config.pulse_width(), callback);

        tracing::info!(
            period_ms = config.period_ms(),
            pulse_width_ms = config.pulse_width_ms(),
            rest_ms = config.rest_ms(),
            "heartbeat started"
        );

        Ok(Heartbeat { guard })
    }
}

impl fmt::Debug for HeartbeatBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeartbeatBuilder")
            .field("custom_timer", &self.timer.is_some())
            .field("custom_dispatcher", &self.dispatcher.is_some())
            .field("sink_error_hook", &self.on_sink_error.is_some())
            .finish()
    }
}

fn default_dispatcher() -> Result<Arc<dyn Dispatcher>, AcquisitionError> {
    let dispatcher: Arc<dyn Dispatcher> = WorkerDispatcher::spawn()?;
    Ok(dispatcher)
}

fn default_timer() -> Result<Arc<dyn ClockTimer>, AcquisitionError> {
    let timer: Arc<dyn ClockTimer> = ThreadTimer::spawn()?;
    Ok(timer)
}

/// A running heartbeat.
///
/// Stopping (explicitly via [`stop`](Self::stop) or implicitly on
/// drop) blocks until the timer, the toggle task, and the dispatcher
/// have all quiesced, in that order. Teardown never interrupts an
/// in-progress toggle; it only cancels future scheduling.
#[derive(Debug)]
pub struct Heartbeat {
    guard: LifecycleGuard,
}

impl Heartbeat {
    /// Start a heartbeat with the default thread-backed facilities.
    ///
    /// # Errors
    ///
    /// Returns an [`AcquisitionError`] if a facility fails to
    /// initialize; see [`HeartbeatBuilder::start`].
    pub fn start(config: PulseConfig, sink: Box<dyn OutputSink>) -> Result<Self, AcquisitionError> {
        Self::builder().start(config, sink)
    }

    /// Create a builder to customize facilities before starting.
    #[must_use]
    pub fn builder() -> HeartbeatBuilder {
        HeartbeatBuilder::default()
    }

    /// Stop the heartbeat, blocking until all resources are released.
    /// Idempotent.
    pub fn stop(&mut self) {
        if self.guard.is_empty() {
            return;
        }
        tracing::info!("stopping heartbeat");
        self.guard.teardown();
    }
}

impl Drop for Heartbeat {
    fn drop(&mut self) {
        self.stop();
    }
}
