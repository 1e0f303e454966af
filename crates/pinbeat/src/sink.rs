//! Hardware output sink trait and hardware-free implementations.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use crate::error::SinkError;

/// A binary hardware output pin.
///
/// The host integration is expected to drive the pin to its active
/// level (`true`) before starting the scheduler; the scheduler records
/// that as the initial state and never performs a write of its own at
/// startup.
///
/// `set_level` may block or sleep. It is only ever called from the
/// dispatcher's single worker slot, never from the restricted timer
/// callback context, so implementations are free to take bus locks or
/// wait on slow hardware.
pub trait OutputSink: Send + 'static {
    /// Drive the pin to the given level (`true` = active/asserted).
    ///
    /// # Errors
    ///
    /// Returns a [`SinkError`] if the write fails. A failed write does
    /// not stop the waveform; the scheduler reports the error and
    /// re-arms the next phase regardless.
    fn set_level(&mut self, active: bool) -> Result<(), SinkError>;
}

/// A sink that only logs transitions, for hardware-free environments.
///
/// Useful for host integrations that want to observe the waveform in
/// log output before wiring up real pin access.
#[derive(Debug, Default)]
pub struct TracingSink {
    writes: u64,
}

impl TracingSink {
    /// Create a new tracing sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl OutputSink for TracingSink {
    fn set_level(&mut self, active: bool) -> Result<(), SinkError> {
        self.writes += 1;
        tracing::info!(level = active, writes = self.writes, "heartbeat edge");
        Ok(())
    }
}

/// A single recorded write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkEvent {
    /// The level that was driven.
    pub level: bool,
    /// When the write happened.
    pub at: Instant,
}

/// A sink that records every write, for tests and bring-up.
///
/// Cheap to construct; take a [`SinkProbe`] before handing the sink to
/// the scheduler to inspect the recorded writes afterwards.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Arc<Mutex<Vec<SinkEvent>>>,
}

impl MemorySink {
    /// Create a new recording sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A shared handle onto this sink's recorded writes.
    #[must_use]
    pub fn probe(&self) -> SinkProbe {
        SinkProbe {
            events: Arc::clone(&self.events),
        }
    }
}

impl OutputSink for MemorySink {
    fn set_level(&mut self, active: bool) -> Result<(), SinkError> {
        self.events.lock().push(SinkEvent {
            level: active,
            at: Instant::now(),
        });
        Ok(())
    }
}

/// Read-side handle for a [`MemorySink`].
#[derive(Debug, Clone)]
pub struct SinkProbe {
    events: Arc<Mutex<Vec<SinkEvent>>>,
}

impl SinkProbe {
    /// All recorded writes, oldest first.
    #[must_use]
    pub fn events(&self) -> Vec<SinkEvent> {
        self.events.lock().clone()
    }

    /// Just the driven levels, oldest first.
    #[must_use]
    pub fn levels(&self) -> Vec<bool> {
        self.events.lock().iter().map(|e| e.level).collect()
    }

    /// Number of recorded writes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// True if nothing has been written yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}
