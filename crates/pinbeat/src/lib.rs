//! # pinbeat
//!
//! Self-correcting heartbeat pulse scheduler for watchdog companion
//! hardware.
//!
//! A single binary output pin is driven with an asymmetric square
//! wave (a total period and a pulse width within it) so external
//! monitoring hardware can tell the controlling process is alive:
//!
//! ```text
//! level ▲
//!  true │────┐         ┌────┐         ┌──
//!       │    │         │    │         │
//! false │    └─────────┘    └─────────┘
//!       └────┴─────────┴────┴─────────┴──► time
//!        pulse   rest   pulse   rest
//!       ◄──── period ──►
//! ```
//!
//! The interesting part is not the pin write but the timing loop
//! around it:
//!
//! - the deadline callback runs in a restricted context and only
//!   submits a pre-registered toggle task to a single-worker
//!   dispatcher, never touching hardware;
//! - the toggle task measures the cost of its own (possibly blocking)
//!   hardware write and shortens the next deadline by it, so a slow
//!   write does not stretch the emitted period;
//! - startup acquires dispatcher, toggle task, and timer in order, and
//!   every teardown path (normal stop or mid-startup failure) releases
//!   them in exact reverse order, exactly once, with at most one
//!   toggle ever in flight.
//!
//! ## Example
//!
//! ```no_run
//! use pinbeat::prelude::*;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // 500ms period, 100ms active pulse.
//! let config = PulseConfig::validate(500, 100)?;
//! let mut heartbeat = Heartbeat::start(config, Box::new(TracingSink::new()))?;
//!
//! // ... process does its work; the pin keeps beating ...
//!
//! // Blocks until the timer, toggle task, and dispatcher are released.
//! heartbeat.stop();
//! # Ok(())
//! # }
//! ```
//!
//! Custom hardware plugs in through [`OutputSink`](sink::OutputSink);
//! tests and hardware-free hosts can use
//! [`MemorySink`](sink::MemorySink) or
//! [`TracingSink`](sink::TracingSink).

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic_in_result_fn,
    clippy::panic,
    missing_docs,
    missing_debug_implementations
)]
#![warn(clippy::pedantic)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod lifecycle;
pub mod prelude;
pub mod scheduler;
pub mod sink;
pub mod task;
pub mod timer;

pub use config::PulseConfig;
pub use error::{AcquisitionError, ConfigError, DispatchError, SinkError};
pub use scheduler::{Heartbeat, HeartbeatBuilder, SinkErrorHook};
pub use sink::{MemorySink, OutputSink, TracingSink};
