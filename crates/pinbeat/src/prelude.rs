//! Prelude for pinbeat.
//!
//! Re-exports the types most host integrations need.
//!
//! # Example
//!
//! ```no_run
//! use pinbeat::prelude::*;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = PulseConfig::validate(500, 100)?;
//! let mut heartbeat = Heartbeat::start(config, Box::new(TracingSink::new()))?;
//! heartbeat.stop();
//! # Ok(())
//! # }
//! ```

pub use crate::config::PulseConfig;
pub use crate::error::{AcquisitionError, ConfigError, DispatchError, SinkError};
pub use crate::scheduler::{Heartbeat, HeartbeatBuilder, SinkErrorHook};
pub use crate::sink::{MemorySink, OutputSink, SinkEvent, SinkProbe, TracingSink};
