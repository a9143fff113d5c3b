//! Observability: typed event names and structured logging
//!
//! All diagnostics use the `tracing` macros with an `event` field taken from
//! [`Event`]. Nothing here affects matching or corpus state.

mod events;
mod logger;

pub use events::Event;
pub use logger::{init_logging, LogFormat, LoggingConfig};
