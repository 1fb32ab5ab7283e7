//! Core helpers shared by the calgate crates: tracing setup and time windows.

pub mod time;
pub mod tracing;

pub use time::{TimeWindow, format_timestamp, parse_timestamp};
pub use tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
