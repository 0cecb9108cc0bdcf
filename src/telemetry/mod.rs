//! Telemetry and logging infrastructure
//!
//! Provides structured logging with tracing and decode timing statistics.

pub mod logging;
pub mod metrics;

pub use logging::{init_logging, LogConfig, LogGuard, LoggingError};
pub use metrics::{DecodeProfiler, DecodeStats};
