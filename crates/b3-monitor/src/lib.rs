//! Logging setup and per-job progress tracking.

mod logging;
mod progress;

pub use logging::{setup_logging, LogFormat, LoggingConfig};
pub use progress::{JobLogEntry, JobState, JobStatus, LogLevel};
pub use tracing_appender::non_blocking::WorkerGuard;
