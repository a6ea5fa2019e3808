//! Core logger types and traits

pub mod capability;
pub mod config;
pub mod encoder;
pub mod error;
pub mod log_context;
pub mod log_entry;
pub mod log_level;
pub mod logger;
pub mod metrics;
pub mod sink;

pub use capability::{CorrelationLogger, Debugger, FieldLogger, NoopDebugger, StderrDebugger};
pub use config::{LogEncoding, LogEnv, LoggerConfig, STDERR, STDOUT};
pub use encoder::Encoder;
pub use error::{LoggerError, Result};
pub use log_context::{args_to_string, fields_from_map, Field, FieldValue};
pub use log_entry::LogEntry;
pub use log_level::LogLevel;
pub use logger::{Logger, LoggerBuilder, DEFAULT_SHUTDOWN_TIMEOUT};
pub use metrics::{BusMetrics, LoggerMetrics};
pub use sink::Sink;
