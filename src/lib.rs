//! # Fan-out Logger
//!
//! A structured logger whose output is republished, line by line, to any
//! number of independent sinks, with per-request correlation ids threaded
//! through server handlers into every record.
//!
//! ## Features
//!
//! - **Event bus**: topic-partitioned publish/subscribe with per-subscriber FIFO
//! - **Fan-out pipeline**: one byte stream to many sinks, cancelled on the first sink failure
//! - **Correlation ids**: extraction, generation and injection in unary and streaming interceptors
//! - **Structured logging**: JSON or console encoding, fields, levels from `debug` to `fatal`
//!
//! ## Example
//!
//! ```
//! use fanout_logger::prelude::*;
//! use fanout_logger::sinks::{SharedBuffer, WriterSink};
//!
//! let buffer = SharedBuffer::new();
//! let logger = Logger::builder()
//!     .encoding(LogEncoding::Json)
//!     .sink(WriterSink::new("memory", buffer.clone()))
//!     .build()
//!     .unwrap();
//!
//! logger.with_correlation_id("abc").info("hello");
//! logger.close().unwrap();
//!
//! assert!(buffer.contents_string().contains(r#""correlation_id":"abc""#));
//! ```

pub mod bus;
#[cfg(feature = "cli")]
pub mod cli;
pub mod core;
pub mod correlation;
pub mod macros;
pub mod pipeline;
pub mod sinks;

pub mod prelude {
    pub use crate::bus::{Bus, DeliveryPolicy, Subscription, SubscriptionId};
    pub use crate::core::{
        CorrelationLogger, Debugger, Field, FieldLogger, FieldValue, LogEncoding, LogEnv,
        LogLevel, Logger, LoggerBuilder, LoggerConfig, LoggerError, Result, Sink,
    };
    pub use crate::correlation::{CorrelationInterceptor, Metadata, RequestContext};
    pub use crate::pipeline::FanOut;
    pub use crate::sinks::{ConsoleSink, FileSink};
}

pub use crate::core::{
    args_to_string, fields_from_map, BusMetrics, CorrelationLogger, Debugger, Encoder, Field,
    FieldLogger, FieldValue, LogEncoding, LogEntry, LogEnv, LogLevel, Logger, LoggerBuilder,
    LoggerConfig, LoggerError, LoggerMetrics, Result, Sink, DEFAULT_SHUTDOWN_TIMEOUT,
};
pub use bus::{Bus, DeliveryPolicy, Record, Subscription, SubscriptionId, GLOBAL_TOPIC};
pub use correlation::{CorrelationError, CorrelationInterceptor, Metadata, RequestContext};
pub use pipeline::FanOut;
pub use sinks::{ConsoleSink, FileSink, NetworkSink, WriterSink};
