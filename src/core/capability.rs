//! Logging capabilities consumed by the pipeline and the correlation layer
//!
//! [`Logger`](crate::Logger) implements all three; tests and embedders can
//! supply their own, and the correlation layer works with the minimal
//! [`CorrelationLogger`] alone.

use super::log_context::{Field, FieldValue};
use std::fmt;

/// Debug-level sink for diagnostic notices
pub trait Debugger: Send + Sync {
    fn debug(&self, message: &str);

    fn debugf(&self, args: fmt::Arguments<'_>) {
        self.debug(&args.to_string());
    }
}

/// A logger that can be bound to a correlation token
pub trait CorrelationLogger: Debugger {
    fn info(&self, message: &str);

    fn infof(&self, args: fmt::Arguments<'_>) {
        self.info(&args.to_string());
    }

    fn error(&self, message: &str);

    fn errorf(&self, args: fmt::Arguments<'_>) {
        self.error(&args.to_string());
    }

    /// Derive a logger bound to `id`; `self` is left untouched
    fn with_correlation_id(&self, id: &str) -> Box<dyn CorrelationLogger>;

    /// The token this logger is bound to, if any
    fn correlation_id(&self) -> Option<&str>;

    /// Structured view of this logger when it supports fields
    fn as_field_logger(&self) -> Option<&dyn FieldLogger> {
        None
    }
}

/// A correlation logger that can attach structured fields
pub trait FieldLogger: CorrelationLogger {
    fn with_field(&self, key: &str, value: FieldValue) -> Box<dyn FieldLogger>;

    fn with_fields(&self, fields: Vec<Field>) -> Box<dyn FieldLogger>;
}

/// Writes debug notices to stderr with the internal diagnostic prefix
#[derive(Debug, Clone, Copy, Default)]
pub struct StderrDebugger;

impl Debugger for StderrDebugger {
    fn debug(&self, message: &str) {
        eprintln!("[LOGGER DEBUG] {}", message);
    }
}

/// Discards every notice
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopDebugger;

impl Debugger for NoopDebugger {
    fn debug(&self, _message: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<String>>);

    impl Debugger for Recorder {
        fn debug(&self, message: &str) {
            self.0.lock().push(message.to_string());
        }
    }

    #[test]
    fn test_debugf_formats_through_debug() {
        let recorder = Recorder::default();
        recorder.debugf(format_args!("key={}", "value"));
        recorder.debug("plain");

        assert_eq!(*recorder.0.lock(), vec!["key=value", "plain"]);
    }
}
