//! Main logger implementation
//!
//! Every entry is encoded into one line and written into an in-process pipe.
//! A dedicated pipeline thread scans that pipe and fans each line out through
//! the bus to every configured sink.

use super::{
    capability::{CorrelationLogger, Debugger, FieldLogger, NoopDebugger, StderrDebugger},
    config::{LogEncoding, LogEnv, LoggerConfig},
    encoder::Encoder,
    error::{panic_message, LoggerError, Result},
    log_context::{Field, FieldValue},
    log_entry::LogEntry,
    log_level::LogLevel,
    metrics::{BusMetrics, LoggerMetrics},
    sink::Sink,
};
use crate::bus::{Bus, DeliveryPolicy, Subscription, GLOBAL_TOPIC};
use crate::correlation::CORRELATION_ID_KEY;
use crate::pipeline::{pipe, CancelToken, FanOut, PipeWriter};
use crate::sinks;
use parking_lot::{Mutex, RwLock};
use std::backtrace::Backtrace;
use std::fmt;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Default shutdown timeout for logger cleanup (5 seconds)
///
/// This timeout is used when the last logger handle is dropped without an
/// explicit [`Logger::close`].
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

const PIPELINE_THREAD: &str = "fanout-pipeline";

/// State shared by a logger and every handle derived from it
struct Core {
    level: LogLevel,
    env: LogEnv,
    encoder: Encoder,
    stacktrace: bool,
    correlation_key: String,
    writer: RwLock<Option<PipeWriter>>,
    pipeline: Mutex<Option<thread::JoinHandle<Result<()>>>>,
    /// Fired by the pipeline when a sink fails
    cancel: CancelToken,
    bus: Bus,
    metrics: LoggerMetrics,
}

impl Core {
    fn write(&self, record: &[u8]) {
        let sent = if self.cancel.is_cancelled() {
            // Ending the pipe releases the scan so the aborted pipeline can finish
            self.writer.write().take();
            false
        } else {
            match self.writer.read().as_ref() {
                Some(writer) => writer.send(record).is_ok(),
                None => false,
            }
        };

        if sent {
            self.metrics.record_logged();
        } else if self.metrics.record_dropped() == 0 {
            eprintln!("[LOGGER WARNING] Fan-out pipeline is not running; dropping log entries");
        }
    }

    fn stacktrace_threshold(&self) -> LogLevel {
        if self.env.is_development() {
            LogLevel::Warn
        } else {
            LogLevel::Error
        }
    }
}

impl Drop for Core {
    fn drop(&mut self) {
        // Ending the pipe lets the pipeline drain and exit
        drop(self.writer.get_mut().take());

        if let Some(handle) = self.pipeline.get_mut().take() {
            let start = Instant::now();
            let timeout = DEFAULT_SHUTDOWN_TIMEOUT;

            loop {
                if handle.is_finished() {
                    match handle.join() {
                        Ok(Ok(())) => {}
                        Ok(Err(e)) => eprintln!("[LOGGER ERROR] Fan-out pipeline failed: {}", e),
                        Err(e) => eprintln!(
                            "[LOGGER ERROR] Fan-out pipeline thread panicked during shutdown: {}",
                            panic_message(e.as_ref())
                        ),
                    }
                    break;
                }

                if start.elapsed() >= timeout {
                    eprintln!(
                        "[LOGGER WARNING] Fan-out pipeline did not finish within {:?} timeout. \
                         Some logs may be lost.",
                        timeout
                    );
                    break;
                }

                thread::sleep(Duration::from_millis(10));
            }
        }

        let dropped = self.metrics.dropped_count();
        if dropped > 0 {
            eprintln!(
                "[LOGGER WARNING] Logger shutting down with {} dropped logs (drop rate: {:.2}%)",
                dropped,
                self.metrics.drop_rate()
            );
        }
    }
}

/// Structured logger writing through the fan-out pipeline
///
/// Cloning is cheap; clones and derived loggers (`with_correlation_id`,
/// `with_field`) share one pipeline. The pipeline shuts down when
/// [`close`](Self::close) is called or the last handle is dropped.
///
/// # Example
///
/// ```
/// use fanout_logger::{Logger, LogLevel};
///
/// let logger = Logger::builder().level(LogLevel::Debug).build().unwrap();
/// let request_logger = logger.with_correlation_id("req-42").with_field("user", "ada");
/// request_logger.info("order placed");
/// logger.close().unwrap();
/// ```
#[derive(Clone)]
pub struct Logger {
    core: Arc<Core>,
    correlation_id: Option<Arc<str>>,
    fields: Arc<Vec<Field>>,
}

impl Logger {
    /// Create a builder for Logger
    #[must_use]
    pub fn builder() -> LoggerBuilder {
        LoggerBuilder::new()
    }

    /// Build a logger from plain configuration
    pub fn from_config(config: &LoggerConfig) -> Result<Self> {
        LoggerBuilder::new()
            .level(config.level()?)
            .env(config.env()?)
            .encoding(config.encoding()?)
            .stacktrace(config.stacktrace)
            .outputs(config.outputs.iter().cloned())
            .build()
    }

    pub fn level(&self) -> LogLevel {
        self.core.level
    }

    pub fn env(&self) -> LogEnv {
        self.core.env
    }

    pub fn encoding(&self) -> LogEncoding {
        self.core.encoder.encoding()
    }

    pub fn is_enabled(&self, level: LogLevel) -> bool {
        level >= self.core.level
    }

    /// The correlation token bound to this handle
    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn log(&self, level: LogLevel, message: impl Into<String>) {
        if !self.is_enabled(level) {
            return;
        }

        let mut entry = LogEntry::new(level, message.into())
            .with_correlation_id(self.correlation_id.as_deref())
            .with_fields(&self.fields, &self.core.correlation_key);

        if self.core.stacktrace && level >= self.core.stacktrace_threshold() {
            entry = entry.with_stacktrace(Backtrace::force_capture().to_string());
        }

        self.core.write(&self.core.encoder.encode(&entry));
    }

    #[inline]
    pub fn debug(&self, message: impl Into<String>) {
        self.log(LogLevel::Debug, message);
    }

    #[inline]
    pub fn info(&self, message: impl Into<String>) {
        self.log(LogLevel::Info, message);
    }

    #[inline]
    pub fn warn(&self, message: impl Into<String>) {
        self.log(LogLevel::Warn, message);
    }

    #[inline]
    pub fn error(&self, message: impl Into<String>) {
        self.log(LogLevel::Error, message);
    }

    /// Log, then panic when running in development
    pub fn dpanic(&self, message: impl Into<String>) {
        let message = message.into();
        self.log(LogLevel::DPanic, message.as_str());
        if self.core.env.is_development() {
            panic!("{}", message);
        }
    }

    /// Log, then panic
    pub fn panic(&self, message: impl Into<String>) -> ! {
        let message = message.into();
        self.log(LogLevel::Panic, message.as_str());
        panic!("{}", message);
    }

    /// Log, close the pipeline so the entry reaches its sinks, then exit with status 1
    pub fn fatal(&self, message: impl Into<String>) -> ! {
        self.log(LogLevel::Fatal, message);
        if let Err(e) = self.close() {
            eprintln!("[LOGGER ERROR] Failed to close logger before exit: {}", e);
        }
        std::process::exit(1);
    }

    /// Derive a logger bound to `id`; this handle is unchanged
    #[must_use]
    pub fn with_correlation_id(&self, id: impl Into<String>) -> Logger {
        let id: String = id.into();
        Logger {
            core: Arc::clone(&self.core),
            correlation_id: Some(Arc::from(id)),
            fields: Arc::clone(&self.fields),
        }
    }

    /// Derive a logger carrying one more field
    #[must_use]
    pub fn with_field(&self, key: impl Into<String>, value: impl Into<FieldValue>) -> Logger {
        self.with_fields(vec![Field::new(key, value)])
    }

    /// Derive a logger carrying extra fields
    #[must_use]
    pub fn with_fields(&self, fields: Vec<Field>) -> Logger {
        let mut merged = Vec::with_capacity(self.fields.len() + fields.len());
        merged.extend(self.fields.iter().cloned());
        merged.extend(fields);
        Logger {
            core: Arc::clone(&self.core),
            correlation_id: self.correlation_id.clone(),
            fields: Arc::new(merged),
        }
    }

    /// Tap the encoded log stream as an extra bus subscriber
    ///
    /// Taps are delivered under [`DeliveryPolicy::DropNewest`] whatever the
    /// logger's policy: records arriving while the tap's slot is still full
    /// are dropped for the tap, and an undrained tap never holds up the sinks
    /// or [`close`](Self::close).
    pub fn subscribe(&self) -> Subscription {
        self.core
            .bus
            .subscribe_with_policy(GLOBAL_TOPIC, DeliveryPolicy::DropNewest)
    }

    /// End the log stream and wait for every sink to receive it
    ///
    /// Returns the pipeline result (a sink failure, for instance). Entries
    /// logged afterwards are counted as dropped.
    pub fn close(&self) -> Result<()> {
        drop(self.core.writer.write().take());

        match self.core.pipeline.lock().take() {
            Some(handle) => handle.join().map_err(|e| {
                LoggerError::worker_panicked(PIPELINE_THREAD, panic_message(e.as_ref()))
            })?,
            None => Err(LoggerError::LoggerClosed),
        }
    }

    /// Get the logger metrics for detailed observability
    ///
    /// # Example
    ///
    /// ```
    /// use fanout_logger::Logger;
    ///
    /// let logger = Logger::builder().build().unwrap();
    /// logger.info("hello");
    ///
    /// let metrics = logger.metrics();
    /// println!("Dropped: {}", metrics.dropped_count());
    /// println!("Total logged: {}", metrics.total_logged());
    /// println!("Drop rate: {:.2}%", metrics.drop_rate());
    /// ```
    pub fn metrics(&self) -> &LoggerMetrics {
        &self.core.metrics
    }

    pub fn bus_metrics(&self) -> &BusMetrics {
        self.core.bus.metrics()
    }

    pub fn dropped_count(&self) -> u64 {
        self.core.metrics.dropped_count()
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("level", &self.core.level)
            .field("env", &self.core.env)
            .field("encoding", &self.core.encoder.encoding())
            .field("correlation_id", &self.correlation_id)
            .field("fields", &self.fields.len())
            .finish()
    }
}

impl Debugger for Logger {
    fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }
}

impl CorrelationLogger for Logger {
    fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    fn error(&self, message: &str) {
        self.log(LogLevel::Error, message);
    }

    fn with_correlation_id(&self, id: &str) -> Box<dyn CorrelationLogger> {
        Box::new(Logger::with_correlation_id(self, id))
    }

    fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }

    fn as_field_logger(&self) -> Option<&dyn FieldLogger> {
        Some(self)
    }
}

impl FieldLogger for Logger {
    fn with_field(&self, key: &str, value: FieldValue) -> Box<dyn FieldLogger> {
        Box::new(Logger::with_field(self, key, value))
    }

    fn with_fields(&self, fields: Vec<Field>) -> Box<dyn FieldLogger> {
        Box::new(Logger::with_fields(self, fields))
    }
}

/// Builder for constructing Logger with a fluent API
///
/// Name-based setters (`level_name`, `encoding_name`) defer their parse
/// errors to [`build`](Self::build), so a bad name never yields a logger.
///
/// # Example
/// ```
/// use fanout_logger::prelude::*;
///
/// let logger = Logger::builder()
///     .level_name("debug")
///     .env(LogEnv::Production)
///     .encoding(LogEncoding::Json)
///     .output("stderr")
///     .delivery_policy(DeliveryPolicy::Block)
///     .build()
///     .unwrap();
/// logger.debug("ready");
/// ```
pub struct LoggerBuilder {
    level: LogLevel,
    env: LogEnv,
    encoding: LogEncoding,
    stacktrace: bool,
    colors: bool,
    correlation_key: String,
    outputs: Vec<String>,
    sinks: Vec<Box<dyn Sink>>,
    delivery_policy: DeliveryPolicy,
    invalid: Option<LoggerError>,
}

impl LoggerBuilder {
    /// Create a new builder with default values
    pub fn new() -> Self {
        Self {
            level: LogLevel::Info,
            env: LogEnv::Development,
            encoding: LogEncoding::Console,
            stacktrace: true,
            colors: false,
            correlation_key: CORRELATION_ID_KEY.to_string(),
            outputs: Vec::new(),
            sinks: Vec::new(),
            delivery_policy: DeliveryPolicy::default(),
            invalid: None,
        }
    }

    fn reject(mut self, err: LoggerError) -> Self {
        self.invalid.get_or_insert(err);
        self
    }

    /// Set minimum log level
    #[must_use = "builder methods return a new value"]
    pub fn level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    /// Set minimum log level by name (`debug`, `info`, ...)
    #[must_use = "builder methods return a new value"]
    pub fn level_name(self, name: &str) -> Self {
        match name.parse() {
            Ok(level) => self.level(level),
            Err(e) => self.reject(e),
        }
    }

    #[must_use = "builder methods return a new value"]
    pub fn env(mut self, env: LogEnv) -> Self {
        self.env = env;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn encoding(mut self, encoding: LogEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Set the encoding by name (`json` or `console`)
    #[must_use = "builder methods return a new value"]
    pub fn encoding_name(self, name: &str) -> Self {
        match name.parse() {
            Ok(encoding) => self.encoding(encoding),
            Err(e) => self.reject(e),
        }
    }

    /// Attach stack traces to severe entries (default: on)
    #[must_use = "builder methods return a new value"]
    pub fn stacktrace(mut self, enabled: bool) -> Self {
        self.stacktrace = enabled;
        self
    }

    /// Color the level column on console outputs
    #[must_use = "builder methods return a new value"]
    pub fn colors(mut self, enabled: bool) -> Self {
        self.colors = enabled;
        self
    }

    /// Key under which the correlation token is encoded
    #[must_use = "builder methods return a new value"]
    pub fn correlation_key(mut self, key: impl Into<String>) -> Self {
        self.correlation_key = key.into();
        self
    }

    /// Add an output destination: `"stderr"`, `"stdout"` or a file path
    #[must_use = "builder methods return a new value"]
    pub fn output(mut self, destination: impl Into<String>) -> Self {
        self.outputs.push(destination.into());
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn outputs<I, S>(mut self, destinations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.outputs.extend(destinations.into_iter().map(Into::into));
        self
    }

    /// Add a custom sink
    #[must_use = "builder methods return a new value"]
    pub fn sink<S: Sink + 'static>(mut self, sink: S) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    /// Set how the bus delivers to a subscriber whose slot is full
    ///
    /// Default is `Block`.
    #[must_use = "builder methods return a new value"]
    pub fn delivery_policy(mut self, policy: DeliveryPolicy) -> Self {
        self.delivery_policy = policy;
        self
    }

    /// Build the Logger and start its pipeline
    ///
    /// Without any output or sink the logger writes to stderr.
    pub fn build(self) -> Result<Logger> {
        if let Some(err) = self.invalid {
            return Err(err);
        }

        let mut outputs = self.outputs;
        if outputs.is_empty() && self.sinks.is_empty() {
            outputs.push(super::config::STDERR.to_string());
        }

        let mut all_sinks = Vec::with_capacity(outputs.len() + self.sinks.len());
        for destination in &outputs {
            all_sinks.push(sinks::open_output(destination, self.colors)?);
        }
        all_sinks.extend(self.sinks);

        let debugger: Arc<dyn Debugger> = if self.level == LogLevel::Debug {
            Arc::new(StderrDebugger)
        } else {
            Arc::new(NoopDebugger)
        };

        let bus = Bus::with_policy(self.delivery_policy);
        let cancel = CancelToken::new();
        let fan_out = FanOut::new(bus.clone())
            .with_debugger(debugger)
            .with_cancel_token(cancel.clone());
        let (writer, reader) = pipe();

        let handle = thread::Builder::new()
            .name(PIPELINE_THREAD.to_string())
            .spawn(move || fan_out.run(reader, all_sinks))
            .map_err(|e| LoggerError::io_operation("starting pipeline", e.to_string(), e))?;

        Ok(Logger {
            core: Arc::new(Core {
                level: self.level,
                env: self.env,
                encoder: Encoder::new(self.encoding, self.correlation_key.clone()),
                stacktrace: self.stacktrace,
                correlation_key: self.correlation_key,
                writer: RwLock::new(Some(writer)),
                pipeline: Mutex::new(Some(handle)),
                cancel,
                bus,
                metrics: LoggerMetrics::new(),
            }),
            correlation_id: None,
            fields: Arc::new(Vec::new()),
        })
    }
}

impl Default for LoggerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sinks::{SharedBuffer, WriterSink};

    fn json_logger(level: LogLevel, buffer: &SharedBuffer) -> Logger {
        Logger::builder()
            .level(level)
            .encoding(LogEncoding::Json)
            .stacktrace(false)
            .sink(WriterSink::new("buffer", buffer.clone()))
            .build()
            .unwrap()
    }

    fn records(buffer: &SharedBuffer) -> Vec<serde_json::Value> {
        buffer
            .contents_string()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn test_level_filtering() {
        let buffer = SharedBuffer::new();
        let logger = json_logger(LogLevel::Warn, &buffer);

        logger.debug("hidden");
        logger.info("hidden");
        logger.warn("shown");
        logger.error("shown too");
        logger.close().unwrap();

        let got = records(&buffer);
        assert_eq!(got.len(), 2);
        assert_eq!(got[0]["level"], "warn");
        assert_eq!(got[1]["msg"], "shown too");
        assert_eq!(logger.metrics().total_logged(), 2);
    }

    #[test]
    fn test_correlation_and_fields() {
        let buffer = SharedBuffer::new();
        let logger = json_logger(LogLevel::Info, &buffer);

        logger
            .with_correlation_id("abc")
            .with_field("user", "ada")
            .with_field("correlation_id", "spoofed")
            .info("hello");
        logger.info("plain");
        logger.close().unwrap();

        let got = records(&buffer);
        assert_eq!(got[0]["correlation_id"], "abc");
        assert_eq!(got[0]["user"], "ada");
        assert!(got[1].get("correlation_id").is_none());
    }

    #[test]
    fn test_parent_unchanged_by_children() {
        let logger = json_logger(LogLevel::Info, &SharedBuffer::new());
        let child = logger.with_correlation_id("child").with_field("k", 1);

        assert_eq!(logger.correlation_id(), None);
        assert!(logger.fields().is_empty());
        assert_eq!(child.correlation_id(), Some("child"));
        assert_eq!(child.fields().len(), 1);
    }

    #[test]
    fn test_close_twice() {
        let logger = json_logger(LogLevel::Info, &SharedBuffer::new());
        assert!(logger.close().is_ok());
        assert!(matches!(logger.close(), Err(LoggerError::LoggerClosed)));
    }

    #[test]
    fn test_close_with_undrained_tap() {
        let buffer = SharedBuffer::new();
        let logger = json_logger(LogLevel::Info, &buffer);
        let _tap = logger.subscribe();

        for i in 0..5 {
            logger.info(format!("entry {}", i));
        }

        let (done, closed) = crossbeam_channel::bounded(1);
        let closer = logger.clone();
        thread::spawn(move || {
            let _ = done.send(closer.close().is_ok());
        });

        let closed = closed
            .recv_timeout(Duration::from_secs(5))
            .expect("close blocked on the tap");
        assert!(closed);
        assert_eq!(records(&buffer).len(), 5);
    }

    #[test]
    fn test_entries_after_sink_failure_are_dropped() {
        struct Broken;

        impl Sink for Broken {
            fn write_record(&mut self, _record: &[u8]) -> Result<()> {
                Err(LoggerError::sink_write("broken", "unplugged"))
            }

            fn flush(&mut self) -> Result<()> {
                Ok(())
            }

            fn name(&self) -> &str {
                "broken"
            }
        }

        let logger = Logger::builder().sink(Broken).build().unwrap();
        logger.info("fails the sink");

        let start = Instant::now();
        while logger.dropped_count() == 0 && start.elapsed() < Duration::from_secs(5) {
            logger.info("retrying");
            thread::sleep(Duration::from_millis(5));
        }
        assert!(logger.dropped_count() > 0, "pipeline abort never observed");

        let logged = logger.metrics().total_logged();
        let dropped = logger.dropped_count();
        for _ in 0..3 {
            logger.info("after abort");
        }
        assert_eq!(logger.metrics().total_logged(), logged);
        assert_eq!(logger.dropped_count(), dropped + 3);

        let err = logger.close().unwrap_err();
        assert!(err.to_string().contains("unplugged"));
        assert!(matches!(logger.close(), Err(LoggerError::LoggerClosed)));
    }

    #[test]
    fn test_logging_after_close_is_dropped() {
        let logger = json_logger(LogLevel::Info, &SharedBuffer::new());
        logger.close().unwrap();

        logger.info("too late");
        assert_eq!(logger.dropped_count(), 1);
    }

    #[test]
    fn test_bad_names_fail_build() {
        let err = Logger::builder().level_name("loud").build().unwrap_err();
        assert!(err.to_string().contains("allowed values are"));

        let err = Logger::builder().encoding_name("xml").build().unwrap_err();
        assert!(err.to_string().contains("no encoder registered for name \"xml\""));
    }

    #[test]
    fn test_unknown_env_fails_from_config() {
        let config = LoggerConfig {
            env: "staging".into(),
            ..LoggerConfig::default()
        };
        let err = Logger::from_config(&config).unwrap_err();
        assert!(matches!(err, LoggerError::InvalidConfiguration { .. }));
    }

    #[test]
    fn test_unwritable_output_fails_build() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("app.log");

        let err = Logger::builder()
            .output(path.to_string_lossy())
            .build()
            .unwrap_err();
        assert!(matches!(err, LoggerError::SinkCreation { .. }));
    }

    #[test]
    fn test_stacktrace_threshold_follows_env() {
        let buffer = SharedBuffer::new();
        let logger = Logger::builder()
            .env(LogEnv::Production)
            .encoding(LogEncoding::Json)
            .sink(WriterSink::new("buffer", buffer.clone()))
            .build()
            .unwrap();

        logger.warn("no trace");
        logger.error("trace");
        logger.close().unwrap();

        let got = records(&buffer);
        assert!(got[0].get("stacktrace").is_none());
        assert!(got[1].get("stacktrace").is_some());
    }

    #[test]
    fn test_dpanic_only_panics_in_development() {
        let logger = Logger::builder()
            .env(LogEnv::Production)
            .sink(WriterSink::new("buffer", SharedBuffer::new()))
            .build()
            .unwrap();
        logger.dpanic("tolerated");

        let dev = Logger::builder()
            .env(LogEnv::Development)
            .sink(WriterSink::new("buffer", SharedBuffer::new()))
            .build()
            .unwrap();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| dev.dpanic("boom")));
        assert!(result.is_err());
    }

    #[test]
    fn test_field_logger_view() {
        let buffer = SharedBuffer::new();
        let logger = json_logger(LogLevel::Info, &buffer);

        let dynamic: &dyn CorrelationLogger = &logger;
        let fields = dynamic.as_field_logger().unwrap();
        fields.with_field("request", FieldValue::from("ping")).info("");
        logger.close().unwrap();

        assert_eq!(records(&buffer)[0]["request"], "ping");
    }
}
