//! Error types for the logger system

pub type Result<T> = std::result::Result<T, LoggerError>;

#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    /// IO error with context
    #[error("IO error while {operation}: {message}")]
    IoOperation {
        operation: String,
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Generic IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Invalid configuration with details
    #[error("Invalid configuration for {component}: {message}")]
    InvalidConfiguration { component: String, message: String },

    /// Output destination could not be opened
    #[error("Sink creation failed for '{destination}': {message}")]
    SinkCreation {
        destination: String,
        message: String,
    },

    /// A sink rejected a record
    #[error("Sink '{sink}' write failed: {message}")]
    SinkWrite { sink: String, message: String },

    /// File lock error
    #[error("Failed to acquire file lock on '{path}'")]
    FileLockError { path: String },

    /// The input scan and at least one sink failed in the same pipeline run
    #[error("Fan-out pipeline failed: scan: {scan}; sink: {sink}")]
    Pipeline {
        scan: Box<LoggerError>,
        sink: Box<LoggerError>,
    },

    /// Correlation id could not be resolved
    #[error("Correlation error: {0}")]
    Correlation(#[from] crate::correlation::CorrelationError),

    /// Logger already closed
    #[error("Logger already closed")]
    LoggerClosed,

    /// A worker thread panicked
    #[error("Worker '{worker}' panicked: {message}")]
    WorkerPanicked { worker: String, message: String },

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl LoggerError {
    /// Create an IO operation error with context
    pub fn io_operation(
        operation: impl Into<String>,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        LoggerError::IoOperation {
            operation: operation.into(),
            message: message.into(),
            source,
        }
    }

    /// Create an invalid configuration error
    pub fn config(component: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::InvalidConfiguration {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Create a sink creation error
    pub fn sink_creation(destination: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::SinkCreation {
            destination: destination.into(),
            message: message.into(),
        }
    }

    /// Create a sink write error
    pub fn sink_write(sink: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::SinkWrite {
            sink: sink.into(),
            message: message.into(),
        }
    }

    /// Create a file lock error
    pub fn file_lock(path: impl Into<String>) -> Self {
        LoggerError::FileLockError { path: path.into() }
    }

    /// Join a scan failure with a sink failure
    pub fn pipeline(scan: LoggerError, sink: LoggerError) -> Self {
        LoggerError::Pipeline {
            scan: Box::new(scan),
            sink: Box::new(sink),
        }
    }

    pub fn worker_panicked(worker: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::WorkerPanicked {
            worker: worker.into(),
            message: message.into(),
        }
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        LoggerError::Other(msg.into())
    }
}

/// Render a thread panic payload as text
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}
