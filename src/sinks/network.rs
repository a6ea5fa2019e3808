//! Network sink for remote logging
//!
//! Streams records to a remote server over TCP.

use crate::core::{LoggerError, Result, Sink};
use std::io::Write;
use std::net::TcpStream;
use std::time::Duration;

const WRITE_TIMEOUT: Duration = Duration::from_secs(5);

/// Network sink that sends records to a remote TCP server
///
/// # Example
///
/// ```no_run
/// use fanout_logger::sinks::NetworkSink;
/// use fanout_logger::Logger;
///
/// let sink = NetworkSink::connect("127.0.0.1:8080")
///     .expect("Failed to connect to log server");
///
/// let logger = Logger::builder().sink(sink).build().unwrap();
/// logger.info("This record is sent to 127.0.0.1:8080");
/// ```
pub struct NetworkSink {
    stream: Option<TcpStream>,
    address: String,
    name: String,
    reconnect_on_error: bool,
}

impl NetworkSink {
    /// Connect to `addr` (e.g. "localhost:8080")
    pub fn connect(addr: impl Into<String>) -> Result<Self> {
        let address = addr.into();
        let stream = Self::open(&address)
            .map_err(|e| LoggerError::sink_creation(&address, e.to_string()))?;

        Ok(Self {
            stream: Some(stream),
            name: format!("tcp:{}", address),
            address,
            reconnect_on_error: true,
        })
    }

    /// Enable or disable automatic reconnection on errors
    ///
    /// Default: enabled
    #[must_use]
    pub fn with_reconnect(mut self, enable: bool) -> Self {
        self.reconnect_on_error = enable;
        self
    }

    fn open(address: &str) -> std::io::Result<TcpStream> {
        let stream = TcpStream::connect(address)?;
        stream.set_write_timeout(Some(WRITE_TIMEOUT))?;
        stream.set_nodelay(true)?;
        Ok(stream)
    }

    fn send(&mut self, record: &[u8]) -> std::io::Result<()> {
        match self.stream {
            Some(ref mut stream) => stream.write_all(record),
            None => Err(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "network stream not connected",
            )),
        }
    }
}

impl Sink for NetworkSink {
    fn write_record(&mut self, record: &[u8]) -> Result<()> {
        let err = match self.send(record) {
            Ok(()) => return Ok(()),
            Err(e) => e,
        };

        // Connection lost
        self.stream = None;
        if !self.reconnect_on_error {
            return Err(LoggerError::sink_write(&self.name, err.to_string()));
        }

        match Self::open(&self.address) {
            Ok(stream) => {
                self.stream = Some(stream);
                self.send(record)
                    .map_err(|e| LoggerError::sink_write(&self.name, e.to_string()))
            }
            Err(reconnect_err) => Err(LoggerError::sink_write(
                &self.name,
                format!("{} (reconnect: {})", err, reconnect_err),
            )),
        }
    }

    fn flush(&mut self) -> Result<()> {
        if let Some(ref mut stream) = self.stream {
            stream.flush()?;
        }
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
