//! Adapters turning any `io::Write` into a sink

use crate::core::{LoggerError, Result, Sink};
use parking_lot::Mutex;
use std::io::{self, Write};
use std::sync::Arc;

/// Sink over an arbitrary writer (socket, pipe, buffer, ...)
///
/// # Example
///
/// ```
/// use fanout_logger::sinks::{SharedBuffer, WriterSink};
/// use fanout_logger::Sink;
///
/// let buffer = SharedBuffer::new();
/// let mut sink = WriterSink::new("buffer", buffer.clone());
/// sink.write_record(b"1\n").unwrap();
/// assert_eq!(buffer.contents(), b"1\n");
/// ```
pub struct WriterSink<W: Write + Send> {
    name: String,
    writer: W,
}

impl<W: Write + Send> WriterSink<W> {
    pub fn new(name: impl Into<String>, writer: W) -> Self {
        Self {
            name: name.into(),
            writer,
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> Sink for WriterSink<W> {
    fn write_record(&mut self, record: &[u8]) -> Result<()> {
        self.writer
            .write_all(record)
            .map_err(|e| LoggerError::sink_write(&self.name, e.to_string()))
    }

    fn flush(&mut self) -> Result<()> {
        self.writer
            .flush()
            .map_err(|e| LoggerError::sink_write(&self.name, e.to_string()))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Cloneable in-memory buffer; every clone writes into the same bytes
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything written so far
    pub fn contents(&self) -> Vec<u8> {
        self.bytes.lock().clone()
    }

    pub fn contents_string(&self) -> String {
        String::from_utf8_lossy(&self.bytes.lock()).into_owned()
    }

    pub fn len(&self) -> usize {
        self.bytes.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.lock().is_empty()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BrokenWriter;

    impl Write for BrokenWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "failed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_writer_sink_reports_its_name() {
        let mut sink = WriterSink::new("broken", BrokenWriter);
        let err = sink.write_record(b"x\n").unwrap_err();
        assert_eq!(err.to_string(), "Sink 'broken' write failed: failed");
    }

    #[test]
    fn test_shared_buffer_clones_share_bytes() {
        let buffer = SharedBuffer::new();
        let mut a = WriterSink::new("a", buffer.clone());
        let mut b = WriterSink::new("b", buffer.clone());

        a.write_record(b"1\n").unwrap();
        b.write_record(b"2\n").unwrap();

        assert_eq!(buffer.contents_string(), "1\n2\n");
        assert_eq!(buffer.len(), 4);
    }
}
