//! Sink trait for record output destinations

use super::error::Result;

/// Destination for encoded, newline-terminated log records
///
/// Each sink is driven by its own consumer thread in the fan-out pipeline,
/// so implementations only need to be `Send`.
pub trait Sink: Send {
    /// Write one whole record
    fn write_record(&mut self, record: &[u8]) -> Result<()>;
    fn flush(&mut self) -> Result<()>;
    fn name(&self) -> &str;
}

impl<S: Sink + ?Sized> Sink for Box<S> {
    fn write_record(&mut self, record: &[u8]) -> Result<()> {
        (**self).write_record(record)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
