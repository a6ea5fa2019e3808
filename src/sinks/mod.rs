//! Sink implementations

pub mod console;
pub mod file;
pub mod network;
pub mod writer;

pub use console::{ConsoleSink, ConsoleTarget};
pub use file::FileSink;
pub use network::NetworkSink;
pub use writer::{SharedBuffer, WriterSink};

pub use crate::core::Sink;

use crate::core::config::{STDERR, STDOUT};
use crate::core::Result;

/// Open the sink named by an output destination
///
/// `"stderr"` and `"stdout"` select the console (optionally colored);
/// anything else is a file path that is created (or truncated).
pub fn open_output(destination: &str, colors: bool) -> Result<Box<dyn Sink>> {
    match destination {
        STDERR => Ok(Box::new(ConsoleSink::stderr().with_colors(colors))),
        STDOUT => Ok(Box::new(ConsoleSink::stdout().with_colors(colors))),
        path => Ok(Box::new(FileSink::create(path)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_output() {
        assert_eq!(open_output("stderr", false).unwrap().name(), "stderr");
        assert_eq!(open_output("stdout", true).unwrap().name(), "stdout");

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        let sink = open_output(path.to_str().unwrap(), false).unwrap();
        assert!(sink.name().starts_with("file:"));
    }
}
