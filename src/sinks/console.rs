//! Console sink implementation

use crate::core::{LoggerError, Result, Sink};
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleTarget {
    Stdout,
    Stderr,
}

pub struct ConsoleSink {
    target: ConsoleTarget,
    use_colors: bool,
}

impl ConsoleSink {
    pub fn stderr() -> Self {
        Self {
            target: ConsoleTarget::Stderr,
            use_colors: false,
        }
    }

    pub fn stdout() -> Self {
        Self {
            target: ConsoleTarget::Stdout,
            use_colors: false,
        }
    }

    /// Highlight the level column of console-encoded records
    ///
    /// Has no effect unless the `console` feature is enabled.
    #[must_use]
    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }

    pub fn target(&self) -> ConsoleTarget {
        self.target
    }

    #[cfg(feature = "console")]
    fn colorize(record: &[u8]) -> Vec<u8> {
        use crate::core::LogLevel;
        use colored::Colorize;

        let line = String::from_utf8_lossy(record);
        for level in LogLevel::ALL {
            let column = format!("\t{}\t", level.label());
            if line.contains(&column) {
                let painted = format!("\t{}\t", level.label().color(level.color_code()));
                return line.replacen(&column, &painted, 1).into_bytes();
            }
        }
        record.to_vec()
    }

    #[cfg(not(feature = "console"))]
    fn colorize(record: &[u8]) -> Vec<u8> {
        record.to_vec()
    }
}

impl Sink for ConsoleSink {
    fn write_record(&mut self, record: &[u8]) -> Result<()> {
        let painted;
        let bytes = if self.use_colors {
            painted = Self::colorize(record);
            &painted[..]
        } else {
            record
        };

        let result = match self.target {
            ConsoleTarget::Stdout => std::io::stdout().lock().write_all(bytes),
            ConsoleTarget::Stderr => std::io::stderr().lock().write_all(bytes),
        };
        result.map_err(|e| LoggerError::sink_write(self.name(), e.to_string()))
    }

    fn flush(&mut self) -> Result<()> {
        match self.target {
            ConsoleTarget::Stdout => std::io::stdout().flush()?,
            ConsoleTarget::Stderr => std::io::stderr().flush()?,
        }
        Ok(())
    }

    fn name(&self) -> &str {
        match self.target {
            ConsoleTarget::Stdout => "stdout",
            ConsoleTarget::Stderr => "stderr",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_sink_names() {
        assert_eq!(ConsoleSink::stdout().name(), "stdout");
        assert_eq!(ConsoleSink::stderr().name(), "stderr");
    }

    #[cfg(feature = "console")]
    #[test]
    fn test_colorize_keeps_other_columns() {
        colored::control::set_override(true);
        let painted = ConsoleSink::colorize(b"ts\tERROR\tdisk full\n");
        let text = String::from_utf8(painted).unwrap();

        assert!(text.starts_with("ts\t"));
        assert!(text.ends_with("\tdisk full\n"));
        assert!(text.contains("\x1b["));
        colored::control::unset_override();
    }

    #[test]
    fn test_write_to_stdout() {
        let mut sink = ConsoleSink::stdout();
        assert!(sink.write_record(b"console sink test\n").is_ok());
        assert!(sink.flush().is_ok());
    }
}
