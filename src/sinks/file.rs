//! File sink implementation

use crate::core::{LoggerError, Result, Sink};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub struct FileSink {
    writer: Option<BufWriter<File>>,
    path: PathBuf,
    name: String,
}

impl FileSink {
    /// Create (or truncate) the file at `path`
    pub fn create(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = File::create(&path)
            .map_err(|e| LoggerError::sink_creation(path.display().to_string(), e.to_string()))?;
        Ok(Self::from_file(file, path))
    }

    /// Open `path` for appending, creating it if needed
    pub fn append(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| LoggerError::sink_creation(path.display().to_string(), e.to_string()))?;
        Ok(Self::from_file(file, path))
    }

    fn from_file(file: File, path: PathBuf) -> Self {
        let name = format!("file:{}", path.display());
        Self {
            writer: Some(BufWriter::new(file)),
            path,
            name,
        }
    }

    /// Take an exclusive advisory lock so a second process cannot interleave writes
    ///
    /// The lock is released when the sink is dropped.
    #[cfg(feature = "file")]
    pub fn with_exclusive_lock(self) -> Result<Self> {
        use fs2::FileExt;

        let locked = self
            .writer
            .as_ref()
            .map(|writer| writer.get_ref().try_lock_exclusive().is_ok())
            .unwrap_or(false);

        if locked {
            Ok(self)
        } else {
            Err(LoggerError::file_lock(self.path.display().to_string()))
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Sink for FileSink {
    fn write_record(&mut self, record: &[u8]) -> Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| LoggerError::sink_write(&self.name, "file writer not initialized"))?;

        writer
            .write_all(record)
            .map_err(|e| LoggerError::sink_write(&self.name, e.to_string()))
    }

    fn flush(&mut self) -> Result<()> {
        if let Some(ref mut writer) = self.writer {
            writer.flush()?;
        }
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for FileSink {
    fn drop(&mut self) {
        // Ensure all buffered data is flushed to disk
        let _ = self.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_create_truncates() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("out.log");
        fs::write(&path, "stale\n")?;

        let mut sink = FileSink::create(&path)?;
        sink.write_record(b"fresh\n")?;
        sink.flush()?;

        assert_eq!(fs::read_to_string(&path)?, "fresh\n");
        Ok(())
    }

    #[test]
    fn test_append_keeps_existing_lines() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("out.log");
        fs::write(&path, "old\n")?;

        let mut sink = FileSink::append(&path)?;
        sink.write_record(b"new\n")?;
        drop(sink);

        assert_eq!(fs::read_to_string(&path)?, "old\nnew\n");
        Ok(())
    }

    #[test]
    fn test_create_in_missing_directory_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing").join("out.log");

        let err = FileSink::create(&path).err().unwrap();
        assert!(matches!(err, LoggerError::SinkCreation { .. }));
    }

    #[cfg(feature = "file")]
    #[test]
    fn test_exclusive_lock() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("locked.log");

        let sink = FileSink::create(&path)?.with_exclusive_lock()?;
        assert_eq!(sink.path(), path.as_path());
        Ok(())
    }
}
