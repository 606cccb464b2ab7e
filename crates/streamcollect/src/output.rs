// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Record output destinations: stdout, file (with rotation), memory.

use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

/// Output configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub enum OutputConfig {
    /// Write to stdout.
    #[default]
    Stdout,
    /// Write to file with optional rotation.
    File {
        path: PathBuf,
        rotation: Option<FileRotation>,
    },
}

/// File rotation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRotation {
    /// Maximum file size in bytes before rotation.
    pub max_size: u64,
    /// Maximum number of rotated files to keep.
    pub max_files: u32,
}

impl Default for FileRotation {
    fn default() -> Self {
        Self {
            max_size: 64 * 1024 * 1024,
            max_files: 5,
        }
    }
}

/// Record output trait.
///
/// `write` receives one complete record line without its newline and must
/// emit it with a single contiguous write.
pub trait SampleOutput: Send {
    /// Write a formatted record line.
    fn write(&mut self, line: &str) -> io::Result<()>;

    /// Flush output.
    fn flush(&mut self) -> io::Result<()>;
}

/// Stdout output.
pub struct StdoutOutput {
    handle: io::Stdout,
    buf: Vec<u8>,
}

impl StdoutOutput {
    pub fn new() -> Self {
        Self {
            handle: io::stdout(),
            buf: Vec::with_capacity(256),
        }
    }
}

impl Default for StdoutOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl SampleOutput for StdoutOutput {
    fn write(&mut self, line: &str) -> io::Result<()> {
        self.buf.clear();
        self.buf.extend_from_slice(line.as_bytes());
        self.buf.push(b'\n');
        // Line-at-a-time so a downstream pipe sees records promptly
        let mut lock = self.handle.lock();
        lock.write_all(&self.buf)?;
        lock.flush()
    }

    fn flush(&mut self) -> io::Result<()> {
        self.handle.flush()
    }
}

/// File output with optional rotation.
pub struct FileOutput {
    path: PathBuf,
    writer: BufWriter<File>,
    rotation: Option<FileRotation>,
    current_size: u64,
}

impl FileOutput {
    /// Open (append) the record file.
    pub fn open(path: impl AsRef<Path>, rotation: Option<FileRotation>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let current_size = file.metadata()?.len();

        Ok(Self {
            path,
            writer: BufWriter::new(file),
            rotation,
            current_size,
        })
    }

    /// Rotate when the current file reached its size limit.
    fn maybe_rotate(&mut self) -> io::Result<()> {
        let max_files = match &self.rotation {
            Some(r) if self.current_size >= r.max_size => r.max_files.max(1),
            _ => return Ok(()),
        };

        self.writer.flush()?;

        // name.N.ext is dropped, name.1.ext -> name.2.ext, ...
        for i in (1..=max_files).rev() {
            let old_path = rotated_path(&self.path, i);
            if old_path.exists() {
                if i >= max_files {
                    std::fs::remove_file(&old_path)?;
                } else {
                    std::fs::rename(&old_path, rotated_path(&self.path, i + 1))?;
                }
            }
        }

        std::fs::rename(&self.path, rotated_path(&self.path, 1))?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        self.writer = BufWriter::new(file);
        self.current_size = 0;

        tracing::debug!(path = %self.path.display(), "Rotated record file");
        Ok(())
    }
}

impl SampleOutput for FileOutput {
    fn write(&mut self, line: &str) -> io::Result<()> {
        self.maybe_rotate()?;

        let bytes = line.as_bytes();
        self.writer.write_all(bytes)?;
        self.writer.write_all(b"\n")?;
        self.current_size += bytes.len() as u64 + 1;

        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

/// Generate rotated file path.
fn rotated_path(base: &Path, index: u32) -> PathBuf {
    let stem = base.file_stem().unwrap_or_default().to_string_lossy();
    let ext = base
        .extension()
        .map(|e| e.to_string_lossy())
        .unwrap_or_default();

    let new_name = if ext.is_empty() {
        format!("{}.{}", stem, index)
    } else {
        format!("{}.{}.{}", stem, index, ext)
    };

    base.with_file_name(new_name)
}

/// In-memory output for embedding the collector in another process.
///
/// Clones share the same buffer.
#[derive(Clone, Default)]
pub struct MemoryOutput {
    lines: Arc<Mutex<Vec<String>>>,
}

impl MemoryOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the lines written so far.
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Remove and return the lines written so far.
    pub fn drain(&self) -> Vec<String> {
        std::mem::take(&mut *self.lines.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl SampleOutput for MemoryOutput {
    fn write(&mut self, line: &str) -> io::Result<()> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(line.to_string());
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Create output from configuration.
pub fn create_output(config: &OutputConfig) -> io::Result<Box<dyn SampleOutput>> {
    match config {
        OutputConfig::Stdout => Ok(Box::new(StdoutOutput::new())),
        OutputConfig::File { path, rotation } => {
            Ok(Box::new(FileOutput::open(path, rotation.clone())?))
        }
    }
}

/// Parse size string like "10M", "100K", "1G".
///
/// Returns `None` for malformed input or a size that does not fit in `u64`.
pub fn parse_size(s: &str) -> Option<u64> {
    let s = s.trim().to_uppercase();

    let (num, unit) = if let Some(num) = s.strip_suffix('K') {
        (num, 1u64 << 10)
    } else if let Some(num) = s.strip_suffix('M') {
        (num, 1 << 20)
    } else if let Some(num) = s.strip_suffix('G') {
        (num, 1 << 30)
    } else {
        (s.as_str(), 1)
    };

    num.parse::<u64>().ok()?.checked_mul(unit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_output() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("records.tsv");

        let mut output = FileOutput::open(&path, None).unwrap();
        output.write("20\t1000\t10\t0\t-42\t0x00\tExtra:0").unwrap();
        output.write("21\t1001\t10\t0\t-40\t0x00\tExtra:0").unwrap();
        output.flush().unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "20\t1000\t10\t0\t-42\t0x00\tExtra:0\n21\t1001\t10\t0\t-40\t0x00\tExtra:0\n"
        );
    }

    #[test]
    fn test_file_output_appends() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested/dir/records.tsv");

        {
            let mut output = FileOutput::open(&path, None).unwrap();
            output.write("first").unwrap();
            output.flush().unwrap();
        }
        let mut output = FileOutput::open(&path, None).unwrap();
        output.write("second").unwrap();
        output.flush().unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "first\nsecond\n");
    }

    #[test]
    fn test_file_rotation() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("records.tsv");

        let rotation = FileRotation {
            max_size: 50,
            max_files: 3,
        };
        let mut output = FileOutput::open(&path, Some(rotation)).unwrap();

        for i in 0..20 {
            output.write(&format!("20\t{}\t10\t0\t-42\t0x00\tExtra:0", i)).unwrap();
        }
        output.flush().unwrap();

        assert!(path.exists());
        assert!(temp_dir.path().join("records.1.tsv").exists());
        assert!(temp_dir.path().join("records.2.tsv").exists());
        assert!(temp_dir.path().join("records.3.tsv").exists());
        assert!(!temp_dir.path().join("records.4.tsv").exists());
    }

    #[test]
    fn test_rotated_path() {
        let base = Path::new("/var/log/samples.tsv");
        assert_eq!(
            rotated_path(base, 1),
            PathBuf::from("/var/log/samples.1.tsv")
        );

        let no_ext = Path::new("/var/log/samples");
        assert_eq!(rotated_path(no_ext, 2), PathBuf::from("/var/log/samples.2"));
    }

    #[test]
    fn test_memory_output_shared() {
        let output = MemoryOutput::new();
        let mut writer = output.clone();
        writer.write("a").unwrap();
        writer.write("b").unwrap();

        assert_eq!(output.lines(), vec!["a", "b"]);
        assert_eq!(output.drain(), vec!["a", "b"]);
        assert!(output.lines().is_empty());
    }

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("100"), Some(100));
        assert_eq!(parse_size("10K"), Some(10 * 1024));
        assert_eq!(parse_size("10m"), Some(10 * 1024 * 1024));
        assert_eq!(parse_size("1G"), Some(1024 * 1024 * 1024));
        assert_eq!(parse_size("big"), None);
    }

    #[test]
    fn test_parse_size_overflow() {
        assert_eq!(parse_size("99999999999G"), None);
        assert_eq!(parse_size("18014398509481984K"), None);
        assert_eq!(parse_size("17179869183G"), Some(17179869183 * 1024 * 1024 * 1024));
    }
}
