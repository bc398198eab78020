use crate::logging::ConsoleOutput;
use crate::Result;
use anyhow::{anyhow, Context};
use std::fs::{create_dir_all, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

/// Destination of formatted lines: a console writer plus an optional
/// append-mode log file.
///
/// Writes are best effort. The first failure of each destination is reported
/// once through `tracing`; later failures of that destination are dropped.
pub struct Sink {
    console: Box<dyn Write + Send>,
    console_failed: bool,
    log_file: Option<LogFile>,
}

struct LogFile {
    path: PathBuf,
    file: File,
    failed: bool,
}

impl Sink {
    pub fn new(output: ConsoleOutput) -> Self {
        Self::with_writer(output.writer())
    }

    pub fn with_writer(writer: Box<dyn Write + Send>) -> Self {
        Self {
            console: writer,
            console_failed: false,
            log_file: None,
        }
    }

    /// Open `path` for appending and duplicate every later line into it.
    /// A previously attached file is closed.
    pub fn attach(&mut self, path: &Path) -> Result<()> {
        ensure_parent_dir(path)?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("failed to open log file {}", path.display()))?;
        self.log_file = Some(LogFile {
            path: path.to_path_buf(),
            file,
            failed: false,
        });
        Ok(())
    }

    pub fn log_file_path(&self) -> Option<&Path> {
        self.log_file.as_ref().map(|log| log.path.as_path())
    }

    pub fn write_line(&mut self, line: &str) {
        if let Err(err) = write_terminated(&mut self.console, line) {
            if !self.console_failed {
                self.console_failed = true;
                tracing::warn!("console sink write failed, dropping further errors: {}", err);
            }
        }

        if let Some(log) = self.log_file.as_mut() {
            if let Err(err) = write_terminated(&mut log.file, line) {
                if !log.failed {
                    log.failed = true;
                    tracing::warn!(
                        "log file {} write failed, dropping further errors: {}",
                        log.path.display(),
                        err
                    );
                }
            }
        }
    }
}

fn write_terminated<W: Write + ?Sized>(writer: &mut W, line: &str) -> io::Result<()> {
    writer.write_all(line.as_bytes())?;
    writer.write_all(b"\n")?;
    writer.flush()
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    match path.parent() {
        Some(directory) if !directory.as_os_str().is_empty() => create_dir_all(directory)
            .with_context(|| format!("failed to create log directory {}", directory.display())),
        Some(_) => Ok(()),
        None => Err(anyhow!("log file path {} has no parent directory", path.display())),
    }
}

/// In-memory writer shared between a tracer and whoever inspects its output.
#[derive(Clone, Default, Debug)]
pub struct SharedBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, lossily decoded.
    pub fn contents(&self) -> String {
        let bytes = self.bytes.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&bytes).into_owned()
    }

    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }

    pub fn clear(&self) {
        self.bytes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
