//! Line streams the watchers consume

use anyhow::{Context, Result, bail};
use std::future::Future;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStdout, Command};
use tracing::{info, warn};

use crate::config::Paths;
use crate::constants::logs;

/// Unbounded, lazily produced lines. `None` means the stream closed and
/// only re-opening can continue it.
pub trait LineSource: Send + 'static {
    fn next_line(&mut self) -> impl Future<Output = Result<Option<String>>> + Send;
}

/// Lines appended to files, followed across rotation by `tail -F`
pub struct TailSource {
    // killed when the source is dropped
    _child: Child,
    reader: BufReader<ChildStdout>,
    buf: Vec<u8>,
}

impl TailSource {
    pub fn spawn(args: &[&str], files: &[PathBuf]) -> Result<Self> {
        let mut child = Command::new(logs::TAIL)
            .args(args)
            .args(files)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to spawn {} for {:?}", logs::TAIL, files))?;

        let stdout = child
            .stdout
            .take()
            .context("tail stdout was not captured")?;

        Ok(Self {
            _child: child,
            reader: BufReader::new(stdout),
            buf: Vec::new(),
        })
    }
}

impl LineSource for TailSource {
    async fn next_line(&mut self) -> Result<Option<String>> {
        self.buf.clear();
        let read = self
            .reader
            .read_until(b'\n', &mut self.buf)
            .await
            .context("Failed to read from tail")?;
        if read == 0 {
            return Ok(None);
        }
        // Steam logs are not guaranteed UTF-8
        Ok(Some(String::from_utf8_lossy(&self.buf).trim_end().to_string()))
    }
}

#[cfg(test)]
impl LineSource for tokio::sync::mpsc::Receiver<String> {
    async fn next_line(&mut self) -> Result<Option<String>> {
        Ok(self.recv().await)
    }
}

/// Opens the two log streams
pub trait LogSources: Send + Sync + 'static {
    type Source: LineSource;

    /// Colorspace and game lifecycle lines
    fn color(&self) -> Result<Self::Source>;

    /// Display topology lines, new ones only
    fn monitor(&self) -> Result<Self::Source>;
}

/// Steam logs followed with `tail`
pub struct TailLogs {
    color: Vec<PathBuf>,
    display: PathBuf,
}

impl TailLogs {
    pub fn new(paths: &Paths) -> Self {
        Self {
            color: paths.color_logs(),
            display: paths.display_log(),
        }
    }
}

impl LogSources for TailLogs {
    type Source = TailSource;

    fn color(&self) -> Result<TailSource> {
        for path in &self.color {
            if !path.exists() {
                warn!(path = %path.display(), "Log not found");
            }
        }
        info!(logs = ?self.color, "Following color logs");
        TailSource::spawn(&["-F"], &self.color)
    }

    fn monitor(&self) -> Result<TailSource> {
        if !self.display.exists() {
            bail!("Log not found, cannot watch external monitor: {}", self.display.display());
        }
        info!(log = %self.display.display(), "Starting external monitor watcher");
        TailSource::spawn(&["-Fn0"], std::slice::from_ref(&self.display))
    }
}
