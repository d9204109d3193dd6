//! Per-theme build log files.
//!
//! The build worker appends commands, step markers and raw process
//! output to `build_log.txt` inside the theme's extraction directory.
//! Readers only ever see snapshots: the logs endpoint returns the last
//! [`LOG_TAIL_LINES`] lines on every poll.

use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

/// How many trailing lines a log snapshot contains.
pub const LOG_TAIL_LINES: usize = 500;

/// Handle to one theme's append-only build log.
#[derive(Debug, Clone)]
pub struct BuildLog {
    path: PathBuf,
}

impl BuildLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn timestamp() -> String {
        chrono::Local::now().format("%H:%M:%S").to_string()
    }

    async fn append(&self, text: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(text.as_bytes()).await?;
        file.flush().await
    }

    /// Append one raw output line (a newline is added).
    pub async fn append_line(&self, line: &str) -> io::Result<()> {
        self.append(&format!("{line}\n")).await
    }

    /// Append a `$ command` header before a process is spawned.
    pub async fn append_command(&self, command: &str) -> io::Result<()> {
        self.append(&format!("\n[{}] $ {command}\n", Self::timestamp()))
            .await
    }

    /// Append a `--- step ---` marker for a pipeline stage.
    pub async fn append_step(&self, message: &str) -> io::Result<()> {
        self.append(&format!("\n[{}] --- {message} ---\n", Self::timestamp()))
            .await
    }

    /// Append an error line, marked so viewers can style it.
    pub async fn append_error(&self, message: &str) -> io::Result<()> {
        self.append(&format!("\n❌ {message}\n")).await
    }

    /// Read the last `max_lines` lines, or `None` when no log exists yet.
    pub async fn tail(&self, max_lines: usize) -> io::Result<Option<String>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };
        let lines: Vec<&str> = content.lines().collect();
        let start = lines.len().saturating_sub(max_lines);
        Ok(Some(lines[start..].join("\n")))
    }
}
