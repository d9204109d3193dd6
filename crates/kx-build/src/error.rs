use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),
    #[error("archive entry escapes the extraction directory: {0}")]
    UnsafeArchivePath(String),
    #[error("command failed: {command} (exit code {code})")]
    CommandFailed { command: String, code: i32 },
    #[error("build finished but the static output directory is missing: {0}")]
    MissingOutput(PathBuf),
    #[error("invalid theme status: {0}")]
    InvalidStatus(String),
}
