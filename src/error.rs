use std::path::{Path, PathBuf};

use thiserror::Error;

/// Failures surfaced by the dataset tools. Every variant is fatal to the current invocation.
#[derive(Debug, Error)]
pub enum EditorError {
    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("invalid dataset: {reason} (example: {stem})")]
    InvalidDataset { stem: String, reason: String },

    #[error("insufficient data: {0}")]
    InsufficientData(String),

    #[error("io error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("rename record error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),
}

pub type Result<T> = std::result::Result<T, EditorError>;

impl EditorError {
    pub fn config(msg: impl Into<String>) -> Self {
        EditorError::Configuration(msg.into())
    }

    pub fn insufficient(msg: impl Into<String>) -> Self {
        EditorError::InsufficientData(msg.into())
    }
}

/// Attach the offending path to a raw `io::Error`.
pub trait IoContext<T> {
    fn at(self, path: &Path) -> Result<T>;
}

impl<T> IoContext<T> for std::io::Result<T> {
    fn at(self, path: &Path) -> Result<T> {
        self.map_err(|source| EditorError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Fails with `Configuration` unless `path` exists.
pub fn require_exists(path: &Path) -> Result<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(EditorError::config(format!("not found: {}", path.display())))
    }
}

/// Fails with `Configuration` unless `path` is an existing directory.
pub fn require_dir(path: &Path) -> Result<()> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(EditorError::config(format!(
            "not a directory: {}",
            path.display()
        )))
    }
}

/// Fails with `Configuration` if `path` already exists.
pub fn require_absent(path: &Path) -> Result<()> {
    if path.exists() {
        Err(EditorError::config(format!(
            "refusing to overwrite existing {}",
            path.display()
        )))
    } else {
        Ok(())
    }
}

/// Parent of `path`, treating a bare relative name as living in `.`.
pub fn parent_or_cwd(path: &Path) -> PathBuf {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
