//! Filesystem mutation seam. Every tool writes through a [`FileStore`], so a run can be
//! executed for real ([`FsStore`]) or only planned ([`DryRunStore`]).

use std::fmt;
use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use crate::error::{EditorError, IoContext, Result};

pub trait FileStore {
    /// Copy a single file to `dst` (a file path, overwritten if present).
    fn copy(&mut self, src: &Path, dst: &Path) -> Result<()>;

    /// Create a symlink at `link` pointing to `target`, replacing an existing non-directory entry.
    fn symlink(&mut self, target: &Path, link: &Path) -> Result<()>;

    /// Move `src` to `dst`.
    fn move_to(&mut self, src: &Path, dst: &Path) -> Result<()>;

    /// Create `path` and any missing parents.
    fn mkdir(&mut self, path: &Path) -> Result<()>;

    /// Write `contents` to `path`, replacing any existing file.
    fn write_file(&mut self, path: &Path, contents: &[u8]) -> Result<()>;

    /// Entries of `dir`, sorted by file name.
    fn list(&self, dir: &Path) -> Result<Vec<PathBuf>>;

    /// Whether the run only records operations.
    fn is_dry_run(&self) -> bool {
        false
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct FsStore;

impl FileStore for FsStore {
    fn copy(&mut self, src: &Path, dst: &Path) -> Result<()> {
        std::fs::copy(src, dst).at(src)?;
        Ok(())
    }

    fn symlink(&mut self, target: &Path, link: &Path) -> Result<()> {
        if let Ok(meta) = std::fs::symlink_metadata(link) {
            if meta.is_dir() {
                return Err(EditorError::config(format!(
                    "refusing to replace directory {} with a symlink",
                    link.display()
                )));
            }
            std::fs::remove_file(link).at(link)?;
        }

        #[cfg(unix)]
        {
            std::os::unix::fs::symlink(target, link).at(link)
        }

        #[cfg(not(unix))]
        {
            let _ = target;
            Err(EditorError::config(format!(
                "symlinks are not supported on this platform ({})",
                link.display()
            )))
        }
    }

    fn move_to(&mut self, src: &Path, dst: &Path) -> Result<()> {
        std::fs::rename(src, dst).at(src)
    }

    fn mkdir(&mut self, path: &Path) -> Result<()> {
        std::fs::create_dir_all(path).at(path)
    }

    fn write_file(&mut self, path: &Path, contents: &[u8]) -> Result<()> {
        std::fs::write(path, contents).at(path)
    }

    fn list(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        list_dir(dir)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOp {
    Copy { src: PathBuf, dst: PathBuf },
    Symlink { target: PathBuf, link: PathBuf },
    Move { src: PathBuf, dst: PathBuf },
    Mkdir { path: PathBuf },
    Write { path: PathBuf, bytes: usize },
}

impl fmt::Display for StoreOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreOp::Copy { src, dst } => write!(f, "copy {} -> {}", src.display(), dst.display()),
            StoreOp::Symlink { target, link } => {
                write!(f, "symlink {} -> {}", link.display(), target.display())
            }
            StoreOp::Move { src, dst } => write!(f, "move {} -> {}", src.display(), dst.display()),
            StoreOp::Mkdir { path } => write!(f, "mkdir {}", path.display()),
            StoreOp::Write { path, bytes } => {
                write!(f, "write {} ({bytes} bytes)", path.display())
            }
        }
    }
}

/// Records mutations instead of performing them; listing still reads the real filesystem.
#[derive(Debug, Default)]
pub struct DryRunStore {
    pub ops: Vec<StoreOp>,
}

impl DryRunStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&mut self, op: StoreOp) {
        debug!(%op, "dry run");
        self.ops.push(op);
    }

    pub fn count(&self, pred: impl Fn(&StoreOp) -> bool) -> usize {
        self.ops.iter().filter(|op| pred(op)).count()
    }
}

impl FileStore for DryRunStore {
    fn copy(&mut self, src: &Path, dst: &Path) -> Result<()> {
        self.record(StoreOp::Copy {
            src: src.to_path_buf(),
            dst: dst.to_path_buf(),
        });
        Ok(())
    }

    fn symlink(&mut self, target: &Path, link: &Path) -> Result<()> {
        self.record(StoreOp::Symlink {
            target: target.to_path_buf(),
            link: link.to_path_buf(),
        });
        Ok(())
    }

    fn move_to(&mut self, src: &Path, dst: &Path) -> Result<()> {
        self.record(StoreOp::Move {
            src: src.to_path_buf(),
            dst: dst.to_path_buf(),
        });
        Ok(())
    }

    fn mkdir(&mut self, path: &Path) -> Result<()> {
        self.record(StoreOp::Mkdir {
            path: path.to_path_buf(),
        });
        Ok(())
    }

    fn write_file(&mut self, path: &Path, contents: &[u8]) -> Result<()> {
        self.record(StoreOp::Write {
            path: path.to_path_buf(),
            bytes: contents.len(),
        });
        Ok(())
    }

    fn list(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        list_dir(dir)
    }

    fn is_dry_run(&self) -> bool {
        true
    }
}

pub fn list_dir(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut out: Vec<PathBuf> = Vec::new();
    for entry in std::fs::read_dir(dir).at(dir)? {
        let entry = entry.at(dir)?;
        out.push(entry.path());
    }
    out.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(out)
}

/// Regular files (symlinks followed) of `dir`, sorted by name.
pub fn list_files(store: &dyn FileStore, dir: &Path) -> Result<Vec<PathBuf>> {
    Ok(store.list(dir)?.into_iter().filter(|p| p.is_file()).collect())
}

/// Final path component as a `&Path`, or an error for paths like `..`.
pub fn file_name(path: &Path) -> Result<&Path> {
    path.file_name().map(Path::new).ok_or_else(|| {
        EditorError::config(format!("path has no file name: {}", path.display()))
    })
}

/// Copy each file into `dir`, keeping its file name, with a progress bar labelled `label`.
pub fn copy_into(
    store: &mut dyn FileStore,
    paths: &[PathBuf],
    dir: &Path,
    label: &str,
) -> Result<usize> {
    let bar = progress_bar(paths.len() as u64, label, store.is_dry_run());
    for p in paths {
        let dst = dir.join(file_name(p)?);
        store.copy(p, &dst)?;
        bar.inc(1);
    }
    bar.finish_and_clear();
    info!(dir = %dir.display(), files = paths.len(), "{label}: copied");
    Ok(paths.len())
}

pub fn progress_bar(len: u64, label: &str, hidden: bool) -> ProgressBar {
    if hidden {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(len);
    let style = ProgressStyle::with_template("{msg:>8} [{wide_bar}] {pos}/{len}")
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    bar.set_style(style);
    bar.set_message(label.to_string());
    bar
}

/// Path of `target` expressed relative to directory `base`. Both must be absolute.
pub fn relative_to(target: &Path, base: &Path) -> PathBuf {
    let target: Vec<_> = target.components().collect();
    let base: Vec<_> = base.components().collect();
    let common = target
        .iter()
        .zip(base.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut out = PathBuf::new();
    for _ in common..base.len() {
        out.push("..");
    }
    for c in &target[common..] {
        out.push(c.as_os_str());
    }
    out
}

/// Absolute form of `path` without touching the filesystem.
pub fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().at(Path::new("."))?;
    Ok(cwd.join(path))
}
