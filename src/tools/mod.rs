//! The dataset utilities other than the train/test partitioner.

pub mod chunk;
pub mod dirdiff;
pub mod extract_latest;
pub mod numbering;
pub mod reorganize;
pub mod thin;

use std::path::{Path, PathBuf};

use crate::error::{EditorError, Result};
use crate::file_store::absolute;

/// `<dir><suffix>` next to `dir`, e.g. `imgs` -> `imgs_reduced`.
pub fn sibling_dir(dir: &Path, suffix: &str) -> Result<PathBuf> {
    let dir = absolute(dir)?;
    let name = dir
        .file_name()
        .ok_or_else(|| EditorError::config(format!("no directory name: {}", dir.display())))?;
    Ok(dir.with_file_name(format!("{}{suffix}", name.to_string_lossy())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sibling_dir_appends_suffix() {
        let p = sibling_dir(Path::new("/data/imgs"), "_reduced").unwrap();
        assert_eq!(p, PathBuf::from("/data/imgs_reduced"));
        let p = sibling_dir(Path::new("/data/imgs/"), "_deleted").unwrap();
        assert_eq!(p, PathBuf::from("/data/imgs_deleted"));
    }
}
