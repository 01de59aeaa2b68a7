use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::DiscoverConfig;
use crate::error::{EditorError, Result};
use crate::file_store::{list_files, FileStore};

/// Case-insensitive extension match against bare extensions (`"jpg"`).
pub fn has_extension(path: &Path, exts: &[String]) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => exts.iter().any(|want| want.eq_ignore_ascii_case(ext)),
        None => false,
    }
}

pub fn files_with_extensions(
    store: &dyn FileStore,
    dir: &Path,
    exts: &[String],
) -> Result<Vec<PathBuf>> {
    Ok(list_files(store, dir)?
        .into_iter()
        .filter(|p| has_extension(p, exts))
        .collect())
}

/// Non-recursive scan for dataset items. Images and annotations are counted separately and the
/// larger set wins (images on a tie).
pub fn find_dataset(
    store: &dyn FileStore,
    dir: &Path,
    cfg: &DiscoverConfig,
) -> Result<Vec<PathBuf>> {
    let images = files_with_extensions(store, dir, &cfg.image_extensions)?;
    let annotations = files_with_extensions(store, dir, &cfg.annotation_extensions)?;
    debug!(
        images = images.len(),
        annotations = annotations.len(),
        "scanned {}",
        dir.display()
    );

    let items = if images.len() < annotations.len() {
        annotations
    } else {
        images
    };
    if items.is_empty() {
        return Err(EditorError::insufficient(format!(
            "no dataset files found in {}",
            dir.display()
        )));
    }
    Ok(items)
}

/// Natural, case-insensitive ordering of file names (`img_2` before `img_10`).
pub fn natural_sort(paths: &mut [PathBuf]) {
    paths.sort_by(|a, b| {
        let [a, b] = [a, b].map(|p| p.file_name().unwrap_or_default().to_string_lossy());
        lexical_sort::natural_lexical_cmp(&a, &b)
    });
}
