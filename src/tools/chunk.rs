use std::path::PathBuf;

use tracing::info;

use crate::discover::natural_sort;
use crate::error::{parent_or_cwd, require_dir, EditorError, Result};
use crate::file_store::{absolute, file_name, relative_to, FileStore};

pub const DATASETS_DIR: &str = "datasets";

#[derive(Debug, Clone)]
pub struct ChunkOptions {
    pub file_dir: PathBuf,
    pub size: usize,
    pub output: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkInfo {
    pub first: usize,
    pub last: usize,
    pub dataset_dir: PathBuf,
    pub imgs_dir: PathBuf,
    pub files: usize,
}

/// `(dataset_a_b, imgs_a_b)` for the 1-based number range `a..=b`.
pub fn chunk_dir_names(first: usize, last: usize) -> (String, String) {
    (
        format!("dataset_{first:05}_{last:05}"),
        format!("imgs_{first:05}_{last:05}"),
    )
}

/// Split a flat directory into `output/datasets/dataset_a_b/imgs_a_b/` groups of `size`
/// relative symlinks. Ranges are nominal: the last group keeps `b = n * size`.
pub fn run_chunk(opts: &ChunkOptions, store: &mut dyn FileStore) -> Result<Vec<ChunkInfo>> {
    let file_dir = absolute(&opts.file_dir)?;
    require_dir(&file_dir)?;
    if opts.size == 0 {
        return Err(EditorError::config("chunk size must be > 0"));
    }
    let output = absolute(&opts.output)?;
    require_dir(&parent_or_cwd(&output))?;

    let mut files = store.list(&file_dir)?;
    if files.is_empty() {
        return Err(EditorError::insufficient(format!(
            "no files in {}",
            file_dir.display()
        )));
    }
    natural_sort(&mut files);

    let datasets_dir = output.join(DATASETS_DIR);
    let mut out = Vec::new();
    for (i, group) in files.chunks(opts.size).enumerate() {
        let first = i * opts.size + 1;
        let last = (i + 1) * opts.size;
        let (dataset_name, imgs_name) = chunk_dir_names(first, last);
        let dataset_dir = datasets_dir.join(dataset_name);
        let imgs_dir = dataset_dir.join(imgs_name);
        store.mkdir(&imgs_dir)?;

        for f in group {
            let link = imgs_dir.join(file_name(f)?);
            store.symlink(&relative_to(f, &imgs_dir), &link)?;
        }
        info!(dir = %imgs_dir.display(), files = group.len(), "chunk linked");
        out.push(ChunkInfo {
            first,
            last,
            dataset_dir,
            imgs_dir,
            files: group.len(),
        });
    }
    Ok(out)
}
