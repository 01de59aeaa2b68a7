//! Thinning helpers: keep every Nth file, a random sample, or drop a number range.

use std::path::{Path, PathBuf};

use rand::seq::SliceRandom;
use tracing::info;

use crate::allocate::rng_from_seed;
use crate::error::{require_absent, require_dir, EditorError, Result};
use crate::file_store::{absolute, copy_into, list_files, FileStore};
use crate::tools::sibling_dir;

#[derive(Debug, Clone)]
pub struct ThinReport {
    pub out_dir: PathBuf,
    pub kept: usize,
    pub total: usize,
}

fn dataset_files(store: &dyn FileStore, dir: &Path) -> Result<Vec<PathBuf>> {
    require_dir(dir)?;
    let files = list_files(store, dir)?;
    if files.is_empty() {
        return Err(EditorError::insufficient(format!(
            "no files in {}",
            dir.display()
        )));
    }
    Ok(files)
}

/// Copy every `skip_num`-th file (starting with the first) into `<data_dir>_reduced`.
pub fn run_reduce(
    data_dir: &Path,
    skip_num: usize,
    store: &mut dyn FileStore,
) -> Result<ThinReport> {
    if skip_num < 2 {
        return Err(EditorError::config(format!(
            "skip_num must be > 1, got {skip_num}"
        )));
    }
    let data_dir = absolute(data_dir)?;
    let files = dataset_files(store, &data_dir)?;
    let kept: Vec<PathBuf> = files.iter().step_by(skip_num).cloned().collect();

    let out_dir = sibling_dir(&data_dir, "_reduced")?;
    store.mkdir(&out_dir)?;
    copy_into(store, &kept, &out_dir, "reduce")?;
    Ok(ThinReport {
        out_dir,
        kept: kept.len(),
        total: files.len(),
    })
}

/// Copy a uniform random sample of `num` files into `<dir>_random_<num>`.
pub fn run_choice(
    dir: &Path,
    num: usize,
    seed: Option<u64>,
    store: &mut dyn FileStore,
) -> Result<ThinReport> {
    let dir = absolute(dir)?;
    let files = dataset_files(store, &dir)?;
    if num > files.len() {
        return Err(EditorError::config(format!(
            "cannot choose {num} of {} files",
            files.len()
        )));
    }
    let out_dir = sibling_dir(&dir, &format!("_random_{num}"))?;
    require_absent(&out_dir)?;

    let mut rng = rng_from_seed(seed);
    let mut chosen: Vec<PathBuf> = files.choose_multiple(&mut rng, num).cloned().collect();
    chosen.sort();
    info!(num, from = files.len(), "random sample drawn");

    store.mkdir(&out_dir)?;
    copy_into(store, &chosen, &out_dir, "choice")?;
    Ok(ThinReport {
        out_dir,
        kept: chosen.len(),
        total: files.len(),
    })
}

/// Trailing `_NNNNN` number of a stem, if the last `_` token is an integer.
pub fn trailing_number(path: &Path) -> Option<i64> {
    let stem = path.file_stem()?.to_string_lossy();
    stem.rsplit('_').next()?.parse().ok()
}

/// Copy all files into `<dir>_deleted` except those numbered within `start..=end`.
/// Files without a trailing number are always kept.
pub fn run_delete(
    dir: &Path,
    start: i64,
    end: i64,
    store: &mut dyn FileStore,
) -> Result<ThinReport> {
    if start > end {
        return Err(EditorError::config(format!(
            "start {start} must not exceed end {end}"
        )));
    }
    let dir = absolute(dir)?;
    let files = dataset_files(store, &dir)?;
    let kept: Vec<PathBuf> = files
        .iter()
        .filter(|p| !matches!(trailing_number(p), Some(n) if (start..=end).contains(&n)))
        .cloned()
        .collect();
    info!(before = files.len(), after = kept.len(), "range dropped");

    let out_dir = sibling_dir(&dir, "_deleted")?;
    store.mkdir(&out_dir)?;
    copy_into(store, &kept, &out_dir, "delete")?;
    Ok(ThinReport {
        out_dir,
        kept: kept.len(),
        total: files.len(),
    })
}
