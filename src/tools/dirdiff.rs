use std::collections::BTreeSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{parent_or_cwd, require_absent, require_dir, EditorError, Result};
use crate::file_store::{absolute, copy_into, list_files, FileStore};

fn names(paths: &[PathBuf]) -> BTreeSet<OsString> {
    paths
        .iter()
        .filter_map(|p| p.file_name().map(|n| n.to_os_string()))
        .collect()
}

fn without_names(paths: &[PathBuf], other: &BTreeSet<OsString>) -> Vec<PathBuf> {
    paths
        .iter()
        .filter(|p| p.file_name().map_or(true, |n| !other.contains(n)))
        .cloned()
        .collect()
}

pub fn default_intersection_dir(dir1: &Path, dir2: &Path) -> PathBuf {
    let stem = |p: &Path| {
        p.file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    };
    PathBuf::from(format!("intersection-{}-and-{}", stem(dir1), stem(dir2)))
}

#[derive(Debug, Clone)]
pub struct IntersectionReport {
    pub dst_dir: PathBuf,
    pub common: usize,
}

/// Copy the files of `dir1` whose names also exist in `dir2` into a new `dst_dir`.
pub fn run_intersection(
    dir1: &Path,
    dir2: &Path,
    dst_dir: Option<&Path>,
    store: &mut dyn FileStore,
) -> Result<IntersectionReport> {
    require_dir(dir1)?;
    require_dir(dir2)?;
    let dst_dir = match dst_dir {
        Some(p) => p.to_path_buf(),
        None => default_intersection_dir(dir1, dir2),
    };
    require_dir(&parent_or_cwd(&dst_dir))?;
    require_absent(&dst_dir)?;

    let mut listed = Vec::with_capacity(2);
    for dir in [dir1, dir2] {
        let files = list_files(store, dir)?;
        if files.is_empty() {
            return Err(EditorError::insufficient(format!(
                "no files in {}",
                dir.display()
            )));
        }
        listed.push(files);
    }
    let names2 = names(&listed[1]);
    let common: Vec<PathBuf> = listed[0]
        .iter()
        .filter(|p| p.file_name().is_some_and(|n| names2.contains(n)))
        .cloned()
        .collect();
    if common.is_empty() {
        return Err(EditorError::insufficient(format!(
            "no common file names between {} and {}",
            dir1.display(),
            dir2.display()
        )));
    }

    store.mkdir(&dst_dir)?;
    copy_into(store, &common, &dst_dir, "common")?;
    info!(
        dir1 = %dir1.display(),
        dir2 = %dir2.display(),
        dst = %dst_dir.display(),
        intersections = common.len(),
        "intersection done"
    );
    Ok(IntersectionReport {
        dst_dir,
        common: common.len(),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum DiffMode {
    /// Files only in dir1.
    D1,
    /// Files only in dir2.
    D2,
    Both,
}

#[derive(Debug, Clone, Default)]
pub struct DiffReport {
    pub only_dir1: usize,
    pub only_dir2: usize,
    pub copied: usize,
}

/// `<grandparent>_<parent>` of a file, e.g. `/d/run1/imgs/a.jpg` -> `run1_imgs`.
pub fn origin_dir_name(file: &Path) -> String {
    let parent = file.parent();
    let parts: Vec<String> = [parent.and_then(Path::parent), parent]
        .into_iter()
        .flatten()
        .filter_map(|p| p.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .collect();
    parts.join("_")
}

/// Copy files whose names exist in only one of the two directories into
/// `outdir/<grandparent>_<parent>/`.
pub fn run_diff_copy(
    dir1: &Path,
    dir2: &Path,
    mode: DiffMode,
    outdir: &Path,
    store: &mut dyn FileStore,
) -> Result<DiffReport> {
    let dir1 = absolute(dir1)?;
    let dir2 = absolute(dir2)?;
    require_dir(&dir1)?;
    require_dir(&dir2)?;
    let outdir = absolute(outdir)?;
    require_dir(&outdir)?;

    let files1 = list_files(store, &dir1)?;
    let files2 = list_files(store, &dir2)?;
    let only1 = without_names(&files1, &names(&files2));
    let only2 = without_names(&files2, &names(&files1));

    let mut report = DiffReport {
        only_dir1: only1.len(),
        only_dir2: only2.len(),
        copied: 0,
    };
    let mut selected: Vec<&[PathBuf]> = Vec::new();
    if matches!(mode, DiffMode::D1 | DiffMode::Both) {
        selected.push(&only1);
    }
    if matches!(mode, DiffMode::D2 | DiffMode::Both) {
        selected.push(&only2);
    }

    for files in selected {
        let Some(first) = files.first() else {
            continue;
        };
        let dst = outdir.join(origin_dir_name(first));
        store.mkdir(&dst)?;
        report.copied += copy_into(store, files, &dst, "diff")?;
    }
    Ok(report)
}
