use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{require_dir, EditorError, Result};
use crate::file_store::{absolute, copy_into, list_files, FileStore};

pub const ANNS_DIR: &str = "anns";
pub const LATEST_DIR: &str = "latest";

#[derive(Debug, Clone)]
pub struct ExtractLatestOptions {
    pub datasets_dir: PathBuf,
    pub out_dir: PathBuf,
}

#[derive(Debug, Clone, Default)]
pub struct ExtractLatestReport {
    pub save_dir: PathBuf,
    pub copied: usize,
    pub skipped: Vec<PathBuf>,
}

fn name_starts_with(path: &Path, prefix: &str) -> bool {
    path.file_name()
        .map(|n| n.to_string_lossy().starts_with(prefix))
        .unwrap_or(false)
}

/// Collect `datasets/dataset_*/ann*/latest/*` into `out_dir/anns/`. Later datasets overwrite
/// earlier files with the same name.
pub fn run_extract_latest(
    opts: &ExtractLatestOptions,
    store: &mut dyn FileStore,
) -> Result<ExtractLatestReport> {
    let datasets_dir = absolute(&opts.datasets_dir)?;
    require_dir(&datasets_dir)?;
    let out_dir = absolute(&opts.out_dir)?;
    require_dir(&out_dir)?;

    let dataset_dirs: Vec<PathBuf> = store
        .list(&datasets_dir)?
        .into_iter()
        .filter(|p| p.is_dir() && name_starts_with(p, "dataset_"))
        .collect();
    if dataset_dirs.is_empty() {
        return Err(EditorError::insufficient(format!(
            "{} has no dataset_* directories",
            datasets_dir.display()
        )));
    }

    let save_dir = out_dir.join(ANNS_DIR);
    store.mkdir(&save_dir)?;

    let mut report = ExtractLatestReport {
        save_dir: save_dir.clone(),
        ..Default::default()
    };
    for dir in dataset_dirs {
        let anns = store
            .list(&dir)?
            .into_iter()
            .find(|p| p.is_dir() && name_starts_with(p, "ann"));
        let Some(anns) = anns else {
            info!(dir = %dir.display(), "no ann* dir, skipped");
            report.skipped.push(dir);
            continue;
        };
        let latest = anns.join(LATEST_DIR);
        if !latest.is_dir() {
            info!(dir = %anns.display(), "no latest dir, skipped");
            report.skipped.push(dir);
            continue;
        }
        let files = list_files(store, &latest)?;
        if files.is_empty() {
            info!(dir = %latest.display(), "latest is empty, skipped");
            report.skipped.push(dir);
            continue;
        }
        report.copied += copy_into(store, &files, &save_dir, "latest")?;
    }
    Ok(report)
}
