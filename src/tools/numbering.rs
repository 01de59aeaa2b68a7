//! Sequential renaming with a reversible rename record, and its inverse.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::allocate::rng_from_seed;
use crate::discover::{files_with_extensions, has_extension};
use crate::error::{parent_or_cwd, require_absent, require_dir, EditorError, IoContext, Result};
use crate::file_store::{absolute, file_name, progress_bar, relative_to, FileStore};

pub const NUMBERED_DIR: &str = "numberings";
pub const REPAIRED_DIR: &str = "org_imgs";

/// How a numbered entry refers to its source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum LinkMode {
    #[default]
    Copy,
    /// Symlink to the canonical absolute source path.
    Absolute,
    /// Symlink relative to the numbered directory.
    Relative,
}

/// Numbered file name -> original file name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RenameRecord {
    pub entries: BTreeMap<String, String>,
}

impl RenameRecord {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read(path).at(path)?;
        let record: RenameRecord = serde_json::from_slice(&raw)?;
        for (renamed, original) in &record.entries {
            if !is_plain_name(original) || !is_plain_name(renamed) {
                return Err(EditorError::config(format!(
                    "rename record entry {renamed:?} -> {original:?} is not a plain file name"
                )));
            }
        }
        Ok(record)
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    /// Distinct extensions of the numbered names.
    pub fn extensions(&self) -> Vec<String> {
        let mut exts: Vec<String> = self
            .entries
            .keys()
            .filter_map(|k| Path::new(k).extension())
            .map(|e| e.to_string_lossy().into_owned())
            .collect();
        exts.sort();
        exts.dedup();
        exts
    }
}

fn is_plain_name(name: &str) -> bool {
    !name.is_empty() && Path::new(name).file_name().and_then(|n| n.to_str()) == Some(name)
}

#[derive(Debug, Clone)]
pub struct NumberingOptions {
    pub img_dir: PathBuf,
    pub out_dir: PathBuf,
    pub mode: LinkMode,
    pub prefix: String,
    pub shuffle: bool,
    pub seed: Option<u64>,
    pub width: usize,
    pub map_file: String,
    pub image_extensions: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct NumberingReport {
    pub numbered_dir: PathBuf,
    pub record_path: PathBuf,
    pub record: RenameRecord,
}

pub fn numbered_name(prefix: &str, index: usize, width: usize, src: &Path) -> String {
    let ext = src
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    let prefix = if prefix.is_empty() {
        String::new()
    } else {
        format!("{prefix}_")
    };
    format!("{prefix}{index:0width$}{ext}")
}

pub fn run_numbering(
    opts: &NumberingOptions,
    store: &mut dyn FileStore,
) -> Result<NumberingReport> {
    let img_dir = absolute(&opts.img_dir)?;
    require_dir(&img_dir)?;
    let out_dir = absolute(&opts.out_dir)?;
    if !out_dir.exists() {
        require_dir(&parent_or_cwd(&out_dir))?;
    }

    let mut images = files_with_extensions(store, &img_dir, &opts.image_extensions)?;
    if images.is_empty() {
        return Err(EditorError::insufficient(format!(
            "no images in {}",
            img_dir.display()
        )));
    }
    if opts.shuffle {
        images.shuffle(&mut rng_from_seed(opts.seed));
    }
    info!(images = images.len(), mode = ?opts.mode, "numbering");

    let numbered_dir = out_dir.join(NUMBERED_DIR);
    store.mkdir(&numbered_dir)?;

    let mut record = RenameRecord::default();
    let bar = progress_bar(images.len() as u64, "number", store.is_dry_run());
    for (i, src) in images.iter().enumerate() {
        let name = numbered_name(&opts.prefix, i + 1, opts.width, src);
        let dst = numbered_dir.join(&name);
        match opts.mode {
            LinkMode::Copy => store.copy(src, &dst)?,
            LinkMode::Absolute => {
                let target = src.canonicalize().at(src)?;
                store.symlink(&target, &dst)?;
            }
            LinkMode::Relative => store.symlink(&relative_to(src, &numbered_dir), &dst)?,
        }
        record
            .entries
            .insert(name, file_name(src)?.to_string_lossy().into_owned());
        bar.inc(1);
    }
    bar.finish_and_clear();

    let record_path = out_dir.join(&opts.map_file);
    store.write_file(&record_path, &record.to_json()?)?;
    info!(
        record = %record_path.display(),
        entries = record.entries.len(),
        "rename record written"
    );

    Ok(NumberingReport {
        numbered_dir,
        record_path,
        record,
    })
}

#[derive(Debug, Clone)]
pub struct RepairOptions {
    pub img_dir: PathBuf,
    pub record: PathBuf,
}

#[derive(Debug, Clone)]
pub struct RepairReport {
    pub save_dir: PathBuf,
    pub restored: usize,
    pub skipped: usize,
}

/// Copy numbered files back under their original names into `<img_dir>/../org_imgs`.
pub fn run_repair(opts: &RepairOptions, store: &mut dyn FileStore) -> Result<RepairReport> {
    let img_dir = absolute(&opts.img_dir)?;
    require_dir(&img_dir)?;
    let record_path = absolute(&opts.record)?;
    if !record_path.is_file() {
        return Err(EditorError::config(format!(
            "rename record not found: {}",
            record_path.display()
        )));
    }
    let save_dir = parent_or_cwd(&img_dir).join(REPAIRED_DIR);
    require_absent(&save_dir)?;

    let record = RenameRecord::load(&record_path)?;
    let exts = record.extensions();
    let files: Vec<PathBuf> = store
        .list(&img_dir)?
        .into_iter()
        .filter(|p| p.is_file() && has_extension(p, &exts))
        .collect();
    if files.is_empty() {
        return Err(EditorError::insufficient(format!(
            "no files with extensions {exts:?} in {}",
            img_dir.display()
        )));
    }

    store.mkdir(&save_dir)?;
    let (mut restored, mut skipped) = (0usize, 0usize);
    for src in &files {
        let name = file_name(src)?.to_string_lossy().into_owned();
        match record.entries.get(&name) {
            Some(original) => {
                store.copy(src, &save_dir.join(original))?;
                restored += 1;
            }
            None => {
                info!(file = %src.display(), "not in rename record, skipped");
                skipped += 1;
            }
        }
    }
    info!(restored, skipped, save_dir = %save_dir.display(), "repair done");

    Ok(RepairReport {
        save_dir,
        restored,
        skipped,
    })
}
