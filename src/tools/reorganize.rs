//! De-nesting, prefix grouping, and directory merging helpers.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::{parent_or_cwd, require_absent, require_dir, EditorError, IoContext, Result};
use crate::file_store::{absolute, file_name, list_files, FileStore};
use crate::tools::sibling_dir;

#[derive(Debug, Clone)]
pub struct BreakNestOptions {
    pub target_dir: PathBuf,
    pub num_nest: usize,
    pub save_dir: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct BreakNestReport {
    pub save_dir: PathBuf,
    pub files: usize,
    pub trees: usize,
}

fn resolve_break_nest_save_dir(target: &Path, save_dir: Option<&Path>) -> Result<PathBuf> {
    let save = match save_dir {
        None => sibling_dir(target, "_break-nest")?,
        Some(root) => {
            let root = absolute(root)?;
            require_dir(&parent_or_cwd(&root))?;
            root.join(file_name(target)?)
        }
    };
    if save == target {
        return Err(EditorError::config(format!(
            "save dir must differ from target: {}",
            save.display()
        )));
    }
    Ok(save)
}

/// Copy every file within `num_nest + 1` levels of `target_dir` flat into the save dir, and
/// every directory found exactly at that depth as a whole tree.
pub fn run_break_nest(
    opts: &BreakNestOptions,
    store: &mut dyn FileStore,
) -> Result<BreakNestReport> {
    let target = absolute(&opts.target_dir)?;
    require_dir(&target)?;
    let cwd = std::env::current_dir().at(Path::new("."))?;
    if target.canonicalize().at(&target)? == cwd.canonicalize().at(&cwd)? {
        return Err(EditorError::config("the current directory cannot be the target"));
    }
    if opts.num_nest == 0 {
        return Err(EditorError::config("num_nest must be > 0"));
    }
    let save_dir = resolve_break_nest_save_dir(&target, opts.save_dir.as_deref())?;

    let depth = opts.num_nest + 1;
    let mut files = Vec::new();
    let mut trees = Vec::new();
    for entry in WalkDir::new(&target)
        .min_depth(1)
        .max_depth(depth)
        .sort_by_file_name()
    {
        let entry = entry?;
        let path = entry.path();
        if path.is_file() {
            files.push(path.to_path_buf());
        } else if path.is_dir() && entry.depth() == depth {
            trees.push(path.to_path_buf());
        }
    }
    debug!(files = files.len(), trees = trees.len(), "nested entries found");

    store.mkdir(&save_dir)?;
    for f in &files {
        let dst = save_dir.join(file_name(f)?);
        if dst.exists() {
            debug!(file = %dst.display(), "name collision, overwriting");
        }
        store.copy(f, &dst)?;
    }
    for t in &trees {
        copy_tree(store, t, &save_dir.join(file_name(t)?))?;
    }
    info!(
        save_dir = %save_dir.display(),
        files = files.len(),
        trees = trees.len(),
        "break_nest done"
    );

    Ok(BreakNestReport {
        save_dir,
        files: files.len(),
        trees: trees.len(),
    })
}

/// Recursive copy of `src` to a new directory `dst`.
pub fn copy_tree(store: &mut dyn FileStore, src: &Path, dst: &Path) -> Result<()> {
    require_absent(dst)?;
    for entry in WalkDir::new(src).sort_by_file_name() {
        let entry = entry?;
        let rel = entry.path().strip_prefix(src).unwrap_or(entry.path());
        let out = dst.join(rel);
        if entry.path().is_dir() {
            store.mkdir(&out)?;
        } else {
            store.copy(entry.path(), &out)?;
        }
    }
    Ok(())
}

/// First two `_` tokens of the stem.
pub fn prefix_group(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    stem.split('_').take(2).collect::<Vec<_>>().join("_")
}

#[derive(Debug, Clone)]
pub struct GroupReport {
    pub groups: BTreeMap<String, Vec<PathBuf>>,
    pub plan: String,
    pub applied: bool,
}

/// `name : path` lines, with the name blanked after its first line.
pub fn render_group_plan(groups: &BTreeMap<String, Vec<PathBuf>>) -> String {
    let mut out = String::new();
    for (name, paths) in groups {
        for (i, p) in paths.iter().enumerate() {
            let label = if i == 0 {
                name.clone()
            } else {
                " ".repeat(name.len())
            };
            let _ = writeln!(out, "{label} : {}", p.display());
        }
    }
    out
}

/// Group files by prefix; only with `apply` move each file into `dir/<group>/`.
pub fn run_group(dir: &Path, apply: bool, store: &mut dyn FileStore) -> Result<GroupReport> {
    let dir = absolute(dir)?;
    require_dir(&dir)?;
    let files = list_files(store, &dir)?;
    if files.is_empty() {
        return Err(EditorError::insufficient(format!(
            "no files in {}",
            dir.display()
        )));
    }

    let mut groups: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    for f in files {
        groups.entry(prefix_group(&f)).or_default().push(f);
    }
    let plan = render_group_plan(&groups);

    if apply {
        if let Some(clash) = groups
            .keys()
            .map(|name| dir.join(name))
            .find(|p| p.exists() && !p.is_dir())
        {
            return Err(EditorError::config(format!(
                "group dir would replace an existing file: {}",
                clash.display()
            )));
        }
        for (name, paths) in &groups {
            let group_dir = dir.join(name);
            store.mkdir(&group_dir)?;
            for p in paths {
                store.move_to(p, &group_dir.join(file_name(p)?))?;
            }
        }
        info!(groups = groups.len(), "files moved into group dirs");
    }

    Ok(GroupReport {
        groups,
        plan,
        applied: apply,
    })
}

/// Create `tgt_dir/name` and move every other entry of `tgt_dir` into it.
pub fn run_move_into(tgt_dir: &Path, name: &str, store: &mut dyn FileStore) -> Result<usize> {
    let tgt_dir = absolute(tgt_dir)?;
    require_dir(&tgt_dir)?;
    if name.is_empty() || Path::new(name).file_name().and_then(|n| n.to_str()) != Some(name) {
        return Err(EditorError::config(format!(
            "new dir name must be a plain name, got {name:?}"
        )));
    }
    let new_dir = tgt_dir.join(name);
    let entries: Vec<PathBuf> = store
        .list(&tgt_dir)?
        .into_iter()
        .filter(|p| *p != new_dir)
        .collect();

    store.mkdir(&new_dir)?;
    for p in &entries {
        store.move_to(p, &new_dir.join(file_name(p)?))?;
    }
    info!(moved = entries.len(), dir = %new_dir.display(), "move_into done");
    Ok(entries.len())
}

pub const RSYNC_FILE_KEYWORDS: [&str; 2] = [".sqlite3", "README.txt"];
pub const RSYNC_DIR_KEYWORDS: [&str; 7] =
    ["train", "test", "val", "invalid", "sub", "sample", "example"];
pub const RSYNC_DIR: &str = "for_rsync";

#[derive(Debug, Clone)]
pub struct ForRsyncReport {
    pub out_dir: PathBuf,
    pub keywords: Vec<(String, bool)>,
    pub linked: usize,
}

/// Symlink the keeper entries of an annotation dataset into `src_dir/for_rsync/<name>/`.
/// File keywords match files only and directory keywords match directories only.
pub fn run_for_rsync(src_dir: &Path, store: &mut dyn FileStore) -> Result<ForRsyncReport> {
    let src_dir = absolute(src_dir)?;
    require_dir(&src_dir)?;
    let entries: Vec<(PathBuf, String)> = store
        .list(&src_dir)?
        .into_iter()
        .filter_map(|p| {
            let name = p.file_name()?.to_string_lossy().into_owned();
            (!name.starts_with('.')).then_some((p, name))
        })
        .collect();

    let mut found: BTreeSet<PathBuf> = BTreeSet::new();
    let mut keywords = Vec::new();
    let tagged = RSYNC_FILE_KEYWORDS
        .iter()
        .map(|kw| (kw, false))
        .chain(RSYNC_DIR_KEYWORDS.iter().map(|kw| (kw, true)));
    for (kw, want_dir) in tagged {
        let mut hit = false;
        for (p, name) in &entries {
            if p.is_dir() == want_dir && name.contains(kw) {
                found.insert(p.clone());
                hit = true;
            }
        }
        keywords.push((kw.to_string(), hit));
    }
    if found.is_empty() {
        return Err(EditorError::insufficient(format!(
            "{} has none of the rsync keywords",
            src_dir.display()
        )));
    }

    let out_dir = src_dir.join(RSYNC_DIR).join(file_name(&src_dir)?);
    require_absent(&out_dir)?;
    store.mkdir(&out_dir)?;
    for p in &found {
        store.symlink(p, &out_dir.join(file_name(p)?))?;
    }
    info!(linked = found.len(), out_dir = %out_dir.display(), "for_rsync done");

    Ok(ForRsyncReport {
        out_dir,
        keywords,
        linked: found.len(),
    })
}
