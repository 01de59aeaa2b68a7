use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::allocate::{allocate, rng_from_seed, separate_random, PathSplit, Ratio, Split};
use crate::config::DiscoverConfig;
use crate::discover::find_dataset;
use crate::error::{parent_or_cwd, require_dir, EditorError, Result};
use crate::file_store::{copy_into, FileStore};
use crate::session::{check_valid_dataset, group, Session};

#[derive(Debug, Clone)]
pub struct SeparateOptions {
    pub dataset_dir: PathBuf,
    pub output_dir: PathBuf,
    pub ratio: f64,
    pub want_val: bool,
    pub random: bool,
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Random,
    Temporal,
}

#[derive(Debug, Clone)]
pub struct SeparateReport {
    pub mode: Mode,
    pub output_dir: PathBuf,
    pub counts: BTreeMap<Split, usize>,
    /// Per-split session tables, temporal mode only.
    pub tables: Vec<String>,
    pub notes: Vec<String>,
}

/// Validate inputs, compute the split, then materialize `<output_dir>/{train,test,val}`.
/// Nothing is written unless every check and the allocation succeed.
pub fn run_separate(
    opts: &SeparateOptions,
    discover: &DiscoverConfig,
    store: &mut dyn FileStore,
) -> Result<SeparateReport> {
    require_dir(&opts.dataset_dir)?;
    let out_parent = parent_or_cwd(&opts.output_dir);
    if !out_parent.is_dir() {
        return Err(EditorError::config(format!(
            "output parent not found: {}",
            out_parent.display()
        )));
    }
    let ratio = Ratio::new(opts.ratio)?;

    let paths = find_dataset(store, &opts.dataset_dir, discover)?;
    info!(
        files = paths.len(),
        dataset_dir = %opts.dataset_dir.display(),
        "dataset discovered"
    );

    let mut rng = rng_from_seed(opts.seed);
    let mut tables = Vec::new();
    let mut notes = Vec::new();
    let (mode, plan) = if opts.random {
        (
            Mode::Random,
            separate_random(paths, ratio, opts.want_val, &mut rng),
        )
    } else {
        let sessions = group(check_valid_dataset(&paths)?);
        tables.push(render_session_table("all", sessions.values()));
        let alloc = allocate(&sessions, ratio, opts.want_val, &mut rng)?;
        for split in Split::ALL {
            if split == Split::Val && !alloc.has_val() {
                continue;
            }
            let keys = alloc.assignment.keys(split);
            tables.push(render_session_table(
                split.dir_name(),
                keys.iter().filter_map(|k| sessions.get(k)),
            ));
        }
        notes.extend(alloc.notes.iter().cloned());
        (Mode::Temporal, alloc.to_paths(&sessions))
    };

    let counts = write_splits(store, &plan, &opts.output_dir)?;
    Ok(SeparateReport {
        mode,
        output_dir: opts.output_dir.clone(),
        counts,
        tables,
        notes,
    })
}

fn write_splits(
    store: &mut dyn FileStore,
    plan: &PathSplit,
    output_dir: &Path,
) -> Result<BTreeMap<Split, usize>> {
    store.mkdir(output_dir)?;
    let mut counts = BTreeMap::new();
    for split in Split::ALL {
        let paths = plan.get(split);
        counts.insert(split, paths.len());
        if paths.is_empty() {
            debug!(%split, "empty split, nothing to write");
            continue;
        }
        let dir = output_dir.join(split.dir_name());
        store.mkdir(&dir)?;
        copy_into(store, paths, &dir, split.dir_name())?;
    }
    Ok(counts)
}

/// Sessions by descending item count, then the split total.
///
/// ```text
/// --- test --------------------
/// nums  | date_time
///    78 | 20211201_173428
///    43 | 20211201_172102
/// num data is 121
/// ------------------------------
/// ```
pub fn render_session_table<'a>(
    label: &str,
    sessions: impl IntoIterator<Item = &'a Session>,
) -> String {
    let mut rows: Vec<&Session> = sessions.into_iter().collect();
    rows.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.key.cmp(&b.key)));

    let mut out = String::new();
    let _ = writeln!(out, "--- {label} {}", "-".repeat(20));
    let _ = writeln!(out, "{:5} | date_time", "nums");
    let mut total = 0usize;
    for s in &rows {
        let _ = writeln!(out, "{:>5} | {}", s.len(), s.key);
        total += s.len();
    }
    let _ = writeln!(out, "num data is {total}");
    let _ = write!(out, "{}", "-".repeat(30));
    out
}
