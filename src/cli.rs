//! Pieces shared by the `dataset_editor` and `separate_traindata` binaries.

use std::path::PathBuf;

use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::file_store::{DryRunStore, FileStore, FsStore};
use crate::partition::{run_separate, Mode, SeparateOptions, SeparateReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum LogLevel {
    #[default]
    Info,
    Debug,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        }
    }
}

/// `RUST_LOG` wins when set; otherwise `level` picks the filter.
pub fn init_logging(level: LogLevel) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

#[derive(Debug, Clone, clap::Args)]
pub struct SeparateArgs {
    /// Directory holding the images and/or annotation files.
    pub dataset_dir: PathBuf,

    /// Destination; `train/`, `test/` and `val/` are created inside.
    pub output_dir: PathBuf,

    /// Fraction of items targeted for test, in (0, 1). Defaults to `separate.ratio` (0.4).
    #[arg(long)]
    pub ratio: Option<f64>,

    /// Do not carve a validation split out of test.
    #[arg(long = "not_val")]
    pub not_val: bool,

    /// Ignore sessions and split items uniformly at random.
    #[arg(long)]
    pub random: bool,
}

/// Real filesystem, or a recorder when `dry_run` is set.
pub enum Store {
    Fs(FsStore),
    DryRun(DryRunStore),
}

impl Store {
    pub fn new(dry_run: bool) -> Self {
        if dry_run {
            Store::DryRun(DryRunStore::new())
        } else {
            Store::Fs(FsStore)
        }
    }

    pub fn as_dyn(&mut self) -> &mut dyn FileStore {
        match self {
            Store::Fs(s) => s,
            Store::DryRun(s) => s,
        }
    }

    /// Print the recorded operations of a dry run.
    pub fn print_plan(&self) {
        if let Store::DryRun(s) = self {
            println!("dry_run_ops={}", s.ops.len());
            for op in &s.ops {
                println!("  {op}");
            }
        }
    }
}

pub fn separate(
    args: &SeparateArgs,
    cfg: &Config,
    seed: Option<u64>,
    store: &mut dyn FileStore,
) -> crate::error::Result<SeparateReport> {
    let opts = SeparateOptions {
        dataset_dir: args.dataset_dir.clone(),
        output_dir: args.output_dir.clone(),
        ratio: args.ratio.unwrap_or(cfg.separate.ratio),
        want_val: !args.not_val,
        random: args.random,
        seed: seed.or(cfg.separate.seed),
    };
    run_separate(&opts, &cfg.discover, store)
}

pub fn print_separate_report(report: &SeparateReport) {
    for table in &report.tables {
        println!("{table}");
    }
    let mode = match report.mode {
        Mode::Random => "random",
        Mode::Temporal => "temporal",
    };
    println!("mode={mode}");
    println!("output_dir={}", report.output_dir.display());
    for (split, n) in &report.counts {
        println!("{split}={n}");
    }
    for note in &report.notes {
        println!("note: {note}");
    }
}
