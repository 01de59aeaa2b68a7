use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing::info;

use dataset_editor::cli::{self, LogLevel, SeparateArgs, Store};
use dataset_editor::config::Config;
use dataset_editor::tools::chunk::{run_chunk, ChunkOptions};
use dataset_editor::tools::dirdiff::{run_diff_copy, run_intersection, DiffMode};
use dataset_editor::tools::extract_latest::{run_extract_latest, ExtractLatestOptions};
use dataset_editor::tools::numbering::{
    run_numbering, run_repair, LinkMode, NumberingOptions, RepairOptions,
};
use dataset_editor::tools::reorganize::{
    run_break_nest, run_for_rsync, run_group, run_move_into, BreakNestOptions,
};
use dataset_editor::tools::thin::{run_choice, run_delete, run_reduce, ThinReport};

#[derive(Parser, Debug)]
#[command(
    name = "dataset_editor",
    version,
    about = "Utilities for reshaping image/annotation dataset directories"
)]
struct Args {
    /// TOML config; `dataset_editor.toml` in the working directory is used when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[arg(long = "log_level", value_enum, default_value_t = LogLevel::Info, global = true)]
    log_level: LogLevel,

    /// Seed for every random choice; entropy when omitted.
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Print the planned filesystem operations instead of performing them.
    #[arg(long = "dry_run", global = true)]
    dry_run: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
#[command(rename_all = "snake_case")]
enum Command {
    /// Rename images to sequential numbers and write a rename record.
    Numbering {
        img_dir: PathBuf,
        out_dir: PathBuf,
        #[arg(short, long, value_enum, default_value_t = LinkMode::Copy)]
        mode: LinkMode,
        #[arg(short, long, default_value = "")]
        prefix: String,
        #[arg(short, long)]
        shuffle: bool,
    },
    /// Restore original names from a rename record.
    Repair { img_dir: PathBuf, record: PathBuf },
    /// Split a flat directory into fixed-size dataset directories of symlinks.
    Mkdir {
        file_dir: PathBuf,
        #[arg(short = 'n', long = "devide_number")]
        size: Option<usize>,
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },
    /// Collect `ann*/latest` annotations of every dataset directory.
    ExtLatest { datasets: PathBuf, out_dir: PathBuf },
    /// Split a dataset into train/test/val keeping recording sessions intact.
    SeparateTrain(SeparateArgs),
    /// Keep every Nth file.
    Reduce {
        data_dir: PathBuf,
        #[arg(long = "skip_num", default_value_t = 2)]
        skip_num: usize,
    },
    /// Keep a random sample of files.
    Choice { dir: PathBuf, num: usize },
    /// Group files by the first two `_` tokens of their names.
    Group {
        dir: PathBuf,
        /// Move the files; otherwise only print the plan.
        #[arg(short, long)]
        yes: bool,
    },
    /// Copy the files present in only one of two directories.
    DiffCopy {
        dir1: PathBuf,
        dir2: PathBuf,
        #[arg(value_enum)]
        mode: DiffMode,
        outdir: PathBuf,
    },
    /// Symlink the entries worth syncing into `for_rsync/<name>`.
    ForRsync { src_dir: PathBuf },
    /// Move every entry of a directory into a new sub-directory.
    MoveInto { tgt_dir: PathBuf, name: String },
    /// Copy the files present in both directories.
    Intersection {
        dir1: PathBuf,
        dir2: PathBuf,
        #[arg(long = "dst_dir")]
        dst_dir: Option<PathBuf>,
    },
    /// Flatten nested directories.
    BreakNest {
        target_dir: PathBuf,
        #[arg(short = 'n', long = "num_nest", default_value_t = 1)]
        num_nest: usize,
        #[arg(short, long = "save_dir")]
        save_dir: Option<PathBuf>,
    },
    /// Drop files whose trailing number falls in `start..=end`.
    Delete { dir: PathBuf, start: i64, end: i64 },
}

fn print_thin(report: &ThinReport) {
    println!("out_dir={}", report.out_dir.display());
    println!("kept={}/{}", report.kept, report.total);
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    cli::init_logging(args.log_level);

    let cfg = Config::load_or_default(args.config.as_deref()).context("load config")?;
    let mut store = Store::new(args.dry_run);
    let fs = store.as_dyn();

    match &args.command {
        Command::Numbering {
            img_dir,
            out_dir,
            mode,
            prefix,
            shuffle,
        } => {
            let opts = NumberingOptions {
                img_dir: img_dir.clone(),
                out_dir: out_dir.clone(),
                mode: *mode,
                prefix: prefix.clone(),
                shuffle: *shuffle,
                seed: args.seed,
                width: cfg.numbering.width,
                map_file: cfg.numbering.map_file.clone(),
                image_extensions: cfg.discover.image_extensions.clone(),
            };
            let res = run_numbering(&opts, fs)
                .with_context(|| format!("numbering {}", img_dir.display()))?;
            println!("numbered_dir={}", res.numbered_dir.display());
            println!("record={}", res.record_path.display());
            println!("files={}", res.record.entries.len());
        }
        Command::Repair { img_dir, record } => {
            let opts = RepairOptions {
                img_dir: img_dir.clone(),
                record: record.clone(),
            };
            let res = run_repair(&opts, fs)
                .with_context(|| format!("repair {}", img_dir.display()))?;
            println!("save_dir={}", res.save_dir.display());
            println!("restored={}", res.restored);
            println!("skipped={}", res.skipped);
        }
        Command::Mkdir {
            file_dir,
            size,
            output,
        } => {
            let opts = ChunkOptions {
                file_dir: file_dir.clone(),
                size: size.unwrap_or(cfg.chunk.size),
                output: output.clone(),
            };
            let chunks = run_chunk(&opts, fs)
                .with_context(|| format!("mkdir {}", file_dir.display()))?;
            for c in &chunks {
                println!("{} files={}", c.imgs_dir.display(), c.files);
            }
            println!("datasets={}", chunks.len());
        }
        Command::ExtLatest { datasets, out_dir } => {
            let opts = ExtractLatestOptions {
                datasets_dir: datasets.clone(),
                out_dir: out_dir.clone(),
            };
            let res = run_extract_latest(&opts, fs)
                .with_context(|| format!("ext_latest {}", datasets.display()))?;
            println!("save_dir={}", res.save_dir.display());
            println!("copied={}", res.copied);
            println!("skipped={}", res.skipped.len());
        }
        Command::SeparateTrain(sep) => {
            let report = cli::separate(sep, &cfg, args.seed, fs)
                .with_context(|| format!("separate_train {}", sep.dataset_dir.display()))?;
            cli::print_separate_report(&report);
        }
        Command::Reduce { data_dir, skip_num } => {
            let res = run_reduce(data_dir, *skip_num, fs)
                .with_context(|| format!("reduce {}", data_dir.display()))?;
            print_thin(&res);
        }
        Command::Choice { dir, num } => {
            let res = run_choice(dir, *num, args.seed, fs)
                .with_context(|| format!("choice {}", dir.display()))?;
            print_thin(&res);
        }
        Command::Group { dir, yes } => {
            let res =
                run_group(dir, *yes, fs).with_context(|| format!("group {}", dir.display()))?;
            print!("{}", res.plan);
            println!("groups={}", res.groups.len());
            if !res.applied {
                info!("plan only; pass --yes to move the files");
            }
        }
        Command::DiffCopy {
            dir1,
            dir2,
            mode,
            outdir,
        } => {
            let res = run_diff_copy(dir1, dir2, *mode, outdir, fs).context("diff_copy")?;
            println!("only_dir1={}", res.only_dir1);
            println!("only_dir2={}", res.only_dir2);
            println!("copied={}", res.copied);
        }
        Command::ForRsync { src_dir } => {
            let res = run_for_rsync(src_dir, fs)
                .with_context(|| format!("for_rsync {}", src_dir.display()))?;
            for (kw, hit) in &res.keywords {
                println!("{kw}: {}", if *hit { "found" } else { "-" });
            }
            println!("out_dir={}", res.out_dir.display());
            println!("linked={}", res.linked);
        }
        Command::MoveInto { tgt_dir, name } => {
            let moved = run_move_into(tgt_dir, name, fs)
                .with_context(|| format!("move_into {}", tgt_dir.display()))?;
            println!("moved={moved}");
        }
        Command::Intersection {
            dir1,
            dir2,
            dst_dir,
        } => {
            let res = run_intersection(dir1, dir2, dst_dir.as_deref(), fs)
                .context("intersection")?;
            println!("dst_dir={}", res.dst_dir.display());
            println!("common={}", res.common);
        }
        Command::BreakNest {
            target_dir,
            num_nest,
            save_dir,
        } => {
            let opts = BreakNestOptions {
                target_dir: target_dir.clone(),
                num_nest: *num_nest,
                save_dir: save_dir.clone(),
            };
            let res = run_break_nest(&opts, fs)
                .with_context(|| format!("break_nest {}", target_dir.display()))?;
            println!("save_dir={}", res.save_dir.display());
            println!("files={}", res.files);
            println!("trees={}", res.trees);
        }
        Command::Delete { dir, start, end } => {
            let res = run_delete(dir, *start, *end, fs)
                .with_context(|| format!("delete {}", dir.display()))?;
            print_thin(&res);
        }
    }

    store.print_plan();
    Ok(())
}
