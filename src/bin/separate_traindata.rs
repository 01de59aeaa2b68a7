use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;

use dataset_editor::cli::{self, LogLevel, SeparateArgs, Store};
use dataset_editor::config::Config;

#[derive(Debug, Parser)]
#[command(name = "separate_traindata")]
struct Args {
    #[command(flatten)]
    separate: SeparateArgs,

    #[arg(long = "log_level", value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,

    /// Seed for shuffling; entropy when omitted.
    #[arg(long)]
    seed: Option<u64>,

    /// Print the planned copies instead of performing them.
    #[arg(long = "dry_run")]
    dry_run: bool,

    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    cli::init_logging(args.log_level);

    let cfg = Config::load_or_default(args.config.as_deref()).context("load config")?;
    let mut store = Store::new(args.dry_run);
    let report = cli::separate(&args.separate, &cfg, args.seed, store.as_dyn())
        .with_context(|| format!("separate {}", args.separate.dataset_dir.display()))?;

    cli::print_separate_report(&report);
    store.print_plan();
    Ok(())
}
