use std::path::PathBuf;
use std::process::ExitCode;

use card_cli::{BatchRunner, BatchScope, FileSelection, PairScope, RunConfig, StopPolicy, format_report, init_thread_pool};
use clap::{CommandFactory, Parser};
use log::{error, warn};

#[derive(Parser)]
#[command(name = "cardmatch")]
#[command(about = "Find symbols shared between circular cards in photographs")]
#[command(version)]
struct Cli {
    /// Directory holding .jpg, .png or .tif photographs
    path: PathBuf,

    /// TOML or JSON run configuration; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Smallest card diameter in pixels
    #[arg(long)]
    min_card_size: Option<u32>,

    /// Largest card diameter in pixels
    #[arg(long)]
    max_card_size: Option<u32>,

    /// Descriptor distance below which two keypoints agree
    #[arg(long)]
    good_distance: Option<f32>,

    /// Agreeing keypoints needed to call two symbols equal
    #[arg(long)]
    good_matches: Option<usize>,

    /// Debug logging and, with --debug-dir, overlay images
    #[arg(short, long)]
    verbose: bool,

    /// Report every matching card pair instead of stopping at the first
    #[arg(long)]
    exhaustive: bool,

    /// Compare only neighbouring cards
    #[arg(long)]
    adjacent: bool,

    /// Pool the cards of all images into one batch
    #[arg(long)]
    across_images: bool,

    /// Process only the file at this position of the sorted listing
    #[arg(long)]
    file_index: Option<usize>,

    /// Directory for PNG overlays, written only together with --verbose.
    /// This is the only option that makes cardmatch write files.
    #[arg(long)]
    debug_dir: Option<PathBuf>,

    /// Time budget per batch in seconds
    #[arg(long)]
    deadline_secs: Option<f64>,

    /// Compare card pairs in parallel
    #[arg(long)]
    parallel: bool,
}

impl Cli {
    fn run_config(&self) -> card_cli::BatchResult<RunConfig> {
        let mut cfg = match &self.config {
            Some(path) => RunConfig::load(path)?,
            None => RunConfig::default(),
        };

        let pipeline = &mut cfg.pipeline;
        if let Some(v) = self.min_card_size {
            pipeline.min_card_size = v;
        }
        if let Some(v) = self.max_card_size {
            pipeline.max_card_size = v;
        }
        if let Some(v) = self.good_distance {
            pipeline.good_distance = v;
        }
        if let Some(v) = self.good_matches {
            pipeline.good_matches_min_limit = v;
        }
        pipeline.verbose |= self.verbose;

        let orch = &mut cfg.orchestrator;
        if self.exhaustive {
            orch.stop_policy = StopPolicy::Exhaustive;
        }
        if self.adjacent {
            orch.pair_scope = PairScope::Adjacent;
        }
        if self.across_images {
            orch.batch_scope = BatchScope::AcrossImages;
        }
        if let Some(index) = self.file_index {
            orch.file_selection = FileSelection::Single(index);
        }
        if self.debug_dir.is_some() {
            orch.debug_dir = self.debug_dir.clone();
        }
        if self.deadline_secs.is_some() {
            orch.deadline_secs = self.deadline_secs;
        }
        orch.parallel |= self.parallel;

        cfg.validate()?;
        Ok(cfg)
    }
}

fn run(cli: &Cli) -> card_cli::BatchResult<()> {
    let cfg = cli.run_config()?;
    if let Err(e) = init_thread_pool(cfg.pipeline.n_threads) {
        warn!("Thread pool already initialized: {}", e);
    }

    let runner = BatchRunner::new(cfg)?;
    for report in runner.run(&cli.path)? {
        println!("{}", format_report(&report));
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.is_usage_error() => {
            eprintln!("{}\n", e);
            eprintln!("{}", Cli::command().render_help());
            ExitCode::FAILURE
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
