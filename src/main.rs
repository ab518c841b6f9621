mod aggregate;
mod config;
mod extract;
mod record;
mod snapshot;
mod summary;
mod tradeoff;

use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use crate::config::SynthConfig;
use crate::extract::Dialect;
use crate::snapshot::Snapshot;
use crate::tradeoff::TradeoffReport;

/// Extract area, power and timing metrics from synthesis reports of an
/// exact design and its approximate variants, merge in error metrics, and
/// write a snapshot plus trade-off data for plotting.
#[derive(Parser, Debug)]
#[command(name = "synthmetrics", version, about)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, default_value = config::DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Reports base directory (overrides config)
    #[arg(long)]
    reports_dir: Option<PathBuf>,

    /// Snapshot output file (overrides config)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Trade-off output file (overrides config)
    #[arg(long)]
    tradeoffs_output: Option<PathBuf>,

    /// Write a default config file and exit
    #[arg(long)]
    init: bool,

    /// Print resolved config and report paths, don't parse anything
    #[arg(long)]
    dry_run: bool,

    /// Print a metrics table after the run
    #[arg(long)]
    summary: bool,

    /// Skip deriving and writing the trade-off file
    #[arg(long)]
    no_tradeoffs: bool,

    /// Re-derive trade-offs and summary from a saved snapshot instead of
    /// parsing reports (defaults to the configured snapshot path)
    #[arg(long, value_name = "FILE", num_args = 0..=1)]
    from_snapshot: Option<Option<PathBuf>>,

    /// Extra logging (per-report results)
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Only warnings and errors
    #[arg(short, long)]
    quiet: bool,
}

impl Cli {
    fn apply_overrides(&self, config: &mut SynthConfig) {
        if let Some(dir) = &self.reports_dir {
            config.reports.base_dir = dir.clone();
        }
        if let Some(out) = &self.output {
            config.output.snapshot = out.clone();
        }
        if let Some(out) = &self.tradeoffs_output {
            config.output.tradeoffs = out.clone();
        }
    }
}

fn init_logging(cli: &Cli) {
    let default_level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Exit status of a normal run.
const EXIT_OK: u8 = 0;
/// Config or snapshot could not be loaded, or an output file could not be
/// written.
const EXIT_FAILURE: u8 = 1;
/// Output directory could not be created.
const EXIT_NO_OUTPUT_DIR: u8 = 2;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);
    tracing::debug!(?cli, "parsed CLI arguments");

    if cli.init {
        return match SynthConfig::init(&cli.config) {
            Ok(true) => {
                println!("Wrote {}", cli.config.display());
                ExitCode::SUCCESS
            }
            Ok(false) => {
                println!("{} already exists, left unchanged", cli.config.display());
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Error: failed to write {}: {e}", cli.config.display());
                ExitCode::FAILURE
            }
        };
    }

    let mut config = match SynthConfig::load(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };
    cli.apply_overrides(&mut config);

    if cli.dry_run {
        print_dry_run(&config);
        return ExitCode::SUCCESS;
    }

    if let Some(from) = &cli.from_snapshot {
        let path = from.as_ref().unwrap_or(&config.output.snapshot);
        return ExitCode::from(rederive(&cli, &config, path));
    }

    ExitCode::from(run(&cli, &config))
}

fn print_dry_run(config: &SynthConfig) {
    match toml::to_string_pretty(config) {
        Ok(text) => println!("{text}"),
        Err(e) => tracing::warn!(error = %e, "failed to render resolved config"),
    }
    let dialect = Dialect::synopsys(config.extraction.slack_selection);
    println!("Report files ({} dialect):", dialect.name());
    for design in &config.designs {
        for kind in record::ReportKind::ALL {
            let path = design.report_path(&config.reports.base_dir, kind);
            let state = if path.is_file() { "found" } else { "missing" };
            let fields: Vec<&str> = dialect.fields(kind).iter().map(|f| f.as_str()).collect();
            println!(
                "  {:<12} {:<7} {} ({state}) -> {}",
                design.id,
                kind,
                path.display(),
                fields.join(", ")
            );
        }
    }
    println!("Dry run: nothing parsed or written.");
}

fn run(cli: &Cli, config: &SynthConfig) -> u8 {
    // The one unrecoverable condition: nowhere to put the results.
    let mut outputs = vec![&config.output.snapshot];
    if !cli.no_tradeoffs {
        outputs.push(&config.output.tradeoffs);
    }
    for out in outputs {
        if let Err(e) = snapshot::ensure_parent_dir(out) {
            eprintln!("Error: {e}");
            return EXIT_NO_OUTPUT_DIR;
        }
    }

    tracing::info!(
        base_dir = %config.reports.base_dir.display(),
        designs = config.designs.len(),
        "parsing synthesis reports"
    );
    let dialect = Dialect::synopsys(config.extraction.slack_selection);
    tracing::debug!(dialect = dialect.name(), "using report dialect");
    let (snapshot, log) = aggregate::aggregate(
        &config.designs,
        &config.reports.base_dir,
        &dialect,
        &config.quality,
    );

    let mut status = EXIT_OK;

    match snapshot.write(&config.output.snapshot) {
        Ok(()) => tracing::info!(
            path = %config.output.snapshot.display(),
            designs = snapshot.len(),
            "saved snapshot"
        ),
        Err(e) => {
            tracing::error!(error = %e, "failed to save snapshot; previous snapshot left as is");
            status = EXIT_FAILURE;
        }
    }

    let baseline = config.baseline().unwrap_or_default();

    if !cli.no_tradeoffs {
        write_tradeoffs(&snapshot, baseline, config, &mut status);
    }

    if cli.summary {
        print!(
            "{}",
            summary::generate_summary(&snapshot, Some(&log), baseline, &config.tradeoff.metrics)
        );
    }

    status
}

/// Second stage on its own: load a persisted snapshot and derive the
/// trade-off file and summary from it without touching any report.
fn rederive(cli: &Cli, config: &SynthConfig, path: &Path) -> u8 {
    let snapshot = match Snapshot::load(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!("Run without --from-snapshot first to extract the reports.");
            return EXIT_FAILURE;
        }
    };
    tracing::info!(
        path = %path.display(),
        designs = snapshot.len(),
        "loaded snapshot"
    );

    let baseline = config.baseline().unwrap_or_default();
    let mut status = EXIT_OK;

    if !cli.no_tradeoffs {
        if let Err(e) = crate::snapshot::ensure_parent_dir(&config.output.tradeoffs) {
            eprintln!("Error: {e}");
            return EXIT_NO_OUTPUT_DIR;
        }
        write_tradeoffs(&snapshot, baseline, config, &mut status);
    }

    if cli.summary {
        print!(
            "{}",
            summary::generate_summary(&snapshot, None, baseline, &config.tradeoff.metrics)
        );
    }

    status
}

fn write_tradeoffs(snapshot: &Snapshot, baseline: &str, config: &SynthConfig, status: &mut u8) {
    let report = TradeoffReport::build(snapshot, baseline, &config.tradeoff.metrics);
    match crate::snapshot::write_json_atomic(&config.output.tradeoffs, &report) {
        Ok(()) => tracing::info!(
            path = %config.output.tradeoffs.display(),
            comparisons = report.comparisons.len(),
            pairs = report.pairs.len(),
            "saved trade-off data"
        ),
        Err(e) => {
            tracing::error!(error = %e, "failed to save trade-off data");
            *status = EXIT_FAILURE;
        }
    }
}
