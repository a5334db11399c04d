use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};
use studylog_core::logging::{self, LoggingConfig, sanitize_path};
use studylog_core::{ActivityLog, Clock, Config, DEFAULT_CONFIG_FILE, MergeReport, SummaryStats, SystemClock, detect};
use studylog_store as store;

/// studylog - Track daily flashcard study activity from collection snapshots
#[derive(Parser, Debug)]
#[command(name = "studylog")]
#[command(about = "Detect study changes between snapshots and keep a daily activity log", long_about = None)]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to studylog.toml (default: ./studylog.toml)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a starter config to --config or ./studylog.toml
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
    /// Compare two snapshots and write the detected changes
    Detect {
        /// Earlier snapshot CSV (missing or unreadable means no prior data)
        #[arg(value_name = "PREVIOUS")]
        previous: PathBuf,

        /// Current snapshot CSV
        #[arg(value_name = "CURRENT")]
        current: PathBuf,

        /// Output JSON (default: changes_<date>.json)
        #[arg(value_name = "OUTPUT")]
        output: Option<PathBuf>,
    },
    /// Merge detected changes into the activity log
    Merge {
        /// Changes JSON written by `detect`
        #[arg(value_name = "DELTAS")]
        deltas: PathBuf,

        /// Activity log (default: config's activity_log)
        #[arg(value_name = "ACTIVITY_LOG")]
        activity_log: Option<PathBuf>,

        /// Raw review counts written by `extract`
        #[arg(long, value_name = "PATH")]
        activity_summary: Option<PathBuf>,

        /// Days of history to keep (default: config's retention_days)
        #[arg(long, value_name = "DAYS", value_parser = clap::value_parser!(u32).range(1..))]
        retention_days: Option<u32>,
    },
    /// Print statistics for an activity log
    Summary {
        /// Activity log (default: config's activity_log)
        #[arg(value_name = "ACTIVITY_LOG")]
        activity_log: Option<PathBuf>,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Export a snapshot and review counts from the local Anki collection
    Extract {
        /// Anki profile directory (default: platform Anki2 directory)
        #[arg(long, value_name = "DIR")]
        data_dir: Option<PathBuf>,

        /// Profile name (default: config's extract.profile)
        #[arg(short, long, value_name = "NAME")]
        profile: Option<String>,

        /// Directory for the exported files (default: config's extract.output_dir)
        #[arg(short, long, value_name = "DIR")]
        output_dir: Option<PathBuf>,
    },
}

fn main() {
    if let Err(e) = run() {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    // init writes the config file, so it must not require one
    let config = match cli.command {
        Commands::Init { .. } => Config::default(),
        _ => load_config(cli.config.as_deref())?,
    };

    let mut logging_config = LoggingConfig::from(config.logging.clone());
    if cli.verbose {
        logging_config = logging_config.with_level("debug");
    }
    let _guard = logging::init_logging(Some(logging_config)).context("Failed to initialize logging")?;
    tracing::debug!(
        retention_days = config.retention_days,
        activity_log = %sanitize_path(&config.activity_log),
        "Loaded configuration"
    );

    let clock = SystemClock::new();

    match cli.command {
        Commands::Init { force } => {
            let path = cli.config.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
            cmd_init(&path, force)?;
        }
        Commands::Detect { previous, current, output } => {
            cmd_detect(&previous, &current, output, &clock)?;
        }
        Commands::Merge { deltas, activity_log, activity_summary, retention_days } => {
            let log_path = activity_log.unwrap_or_else(|| config.activity_log.clone());
            let retention_days = retention_days.unwrap_or(config.retention_days);
            cmd_merge(&deltas, &log_path, activity_summary.as_deref(), retention_days, &clock)?;
        }
        Commands::Summary { activity_log, json } => {
            let log_path = activity_log.unwrap_or_else(|| config.activity_log.clone());
            cmd_summary(&log_path, json, &clock)?;
        }
        Commands::Extract { data_dir, profile, output_dir } => {
            let data_dir = data_dir.or_else(|| config.extract.data_dir.clone());
            let profile = profile.unwrap_or_else(|| config.extract.profile.clone());
            let output_dir = output_dir.unwrap_or_else(|| config.extract.output_dir.clone());
            cmd_extract(data_dir.as_deref(), &profile, &output_dir, config.retention_days, &clock)?;
        }
    }

    Ok(())
}

/// Load the config; an explicit path must exist, the default may not.
fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::from_file(path).with_context(|| format!("Failed to load config from {}", path.display())),
        None => {
            let path = Path::new(DEFAULT_CONFIG_FILE);
            Config::load_or_default(path).with_context(|| format!("Failed to load config from {}", path.display()))
        }
    }
}

/// Write the commented default config; an existing file is kept unless `force`
fn cmd_init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
    }
    store::write_atomic(path, Config::example().as_bytes())
        .with_context(|| format!("Failed to write config to {}", path.display()))?;
    println!("{} Wrote {}", "Success:".green().bold(), sanitize_path(path));
    Ok(())
}

/// Compare two snapshots and save the delta set; returns the output path
fn cmd_detect(previous: &Path, current: &Path, output: Option<PathBuf>, clock: &dyn Clock) -> Result<PathBuf> {
    let snapshot_date = studylog_core::snapshot_date_for(current, clock);
    let output = output.unwrap_or_else(|| PathBuf::from(format!("changes_{}.json", snapshot_date)));

    println!(
        "{} Comparing {} -> {}",
        "Info:".blue().bold(),
        sanitize_path(previous),
        sanitize_path(current)
    );

    let previous_items = store::load_snapshot(previous);
    let current_items = store::load_snapshot(current);
    if current_items.is_empty() {
        anyhow::bail!("Could not load current snapshot {}", current.display());
    }

    let deltas = detect(&previous_items, &current_items, clock).with_snapshot_date(snapshot_date);
    store::save_deltas(&output, &deltas)
        .with_context(|| format!("Failed to save changes to {}", output.display()))?;

    println!(
        "{} Changes detected and saved to {}",
        "Success:".green().bold(),
        output.display().cyan()
    );
    println!("  Reviews: {}", deltas.reviews.len());
    println!("  New studies: {}", deltas.new_studies.len());
    println!("  Level changes: {}", deltas.level_changes.len());
    println!("  Items in current snapshot: {}", deltas.metadata.current_items);

    Ok(output)
}

/// Merge a delta set into the log, trim it and save it
fn cmd_merge(
    deltas_path: &Path, log_path: &Path, activity_summary: Option<&Path>, retention_days: u32, clock: &dyn Clock,
) -> Result<ActivityLog> {
    println!("{} Updating activity log: {}", "Info:".blue().bold(), sanitize_path(log_path));
    println!("{} Processing changes from: {}", "Info:".blue().bold(), sanitize_path(deltas_path));

    let deltas = store::load_deltas(deltas_path)
        .with_context(|| format!("Failed to load changes from {}", deltas_path.display()))?;

    let mut log = store::load_activity_log(log_path, clock);
    let report = log.merge(&deltas, clock);
    print_merge_report(&report);

    if let Some(summary_path) = activity_summary
        && let Some(summary) = store::load_review_counts(summary_path)
    {
        let days = log.incorporate_review_counts(&summary);
        println!("  Review counts recorded for {} days", days);
    }

    let removed = log.apply_retention(retention_days, clock.today());
    if removed > 0 {
        println!("  Removed {} days older than {} days", removed, retention_days);
    }

    store::save_activity_log(log_path, &log)
        .with_context(|| format!("Failed to save activity log to {}", log_path.display()))?;
    println!("{} Activity log updated", "Success:".green().bold());

    print_summary(&SummaryStats::from_log(&log));
    Ok(log)
}

fn print_merge_report(report: &MergeReport) {
    for ((day, kind), merged) in &report.days {
        println!(
            "  Added {} {} for {} (total: {})",
            merged.added,
            kind,
            day.cyan(),
            merged.total
        );
    }
    if report.skipped() > 0 {
        println!("  Skipped {} entries already in the log", report.skipped());
    }
}

fn print_summary(stats: &SummaryStats) {
    println!();
    println!("{}", "Summary Statistics".green().bold().underline());
    println!("  Total days tracked: {}", stats.total_days_tracked);
    println!("  Active days: {}", stats.active_days);
    println!("  Total reviews: {}", stats.total_reviews);
    println!("  Total new studies: {}", stats.total_new_studies);
    println!("  Total level changes: {}", stats.total_level_changes);
    println!("  Unique collections: {}", stats.unique_collections);
    println!("  Average daily reviews: {:.1}", stats.average_daily_reviews);
    println!("  Average daily new studies: {:.1}", stats.average_daily_new_studies);
}

/// Print statistics for the log at `log_path`
fn cmd_summary(log_path: &Path, json: bool, clock: &dyn Clock) -> Result<SummaryStats> {
    let log = store::load_activity_log(log_path, clock);
    let stats = SummaryStats::from_log(&log);

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        println!("{} Activity log: {}", "Info:".blue().bold(), sanitize_path(log_path));
        print_summary(&stats);
    }
    Ok(stats)
}

/// Export today's snapshot and review counts from the Anki collection
fn cmd_extract(
    data_dir: Option<&Path>, profile: &str, output_dir: &Path, retention_days: u32, clock: &dyn Clock,
) -> Result<store::ExportPaths> {
    let profile_dir = store::locate_profile_dir(data_dir, profile)
        .context("Please make sure Anki is installed and has been run at least once")?;
    println!("{} Looking for Anki data in: {}", "Info:".blue().bold(), sanitize_path(&profile_dir));

    let extraction = store::extract(&profile_dir, retention_days, clock).context("Failed to read collection")?;
    let paths = store::write_exports(output_dir, &extraction, clock).context("Failed to write exports")?;

    println!(
        "{} Exported {} cards to {}",
        "Success:".green().bold(),
        extraction.items.len(),
        paths.snapshot.display().cyan()
    );
    println!(
        "{} Exported review counts for {} days to {}",
        "Success:".green().bold(),
        extraction.review_counts.total_days,
        paths.review_counts.display().cyan()
    );

    Ok(paths)
}
