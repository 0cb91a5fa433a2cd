//! Command implementations for the `cpw` binary
//!
//! Sets up logging, resolves the configuration, and runs the pipeline
//! workflows against the local document store with spinner feedback and a
//! coloured summary.

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::cli::args::{Args, Commands, InitConfigArgs};
use crate::config::PipelineConfig;
use crate::models::{ExtractionReport, FirstRunReport};
use crate::pipeline::PipelineRunner;
use crate::store::LocalFolderStore;

/// Dispatch to the subcommand handler
pub async fn run(args: Args) -> Result<()> {
    setup_logging(&args)?;

    let Some(command) = args.command.clone() else {
        bail!("no command given, see `cpw --help`");
    };

    match command {
        Commands::InitConfig(init) => init_config(&args, &init),
        Commands::Clean(run) => {
            let runner = build_runner(&args)?;
            run_clean(&runner, run.run_date(), args.quiet).await
        }
        Commands::Categorize(run) => {
            let runner = build_runner(&args)?;
            run_categorize(&runner, run.run_date(), args.quiet).await
        }
        Commands::Run(run) => {
            let runner = build_runner(&args)?;
            let run_date = run.run_date();
            run_clean(&runner, run_date, args.quiet).await?;
            run_categorize(&runner, run_date, args.quiet).await
        }
    }
}

/// Set up structured logging on stderr
pub fn setup_logging(args: &Args) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let log_level = args.get_log_level();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("cpw_reconciler={}", log_level)));

    if args.quiet {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .try_init()
            .context("Failed to initialise logging")?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_timer(fmt::time::uptime())
                    .with_writer(std::io::stderr),
            )
            .try_init()
            .context("Failed to initialise logging")?;
    }

    debug!("Logging initialized at level: {}", log_level);
    Ok(())
}

/// Load configuration: explicit file, then the default file if present, then defaults
pub fn load_configuration(args: &Args) -> Result<PipelineConfig> {
    let default_path = PipelineConfig::default_path().filter(|path| path.exists());

    let mut config = match args.config.as_ref().or(default_path.as_ref()) {
        Some(path) => {
            info!("Using config file: {}", path.display());
            PipelineConfig::load(path)
                .with_context(|| format!("Failed to load {}", path.display()))?
        }
        None => {
            info!("No config file found, using defaults");
            PipelineConfig::default()
        }
    };

    if let Some(root) = &args.root {
        config = config.with_root(root.clone());
    }
    config.validate()?;

    Ok(config)
}

fn build_runner(args: &Args) -> Result<PipelineRunner<LocalFolderStore>> {
    let config = load_configuration(args)?;
    let store = LocalFolderStore::new(config.store.root.clone());
    Ok(PipelineRunner::new(store, config)?)
}

async fn run_clean(
    runner: &PipelineRunner<LocalFolderStore>,
    run_date: NaiveDate,
    quiet: bool,
) -> Result<()> {
    let spinner = create_spinner("Cleaning planning export...", quiet);
    let result = runner.first_run(run_date).await;
    spinner.finish_and_clear();

    let report = result.context("First run failed")?;
    if !quiet {
        print_first_run_report(&report);
    }
    Ok(())
}

async fn run_categorize(
    runner: &PipelineRunner<LocalFolderStore>,
    run_date: NaiveDate,
    quiet: bool,
) -> Result<()> {
    let spinner = create_spinner("Extracting categories...", quiet);
    let result = runner.extract_categories(run_date).await;
    spinner.finish_and_clear();

    let report = result.context("Category extraction failed")?;
    if !quiet {
        print_extraction_report(&report, &output_folder(runner));
    }
    Ok(())
}

/// Folder on disk receiving the category workbooks
fn output_folder(runner: &PipelineRunner<LocalFolderStore>) -> PathBuf {
    runner
        .store()
        .root()
        .join(&runner.config().store.output_folder)
}

fn init_config(args: &Args, init: &InitConfigArgs) -> Result<()> {
    let path: PathBuf = match init.path.clone().or_else(|| args.config.clone()) {
        Some(path) => path,
        None => PipelineConfig::default_path()
            .context("Could not determine user config directory")?,
    };

    if path.exists() && !init.force {
        bail!(
            "{} already exists, pass --force to overwrite it",
            path.display()
        );
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let text = PipelineConfig::default().to_toml_string()?;
    std::fs::write(&path, text).with_context(|| format!("Failed to write {}", path.display()))?;

    println!(
        "{} {}",
        "Wrote default configuration to".bright_green(),
        path.display()
    );
    Ok(())
}

/// Spinner on stderr, hidden in quiet mode
pub fn create_spinner(message: &str, quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn print_first_run_report(report: &FirstRunReport) {
    let stats = &report.stats;
    println!("{}", "First run complete".bright_green().bold());
    println!("  {} {}", "Source:".bright_cyan(), report.source_name);
    println!(
        "  {} {}/{}",
        "Archived as:".bright_cyan(),
        report.stored_location,
        report.stored_name
    );
    println!(
        "  {} {} in, {} out",
        "Rows:".bright_cyan(),
        stats.input_rows.to_string().bright_white().bold(),
        stats.output_rows.to_string().bright_white().bold()
    );
    println!(
        "  {} {} ({} duplicates, {} without employee, {} conversion lines)",
        "Removed:".bright_cyan(),
        stats.rows_removed(),
        stats.duplicates_removed,
        stats.missing_employee_removed,
        stats.excluded_employee_removed
    );
}

fn print_extraction_report(report: &ExtractionReport, output_folder: &Path) {
    println!("{}", "Category extraction complete".bright_green().bold());
    println!("  {} {}", "Directory:".bright_cyan(), report.directory_name);
    println!("  {} {}", "Planning:".bright_cyan(), report.planning_name);
    println!(
        "  {} {}",
        "Joined rows:".bright_cyan(),
        report.joined_rows.to_string().bright_white().bold()
    );
    println!("  {} {}", "Written to:".bright_cyan(), output_folder.display());

    for output in &report.stored {
        println!("    {} ({} rows)", output.name, output.rows);
    }

    if report.unclassified_rows > 0 {
        let unmatched: Vec<&str> = report
            .observed_suffixes
            .iter()
            .filter(|(_, label)| label.is_none())
            .map(|(suffix, _)| suffix.as_str())
            .collect();
        println!(
            "  {} {} rows matched no category ({})",
            "Warning:".bright_yellow(),
            report.unclassified_rows,
            unmatched.join(", ")
        );
    }
    for entry in &report.ambiguous {
        println!(
            "  {} '{}' appears {} times in the directory, first entry used",
            "Warning:".bright_yellow(),
            entry.key,
            entry.matches
        );
    }
}
