//! Command-line argument definitions for the CPW reconciler
//!
//! Defines the `cpw` interface with the clap derive API: global options for
//! configuration and logging, plus one subcommand per operator workflow.

use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::constants::output::RUN_DATE_FORMAT;

/// CLI arguments for the CPW reconciler
///
/// Cleans the raw planning export, archives it under the run date, and
/// splits the latest archive into one workbook per business category.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "cpw",
    version,
    about = "Reconcile planning exports against the workbook structure and split them by category",
    long_about = "Cleans the latest Project Financial Plan export, archives it with the run date, \
                  joins the newest archive to the workbook structure directory and writes one \
                  CPW workbook per category (MOB, PLA, RES, EF, SSC by default)."
)]
pub struct Args {
    /// Configuration file (TOML)
    ///
    /// Defaults to <config dir>/cpw-reconciler/config.toml when that file exists,
    /// otherwise the built-in defaults are used.
    #[arg(short = 'c', long = "config", value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Root folder of the document store, overriding `store.root`
    #[arg(long = "root", value_name = "PATH", global = true)]
    pub root: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Clean the raw planning export and archive it (first run)
    Clean(RunArgs),
    /// Split the latest archived planning table into category workbooks
    Categorize(RunArgs),
    /// Clean, then categorize
    Run(RunArgs),
    /// Write the default configuration file
    InitConfig(InitConfigArgs),
}

/// Arguments shared by the pipeline workflows
#[derive(Debug, Clone, Default, Parser)]
pub struct RunArgs {
    /// Date stamped on outputs (defaults to today)
    #[arg(long = "run-date", value_name = "YYYY-MM-DD", value_parser = parse_run_date)]
    pub run_date: Option<NaiveDate>,
}

impl RunArgs {
    pub fn run_date(&self) -> NaiveDate {
        self.run_date.unwrap_or_else(|| Local::now().date_naive())
    }
}

/// Arguments for init-config
#[derive(Debug, Clone, Parser)]
pub struct InitConfigArgs {
    /// Where to write the file; defaults to --config or the user config directory
    #[arg(value_name = "PATH")]
    pub path: Option<PathBuf>,

    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}

impl Args {
    pub fn get_log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else if self.quiet {
            "warn"
        } else {
            "info"
        }
    }
}

fn parse_run_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, RUN_DATE_FORMAT)
        .map_err(|e| format!("expected a date like 2024-03-15: {}", e))
}
