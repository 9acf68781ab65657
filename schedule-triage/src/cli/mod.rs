//! Command-line interface

pub mod commands;
pub mod output;

use anyhow::{Result, bail};
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::export::ExportFormat;
use crate::records::{ContactStatus, DateChangeMagnitude, Priority};
use crate::view::{DEFAULT_PAGE_SIZE, FilterSpec};

#[derive(Parser, Debug)]
#[command(name = "schedule-triage")]
#[command(about = "Enrich schedule-change sheets with Intercom contact status, then filter and export them")]
#[command(version)]
pub struct Cli {
    /// Reference date for priorities (YYYY-MM-DD), defaults to today
    #[arg(long, global = true)]
    pub today: Option<NaiveDate>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn reference_date(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Local::now().date_naive())
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Look every record up in Intercom, then export the filtered result
    Enrich(EnrichArgs),
    /// Show one page of a sheet without contacting Intercom
    Preview(PreviewArgs),
    /// Look a single email address up in Intercom
    Lookup(LookupArgs),
}

#[derive(Args, Debug)]
pub struct EnrichArgs {
    /// Input sheet (.csv, .xlsx or .xls)
    pub file: PathBuf,

    /// Records looked up together as one group
    #[arg(long)]
    pub group_size: Option<usize>,

    /// Groups allowed in flight at once
    #[arg(long)]
    pub concurrency: Option<usize>,

    #[command(flatten)]
    pub filter: FilterArgs,

    /// Export format
    #[arg(long, value_enum, default_value_t = FormatArg::Csv)]
    pub format: FormatArg,

    /// Export directory (defaults to the configured export directory)
    #[arg(long)]
    pub out: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct PreviewArgs {
    /// Input sheet (.csv, .xlsx or .xls)
    pub file: PathBuf,

    #[command(flatten)]
    pub filter: FilterArgs,

    /// Page number, starting at 1
    #[arg(long, default_value_t = 1)]
    pub page: usize,

    /// Rows per page: 20, 50, 100, or 0 for all rows
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    pub page_size: usize,

    /// Sort column (name, email, phone, original, new, contacted,
    /// conversations, priority, magnitude, status)
    #[arg(long, default_value = "original")]
    pub sort: String,

    /// Sort descending
    #[arg(long)]
    pub desc: bool,
}

#[derive(Args, Debug)]
pub struct LookupArgs {
    pub email: String,
}

#[derive(Args, Debug, Default, Clone)]
pub struct FilterArgs {
    /// Contacted status (Unknown, Yes, No, Error)
    #[arg(long)]
    pub contacted: Option<String>,

    /// Minimum conversation count
    #[arg(long)]
    pub min_conversations: Option<u64>,

    /// Priority (Immediate, "Very High", High, Medium, Low, Unknown)
    #[arg(long)]
    pub priority: Option<String>,

    /// Date change magnitude (Minor, Moderate, Major, Unknown)
    #[arg(long)]
    pub magnitude: Option<String>,

    /// Ticket status, matched exactly
    #[arg(long)]
    pub ticket_status: Option<String>,
}

impl FilterArgs {
    pub fn to_spec(&self) -> Result<FilterSpec> {
        let mut spec = FilterSpec::all();

        if let Some(raw) = &self.contacted {
            match ContactStatus::from_label(raw) {
                Some(status) => spec = spec.with_contacted(status),
                None => bail!("Unknown contacted status: {}", raw),
            }
        }
        if let Some(min) = self.min_conversations {
            spec = spec.with_min_conversations(min);
        }
        if let Some(raw) = &self.priority {
            match Priority::from_label(raw) {
                Some(priority) => spec = spec.with_priority(priority),
                None => bail!("Unknown priority: {}", raw),
            }
        }
        if let Some(raw) = &self.magnitude {
            match DateChangeMagnitude::from_label(raw) {
                Some(magnitude) => spec = spec.with_magnitude(magnitude),
                None => bail!("Unknown date change magnitude: {}", raw),
            }
        }
        if let Some(status) = &self.ticket_status {
            spec = spec.with_ticket_status(status.clone());
        }

        Ok(spec)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Csv,
    Xlsx,
    Json,
}

impl From<FormatArg> for ExportFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Csv => ExportFormat::Csv,
            FormatArg::Xlsx => ExportFormat::Xlsx,
            FormatArg::Json => ExportFormat::Json,
        }
    }
}

/// Dispatch a parsed command line
pub async fn run(cli: Cli) -> Result<()> {
    if cli.no_color {
        colored::control::set_override(false);
    }

    let today = cli.reference_date();
    match cli.command {
        Commands::Enrich(args) => commands::enrich::handle_enrich_command(args, today).await,
        Commands::Preview(args) => commands::preview::handle_preview_command(args, today),
        Commands::Lookup(args) => commands::lookup::handle_lookup_command(args, today).await,
    }
}
