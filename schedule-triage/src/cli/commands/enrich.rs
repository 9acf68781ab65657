//! `enrich`: batch lookup followed by a filtered export

use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;
use colored::*;

use super::intercom_client;
use crate::cli::{EnrichArgs, output};
use crate::config::Config;
use crate::export::{ExportError, ExportFormat};
use crate::session::Session;

pub async fn handle_enrich_command(args: EnrichArgs, today: NaiveDate) -> Result<()> {
    let config = Config::load()?;
    let mut resilience = config.resilience();
    if let Some(size) = args.group_size {
        resilience.concurrency.group_size = size;
    }
    if let Some(width) = args.concurrency {
        resilience.concurrency.max_in_flight_groups = width;
    }

    let filter = args.filter.to_spec()?;
    let lookup = intercom_client(&config, resilience.retry.clone())?;

    let mut session = Session::new(lookup, today);
    let loaded = session
        .load_file(&args.file)
        .with_context(|| format!("Failed to load {}", args.file.display()))?;

    println!(
        "Loaded {} record(s) from {}",
        loaded.to_string().bold(),
        args.file.display().to_string().cyan()
    );

    if loaded == 0 {
        println!("{}", "Nothing to enrich: no rows with an email address.".yellow());
        return Ok(());
    }

    let mut progress = session.subscribe_progress();
    let mut handle = session
        .start_batch(resilience.concurrency.clone())
        .ok_or_else(|| anyhow!("A batch run is already active"))?;

    let mut stop_requested = false;
    let summary = loop {
        tokio::select! {
            result = &mut handle => break result.context("Batch enrichment task failed")?,
            changed = progress.changed() => {
                if changed.is_err() {
                    continue;
                }
                let snapshot = progress.borrow_and_update().clone();
                output::print_progress(&snapshot);
            }
            _ = tokio::signal::ctrl_c(), if !stop_requested => {
                stop_requested = true;
                if session.is_batch_running() {
                    println!("{}", "Stopping after the groups already in flight...".yellow());
                    session.stop_batch();
                }
            }
        }
    };

    output::print_summary(&summary);

    session.set_filter(filter);
    let format = ExportFormat::from(args.format);
    match session.export_as(format) {
        Ok(file) => {
            let dir = args.out.unwrap_or_else(|| config.export_dir());
            let path = file
                .write_to(&dir)
                .with_context(|| format!("Failed to write export to {}", dir.display()))?;
            println!("Exported to {}", path.display().to_string().bright_green());
        }
        Err(ExportError::NothingToExport) => {
            println!("{}", "No data to export for the selected filters.".yellow());
        }
        Err(e) => return Err(e).context("Export failed"),
    }

    Ok(())
}
