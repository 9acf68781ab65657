//! `preview`: one page of a sheet, no network

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use colored::*;
use std::sync::Arc;

use crate::api::{IntercomClient, RetryConfig};
use crate::cli::{PreviewArgs, output};
use crate::session::Session;
use crate::view::{self, PAGE_SIZES, SortDirection, SortField};

pub fn handle_preview_command(args: PreviewArgs, today: NaiveDate) -> Result<()> {
    let Some(sort_field) = SortField::from_name(&args.sort) else {
        bail!("Unknown sort column: {}", args.sort);
    };
    if !view::is_offered_page_size(args.page_size) {
        let offered: Vec<String> = PAGE_SIZES.iter().map(|s| s.to_string()).collect();
        bail!(
            "Unsupported page size {} (choose one of {})",
            args.page_size,
            offered.join(", ")
        );
    }
    let direction = if args.desc {
        SortDirection::Desc
    } else {
        SortDirection::Asc
    };

    // Never called: preview does not start a batch
    let offline = Arc::new(IntercomClient::new("", "", RetryConfig::none()));
    let mut session = Session::new(offline, today);
    let loaded = session
        .load_file(&args.file)
        .with_context(|| format!("Failed to load {}", args.file.display()))?;
    session.set_filter(args.filter.to_spec()?);

    println!(
        "{} record(s) loaded, priorities relative to {}",
        loaded.to_string().bold(),
        today.to_string().cyan()
    );
    println!();

    let page = session.get_page(
        args.page.saturating_sub(1),
        args.page_size,
        sort_field,
        direction,
    );
    output::print_page(&page);
    println!();
    output::print_options(&session.get_categorical_options());

    Ok(())
}
