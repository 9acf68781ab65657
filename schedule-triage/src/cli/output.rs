//! Terminal rendering for tables and progress

use colored::*;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::enrichment::{BatchProgress, BatchSummary, RecordOutcome};
use crate::records::{ContactStatus, Record};
use crate::view::{CategoricalOptions, Page};

const MAX_CELL_WIDTH: usize = 32;

const PAGE_COLUMNS: &[&str] = &[
    "#",
    "Name",
    "Email",
    "Original",
    "New",
    "Contacted",
    "Conv",
    "Priority",
    "Magnitude",
    "Status",
];

/// Truncate to `max` display columns, marking the cut with an ellipsis
pub fn truncate_to_width(text: &str, max: usize) -> String {
    if text.width() <= max {
        return text.to_string();
    }

    let mut out = String::new();
    let mut width = 0;
    for ch in text.chars() {
        let w = ch.width().unwrap_or(0);
        if width + w + 1 > max {
            break;
        }
        out.push(ch);
        width += w;
    }
    out.push('…');
    out
}

fn pad(text: &str, width: usize) -> String {
    let fill = width.saturating_sub(text.width());
    format!("{}{}", text, " ".repeat(fill))
}

/// Plain-text table with columns sized by display width
pub fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| row.iter().map(|c| truncate_to_width(c, MAX_CELL_WIDTH)).collect())
        .collect();

    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| {
            cells
                .iter()
                .filter_map(|row| row.get(i))
                .map(|c| c.width())
                .chain(std::iter::once(h.width()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut out = String::new();
    let header_line: Vec<String> = headers.iter().zip(&widths).map(|(h, w)| pad(h, *w)).collect();
    out.push_str(header_line.join("  ").trim_end());
    out.push('\n');

    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    out.push_str(&rule.join("  "));
    out.push('\n');

    for row in &cells {
        let line: Vec<String> = widths
            .iter()
            .enumerate()
            .map(|(i, w)| pad(row.get(i).map(String::as_str).unwrap_or(""), *w))
            .collect();
        out.push_str(line.join("  ").trim_end());
        out.push('\n');
    }

    out
}

fn page_row(record: &Record) -> Vec<String> {
    vec![
        record.id.to_string(),
        record.name.clone(),
        record.email.clone(),
        record.original_schedule_date.clone(),
        record.new_schedule_date.clone(),
        record.contacted().label().to_string(),
        record.conversation_count().to_string(),
        record.priority.label().to_string(),
        record.magnitude.label().to_string(),
        record.ticket_status.clone(),
    ]
}

pub fn print_page(page: &Page) {
    if page.items.is_empty() {
        println!("{}", "No records match the current filters.".yellow());
        return;
    }

    let rows: Vec<Vec<String>> = page.items.iter().map(page_row).collect();
    print!("{}", render_table(PAGE_COLUMNS, &rows));
    println!(
        "{}",
        format!(
            "Page {} of {} ({} matching record(s))",
            page.page_index + 1,
            page.total_pages.max(1),
            page.total_filtered
        )
        .dimmed()
    );
}

pub fn print_options(options: &CategoricalOptions) {
    let join = |values: Vec<String>| {
        if values.is_empty() {
            "-".to_string()
        } else {
            values.join(", ")
        }
    };

    println!("{}", "Filter values present:".bold());
    println!(
        "  Contacted:     {}",
        join(options.contacted.iter().map(|s| s.label().to_string()).collect())
    );
    println!(
        "  Priority:      {}",
        join(options.priority.iter().map(|p| p.label().to_string()).collect())
    );
    println!(
        "  Magnitude:     {}",
        join(options.magnitude.iter().map(|m| m.label().to_string()).collect())
    );
    println!("  Ticket status: {}", join(options.ticket_status.clone()));
}

pub fn colored_status(status: ContactStatus) -> ColoredString {
    match status {
        ContactStatus::Yes => status.label().bright_green(),
        ContactStatus::No => status.label().yellow(),
        ContactStatus::Error => status.label().bright_red(),
        ContactStatus::Unknown => status.label().dimmed(),
    }
}

/// `[completed/total 42%] status`, with a failure count when any failed
pub fn progress_line(progress: &BatchProgress) -> String {
    let counter = format!(
        "[{}/{} {:.0}%]",
        progress.completed,
        progress.total,
        progress.fraction() * 100.0
    );
    if progress.failed > 0 {
        format!(
            "{} {} {}",
            counter.cyan(),
            progress.status,
            format!("({} failed)", progress.failed).bright_red()
        )
    } else {
        format!("{} {}", counter.cyan(), progress.status)
    }
}

pub fn print_progress(progress: &BatchProgress) {
    println!("{}", progress_line(progress));
}

pub fn print_summary(summary: &BatchSummary) {
    let headline = if summary.cancelled {
        "Batch stopped".yellow().bold()
    } else {
        "Batch finished".bright_green().bold()
    };
    println!(
        "{}: {} of {} record(s) looked up, {} matched, {} unmatched, {} failed",
        headline,
        summary.completed,
        summary.total,
        summary.matched.to_string().bright_green(),
        summary.unmatched,
        summary.failed.to_string().bright_red()
    );
}

pub fn print_outcome(email: &str, outcome: &RecordOutcome) {
    match outcome {
        RecordOutcome::Matched {
            contact_id,
            conversations,
        } => println!(
            "{} {} (contact {}, {} conversation(s))",
            colored_status(ContactStatus::Yes),
            email,
            contact_id.dimmed(),
            conversations
        ),
        RecordOutcome::NoMatch => println!("{} {}", colored_status(ContactStatus::No), email),
        RecordOutcome::Failed(message) => {
            println!("{} {}: {}", colored_status(ContactStatus::Error), email, message)
        }
        RecordOutcome::Skipped => println!("{} {}", "Skipped".dimmed(), email),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_to_width() {
        assert_eq!(truncate_to_width("short", 10), "short");
        assert_eq!(truncate_to_width("abcdefghij", 5), "abcd…");
        // Wide characters count double
        assert_eq!(truncate_to_width("日本語テキスト", 5), "日本…");
    }

    #[test]
    fn test_progress_line_shows_percentage() {
        colored::control::set_override(false);
        let mut progress = BatchProgress {
            completed: 1,
            total: 3,
            status: "Fetching...".to_string(),
            running: true,
            ..BatchProgress::default()
        };
        assert_eq!(progress_line(&progress), "[1/3 33%] Fetching...");

        progress.completed = 3;
        progress.failed = 1;
        assert_eq!(progress_line(&progress), "[3/3 100%] Fetching... (1 failed)");
    }

    #[test]
    fn test_render_table_aligns_columns() {
        let rows = vec![
            vec!["1".to_string(), "a@x.com".to_string()],
            vec!["12".to_string(), "名前@x.com".to_string()],
        ];
        let table = render_table(&["#", "Email"], &rows);
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines[0], "#   Email");
        assert_eq!(lines[1], "--  ----------");
        assert_eq!(lines[2], "1   a@x.com");
        assert_eq!(lines[3], "12  名前@x.com");
    }
}
