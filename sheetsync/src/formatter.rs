//! Output formatters for batch reports

use anyhow::Result;
use colored::*;
use sheetsync_core::{BatchReport, RejectedRow, TransferOutcome, TransferStatus};

enum Line<'a> {
    Rejected(&'a RejectedRow),
    Outcome(&'a TransferOutcome),
}

impl Line<'_> {
    fn row_number(&self) -> u32 {
        match self {
            Line::Rejected(r) => r.row_number,
            Line::Outcome(o) => o.row_number,
        }
    }
}

/// Print one line per task row in table order, then a summary
pub fn print_human(report: &BatchReport, dry_run: bool) {
    let title = format!("Task file: {}", report.task_file.display());
    if dry_run {
        println!("{} {}", title.bold(), "(dry run)".bright_black());
    } else {
        println!("{}", title.bold());
    }
    println!();

    let mut lines: Vec<Line> = report
        .rejected
        .iter()
        .map(Line::Rejected)
        .chain(report.outcomes.iter().map(Line::Outcome))
        .collect();
    lines.sort_by_key(|line| line.row_number());

    for line in &lines {
        match line {
            Line::Rejected(row) => print_rejected(row),
            Line::Outcome(outcome) => print_outcome(outcome),
        }
    }
    if !lines.is_empty() {
        println!();
    }

    println!("{}", "Completed".bold().underline());
    println!("  {} {}", "Copied:".green().bold(), report.copied_count());
    if report.failed_count() > 0 {
        println!("  {} {}", "Failed:".red().bold(), report.failed_count());
    }
    if report.skipped_count() > 0 {
        println!("  {} {}", "Skipped:".yellow().bold(), report.skipped_count());
    }
}

fn print_rejected(row: &RejectedRow) {
    println!(
        "{} {} {}: {}",
        format!("Row {}", row.row_number).bright_black(),
        row.source_file.as_deref().unwrap_or("-"),
        "skipped".yellow().bold(),
        row.reason
    );
}

fn print_outcome(outcome: &TransferOutcome) {
    let target = format!("{} / {}", outcome.spreadsheet_id, outcome.tab);
    match &outcome.status {
        TransferStatus::Copied {
            cells_written,
            window,
        } => println!(
            "{} {} -> {} {}: {} ({} cells)",
            format!("Row {}", outcome.row_number).bright_black(),
            outcome.source_file,
            target.cyan(),
            window,
            "copied".green().bold(),
            cells_written
        ),
        TransferStatus::Failed(err) => println!(
            "{} {} -> {}: {} {}",
            format!("Row {}", outcome.row_number).bright_black(),
            outcome.source_file,
            target.cyan(),
            "error:".red().bold(),
            err
        ),
    }
}

/// Print the report in JSON format
pub fn print_json(report: &BatchReport, dry_run: bool) -> Result<()> {
    let outcomes: Vec<_> = report
        .outcomes
        .iter()
        .map(|o| match &o.status {
            TransferStatus::Copied {
                cells_written,
                window,
            } => serde_json::json!({
                "row": o.row_number,
                "source_file": o.source_file,
                "spreadsheet_id": o.spreadsheet_id,
                "tab": o.tab,
                "status": "copied",
                "range": window.to_a1(),
                "cells_written": cells_written,
            }),
            TransferStatus::Failed(err) => serde_json::json!({
                "row": o.row_number,
                "source_file": o.source_file,
                "spreadsheet_id": o.spreadsheet_id,
                "tab": o.tab,
                "status": "error",
                "kind": err.kind(),
                "message": err.to_string(),
            }),
        })
        .collect();

    let skipped: Vec<_> = report
        .rejected
        .iter()
        .map(|r| {
            serde_json::json!({
                "row": r.row_number,
                "source_file": r.source_file,
                "reason": r.reason.to_string(),
            })
        })
        .collect();

    let output = serde_json::json!({
        "task_file": report.task_file.display().to_string(),
        "dry_run": dry_run,
        "outcomes": outcomes,
        "skipped": skipped,
        "summary": {
            "copied": report.copied_count(),
            "failed": report.failed_count(),
            "skipped": report.skipped_count(),
        }
    });

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
