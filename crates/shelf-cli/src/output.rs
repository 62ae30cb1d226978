//! Terminal output formatting.

use colored::Colorize;

use shelf_core::{RunReport, SkippedRecord};
use shelf_store::MirrorCounts;

use crate::commands::project::ProjectionSummary;

/// Print the per-entity outcome of a snapshot sync.
pub fn print_sync_report(report: &RunReport) {
    if report.entities.is_empty() {
        println!("{}", "No entities synced.".dimmed());
        return;
    }

    println!(
        "{:<20} {:>8} {:>8} {:>8} {:>10}",
        "Entity".bold(),
        "Added".bold(),
        "Removed".bold(),
        "Updated".bold(),
        "Unchanged".bold()
    );
    println!("{}", "-".repeat(58));

    for entity in &report.entities {
        println!(
            "{:<20} {:>8} {:>8} {:>8} {:>10}",
            entity.entity,
            colored_count(entity.added, |s| s.green()),
            colored_count(entity.removed, |s| s.red()),
            colored_count(entity.updated, |s| s.yellow()),
            entity.unchanged.to_string().dimmed()
        );
    }

    if report.is_noop() {
        println!("{}", "Everything already in sync.".dimmed());
    } else {
        let mut summary = format!(
            "{} added, {} removed, {} updated",
            report.total_added().to_string().green(),
            report.total_removed().to_string().red(),
            report.total_updated().to_string().yellow()
        );
        if report.total_skipped() > 0 {
            summary.push_str(&format!(", {} skipped", report.total_skipped().to_string().yellow()));
        }
        println!("{summary}");
    }

    for entity in &report.entities {
        print_skipped(&entity.entity, &entity.skipped);
    }
}

/// Print the per-collection outcome of mirroring snapshots.
pub fn print_mirror_report(mirrored: &[(String, MirrorCounts)]) {
    if mirrored.is_empty() {
        println!("{}", "No collections mirrored.".dimmed());
        return;
    }

    println!(
        "{:<20} {:>8} {:>8} {:>8}",
        "Collection".bold(),
        "Added".bold(),
        "Updated".bold(),
        "Removed".bold()
    );
    println!("{}", "-".repeat(46));

    for (name, counts) in mirrored {
        println!(
            "{:<20} {:>8} {:>8} {:>8}",
            name,
            colored_count(counts.added, |s| s.green()),
            colored_count(counts.updated, |s| s.yellow()),
            colored_count(counts.removed, |s| s.red())
        );
    }
}

/// Print the outcome of a projection run.
pub fn print_projection_summary(summary: &ProjectionSummary) {
    if summary.full_rebuild {
        println!("{}", "Full rebuild".yellow().bold());
    }

    if !summary.labels.is_empty() {
        println!(
            "{:<20} {:>10} {:>8}",
            "Label".bold(),
            "Upserted".bold(),
            "Deleted".bold()
        );
        println!("{}", "-".repeat(40));
        for label in &summary.labels {
            println!(
                "{:<20} {:>10} {:>8}",
                label.label,
                colored_count(label.upserted, |s| s.green()),
                colored_count(label.deleted, |s| s.red())
            );
        }
    }

    if !summary.relationships.is_empty() {
        println!();
        println!("{}", "Relationships".bold());
        for (description, created) in &summary.relationships {
            println!("  {} {}", colored_count(*created as usize, |s| s.green()), description);
        }
    }

    if summary.properties_removed > 0 {
        println!();
        println!(
            "{} denormalized properties removed",
            summary.properties_removed.to_string().cyan()
        );
    }

    for label in &summary.labels {
        print_skipped(&label.label, &label.skipped);
    }
}

fn print_skipped(context: &str, skipped: &[SkippedRecord]) {
    if skipped.is_empty() {
        return;
    }
    println!();
    println!("{} {} skipped in {}", "!".yellow().bold(), skipped.len(), context);
    for record in skipped {
        println!("  {} {}", record.context.dimmed(), record.reason);
    }
}

fn colored_count(
    count: usize,
    color: impl Fn(&str) -> colored::ColoredString,
) -> colored::ColoredString {
    let text = count.to_string();
    if count == 0 {
        text.dimmed()
    } else {
        color(&text)
    }
}
