//! Output formatting for CLI commands.
//!
//! This module handles formatting output as either JSON or human-readable text.

use civic_agenda::{Activity, DeleteOutcome, Occurrence, SubmitOutcome, SubmitReport, TransitionOutcome};
use serde::Serialize;

fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", text),
        Err(e) => eprintln!("Failed to render JSON: {}", e),
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let cut: String = text.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    } else {
        text.to_string()
    }
}

/// Print an occurrence listing.
pub fn print_occurrences(occurrences: &[Occurrence], json: bool) {
    if json {
        print_json(occurrences);
        return;
    }

    if occurrences.is_empty() {
        println!("No occurrences in range.");
        return;
    }

    println!(
        "{:<12} {:<13} {:<20} {:<12} {:<30} ID",
        "DATE", "TIME", "STATUS", "ESTAB", "TITLE"
    );
    println!("{}", "-".repeat(110));

    for o in occurrences {
        println!(
            "{:<12} {:<13} {:<20} {:<12} {:<30} {}{}",
            o.date.to_string(),
            format!("{}-{}", o.start_time.format("%H:%M"), o.end_time.format("%H:%M")),
            o.status.as_str(),
            truncate(&o.establishment_id, 12),
            truncate(&o.title, 30),
            o.id,
            if o.is_virtual { " (virtual)" } else { "" }
        );
    }

    println!("\nTotal: {} occurrences", occurrences.len());
}

/// Print a single activity record.
pub fn print_activity(verb: &str, activity: &Activity, json: bool) {
    if json {
        print_json(activity);
        return;
    }

    println!("{} activity {}", verb, activity.id);
    println!("Title: {}", activity.title);
    println!("Establishment: {}", activity.establishment_id);
    println!(
        "When: {} {}-{}",
        activity.date,
        activity.start_time.format("%H:%M"),
        activity.end_time.format("%H:%M")
    );
    println!("Status: {}", activity.status);
    if let Some(ref rule) = activity.recurrence {
        match rule.end_date {
            Some(end) => println!("Repeats: {} until {}", rule.pattern.as_str(), end),
            None => println!("Repeats: {}", rule.pattern.as_str()),
        }
    }
    if let Some(ref parent_id) = activity.recurrence_parent_id {
        println!("Series: {}", parent_id);
    }
}

/// Print the result of a delete.
pub fn print_delete_outcome(outcome: &DeleteOutcome, json: bool) {
    if json {
        print_json(outcome);
        return;
    }

    match outcome {
        DeleteOutcome::Deleted { ids } => {
            println!("Deleted {} record(s)", ids.len());
            for id in ids {
                println!("  {}", id);
            }
        }
        DeleteOutcome::Cancelled { activity } => {
            println!(
                "Cancelled occurrence on {} (record {})",
                activity.date, activity.id
            );
        }
    }
}

/// Print the result of a lifecycle transition.
pub fn print_transition(outcome: &TransitionOutcome, json: bool) {
    if json {
        print_json(outcome);
    } else if outcome.transition.is_applied() {
        println!("{} is now {}", outcome.activity.id, outcome.activity.status);
    } else {
        println!(
            "{} already {}; nothing changed",
            outcome.activity.id, outcome.activity.status
        );
    }
}

/// Print a bulk submit report.
pub fn print_submit_report(report: &SubmitReport, json: bool) {
    if json {
        print_json(report);
        return;
    }

    for item in &report.items {
        let status = match &item.outcome {
            SubmitOutcome::Submitted => "submitted".to_string(),
            SubmitOutcome::AlreadySubmitted => "already submitted".to_string(),
            SubmitOutcome::Failed { error } => format!("FAILED: {}", error),
            SubmitOutcome::RolledBack => "rolled back".to_string(),
            SubmitOutcome::RollbackFailed { error } => format!("ROLLBACK FAILED: {}", error),
            SubmitOutcome::NotAttempted => "not attempted".to_string(),
        };
        println!("{:<40} {}", item.activity_id, status);
    }

    println!(
        "\nSubmitted: {}  Already submitted: {}  Failed: {}",
        report.submitted, report.already_submitted, report.failed
    );
}
