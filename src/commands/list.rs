use anyhow::Result;

use crate::models::Issue;
use crate::query::{query, FilterSpec};
use crate::store::IssueStore;

pub fn run(store: &dyn IssueStore, filter: &FilterSpec, limit: Option<usize>, json: bool) -> Result<()> {
    let mut issues = query(&store.list()?, filter);
    if let Some(limit) = limit {
        issues.truncate(limit);
    }
    tracing::debug!(matched = issues.len(), "listed issues");

    if json {
        println!("{}", serde_json::to_string_pretty(&issues)?);
        return Ok(());
    }

    if issues.is_empty() {
        println!("No issues found.");
        return Ok(());
    }

    for issue in &issues {
        println!("{}", format_row(issue));
    }

    Ok(())
}

/// Parses a `--radius` in kilometres. Negative or non-finite values would
/// make the geo filter match nothing, so they are errors.
pub fn parse_radius(s: &str) -> std::result::Result<f64, String> {
    let radius: f64 = s
        .trim()
        .parse()
        .map_err(|_| format!("invalid radius '{}'", s.trim()))?;
    if !radius.is_finite() || radius < 0.0 {
        return Err(format!("radius must be a finite, non-negative number of km, got '{}'", s.trim()));
    }
    Ok(radius)
}

pub fn format_row(issue: &Issue) -> String {
    let status_display = format!("[{}]", issue.status.label());
    format!(
        "#{:<4} {:13} {:<40} {:12} {:<24} {}",
        issue.id,
        status_display,
        truncate(&issue.title, 40),
        issue.category,
        truncate(&issue.location.describe(), 24),
        issue.created_at.format("%Y-%m-%d")
    )
}

pub(crate) fn truncate(s: &str, max_chars: usize) -> String {
    let char_count = s.chars().count();
    if char_count <= max_chars {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}
