use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};

use crate::models::{ActivityEntry, Issue, Status};
use crate::store::IssueStore;

pub const EXPORT_VERSION: i32 = 1;

#[derive(Debug, Serialize, Deserialize)]
pub struct ExportedIssue {
    #[serde(flatten)]
    pub issue: Issue,
    pub activity: Vec<ActivityEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ExportData {
    pub version: i32,
    pub exported_at: String,
    pub issues: Vec<ExportedIssue>,
}

fn collect(store: &dyn IssueStore) -> Result<Vec<ExportedIssue>> {
    let mut issues = store.list()?;
    issues.sort_by_key(|i| i.id);
    issues
        .into_iter()
        .map(|issue| {
            let activity = store.activity(issue.id)?;
            Ok(ExportedIssue { issue, activity })
        })
        .collect()
}

fn write_output(content: &str, count: usize, output_path: Option<&str>) -> Result<()> {
    match output_path {
        Some(path) => {
            fs::write(path, content).context("Failed to write export file")?;
            eprintln!("Exported {} issues to {}", count, path);
        }
        None => {
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{}", content)?;
        }
    }
    Ok(())
}

pub fn run_json(store: &dyn IssueStore, output_path: Option<&str>) -> Result<()> {
    let data = ExportData {
        version: EXPORT_VERSION,
        exported_at: chrono::Utc::now().to_rfc3339(),
        issues: collect(store)?,
    };

    let json = serde_json::to_string_pretty(&data)?;
    tracing::info!(issues = data.issues.len(), "exported issues as json");
    write_output(&json, data.issues.len(), output_path)
}

pub fn run_markdown(store: &dyn IssueStore, output_path: Option<&str>) -> Result<()> {
    let issues = collect(store)?;
    let md = render_markdown(&issues, chrono::Utc::now());
    tracing::info!(issues = issues.len(), "exported issues as markdown");
    write_output(&md, issues.len(), output_path)
}

pub fn render_markdown(issues: &[ExportedIssue], exported_at: chrono::DateTime<chrono::Utc>) -> String {
    let mut md = String::new();

    md.push_str("# CivicTrack Issues Export\n\n");
    md.push_str(&format!(
        "Exported: {}\n\n",
        exported_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));

    for status in Status::ALL {
        let group: Vec<_> = issues.iter().filter(|e| e.issue.status == status).collect();
        if group.is_empty() {
            continue;
        }
        md.push_str(&format!("## {}\n\n", status.label()));
        for exported in group {
            write_issue_md(&mut md, exported);
        }
    }
    md
}

fn write_issue_md(md: &mut String, exported: &ExportedIssue) {
    let issue = &exported.issue;
    let checkbox = if issue.status == Status::Resolved {
        "[x]"
    } else {
        "[ ]"
    };

    md.push_str(&format!(
        "### {} #{}: {}\n\n",
        checkbox, issue.id, issue.title
    ));
    md.push_str(&format!("- **Category:** {}\n", issue.category));
    md.push_str(&format!("- **Location:** {}\n", issue.location.describe()));
    if let Some(reporter) = &issue.reporter {
        md.push_str(&format!("- **Reporter:** {}\n", reporter));
    }
    md.push_str(&format!(
        "- **Reported:** {}\n",
        issue.created_at.format("%Y-%m-%d")
    ));

    md.push_str(&format!("\n{}\n", issue.description));

    if !exported.activity.is_empty() {
        md.push_str("\n**Timeline:**\n");
        for entry in &exported.activity {
            md.push_str(&format!(
                "- [{}] {}",
                entry.timestamp.format("%Y-%m-%d %H:%M"),
                entry.action
            ));
            if !entry.description.is_empty() {
                md.push_str(&format!(": {}", entry.description));
            }
            md.push('\n');
        }
    }

    md.push_str("\n---\n\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::memory::MemoryStore;
    use crate::models::IssueId;
    use crate::store::contract;
    use crate::workflow;
    use proptest::prelude::*;
    use tempfile::tempdir;

    fn setup_test_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(&db_path).unwrap();
        (db, dir)
    }

    #[test]
    fn test_collect_includes_activity() {
        let (db, _dir) = setup_test_db();
        let id = db.create(contract::draft("Pothole")).unwrap();
        workflow::transition(&db, id, Status::InProgress).unwrap();

        let exported = collect(&db).unwrap();
        assert_eq!(exported.len(), 1);
        assert_eq!(exported[0].issue.status, Status::InProgress);
        assert_eq!(exported[0].activity.len(), 2);
    }

    #[test]
    fn test_collect_orders_by_id() {
        let store = MemoryStore::new();
        for title in ["a", "b", "c"] {
            store.create(contract::draft(title)).unwrap();
        }
        let ids: Vec<IssueId> = collect(&store).unwrap().iter().map(|e| e.issue.id).collect();
        assert_eq!(ids, vec![IssueId(1), IssueId(2), IssueId(3)]);
    }

    #[test]
    fn test_run_json_to_file() {
        let (db, dir) = setup_test_db();
        db.create(contract::draft("Issue 1")).unwrap();
        db.create(contract::draft("Issue 2")).unwrap();
        let output_path = dir.path().join("export.json");
        let result = run_json(&db, Some(output_path.to_str().unwrap()));
        assert!(result.is_ok());
        let content = fs::read_to_string(&output_path).unwrap();
        let data: ExportData = serde_json::from_str(&content).unwrap();
        assert_eq!(data.version, EXPORT_VERSION);
        assert_eq!(data.issues.len(), 2);
        assert_eq!(data.issues[0].activity[0].action, "Reported");
    }

    #[test]
    fn test_run_json_empty_database() {
        let (db, dir) = setup_test_db();
        let output_path = dir.path().join("export.json");
        run_json(&db, Some(output_path.to_str().unwrap())).unwrap();
        let content = fs::read_to_string(&output_path).unwrap();
        let data: ExportData = serde_json::from_str(&content).unwrap();
        assert_eq!(data.issues.len(), 0);
    }

    #[test]
    fn test_json_uses_storage_keys() {
        let (db, dir) = setup_test_db();
        let id = db.create(contract::draft("Streetlight")).unwrap();
        workflow::transition(&db, id, Status::InProgress).unwrap();
        let output_path = dir.path().join("export.json");
        run_json(&db, Some(output_path.to_str().unwrap())).unwrap();
        let content = fs::read_to_string(&output_path).unwrap();
        assert!(content.contains("\"status\": \"in_progress\""));
        assert!(content.contains("\"category\": \"Potholes\""));
    }

    #[test]
    fn test_run_markdown_to_file() {
        let (db, dir) = setup_test_db();
        db.create(contract::draft("Issue 1")).unwrap();
        let output_path = dir.path().join("export.md");
        run_markdown(&db, Some(output_path.to_str().unwrap())).unwrap();
        let content = fs::read_to_string(&output_path).unwrap();
        assert!(content.contains("# CivicTrack Issues Export"));
        assert!(content.contains("### [ ] #1: Issue 1"));
    }

    #[test]
    fn test_markdown_groups_by_status() {
        let store = MemoryStore::new();
        store.create(contract::draft("Waiting")).unwrap();
        let done = store.create(contract::draft("Fixed")).unwrap();
        workflow::transition(&store, done, Status::InProgress).unwrap();
        workflow::transition(&store, done, Status::Resolved).unwrap();

        let md = render_markdown(&collect(&store).unwrap(), chrono::Utc::now());
        let pending = md.find("## Pending").unwrap();
        let resolved = md.find("## Resolved").unwrap();
        assert!(pending < resolved);
        assert!(!md.contains("## In Progress"));
        assert!(md.contains("### [x] #2: Fixed"));
        assert!(md.contains("Marked Resolved: Status changed from In Progress to Resolved"));
    }

    #[test]
    fn test_export_unicode_content() {
        let (db, dir) = setup_test_db();
        db.create(contract::draft("Bache en la calle 🚧")).unwrap();
        let output_path = dir.path().join("export.json");
        run_json(&db, Some(output_path.to_str().unwrap())).unwrap();
        let content = fs::read_to_string(&output_path).unwrap();
        let data: ExportData = serde_json::from_str(&content).unwrap();
        assert_eq!(data.issues[0].issue.title, "Bache en la calle 🚧");
    }

    proptest! {
        #[test]
        fn prop_json_is_valid(title in "[a-zA-Z0-9][a-zA-Z0-9 ]{0,30}") {
            let (db, dir) = setup_test_db();
            db.create(contract::draft(&title)).unwrap();
            let output_path = dir.path().join("export.json");
            run_json(&db, Some(output_path.to_str().unwrap())).unwrap();
            let content = fs::read_to_string(&output_path).unwrap();
            let result: std::result::Result<ExportData, _> = serde_json::from_str(&content);
            prop_assert!(result.is_ok());
        }
    }
}
