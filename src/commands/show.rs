use anyhow::Result;
use serde::Serialize;

use crate::models::{ActivityEntry, Issue, IssueId};
use crate::store::IssueStore;

#[derive(Serialize)]
struct IssueDetail<'a> {
    #[serde(flatten)]
    issue: &'a Issue,
    activity: &'a [ActivityEntry],
}

pub fn run(store: &dyn IssueStore, id: IssueId, json: bool) -> Result<()> {
    let issue = store.get(id)?;
    let activity = store.activity(id)?;

    if json {
        let detail = IssueDetail {
            issue: &issue,
            activity: &activity,
        };
        println!("{}", serde_json::to_string_pretty(&detail)?);
    } else {
        print!("{}", render(&issue, &activity));
    }
    Ok(())
}

pub fn render(issue: &Issue, activity: &[ActivityEntry]) -> String {
    let mut out = String::new();
    out.push_str(&format!("Issue #{}: {}\n", issue.id, issue.title));
    out.push_str(&format!("Status: {}\n", issue.status));
    out.push_str(&format!("Category: {}\n", issue.category));
    out.push_str(&format!("Location: {}\n", issue.location.describe()));
    if let (Some(_), Some(c)) = (&issue.location.address, &issue.location.coordinates) {
        out.push_str(&format!("Coordinates: {:.5}, {:.5}\n", c.latitude, c.longitude));
    }
    if let Some(image) = &issue.image_url {
        out.push_str(&format!("Image: {}\n", image));
    }
    if let Some(reporter) = &issue.reporter {
        out.push_str(&format!("Reporter: {}\n", reporter));
    }
    out.push_str(&format!(
        "Reported: {}\n",
        issue.created_at.format("%Y-%m-%d %H:%M:%S")
    ));

    out.push_str("\nDescription:\n");
    for line in issue.description.lines() {
        out.push_str(&format!("  {}\n", line));
    }

    out.push_str("\nTimeline:\n");
    for entry in activity {
        out.push_str(&format!(
            "  {}. [{}] {}",
            entry.seq,
            entry.timestamp.format("%Y-%m-%d %H:%M"),
            entry.action
        ));
        if !entry.description.is_empty() {
            out.push_str(&format!(" - {}", entry.description));
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::error::CivicError;
    use crate::models::Status;
    use crate::store::contract;
    use crate::workflow;
    use tempfile::tempdir;

    fn setup_test_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(&db_path).unwrap();
        (db, dir)
    }

    #[test]
    fn test_render_lists_timeline_in_order() {
        let (db, _dir) = setup_test_db();
        let id = db.create(contract::draft("Pothole on main road")).unwrap();
        workflow::transition(&db, id, Status::InProgress).unwrap();
        workflow::transition(&db, id, Status::Resolved).unwrap();

        let text = render(&db.get(id).unwrap(), &db.activity(id).unwrap());
        assert!(text.starts_with(&format!("Issue #{}: Pothole on main road\n", id.0)));
        assert!(text.contains("Status: Resolved\n"));
        assert!(text.contains("Location: Main Street\n"));

        let reported = text.find("1. [").unwrap();
        let started = text.find("2. [").unwrap();
        let resolved = text.find("3. [").unwrap();
        assert!(reported < started && started < resolved);
        assert!(text.contains("Marked Resolved - Status changed from In Progress to Resolved"));
    }

    #[test]
    fn test_render_omits_blank_note_description() {
        let (db, _dir) = setup_test_db();
        let id = db.create(contract::draft("Streetlight")).unwrap();
        db.append_activity(id, crate::models::ActivityDraft::new("Inspected", ""))
            .unwrap();
        let text = render(&db.get(id).unwrap(), &db.activity(id).unwrap());
        assert!(text.contains("] Inspected\n"));
    }

    #[test]
    fn test_run_missing_issue() {
        let (db, _dir) = setup_test_db();
        let err = run(&db, IssueId(99), false).unwrap_err();
        assert_eq!(
            err.downcast_ref::<CivicError>(),
            Some(&CivicError::NotFound(IssueId(99)))
        );
    }

    #[test]
    fn test_run_json() {
        let (db, _dir) = setup_test_db();
        let id = db.create(contract::draft("Garbage")).unwrap();
        run(&db, id, true).unwrap();
    }
}
