#![no_main]

//! Fuzz target for CLI output functions.
//!
//! Row and detail rendering truncate titles and addresses. The goal is to
//! catch panics from byte slicing on multi-byte characters.

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use tempfile::tempdir;

use civictrack::commands::{export, list, show};
use civictrack::db::Database;
use civictrack::query::{query, FilterSpec};
use civictrack::store::IssueStore;
use civictrack::validate::{validate, RawSubmission};

#[derive(Arbitrary, Debug)]
struct CliOutputInput {
    /// Issue title - can contain any Unicode
    title: String,
    /// Issue description - can contain any Unicode
    description: String,
    /// Address - can contain any Unicode
    address: String,
    /// Search text for list filtering
    search: Option<String>,
    /// Number of issues to create (for list testing)
    num_issues: u8,
}

fuzz_target!(|input: CliOutputInput| {
    let num_issues = (input.num_issues % 20).max(1);

    let dir = match tempdir() {
        Ok(d) => d,
        Err(_) => return,
    };
    let db = match Database::open(&dir.path().join("issues.db")) {
        Ok(d) => d,
        Err(_) => return,
    };

    for i in 0..num_issues {
        let title = if i == 0 {
            input.title.clone()
        } else {
            format!("{} #{}", input.title, i)
        };
        let raw = RawSubmission {
            title,
            description: input.description.clone(),
            category: "Other".to_string(),
            address: Some(input.address.clone()),
            ..Default::default()
        };
        if let Ok(draft) = validate(raw) {
            let _ = db.create(draft);
        }
    }

    let issues = match db.list() {
        Ok(issues) => issues,
        Err(_) => return,
    };
    let filter = FilterSpec {
        text: input.search,
        ..Default::default()
    };
    for issue in query(&issues, &filter) {
        let _ = list::format_row(&issue);
        if let Ok(activity) = db.activity(issue.id) {
            let _ = show::render(&issue, &activity);
        }
    }

    let export_path = dir.path().join("export.json");
    let export_path = export_path.to_string_lossy();
    let _ = export::run_json(&db, Some(&*export_path));
});
