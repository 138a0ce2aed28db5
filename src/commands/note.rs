use anyhow::{bail, Result};

use crate::models::{ActivityDraft, IssueId};
use crate::store::IssueStore;

/// Adds a free-form timeline entry such as "Assigned to municipal worker".
/// Never changes the issue's status.
pub fn run(store: &dyn IssueStore, id: IssueId, action: &str, description: Option<&str>) -> Result<()> {
    let action = action.trim();
    if action.is_empty() {
        bail!("Note action cannot be empty");
    }

    let entry = store.append_activity(
        id,
        ActivityDraft::new(action, description.map(str::trim).unwrap_or_default()),
    )?;
    println!("Added note #{} to issue #{}", entry.seq, id);
    Ok(())
}
