use anyhow::Result;

use crate::models::{IssueId, Status};
use crate::store::IssueStore;
use crate::workflow;

pub fn start(store: &dyn IssueStore, id: IssueId, note: Option<&str>) -> Result<()> {
    move_to(store, id, Status::InProgress, note)
}

pub fn resolve(store: &dyn IssueStore, id: IssueId, note: Option<&str>) -> Result<()> {
    move_to(store, id, Status::Resolved, note)
}

fn move_to(store: &dyn IssueStore, id: IssueId, to: Status, note: Option<&str>) -> Result<()> {
    let entry = workflow::transition_with_note(store, id, to, note)?;
    println!("Issue #{} is now {} ({})", id, to, entry.action);
    Ok(())
}
