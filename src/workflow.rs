//! Lifecycle state machine: Pending -> In Progress -> Resolved.
//!
//! A resolution must always be preceded by an explicit "in progress" step, so
//! `Pending -> Resolved` is rejected along with every backward or same-state
//! request.

use crate::error::{CivicError, Result};
use crate::models::{ActivityDraft, ActivityEntry, IssueId, Status};
use crate::store::{CommitOutcome, IssueStore};

/// The only state reachable from `from`, if any.
pub fn next_status(from: Status) -> Option<Status> {
    match from {
        Status::Pending => Some(Status::InProgress),
        Status::InProgress => Some(Status::Resolved),
        Status::Resolved => None,
    }
}

pub fn is_legal(from: Status, to: Status) -> bool {
    next_status(from) == Some(to)
}

/// Timeline label for entering `to`.
pub fn action_label(to: Status) -> &'static str {
    match to {
        Status::Pending => "Marked Pending",
        Status::InProgress => "Started In Progress",
        Status::Resolved => "Marked Resolved",
    }
}

pub fn transition(store: &dyn IssueStore, id: IssueId, to: Status) -> Result<ActivityEntry> {
    transition_with_note(store, id, to, None)
}

/// Moves `id` to `to` and records the change on its timeline. `note`, when
/// given, becomes the entry's description.
///
/// The status write and the timeline append commit together. If another
/// caller moves the issue first, the request is re-checked against the new
/// state, so two racing `start`s yield one success and one
/// `IllegalTransition`.
pub fn transition_with_note(
    store: &dyn IssueStore,
    id: IssueId,
    to: Status,
    note: Option<&str>,
) -> Result<ActivityEntry> {
    let mut from = match store.get(id) {
        Ok(issue) => issue.status,
        Err(CivicError::NotFound(_)) => {
            return Err(CivicError::IllegalTransition { id, from: None, to })
        }
        Err(e) => return Err(e),
    };

    // Each retry observes a strictly later state, so this terminates.
    for _ in 0..=Status::ALL.len() {
        if !is_legal(from, to) {
            tracing::debug!(issue = %id, from = from.as_str(), to = to.as_str(), "rejected transition");
            return Err(CivicError::IllegalTransition {
                id,
                from: Some(from),
                to,
            });
        }

        let description = match note.map(str::trim).filter(|n| !n.is_empty()) {
            Some(n) => n.to_string(),
            None => format!("Status changed from {} to {}", from.label(), to.label()),
        };
        let draft = ActivityDraft::new(action_label(to), description);

        match store.commit_transition(id, from, to, draft) {
            Ok(CommitOutcome::Applied(entry)) => {
                tracing::info!(issue = %id, from = from.as_str(), to = to.as_str(), seq = entry.seq, "issue transitioned");
                return Ok(entry);
            }
            Ok(CommitOutcome::Stale { current }) => {
                tracing::warn!(issue = %id, expected = from.as_str(), current = current.as_str(), "status moved underneath transition, re-checking");
                from = current;
            }
            Err(CivicError::NotFound(_)) => {
                return Err(CivicError::IllegalTransition { id, from: None, to })
            }
            Err(e) => return Err(e),
        }
    }

    Err(CivicError::IllegalTransition {
        id,
        from: Some(from),
        to,
    })
}
