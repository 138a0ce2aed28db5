//! Storage capability set shared by every backend.
//!
//! The store is the only component that mutates issue records. Backends must
//! uphold three guarantees under concurrent callers:
//! - issue ids never collide,
//! - activity sequence numbers for one issue are strictly increasing,
//! - `commit_transition` applies its status change and activity entry as one
//!   unit that no reader can observe half-done.

use crate::error::Result;
use crate::models::{ActivityDraft, ActivityEntry, Issue, IssueId, Status};
use crate::validate::ValidatedIssueDraft;

/// Result of a compare-and-swap status commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    Applied(ActivityEntry),
    /// The issue was no longer in the expected state; nothing was written.
    Stale { current: Status },
}

pub trait IssueStore: Send + Sync {
    /// Stores a new `Pending` issue and seeds its timeline with a
    /// "Reported" entry.
    fn create(&self, draft: ValidatedIssueDraft) -> Result<IssueId>;

    fn get(&self, id: IssueId) -> Result<Issue>;

    /// All issues, in no particular order.
    fn list(&self) -> Result<Vec<Issue>>;

    /// Timeline for one issue, ordered by sequence number.
    fn activity(&self, id: IssueId) -> Result<Vec<ActivityEntry>>;

    fn append_activity(&self, id: IssueId, draft: ActivityDraft) -> Result<ActivityEntry>;

    /// Raw status write with no legality check. Use
    /// [`crate::workflow::transition`] for lifecycle changes.
    fn set_status(&self, id: IssueId, status: Status) -> Result<()>;

    /// Sets `to` and appends `draft` atomically, provided the issue is still
    /// in `from`.
    fn commit_transition(
        &self,
        id: IssueId,
        from: Status,
        to: Status,
        draft: ActivityDraft,
    ) -> Result<CommitOutcome>;
}
