//! In-memory issue store.
//!
//! The map lock is only held long enough to find or insert a record. All
//! per-issue work (sequence numbering, status commits) happens under that
//! record's own mutex, so a busy issue never blocks reads of the others.

use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use crate::error::{CivicError, Result};
use crate::models::{ActivityDraft, ActivityEntry, Issue, IssueId, Status};
use crate::store::{CommitOutcome, IssueStore};
use crate::validate::ValidatedIssueDraft;

#[derive(Debug)]
struct IssueRecord {
    issue: Issue,
    log: Vec<ActivityEntry>,
}

impl IssueRecord {
    fn append(&mut self, draft: ActivityDraft) -> ActivityEntry {
        let now = Utc::now();
        // Wall clocks can step backwards; the timeline must not.
        let timestamp = match self.log.last() {
            Some(last) if last.timestamp > now => last.timestamp,
            _ => now,
        };
        let entry = ActivityEntry {
            issue_id: self.issue.id,
            seq: self.log.len() as u32 + 1,
            timestamp,
            action: draft.action,
            description: draft.description,
        };
        self.log.push(entry.clone());
        entry
    }
}

#[derive(Debug)]
pub struct MemoryStore {
    records: RwLock<BTreeMap<IssueId, Arc<Mutex<IssueRecord>>>>,
    next_id: AtomicI64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        MemoryStore::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore {
            records: RwLock::new(BTreeMap::new()),
            next_id: AtomicI64::new(1),
        }
    }

    pub fn len(&self) -> Result<usize> {
        let records = self.records.read().map_err(|_| poisoned())?;
        Ok(records.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        self.len().map(|n| n == 0)
    }

    fn record(&self, id: IssueId) -> Result<Arc<Mutex<IssueRecord>>> {
        let records = self.records.read().map_err(|_| poisoned())?;
        records.get(&id).cloned().ok_or(CivicError::NotFound(id))
    }
}

fn poisoned() -> CivicError {
    CivicError::StorageUnavailable("in-memory store lock poisoned".to_string())
}

fn lock(record: &Mutex<IssueRecord>) -> Result<MutexGuard<'_, IssueRecord>> {
    record.lock().map_err(|_| poisoned())
}

impl IssueStore for MemoryStore {
    fn create(&self, draft: ValidatedIssueDraft) -> Result<IssueId> {
        let id = IssueId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let issue = Issue {
            id,
            title: draft.title().to_string(),
            description: draft.description().to_string(),
            category: draft.category(),
            status: Status::Pending,
            location: draft.location().clone(),
            image_url: draft.image_url().map(str::to_string),
            reporter: draft.reporter().cloned(),
            created_at: Utc::now(),
        };
        let mut record = IssueRecord {
            issue,
            log: Vec::new(),
        };
        record.append(ActivityDraft::reported());

        let mut records = self.records.write().map_err(|_| poisoned())?;
        records.insert(id, Arc::new(Mutex::new(record)));
        tracing::debug!(issue = %id, "created issue");
        Ok(id)
    }

    fn get(&self, id: IssueId) -> Result<Issue> {
        let record = self.record(id)?;
        let guard = lock(&record)?;
        Ok(guard.issue.clone())
    }

    fn list(&self) -> Result<Vec<Issue>> {
        let snapshot: Vec<_> = {
            let records = self.records.read().map_err(|_| poisoned())?;
            records.values().cloned().collect()
        };
        snapshot
            .iter()
            .map(|record| lock(record).map(|guard| guard.issue.clone()))
            .collect()
    }

    fn activity(&self, id: IssueId) -> Result<Vec<ActivityEntry>> {
        let record = self.record(id)?;
        let guard = lock(&record)?;
        Ok(guard.log.clone())
    }

    fn append_activity(&self, id: IssueId, draft: ActivityDraft) -> Result<ActivityEntry> {
        let record = self.record(id)?;
        let mut guard = lock(&record)?;
        let entry = guard.append(draft);
        tracing::debug!(issue = %id, seq = entry.seq, action = %entry.action, "appended activity");
        Ok(entry)
    }

    fn set_status(&self, id: IssueId, status: Status) -> Result<()> {
        let record = self.record(id)?;
        let mut guard = lock(&record)?;
        guard.issue.status = status;
        tracing::debug!(issue = %id, status = status.as_str(), "status overwritten");
        Ok(())
    }

    fn commit_transition(
        &self,
        id: IssueId,
        from: Status,
        to: Status,
        draft: ActivityDraft,
    ) -> Result<CommitOutcome> {
        let record = self.record(id)?;
        let mut guard = lock(&record)?;
        if guard.issue.status != from {
            return Ok(CommitOutcome::Stale {
                current: guard.issue.status,
            });
        }
        guard.issue.status = to;
        let entry = guard.append(draft);
        tracing::debug!(issue = %id, seq = entry.seq, from = from.as_str(), to = to.as_str(), "committed transition");
        Ok(CommitOutcome::Applied(entry))
    }
}
