#![no_main]

//! Fuzz target for the status lifecycle.
//!
//! Drives arbitrary transition requests and notes against one issue and
//! checks that the timeline grows by exactly one entry per accepted change.

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use civictrack::memory::MemoryStore;
use civictrack::models::{ActivityDraft, Status};
use civictrack::store::IssueStore;
use civictrack::validate::{validate, RawSubmission};
use civictrack::workflow;

#[derive(Arbitrary, Debug)]
enum Step {
    Transition(u8),
    Note(String),
}

fuzz_target!(|steps: Vec<Step>| {
    let store = MemoryStore::new();
    let draft = match validate(RawSubmission {
        title: "Fuzzed".to_string(),
        description: "Lifecycle fuzzing".to_string(),
        category: "Other".to_string(),
        address: Some("Anywhere".to_string()),
        ..Default::default()
    }) {
        Ok(d) => d,
        Err(_) => return,
    };
    let id = match store.create(draft) {
        Ok(id) => id,
        Err(_) => return,
    };

    let mut expected_len = 1;
    let mut status = Status::Pending;
    for step in steps.into_iter().take(64) {
        match step {
            Step::Transition(n) => {
                let to = Status::ALL[n as usize % Status::ALL.len()];
                let legal = workflow::is_legal(status, to);
                let result = workflow::transition(&store, id, to);
                assert_eq!(result.is_ok(), legal);
                if legal {
                    status = to;
                    expected_len += 1;
                }
            }
            Step::Note(text) => {
                if store
                    .append_activity(id, ActivityDraft::new("Note", text))
                    .is_ok()
                {
                    expected_len += 1;
                }
            }
        }
    }

    let log = match store.activity(id) {
        Ok(log) => log,
        Err(_) => return,
    };
    assert_eq!(log.len(), expected_len);
    assert!(log.windows(2).all(|w| w[0].seq < w[1].seq));
    if let Ok(issue) = store.get(id) {
        assert_eq!(issue.status, status);
    }
});
