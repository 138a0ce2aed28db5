#![no_main]

//! Fuzz target for the submission validator.
//!
//! Any input must either be rejected with a validation error or produce a
//! draft whose fields are already normalized.

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use civictrack::validate::{validate, RawSubmission};

#[derive(Arbitrary, Debug)]
struct SubmissionInput {
    title: String,
    description: String,
    category: String,
    latitude: Option<f64>,
    longitude: Option<f64>,
    address: Option<String>,
    image_url: Option<String>,
    reporter: Option<String>,
}

fuzz_target!(|input: SubmissionInput| {
    let raw = RawSubmission {
        title: input.title,
        description: input.description,
        category: input.category,
        latitude: input.latitude,
        longitude: input.longitude,
        address: input.address,
        image_url: input.image_url,
        reporter: input.reporter,
    };

    match validate(raw) {
        Ok(draft) => {
            assert!(!draft.title().is_empty());
            assert_eq!(draft.title(), draft.title().trim());
            assert!(!draft.description().is_empty());
            let location = draft.location();
            assert!(location.address.is_some() || location.coordinates.is_some());
            if let Some(c) = &location.coordinates {
                assert!(c.is_valid());
            }
        }
        Err(e) => assert!(e.is_validation()),
    }
});
