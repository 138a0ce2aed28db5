use anyhow::{Context, Result};

use crate::models::{Coordinates, IssueId};
use crate::store::IssueStore;
use crate::validate::{validate, RawSubmission};

pub fn run(store: &dyn IssueStore, raw: RawSubmission) -> Result<IssueId> {
    let draft = validate(raw)?;
    let category = draft.category();
    let id = store.create(draft).context("Failed to store report")?;

    tracing::info!(issue = %id, category = %category, "issue reported");
    println!("Reported issue #{} ({})", id, category);
    Ok(id)
}

/// Parses `LAT,LON` as typed on the command line. Out-of-range pairs are
/// rejected rather than left to match nothing.
pub fn parse_lat_lon(s: &str) -> std::result::Result<(f64, f64), String> {
    let (lat, lon) = s
        .split_once(',')
        .ok_or_else(|| format!("expected LAT,LON but got '{}'", s))?;
    let lat: f64 = lat
        .trim()
        .parse()
        .map_err(|_| format!("invalid latitude '{}'", lat.trim()))?;
    let lon: f64 = lon
        .trim()
        .parse()
        .map_err(|_| format!("invalid longitude '{}'", lon.trim()))?;
    let coords = Coordinates {
        latitude: lat,
        longitude: lon,
    };
    if !coords.is_valid() {
        return Err(format!("coordinates ({}, {}) out of range", lat, lon));
    }
    Ok((lat, lon))
}
