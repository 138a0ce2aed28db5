//! Filtering and ordering of issue listings.
//!
//! Every active field of a [`FilterSpec`] must match. Results are ordered
//! newest first, ties broken by descending id, so the same input always
//! yields the same sequence.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::CivicError;
use crate::models::{Category, Coordinates, Issue, ReporterId, Status};

/// Mean Earth radius (IUGG).
pub const EARTH_RADIUS_KM: f64 = 6371.0088;

/// A filter field that is either disabled (`All`) or pinned to one value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Selection<T> {
    All,
    Only(T),
}

impl<T> Default for Selection<T> {
    fn default() -> Self {
        Selection::All
    }
}

impl<T: PartialEq> Selection<T> {
    pub fn admits(&self, value: &T) -> bool {
        match self {
            Selection::All => true,
            Selection::Only(wanted) => wanted == value,
        }
    }
}

impl<T: FromStr> FromStr for Selection<T> {
    type Err = T::Err;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            Ok(Selection::All)
        } else {
            s.parse().map(Selection::Only)
        }
    }
}

/// Circle on the globe, radius in kilometres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBound {
    pub center: Coordinates,
    pub radius_km: f64,
}

impl GeoBound {
    /// Rejects an out-of-range center and a negative or non-finite radius,
    /// either of which would silently match nothing.
    pub fn new(center: Coordinates, radius_km: f64) -> Result<Self, CivicError> {
        if !center.is_valid() {
            return Err(CivicError::InvalidLocation(format!(
                "center ({}, {}) out of range",
                center.latitude, center.longitude
            )));
        }
        if !radius_km.is_finite() || radius_km < 0.0 {
            return Err(CivicError::InvalidLocation(format!(
                "radius {} km must be finite and non-negative",
                radius_km
            )));
        }
        Ok(GeoBound { center, radius_km })
    }

    pub fn contains(&self, point: &Coordinates) -> bool {
        haversine_km(&self.center, point) <= self.radius_km
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    /// Case-insensitive substring of the title or of the description. Each
    /// field is searched on its own, so a needle spanning the end of the
    /// title and the start of the description does not match.
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub category: Selection<Category>,
    #[serde(default)]
    pub status: Selection<Status>,
    #[serde(default)]
    pub geo: Option<GeoBound>,
    #[serde(default)]
    pub reporter: Option<ReporterId>,
}

impl FilterSpec {
    pub fn matches(&self, issue: &Issue) -> bool {
        self.matches_text(issue)
            && self.category.admits(&issue.category)
            && self.status.admits(&issue.status)
            && self.matches_geo(issue)
            && self.matches_reporter(issue)
    }

    fn matches_text(&self, issue: &Issue) -> bool {
        let needle = match self.text.as_deref().map(str::trim) {
            Some(t) if !t.is_empty() => t.to_lowercase(),
            _ => return true,
        };
        issue.title.to_lowercase().contains(&needle)
            || issue.description.to_lowercase().contains(&needle)
    }

    fn matches_geo(&self, issue: &Issue) -> bool {
        match (&self.geo, &issue.location.coordinates) {
            (None, _) => true,
            (Some(bound), Some(point)) => bound.contains(point),
            (Some(_), None) => false,
        }
    }

    fn matches_reporter(&self, issue: &Issue) -> bool {
        match &self.reporter {
            None => true,
            Some(wanted) => issue.reporter.as_ref() == Some(wanted),
        }
    }
}

/// Great-circle distance in kilometres.
pub fn haversine_km(a: &Coordinates, b: &Coordinates) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlat = (b.latitude - a.latitude).to_radians();
    let dlon = (b.longitude - a.longitude).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_KM * c
}

/// Returns the matching issues, newest first. Never fails; an empty result
/// is a valid answer.
pub fn query(issues: &[Issue], filter: &FilterSpec) -> Vec<Issue> {
    let mut matched: Vec<Issue> = issues
        .iter()
        .filter(|issue| filter.matches(issue))
        .cloned()
        .collect();
    matched.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.cmp(&a.id))
    });
    matched
}
