//! Gatekeeper between client input and the issue store.

use serde::{Deserialize, Serialize};

use crate::error::{CivicError, Result};
use crate::models::{Category, Coordinates, Location, ReporterId};

/// Client-supplied report, exactly as received.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSubmission {
    pub title: String,
    pub description: String,
    pub category: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub reporter: Option<String>,
}

/// A normalized submission. Only [`validate`] builds one, so anything handed
/// to `IssueStore::create` has passed every check.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedIssueDraft {
    title: String,
    description: String,
    category: Category,
    location: Location,
    image_url: Option<String>,
    reporter: Option<ReporterId>,
}

impl ValidatedIssueDraft {
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn image_url(&self) -> Option<&str> {
        self.image_url.as_deref()
    }

    pub fn reporter(&self) -> Option<&ReporterId> {
        self.reporter.as_ref()
    }
}

pub fn validate(raw: RawSubmission) -> Result<ValidatedIssueDraft> {
    let title = raw.title.trim();
    if title.is_empty() {
        return Err(CivicError::MissingField("title"));
    }
    let description = raw.description.trim();
    if description.is_empty() {
        return Err(CivicError::MissingField("description"));
    }

    let category: Category = raw.category.parse().map_err(CivicError::InvalidCategory)?;

    let location = validate_location(raw.latitude, raw.longitude, raw.address.as_deref())?;
    let image_url = validate_image_reference(raw.image_url.as_deref())?;
    let reporter = raw.reporter.as_deref().and_then(ReporterId::new);

    Ok(ValidatedIssueDraft {
        title: title.to_string(),
        description: description.to_string(),
        category,
        location,
        image_url,
        reporter,
    })
}

fn validate_location(
    latitude: Option<f64>,
    longitude: Option<f64>,
    address: Option<&str>,
) -> Result<Location> {
    let coordinates = match (latitude, longitude) {
        (Some(latitude), Some(longitude)) => {
            let coords = Coordinates {
                latitude,
                longitude,
            };
            if !coords.is_valid() {
                return Err(CivicError::InvalidLocation(format!(
                    "coordinates ({}, {}) out of range",
                    latitude, longitude
                )));
            }
            Some(coords)
        }
        (None, None) => None,
        (Some(_), None) => {
            return Err(CivicError::InvalidLocation(
                "latitude given without longitude".to_string(),
            ))
        }
        (None, Some(_)) => {
            return Err(CivicError::InvalidLocation(
                "longitude given without latitude".to_string(),
            ))
        }
    };

    let address = address
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(str::to_string);

    if address.is_none() && coordinates.is_none() {
        return Err(CivicError::InvalidLocation(
            "an address or coordinates are required".to_string(),
        ));
    }

    Ok(Location {
        address,
        coordinates,
    })
}

/// Syntax only; the referenced blob is never fetched.
fn validate_image_reference(raw: Option<&str>) -> Result<Option<String>> {
    let Some(reference) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
        return Ok(None);
    };

    let acceptable = if reference.starts_with('/') {
        !reference.starts_with("//") && !reference.chars().any(char::is_whitespace)
    } else {
        match url::Url::parse(reference) {
            Ok(parsed) => matches!(parsed.scheme(), "http" | "https") && parsed.has_host(),
            Err(_) => false,
        }
    };

    if acceptable {
        Ok(Some(reference.to_string()))
    } else {
        Err(CivicError::InvalidImageReference(reference.to_string()))
    }
}
