use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IssueId(pub i64);

impl fmt::Display for IssueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for IssueId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().trim_start_matches('#').parse().map(IssueId)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReporterId(String);

impl ReporterId {
    /// Returns `None` for a blank identity.
    pub fn new(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(ReporterId(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReporterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Potholes,
    Streetlights,
    Garbage,
    Water,
    Traffic,
    Other,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Potholes,
        Category::Streetlights,
        Category::Garbage,
        Category::Water,
        Category::Traffic,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Potholes => "Potholes",
            Category::Streetlights => "Streetlights",
            Category::Garbage => "Garbage",
            Category::Water => "Water",
            Category::Traffic => "Traffic",
            Category::Other => "Other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| s.to_string())
    }
}

/// Lifecycle state of an issue. `Pending` is initial, `Resolved` terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Pending,
    InProgress,
    Resolved,
}

impl Status {
    pub const ALL: [Status; 3] = [Status::Pending, Status::InProgress, Status::Resolved];

    /// Key used in storage and on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pending => "pending",
            Status::InProgress => "in_progress",
            Status::Resolved => "resolved",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Status::Pending => "Pending",
            Status::InProgress => "In Progress",
            Status::Resolved => "Resolved",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, ' ' | '_' | '-'))
            .collect::<String>()
            .to_lowercase();
        match key.as_str() {
            // Legacy records carry "Open" for a freshly reported issue.
            "pending" | "open" => Ok(Status::Pending),
            "inprogress" => Ok(Status::InProgress),
            "resolved" => Ok(Status::Resolved),
            _ => Err(s.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Location {
    pub address: Option<String>,
    pub coordinates: Option<Coordinates>,
}

impl Location {
    /// Address when known, otherwise the coordinate pair.
    pub fn describe(&self) -> String {
        match (&self.address, &self.coordinates) {
            (Some(address), _) => address.clone(),
            (None, Some(c)) => format!("{:.5}, {:.5}", c.latitude, c.longitude),
            (None, None) => "(unknown)".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub id: IssueId,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub status: Status,
    pub location: Location,
    pub image_url: Option<String>,
    pub reporter: Option<ReporterId>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub issue_id: IssueId,
    pub seq: u32,
    pub timestamp: DateTime<Utc>,
    pub action: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityDraft {
    pub action: String,
    pub description: String,
}

impl ActivityDraft {
    pub fn new(action: impl Into<String>, description: impl Into<String>) -> Self {
        ActivityDraft {
            action: action.into(),
            description: description.into(),
        }
    }

    /// First entry of every timeline.
    pub fn reported() -> Self {
        ActivityDraft::new("Reported", "Issue reported and submitted to the system")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_status_parses_labels_and_keys() {
        assert_eq!("Pending".parse::<Status>(), Ok(Status::Pending));
        assert_eq!("In Progress".parse::<Status>(), Ok(Status::InProgress));
        assert_eq!("in_progress".parse::<Status>(), Ok(Status::InProgress));
        assert_eq!("in-progress".parse::<Status>(), Ok(Status::InProgress));
        assert_eq!("RESOLVED".parse::<Status>(), Ok(Status::Resolved));
    }

    #[test]
    fn test_open_folds_into_pending() {
        assert_eq!("Open".parse::<Status>(), Ok(Status::Pending));
    }

    #[test]
    fn test_unknown_status_rejected() {
        assert!("closed".parse::<Status>().is_err());
        assert!("".parse::<Status>().is_err());
    }

    #[test]
    fn test_category_parse_is_case_insensitive() {
        assert_eq!("potholes".parse::<Category>(), Ok(Category::Potholes));
        assert_eq!(" Streetlights ".parse::<Category>(), Ok(Category::Streetlights));
        assert_eq!("Roads".parse::<Category>(), Err("Roads".to_string()));
    }

    #[test]
    fn test_status_serde_uses_storage_keys() {
        let json = serde_json::to_string(&Status::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
        let back: Status = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Status::InProgress);
    }

    #[test]
    fn test_issue_id_accepts_hash_prefix() {
        assert_eq!("#12".parse::<IssueId>(), Ok(IssueId(12)));
        assert_eq!("7".parse::<IssueId>(), Ok(IssueId(7)));
        assert!("seven".parse::<IssueId>().is_err());
    }

    #[test]
    fn test_blank_reporter_is_anonymous() {
        assert!(ReporterId::new("   ").is_none());
        assert_eq!(ReporterId::new(" user-1 ").unwrap().as_str(), "user-1");
    }

    #[test]
    fn test_location_describe_prefers_address() {
        let loc = Location {
            address: Some("Oak Avenue".into()),
            coordinates: Some(Coordinates {
                latitude: 1.0,
                longitude: 2.0,
            }),
        };
        assert_eq!(loc.describe(), "Oak Avenue");

        let loc = Location {
            address: None,
            coordinates: Some(Coordinates {
                latitude: 12.5,
                longitude: -3.25,
            }),
        };
        assert_eq!(loc.describe(), "12.50000, -3.25000");
    }

    proptest! {
        #[test]
        fn prop_status_key_roundtrip(idx in 0usize..3) {
            let status = Status::ALL[idx];
            prop_assert_eq!(status.as_str().parse::<Status>(), Ok(status));
            prop_assert_eq!(status.label().parse::<Status>(), Ok(status));
        }

        #[test]
        fn prop_coordinates_in_range_are_valid(lat in -90.0f64..=90.0, lon in -180.0f64..=180.0) {
            let c = Coordinates { latitude: lat, longitude: lon };
            prop_assert!(c.is_valid());
        }

        #[test]
        fn prop_latitude_out_of_range_invalid(lat in 90.0001f64..1000.0, lon in -180.0f64..=180.0) {
            let north = Coordinates { latitude: lat, longitude: lon };
            let south = Coordinates { latitude: -lat, longitude: lon };
            prop_assert!(!north.is_valid());
            prop_assert!(!south.is_valid());
        }
    }
}
