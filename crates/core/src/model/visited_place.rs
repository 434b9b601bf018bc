//! A pinned memory on the map.

use serde::{Deserialize, Serialize};

use crate::types::{new_record_id, RecordId, Timestamp, UserId};

pub const VISITED_PLACE_RECORD_TYPE: &str = "VisitedPlace";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaceCategory {
    Restaurant,
    Hotel,
    Sightseeing,
    Shopping,
    Nature,
    Activity,
    #[default]
    Other,
}

impl PlaceCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Restaurant => "restaurant",
            Self::Hotel => "hotel",
            Self::Sightseeing => "sightseeing",
            Self::Shopping => "shopping",
            Self::Nature => "nature",
            Self::Activity => "activity",
            Self::Other => "other",
        }
    }

    /// Parse a stored value; missing or unknown values become
    /// [`PlaceCategory::Other`].
    pub fn from_str_or_default(s: Option<&str>) -> Self {
        match s {
            Some("restaurant") => Self::Restaurant,
            Some("hotel") => Self::Hotel,
            Some("sightseeing") => Self::Sightseeing,
            Some("shopping") => Self::Shopping,
            Some("nature") => Self::Nature,
            Some("activity") => Self::Activity,
            _ => Self::Other,
        }
    }

    pub const ALL: &'static [&'static str] = &[
        "restaurant",
        "hotel",
        "sightseeing",
        "shopping",
        "nature",
        "activity",
        "other",
    ];
}

impl std::fmt::Display for PlaceCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VisitedPlace {
    pub id: RecordId,
    pub title: String,
    pub notes: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub created_at: Timestamp,
    pub visited_at: Option<Timestamp>,
    pub photo_url: Option<String>,
    pub local_photo_file_name: Option<String>,
    pub address: Option<String>,
    pub tags: Option<Vec<String>>,
    pub category: PlaceCategory,
    /// Informational link to a [`TravelPlan`](super::TravelPlan); not enforced.
    pub travel_plan_id: Option<RecordId>,
    pub user_id: UserId,
}

impl VisitedPlace {
    pub fn new(
        title: impl Into<String>,
        latitude: f64,
        longitude: f64,
        user_id: impl Into<UserId>,
    ) -> Self {
        Self {
            id: new_record_id(),
            title: title.into(),
            notes: None,
            latitude,
            longitude,
            created_at: chrono::Utc::now(),
            visited_at: None,
            photo_url: None,
            local_photo_file_name: None,
            address: None,
            tags: None,
            category: PlaceCategory::Other,
            travel_plan_id: None,
            user_id: user_id.into(),
        }
    }
}
