//! Lightweight single-event plan ("outing" or "daily").

use serde::{Deserialize, Serialize};

use crate::types::{new_record_id, RecordId, Timestamp, UserId};

pub const PLAN_RECORD_TYPE: &str = "Plan";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanType {
    #[default]
    Outing,
    Daily,
}

impl PlanType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Outing => "outing",
            Self::Daily => "daily",
        }
    }

    /// Parse a stored value, falling back to [`PlanType::Outing`] for
    /// anything unrecognised.
    pub fn from_str_or_default(s: Option<&str>) -> Self {
        match s {
            Some("daily") => Self::Daily,
            _ => Self::Outing,
        }
    }
}

impl std::fmt::Display for PlanType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    pub id: RecordId,
    pub title: String,
    pub start_date: Timestamp,
    pub end_date: Timestamp,
    /// Time of day the plan starts, if set.
    pub time: Option<Timestamp>,
    pub description: Option<String>,
    pub link_url: Option<String>,
    pub plan_type: PlanType,
    pub local_image_file_name: Option<String>,
    pub card_color: Option<String>,
    pub created_at: Timestamp,
    pub user_id: UserId,
    pub places: Vec<PlannedPlace>,
    pub schedule_items: Vec<PlanScheduleItem>,
}

impl Plan {
    pub fn new(
        title: impl Into<String>,
        start_date: Timestamp,
        end_date: Timestamp,
        plan_type: PlanType,
        user_id: impl Into<UserId>,
    ) -> Self {
        Self {
            id: new_record_id(),
            title: title.into(),
            start_date,
            end_date,
            time: None,
            description: None,
            link_url: None,
            plan_type,
            local_image_file_name: None,
            card_color: None,
            created_at: chrono::Utc::now(),
            user_id: user_id.into(),
            places: Vec::new(),
            schedule_items: Vec::new(),
        }
    }

    /// Resolve the place a schedule item points at. The reference is not
    /// enforced, so a dangling id yields `None`.
    pub fn place_for(&self, item: &PlanScheduleItem) -> Option<&PlannedPlace> {
        let place_id = item.place_id.as_deref()?;
        self.places.iter().find(|p| p.id == place_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedPlace {
    #[serde(default = "new_record_id")]
    pub id: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl PlannedPlace {
    pub fn new(name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            id: new_record_id(),
            name: name.into(),
            latitude,
            longitude,
            address: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanScheduleItem {
    #[serde(default = "new_record_id")]
    pub id: String,
    pub time: Timestamp,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl PlanScheduleItem {
    pub fn new(time: Timestamp, title: impl Into<String>) -> Self {
        Self {
            id: new_record_id(),
            time,
            title: title.into(),
            place_id: None,
            note: None,
        }
    }
}
