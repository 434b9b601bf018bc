//! Multi-day trip with day-by-day schedule, packing list and sharing state.

use serde::{Deserialize, Serialize};

use crate::types::{new_record_id, RecordId, Timestamp, UserId};

/// Record type name used by both remote stores.
pub const TRAVEL_PLAN_RECORD_TYPE: &str = "TravelPlan";

/// A multi-day trip.
#[derive(Debug, Clone, PartialEq)]
pub struct TravelPlan {
    /// Assigned by the backend on first save.
    pub id: Option<RecordId>,
    pub title: String,
    pub destination: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub start_date: Timestamp,
    pub end_date: Timestamp,
    pub local_image_file_name: Option<String>,
    /// Hex card color, e.g. `#FF7A59`.
    pub card_color: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub user_id: UserId,
    pub schedules: Vec<DaySchedule>,
    pub packing_items: Vec<PackingItem>,

    // Sharing sub-state. A shared plan lives in the shared collection.
    pub is_shared: bool,
    pub share_code: Option<String>,
    pub shared_with: Vec<UserId>,
    pub owner_id: Option<UserId>,
    pub last_edited_by: Option<UserId>,
}

impl TravelPlan {
    /// A new, unsaved, private plan.
    pub fn new(
        title: impl Into<String>,
        destination: impl Into<String>,
        start_date: Timestamp,
        end_date: Timestamp,
        user_id: impl Into<UserId>,
    ) -> Self {
        let now = chrono::Utc::now();
        Self {
            id: None,
            title: title.into(),
            destination: destination.into(),
            latitude: None,
            longitude: None,
            start_date,
            end_date,
            local_image_file_name: None,
            card_color: None,
            created_at: now,
            updated_at: now,
            user_id: user_id.into(),
            schedules: Vec::new(),
            packing_items: Vec::new(),
            is_shared: false,
            share_code: None,
            shared_with: Vec::new(),
            owner_id: None,
            last_edited_by: None,
        }
    }

    /// Both coordinates, when the destination has been geocoded.
    pub fn coordinate(&self) -> Option<(f64, f64)> {
        self.latitude.zip(self.longitude)
    }

    /// Stamp an edit: bumps `updated_at` and records the editor.
    pub fn touch(&mut self, editor: &str) {
        self.updated_at = chrono::Utc::now();
        self.last_edited_by = Some(editor.to_string());
    }

    /// Inclusive number of calendar days covered by the trip.
    ///
    /// Returns 0 when the end date precedes the start date.
    pub fn duration_days(&self) -> i64 {
        let days = (self.end_date.date_naive() - self.start_date.date_naive()).num_days();
        if days < 0 {
            0
        } else {
            days + 1
        }
    }

    /// The sharing owner, falling back to the record's user for plans
    /// saved before sharing existed.
    pub fn owner(&self) -> &str {
        self.owner_id.as_deref().unwrap_or(&self.user_id)
    }
}

/// One day of a trip with its ordered items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DaySchedule {
    #[serde(default = "new_record_id")]
    pub id: String,
    pub day_number: i64,
    pub date: Timestamp,
    #[serde(default)]
    pub items: Vec<ScheduleItem>,
}

impl DaySchedule {
    pub fn new(day_number: i64, date: Timestamp) -> Self {
        Self {
            id: new_record_id(),
            day_number,
            date,
            items: Vec::new(),
        }
    }
}

/// A timed entry inside a [`DaySchedule`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleItem {
    #[serde(default = "new_record_id")]
    pub id: String,
    pub time: Timestamp,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
}

impl ScheduleItem {
    pub fn new(time: Timestamp, title: impl Into<String>) -> Self {
        Self {
            id: new_record_id(),
            time,
            title: title.into(),
            location: None,
            notes: None,
            latitude: None,
            longitude: None,
            cost: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackingItem {
    #[serde(default = "new_record_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub is_checked: bool,
}

impl PackingItem {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: new_record_id(),
            name: name.into(),
            is_checked: false,
        }
    }
}

/// Merge two plan lists by id, keeping first-seen order. On collision the
/// later entry replaces the earlier one.
pub fn merge_by_id(first: Vec<TravelPlan>, second: Vec<TravelPlan>) -> Vec<TravelPlan> {
    let mut merged: Vec<TravelPlan> = Vec::with_capacity(first.len() + second.len());
    for plan in first.into_iter().chain(second) {
        let existing = plan
            .id
            .as_deref()
            .and_then(|id| merged.iter().position(|p| p.id.as_deref() == Some(id)));
        match existing {
            Some(index) => merged[index] = plan,
            None => merged.push(plan),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn date(day: u32) -> Timestamp {
        chrono::Utc.with_ymd_and_hms(2025, 4, day, 9, 0, 0).unwrap()
    }

    #[test]
    fn duration_is_inclusive() {
        let plan = TravelPlan::new("Kyoto", "Kyoto", date(1), date(3), "u1");
        assert_eq!(plan.duration_days(), 3);
    }

    #[test]
    fn duration_of_inverted_range_is_zero() {
        let plan = TravelPlan::new("Kyoto", "Kyoto", date(5), date(3), "u1");
        assert_eq!(plan.duration_days(), 0);
    }

    #[test]
    fn touch_records_editor() {
        let mut plan = TravelPlan::new("Kyoto", "Kyoto", date(1), date(3), "u1");
        let before = plan.updated_at;
        plan.touch("u2");
        assert_eq!(plan.last_edited_by.as_deref(), Some("u2"));
        assert!(plan.updated_at >= before);
    }

    #[test]
    fn owner_falls_back_to_user() {
        let mut plan = TravelPlan::new("Kyoto", "Kyoto", date(1), date(3), "u1");
        assert_eq!(plan.owner(), "u1");
        plan.owner_id = Some("u7".into());
        assert_eq!(plan.owner(), "u7");
    }

    #[test]
    fn merge_keeps_one_entry_per_id() {
        let with_id = |id: &str, title: &str| {
            let mut plan = TravelPlan::new(title, "Tokyo", date(1), date(2), "u1");
            plan.id = Some(id.to_string());
            plan
        };
        let merged = merge_by_id(
            vec![with_id("a", "owned"), with_id("b", "owned")],
            vec![with_id("b", "shared"), with_id("c", "shared")],
        );
        let ids: Vec<_> = merged.iter().filter_map(|p| p.id.as_deref()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
        assert_eq!(merged[1].title, "shared");
    }

    #[test]
    fn schedule_item_json_omits_absent_optionals() {
        let item = ScheduleItem::new(date(1), "Fushimi Inari");
        let json = serde_json::to_value(&item).unwrap();
        let obj = json.as_object().unwrap();
        assert!(!obj.contains_key("cost"));
        assert!(!obj.contains_key("location"));
        assert_eq!(obj["title"], "Fushimi Inari");
    }
}
