//! Entity <-> [`Record`] mapping.
//!
//! Optional fields are omitted when absent. Nested lists are JSON-encoded
//! into single string fields with ISO-8601 dates.

use gotravel_core::color::normalize_hex;
use gotravel_core::error::{CoreError, DecodeError};
use gotravel_core::model::{
    DaySchedule, PackingItem, Plan, PlanScheduleItem, PlanType, PlaceCategory, PlannedPlace,
    TravelPlan, VisitedPlace, PLAN_RECORD_TYPE, TRAVEL_PLAN_RECORD_TYPE,
    VISITED_PLACE_RECORD_TYPE,
};
use gotravel_core::types::Timestamp;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::record::Record;

/// Field names shared by encode and decode.
pub mod fields {
    pub const TITLE: &str = "title";
    pub const DESTINATION: &str = "destination";
    pub const LATITUDE: &str = "latitude";
    pub const LONGITUDE: &str = "longitude";
    pub const START_DATE: &str = "startDate";
    pub const END_DATE: &str = "endDate";
    pub const CREATED_AT: &str = "createdAt";
    pub const UPDATED_AT: &str = "updatedAt";
    pub const USER_ID: &str = "userId";
    pub const CARD_COLOR: &str = "cardColor";
    pub const LOCAL_IMAGE_FILE_NAME: &str = "localImageFileName";
    pub const SCHEDULES: &str = "schedules";
    pub const PACKING_ITEMS: &str = "packingItems";
    pub const IS_SHARED: &str = "isShared";
    pub const SHARE_CODE: &str = "shareCode";
    pub const SHARED_WITH: &str = "sharedWith";
    pub const OWNER_ID: &str = "ownerId";
    pub const LAST_EDITED_BY: &str = "lastEditedBy";
    pub const IMAGE: &str = "image";

    pub const TIME: &str = "time";
    pub const DESCRIPTION: &str = "description";
    pub const LINK_URL: &str = "linkURL";
    pub const PLAN_TYPE: &str = "planType";
    pub const PLACES: &str = "places";
    pub const SCHEDULE_ITEMS: &str = "scheduleItems";

    pub const NOTES: &str = "notes";
    pub const VISITED_AT: &str = "visitedAt";
    pub const PHOTO_URL: &str = "photoURL";
    pub const LOCAL_PHOTO_FILE_NAME: &str = "localPhotoFileName";
    pub const ADDRESS: &str = "address";
    pub const TAGS: &str = "tags";
    pub const CATEGORY: &str = "category";
    pub const TRAVEL_PLAN_ID: &str = "travelPlanId";
    pub const PHOTO: &str = "photo";
}

// ---------------------------------------------------------------------------
// Nested list helpers
// ---------------------------------------------------------------------------

fn encode_list<T: Serialize>(record: &mut Record, key: &str, items: &[T]) -> Result<(), CoreError> {
    let json = serde_json::to_string(items)
        .map_err(|e| CoreError::InvalidPayload(format!("Failed to encode {key}: {e}")))?;
    record.set(key, json);
    Ok(())
}

/// Absent list fields decode as empty; present but unparsable ones fail.
fn decode_list<T: DeserializeOwned>(
    record: &Record,
    record_type: &'static str,
    key: &str,
) -> Result<Vec<T>, DecodeError> {
    match record.get(key) {
        None => Ok(Vec::new()),
        Some(_) => {
            let json = record
                .string(key)
                .ok_or_else(|| DecodeError::missing(record_type, key))?;
            serde_json::from_str(json)
                .map_err(|e| DecodeError::invalid(record_type, format!("{key}: {e}")))
        }
    }
}

fn required_string(
    record: &Record,
    record_type: &'static str,
    key: &str,
) -> Result<String, DecodeError> {
    record
        .string(key)
        .map(str::to_string)
        .ok_or_else(|| DecodeError::missing(record_type, key))
}

fn required_date(
    record: &Record,
    record_type: &'static str,
    key: &str,
) -> Result<Timestamp, DecodeError> {
    record
        .date(key)
        .ok_or_else(|| DecodeError::missing(record_type, key))
}

fn optional_string(record: &Record, key: &str) -> Option<String> {
    record.string(key).map(str::to_string)
}

// ---------------------------------------------------------------------------
// TravelPlan
// ---------------------------------------------------------------------------

/// Build the record for `plan` under `id`. The cover image asset is
/// attached separately by the store.
pub fn encode_travel_plan(plan: &TravelPlan, id: &str) -> Result<Record, CoreError> {
    use fields::*;

    let mut record = Record::new(TRAVEL_PLAN_RECORD_TYPE, id);
    record.set(TITLE, plan.title.as_str());
    record.set(DESTINATION, plan.destination.as_str());
    record.set_opt(LATITUDE, plan.latitude);
    record.set_opt(LONGITUDE, plan.longitude);
    record.set(START_DATE, plan.start_date);
    record.set(END_DATE, plan.end_date);
    record.set(CREATED_AT, plan.created_at);
    record.set(UPDATED_AT, plan.updated_at);
    record.set(USER_ID, plan.user_id.as_str());
    record.set_opt(CARD_COLOR, plan.card_color.as_deref());
    record.set_opt(LOCAL_IMAGE_FILE_NAME, plan.local_image_file_name.as_deref());
    encode_list(&mut record, SCHEDULES, &plan.schedules)?;
    encode_list(&mut record, PACKING_ITEMS, &plan.packing_items)?;

    record.set(IS_SHARED, plan.is_shared);
    record.set_opt(SHARE_CODE, plan.share_code.as_deref());
    if !plan.shared_with.is_empty() {
        record.set(SHARED_WITH, plan.shared_with.clone());
    }
    record.set_opt(OWNER_ID, plan.owner_id.as_deref());
    record.set_opt(LAST_EDITED_BY, plan.last_edited_by.as_deref());
    Ok(record)
}

/// Sharing fields are optional in the remote schema and default to a
/// private, unshared plan.
pub fn decode_travel_plan(record: &Record) -> Result<TravelPlan, DecodeError> {
    use fields::*;
    const RT: &str = TRAVEL_PLAN_RECORD_TYPE;

    let title = required_string(record, RT, TITLE)?;
    let start_date = required_date(record, RT, START_DATE)?;
    let end_date = required_date(record, RT, END_DATE)?;
    let created_at = record.date(CREATED_AT).unwrap_or(start_date);
    let schedules: Vec<DaySchedule> = decode_list(record, RT, SCHEDULES)?;
    let packing_items: Vec<PackingItem> = decode_list(record, RT, PACKING_ITEMS)?;

    Ok(TravelPlan {
        id: Some(record.id.clone()),
        title,
        destination: optional_string(record, DESTINATION).unwrap_or_default(),
        latitude: record.double(LATITUDE),
        longitude: record.double(LONGITUDE),
        start_date,
        end_date,
        local_image_file_name: optional_string(record, LOCAL_IMAGE_FILE_NAME),
        card_color: record.string(CARD_COLOR).and_then(normalize_hex),
        created_at,
        updated_at: record.date(UPDATED_AT).unwrap_or(created_at),
        user_id: optional_string(record, USER_ID).unwrap_or_default(),
        schedules,
        packing_items,
        is_shared: record.bool(IS_SHARED).unwrap_or(false),
        share_code: optional_string(record, SHARE_CODE),
        shared_with: record.string_list(SHARED_WITH).map(<[String]>::to_vec).unwrap_or_default(),
        owner_id: optional_string(record, OWNER_ID),
        last_edited_by: optional_string(record, LAST_EDITED_BY),
    })
}

// ---------------------------------------------------------------------------
// Plan
// ---------------------------------------------------------------------------

pub fn encode_plan(plan: &Plan) -> Result<Record, CoreError> {
    use fields::*;

    let mut record = Record::new(PLAN_RECORD_TYPE, plan.id.as_str());
    record.set(TITLE, plan.title.as_str());
    record.set(START_DATE, plan.start_date);
    record.set(END_DATE, plan.end_date);
    record.set_opt(TIME, plan.time);
    record.set_opt(DESCRIPTION, plan.description.as_deref());
    record.set_opt(LINK_URL, plan.link_url.as_deref());
    record.set(PLAN_TYPE, plan.plan_type.as_str());
    record.set_opt(LOCAL_IMAGE_FILE_NAME, plan.local_image_file_name.as_deref());
    record.set_opt(CARD_COLOR, plan.card_color.as_deref());
    record.set(CREATED_AT, plan.created_at);
    record.set(USER_ID, plan.user_id.as_str());
    encode_list(&mut record, PLACES, &plan.places)?;
    encode_list(&mut record, SCHEDULE_ITEMS, &plan.schedule_items)?;
    Ok(record)
}

pub fn decode_plan(record: &Record) -> Result<Plan, DecodeError> {
    use fields::*;
    const RT: &str = PLAN_RECORD_TYPE;

    let title = required_string(record, RT, TITLE)?;
    let start_date = required_date(record, RT, START_DATE)?;
    let end_date = required_date(record, RT, END_DATE)?;
    let places: Vec<PlannedPlace> = decode_list(record, RT, PLACES)?;
    let schedule_items: Vec<PlanScheduleItem> = decode_list(record, RT, SCHEDULE_ITEMS)?;

    Ok(Plan {
        id: record.id.clone(),
        title,
        start_date,
        end_date,
        time: record.date(TIME),
        description: optional_string(record, DESCRIPTION),
        link_url: optional_string(record, LINK_URL),
        plan_type: PlanType::from_str_or_default(record.string(PLAN_TYPE)),
        local_image_file_name: optional_string(record, LOCAL_IMAGE_FILE_NAME),
        card_color: record.string(CARD_COLOR).and_then(normalize_hex),
        created_at: record.date(CREATED_AT).unwrap_or(start_date),
        user_id: optional_string(record, USER_ID).unwrap_or_default(),
        places,
        schedule_items,
    })
}

// ---------------------------------------------------------------------------
// VisitedPlace
// ---------------------------------------------------------------------------

pub fn encode_visited_place(place: &VisitedPlace) -> Record {
    use fields::*;

    let mut record = Record::new(VISITED_PLACE_RECORD_TYPE, place.id.as_str());
    record.set(TITLE, place.title.as_str());
    record.set_opt(NOTES, place.notes.as_deref());
    record.set(LATITUDE, place.latitude);
    record.set(LONGITUDE, place.longitude);
    record.set(CREATED_AT, place.created_at);
    record.set_opt(VISITED_AT, place.visited_at);
    record.set_opt(PHOTO_URL, place.photo_url.as_deref());
    record.set_opt(LOCAL_PHOTO_FILE_NAME, place.local_photo_file_name.as_deref());
    record.set_opt(ADDRESS, place.address.as_deref());
    record.set_opt(TAGS, place.tags.clone());
    record.set(CATEGORY, place.category.as_str());
    record.set_opt(TRAVEL_PLAN_ID, place.travel_plan_id.as_deref());
    record.set(USER_ID, place.user_id.as_str());
    record
}

pub fn decode_visited_place(record: &Record) -> Result<VisitedPlace, DecodeError> {
    use fields::*;
    const RT: &str = VISITED_PLACE_RECORD_TYPE;

    let title = required_string(record, RT, TITLE)?;
    let created_at = required_date(record, RT, CREATED_AT)?;

    Ok(VisitedPlace {
        id: record.id.clone(),
        title,
        notes: optional_string(record, NOTES),
        latitude: record.double(LATITUDE).unwrap_or(0.0),
        longitude: record.double(LONGITUDE).unwrap_or(0.0),
        created_at,
        visited_at: record.date(VISITED_AT),
        photo_url: optional_string(record, PHOTO_URL),
        local_photo_file_name: optional_string(record, LOCAL_PHOTO_FILE_NAME),
        address: optional_string(record, ADDRESS),
        tags: record.string_list(TAGS).map(<[String]>::to_vec),
        category: PlaceCategory::from_str_or_default(record.string(CATEGORY)),
        travel_plan_id: optional_string(record, TRAVEL_PLAN_ID),
        user_id: optional_string(record, USER_ID).unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use gotravel_core::model::ScheduleItem;

    use super::*;

    fn at(day: u32, hour: u32) -> Timestamp {
        chrono::Utc.with_ymd_and_hms(2025, 10, day, hour, 30, 0).unwrap()
    }

    fn plan_with_schedules() -> TravelPlan {
        let mut plan = TravelPlan::new("Hokkaido", "Sapporo", at(1, 0), at(2, 0), "u1");
        for day in 1..=2u32 {
            let mut schedule = DaySchedule::new(i64::from(day), at(day, 0));
            for n in 0..3u32 {
                let mut item = ScheduleItem::new(at(day, 8 + n), format!("Stop {n}"));
                if n != 1 {
                    item.cost = Some(1200.0 * f64::from(n + 1));
                }
                if n != 2 {
                    item.location = Some(format!("Place {day}-{n}"));
                }
                if n == 0 {
                    item.notes = Some("Book ahead".into());
                }
                schedule.items.push(item);
            }
            plan.schedules.push(schedule);
        }
        plan.packing_items.push(PackingItem::new("Passport"));
        plan
    }

    #[test]
    fn nested_lists_round_trip_through_json_fields() {
        let plan = plan_with_schedules();
        let record = encode_travel_plan(&plan, "t1").unwrap();

        assert!(record.string(fields::SCHEDULES).is_some());
        let decoded = decode_travel_plan(&record).unwrap();

        assert_eq!(decoded.schedules.len(), 2);
        assert!(decoded.schedules.iter().all(|d| d.items.len() == 3));
        assert_eq!(decoded.schedules, plan.schedules);
        assert_eq!(decoded.packing_items, plan.packing_items);
    }

    #[test]
    fn encode_omits_absent_optionals() {
        let plan = TravelPlan::new("Trip", "Osaka", at(1, 0), at(3, 0), "u1");
        let record = encode_travel_plan(&plan, "t1").unwrap();
        for key in [
            fields::LATITUDE,
            fields::LONGITUDE,
            fields::CARD_COLOR,
            fields::SHARE_CODE,
            fields::SHARED_WITH,
            fields::OWNER_ID,
            fields::LAST_EDITED_BY,
        ] {
            assert!(record.get(key).is_none(), "{key} should be omitted");
        }
    }

    #[test]
    fn missing_sharing_fields_default_to_private() {
        let mut record = Record::new(TRAVEL_PLAN_RECORD_TYPE, "legacy");
        record.set(fields::TITLE, "Legacy trip");
        record.set(fields::START_DATE, at(1, 0));
        record.set(fields::END_DATE, at(2, 0));

        let plan = decode_travel_plan(&record).unwrap();
        assert!(!plan.is_shared);
        assert!(plan.shared_with.is_empty());
        assert!(plan.share_code.is_none());
        assert!(plan.owner_id.is_none());
        assert!(plan.last_edited_by.is_none());
        assert_eq!(plan.destination, "");
        assert!(plan.coordinate().is_none());
    }

    #[test]
    fn missing_title_fails_decode() {
        let mut record = Record::new(TRAVEL_PLAN_RECORD_TYPE, "bad");
        record.set(fields::START_DATE, at(1, 0));
        record.set(fields::END_DATE, at(2, 0));
        let err = decode_travel_plan(&record).unwrap_err();
        assert_eq!(err.record_type, TRAVEL_PLAN_RECORD_TYPE);
    }

    #[test]
    fn corrupt_nested_json_fails_decode() {
        let mut record = encode_travel_plan(&plan_with_schedules(), "t1").unwrap();
        record.set(fields::SCHEDULES, "{not json");
        assert!(decode_travel_plan(&record).is_err());
    }

    #[test]
    fn plan_without_type_is_outing() {
        let now = at(5, 0);
        let mut record = encode_plan(&Plan::new("Cafe", now, now, PlanType::Daily, "u1")).unwrap();
        record.fields.remove(fields::PLAN_TYPE);
        assert_eq!(decode_plan(&record).unwrap().plan_type, PlanType::Outing);
    }

    #[test]
    fn visited_place_defaults() {
        let mut record = Record::new(VISITED_PLACE_RECORD_TYPE, "v1");
        record.set(fields::TITLE, "Shrine");
        record.set(fields::CREATED_AT, at(1, 0));
        record.set(fields::CATEGORY, "not_a_real_category");

        let place = decode_visited_place(&record).unwrap();
        assert_eq!(place.category, PlaceCategory::Other);
        assert_eq!((place.latitude, place.longitude), (0.0, 0.0));
        assert!(place.tags.is_none());
    }

    #[test]
    fn card_color_is_canonicalized() {
        let mut plan = TravelPlan::new("Trip", "Nara", at(1, 0), at(1, 0), "u1");
        plan.card_color = Some("#ff7a59".into());
        let record = encode_travel_plan(&plan, "t1").unwrap();
        assert_eq!(decode_travel_plan(&record).unwrap().card_color.as_deref(), Some("#FF7A59"));
    }
}
