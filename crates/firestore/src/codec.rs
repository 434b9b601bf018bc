//! Entity <-> document field mapping.
//!
//! Absent optionals are never written. Nested lists are arrays of maps with
//! typed timestamps; a nested element missing its own required fields is
//! dropped rather than failing the whole document.

use gotravel_core::color::normalize_hex;
use gotravel_core::error::DecodeError;
use gotravel_core::model::{
    DaySchedule, PackingItem, Plan, PlanScheduleItem, PlanType, PlaceCategory, PlannedPlace,
    ScheduleItem, TravelPlan, VisitedPlace, PLAN_RECORD_TYPE, TRAVEL_PLAN_RECORD_TYPE,
    VISITED_PLACE_RECORD_TYPE,
};
use gotravel_core::types::new_record_id;

use crate::value::{Document, FieldReader, Fields, FieldsBuilder, Value};

/// Document field names.
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

    // Nested element keys
    pub const ID: &str = "id";
    pub const DAY_NUMBER: &str = "dayNumber";
    pub const DATE: &str = "date";
    pub const ITEMS: &str = "items";
    pub const LOCATION: &str = "location";
    pub const COST: &str = "cost";
    pub const NAME: &str = "name";
    pub const IS_CHECKED: &str = "isChecked";
    pub const PLACE_ID: &str = "placeId";
    pub const NOTE: &str = "note";
}

use fields::*;

fn map_array<T>(items: &[T], encode: impl Fn(&T) -> Fields) -> Value {
    Value::Array(items.iter().map(|item| Value::Map(encode(item))).collect())
}

/// Decode each nested map, dropping the ones that fail.
fn compact<'a, T>(
    readers: Vec<FieldReader<'a>>,
    decode: impl Fn(&FieldReader<'a>) -> Result<T, DecodeError>,
) -> Vec<T> {
    readers.iter().filter_map(|r| decode(r).ok()).collect()
}

fn nested_id(r: &FieldReader<'_>) -> String {
    r.owned_string(ID).unwrap_or_else(new_record_id)
}

/// Decode every document, logging and dropping the ones that fail.
pub(crate) fn decode_all<T>(
    documents: &[Document],
    decode: fn(&Document) -> Result<T, DecodeError>,
) -> Vec<T> {
    documents
        .iter()
        .filter_map(|document| match decode(document) {
            Ok(entity) => Some(entity),
            Err(e) => {
                tracing::warn!(document_id = %document.id, error = %e, "Dropping unreadable document");
                None
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// TravelPlan
// ---------------------------------------------------------------------------

fn encode_schedule_item(item: &ScheduleItem) -> Fields {
    FieldsBuilder::new()
        .set(ID, item.id.as_str())
        .set(TIME, item.time)
        .set(TITLE, item.title.as_str())
        .set_opt(LOCATION, item.location.as_deref())
        .set_opt(NOTES, item.notes.as_deref())
        .set_opt(LATITUDE, item.latitude)
        .set_opt(LONGITUDE, item.longitude)
        .set_opt(COST, item.cost)
        .build()
}

fn decode_schedule_item(r: &FieldReader<'_>) -> Result<ScheduleItem, DecodeError> {
    Ok(ScheduleItem {
        id: nested_id(r),
        time: r.required_timestamp(TIME)?,
        title: r.required_string(TITLE)?,
        location: r.owned_string(LOCATION),
        notes: r.owned_string(NOTES),
        latitude: r.double(LATITUDE),
        longitude: r.double(LONGITUDE),
        cost: r.double(COST),
    })
}

fn encode_day_schedule(day: &DaySchedule) -> Fields {
    FieldsBuilder::new()
        .set(ID, day.id.as_str())
        .set(DAY_NUMBER, day.day_number)
        .set(DATE, day.date)
        .set(ITEMS, map_array(&day.items, encode_schedule_item))
        .build()
}

fn decode_day_schedule(r: &FieldReader<'_>) -> Result<DaySchedule, DecodeError> {
    Ok(DaySchedule {
        id: nested_id(r),
        day_number: r.required_integer(DAY_NUMBER)?,
        date: r.required_timestamp(DATE)?,
        items: compact(r.map_array(ITEMS), decode_schedule_item),
    })
}

fn encode_packing_item(item: &PackingItem) -> Fields {
    FieldsBuilder::new()
        .set(ID, item.id.as_str())
        .set(NAME, item.name.as_str())
        .set(IS_CHECKED, item.is_checked)
        .build()
}

fn decode_packing_item(r: &FieldReader<'_>) -> Result<PackingItem, DecodeError> {
    Ok(PackingItem {
        id: nested_id(r),
        name: r.required_string(NAME)?,
        is_checked: r.bool(IS_CHECKED).unwrap_or(false),
    })
}

/// Fields for `plan`. The document id is carried separately.
///
/// `isShared` is always written; the other sharing fields only when set.
/// Shared plans always carry `sharedWith` so membership queries match.
pub fn encode_travel_plan(plan: &TravelPlan) -> Fields {
    let mut builder = FieldsBuilder::new()
        .set(TITLE, plan.title.as_str())
        .set(DESTINATION, plan.destination.as_str())
        .set_opt(LATITUDE, plan.latitude)
        .set_opt(LONGITUDE, plan.longitude)
        .set(START_DATE, plan.start_date)
        .set(END_DATE, plan.end_date)
        .set(CREATED_AT, plan.created_at)
        .set(UPDATED_AT, plan.updated_at)
        .set(USER_ID, plan.user_id.as_str())
        .set_opt(CARD_COLOR, plan.card_color.as_deref())
        .set_opt(LOCAL_IMAGE_FILE_NAME, plan.local_image_file_name.as_deref())
        .set(SCHEDULES, map_array(&plan.schedules, encode_day_schedule))
        .set(PACKING_ITEMS, map_array(&plan.packing_items, encode_packing_item))
        .set(IS_SHARED, plan.is_shared)
        .set_opt(SHARE_CODE, plan.share_code.as_deref())
        .set_opt(OWNER_ID, plan.owner_id.as_deref())
        .set_opt(LAST_EDITED_BY, plan.last_edited_by.as_deref());
    if plan.is_shared || !plan.shared_with.is_empty() {
        builder = builder.set(SHARED_WITH, plan.shared_with.clone());
    }
    builder.build()
}

pub fn decode_travel_plan(document: &Document) -> Result<TravelPlan, DecodeError> {
    let r = FieldReader::new(&document.fields, TRAVEL_PLAN_RECORD_TYPE);

    let title = r.required_string(TITLE)?;
    let start_date = r.required_timestamp(START_DATE)?;
    let end_date = r.required_timestamp(END_DATE)?;
    let created_at = r.timestamp(CREATED_AT).unwrap_or(start_date);

    Ok(TravelPlan {
        id: Some(document.id.clone()),
        title,
        destination: r.owned_string(DESTINATION).unwrap_or_default(),
        latitude: r.double(LATITUDE),
        longitude: r.double(LONGITUDE),
        start_date,
        end_date,
        local_image_file_name: r.owned_string(LOCAL_IMAGE_FILE_NAME),
        card_color: r.string(CARD_COLOR).and_then(normalize_hex),
        created_at,
        updated_at: r.timestamp(UPDATED_AT).unwrap_or(created_at),
        user_id: r.owned_string(USER_ID).unwrap_or_default(),
        schedules: compact(r.map_array(SCHEDULES), decode_day_schedule),
        packing_items: compact(r.map_array(PACKING_ITEMS), decode_packing_item),
        is_shared: r.bool(IS_SHARED).unwrap_or(false),
        share_code: r.owned_string(SHARE_CODE),
        shared_with: r.string_array(SHARED_WITH).unwrap_or_default(),
        owner_id: r.owned_string(OWNER_ID),
        last_edited_by: r.owned_string(LAST_EDITED_BY),
    })
}

// ---------------------------------------------------------------------------
// Plan
// ---------------------------------------------------------------------------

fn encode_planned_place(place: &PlannedPlace) -> Fields {
    FieldsBuilder::new()
        .set(ID, place.id.as_str())
        .set(NAME, place.name.as_str())
        .set(LATITUDE, place.latitude)
        .set(LONGITUDE, place.longitude)
        .set_opt(ADDRESS, place.address.as_deref())
        .build()
}

fn decode_planned_place(r: &FieldReader<'_>) -> Result<PlannedPlace, DecodeError> {
    Ok(PlannedPlace {
        id: nested_id(r),
        name: r.required_string(NAME)?,
        latitude: r.required_double(LATITUDE)?,
        longitude: r.required_double(LONGITUDE)?,
        address: r.owned_string(ADDRESS),
    })
}

fn encode_plan_schedule_item(item: &PlanScheduleItem) -> Fields {
    FieldsBuilder::new()
        .set(ID, item.id.as_str())
        .set(TIME, item.time)
        .set(TITLE, item.title.as_str())
        .set_opt(PLACE_ID, item.place_id.as_deref())
        .set_opt(NOTE, item.note.as_deref())
        .build()
}

fn decode_plan_schedule_item(r: &FieldReader<'_>) -> Result<PlanScheduleItem, DecodeError> {
    Ok(PlanScheduleItem {
        id: nested_id(r),
        time: r.required_timestamp(TIME)?,
        title: r.required_string(TITLE)?,
        place_id: r.owned_string(PLACE_ID),
        note: r.owned_string(NOTE),
    })
}

pub fn encode_plan(plan: &Plan) -> Fields {
    FieldsBuilder::new()
        .set(TITLE, plan.title.as_str())
        .set(START_DATE, plan.start_date)
        .set(END_DATE, plan.end_date)
        .set_opt(TIME, plan.time)
        .set_opt(DESCRIPTION, plan.description.as_deref())
        .set_opt(LINK_URL, plan.link_url.as_deref())
        .set(PLAN_TYPE, plan.plan_type.as_str())
        .set_opt(LOCAL_IMAGE_FILE_NAME, plan.local_image_file_name.as_deref())
        .set_opt(CARD_COLOR, plan.card_color.as_deref())
        .set(CREATED_AT, plan.created_at)
        .set(USER_ID, plan.user_id.as_str())
        .set(PLACES, map_array(&plan.places, encode_planned_place))
        .set(SCHEDULE_ITEMS, map_array(&plan.schedule_items, encode_plan_schedule_item))
        .build()
}

pub fn decode_plan(document: &Document) -> Result<Plan, DecodeError> {
    let r = FieldReader::new(&document.fields, PLAN_RECORD_TYPE);

    let title = r.required_string(TITLE)?;
    let start_date = r.required_timestamp(START_DATE)?;
    let end_date = r.required_timestamp(END_DATE)?;

    Ok(Plan {
        id: document.id.clone(),
        title,
        start_date,
        end_date,
        time: r.timestamp(TIME),
        description: r.owned_string(DESCRIPTION),
        link_url: r.owned_string(LINK_URL),
        plan_type: PlanType::from_str_or_default(r.string(PLAN_TYPE)),
        local_image_file_name: r.owned_string(LOCAL_IMAGE_FILE_NAME),
        card_color: r.string(CARD_COLOR).and_then(normalize_hex),
        created_at: r.timestamp(CREATED_AT).unwrap_or(start_date),
        user_id: r.owned_string(USER_ID).unwrap_or_default(),
        places: compact(r.map_array(PLACES), decode_planned_place),
        schedule_items: compact(r.map_array(SCHEDULE_ITEMS), decode_plan_schedule_item),
    })
}

// ---------------------------------------------------------------------------
// VisitedPlace
// ---------------------------------------------------------------------------

pub fn encode_visited_place(place: &VisitedPlace) -> Fields {
    FieldsBuilder::new()
        .set(TITLE, place.title.as_str())
        .set_opt(NOTES, place.notes.as_deref())
        .set(LATITUDE, place.latitude)
        .set(LONGITUDE, place.longitude)
        .set(CREATED_AT, place.created_at)
        .set_opt(VISITED_AT, place.visited_at)
        .set_opt(PHOTO_URL, place.photo_url.as_deref())
        .set_opt(LOCAL_PHOTO_FILE_NAME, place.local_photo_file_name.as_deref())
        .set_opt(ADDRESS, place.address.as_deref())
        .set_opt(TAGS, place.tags.clone())
        .set(CATEGORY, place.category.as_str())
        .set_opt(TRAVEL_PLAN_ID, place.travel_plan_id.as_deref())
        .set(USER_ID, place.user_id.as_str())
        .build()
}

pub fn decode_visited_place(document: &Document) -> Result<VisitedPlace, DecodeError> {
    let r = FieldReader::new(&document.fields, VISITED_PLACE_RECORD_TYPE);

    let title = r.required_string(TITLE)?;
    let created_at = r.required_timestamp(CREATED_AT)?;

    Ok(VisitedPlace {
        id: document.id.clone(),
        title,
        notes: r.owned_string(NOTES),
        latitude: r.double(LATITUDE).unwrap_or(0.0),
        longitude: r.double(LONGITUDE).unwrap_or(0.0),
        created_at,
        visited_at: r.timestamp(VISITED_AT),
        photo_url: r.owned_string(PHOTO_URL),
        local_photo_file_name: r.owned_string(LOCAL_PHOTO_FILE_NAME),
        address: r.owned_string(ADDRESS),
        tags: r.string_array(TAGS),
        category: PlaceCategory::from_str_or_default(r.string(CATEGORY)),
        travel_plan_id: r.owned_string(TRAVEL_PLAN_ID),
        user_id: r.owned_string(USER_ID).unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use gotravel_core::types::Timestamp;

    use super::*;

    fn at(day: u32, hour: u32) -> Timestamp {
        chrono::Utc.with_ymd_and_hms(2025, 11, day, hour, 0, 0).unwrap()
    }

    fn plan_with_two_days() -> TravelPlan {
        let mut plan = TravelPlan::new("Kyushu", "Fukuoka", at(3, 0), at(4, 0), "u1");
        for day in 1..=2u32 {
            let mut schedule = DaySchedule::new(i64::from(day), at(2 + day, 0));
            for n in 0..3u32 {
                let mut item = ScheduleItem::new(at(2 + day, 9 + n), format!("Stop {n}"));
                match n {
                    0 => item.cost = Some(800.0),
                    1 => item.location = Some("Tenjin".into()),
                    _ => {
                        item.latitude = Some(33.59);
                        item.longitude = Some(130.40);
                    }
                }
                schedule.items.push(item);
            }
            plan.schedules.push(schedule);
        }
        plan.packing_items.push(PackingItem::new("Umbrella"));
        plan
    }

    #[test]
    fn nested_lists_are_arrays_of_maps() {
        let plan = plan_with_two_days();
        let fields = encode_travel_plan(&plan);

        let Value::Array(days) = &fields[SCHEDULES] else {
            panic!("schedules should be an array");
        };
        let Value::Map(first) = &days[0] else {
            panic!("day should be a map");
        };
        assert!(matches!(first[DATE], Value::Timestamp(_)));

        let decoded = decode_travel_plan(&Document::new("t1", fields)).unwrap();
        assert_eq!(decoded.schedules, plan.schedules);
        assert_eq!(decoded.packing_items, plan.packing_items);
    }

    #[test]
    fn private_plan_writes_only_is_shared() {
        let plan = TravelPlan::new("Trip", "Nara", at(1, 0), at(2, 0), "u1");
        let fields = encode_travel_plan(&plan);
        assert_eq!(fields[IS_SHARED], Value::Bool(false));
        for key in [SHARE_CODE, SHARED_WITH, OWNER_ID, LAST_EDITED_BY, LATITUDE, CARD_COLOR] {
            assert!(!fields.contains_key(key), "{key} should be omitted");
        }
    }

    #[test]
    fn legacy_document_defaults_sharing_state() {
        let fields = FieldsBuilder::new()
            .set(TITLE, "Old trip")
            .set(START_DATE, at(1, 0))
            .set(END_DATE, at(2, 0))
            .build();
        let plan = decode_travel_plan(&Document::new("old", fields)).unwrap();
        assert!(!plan.is_shared);
        assert!(plan.shared_with.is_empty());
        assert!(plan.share_code.is_none());
        assert!(plan.owner_id.is_none());
        assert!(plan.last_edited_by.is_none());
        assert_eq!(plan.updated_at, plan.start_date);
    }

    #[test]
    fn malformed_nested_items_are_dropped() {
        let broken = FieldsBuilder::new().set(NAME, "no coordinates").build();
        let good = encode_planned_place(&PlannedPlace::new("Dotonbori", 34.67, 135.50));
        let fields = FieldsBuilder::new()
            .set(TITLE, "Osaka night")
            .set(START_DATE, at(1, 18))
            .set(END_DATE, at(1, 23))
            .set(PLACES, Value::Array(vec![Value::Map(broken), Value::Map(good), Value::from(3i64)]))
            .build();

        let plan = decode_plan(&Document::new("p1", fields)).unwrap();
        assert_eq!(plan.places.len(), 1);
        assert_eq!(plan.places[0].name, "Dotonbori");
        assert_eq!(plan.plan_type, PlanType::Outing);
    }

    #[test]
    fn wrong_typed_required_field_fails() {
        let fields = FieldsBuilder::new()
            .set(TITLE, "Shrine")
            .set(CREATED_AT, "yesterday")
            .build();
        let err = decode_visited_place(&Document::new("v1", fields)).unwrap_err();
        assert_eq!(err.record_type, VISITED_PLACE_RECORD_TYPE);
    }

    #[test]
    fn visited_place_round_trip() {
        let mut place = VisitedPlace::new("Itsukushima", 34.29, 132.32, "u1");
        place.tags = Some(vec!["torii".into(), "sea".into()]);
        place.category = PlaceCategory::Sightseeing;
        place.visited_at = Some(at(7, 10));

        let decoded =
            decode_visited_place(&Document::new(place.id.clone(), encode_visited_place(&place)))
                .unwrap();
        assert_eq!(decoded, place);
    }
}
