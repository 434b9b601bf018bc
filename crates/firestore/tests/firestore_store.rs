//! Adapter behaviour against the in-memory document database.

use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::TimeZone;
use futures::StreamExt;
use gotravel_core::auth::StaticAuth;
use gotravel_core::error::{CoreError, RemoteError};
use gotravel_core::model::{
    DaySchedule, PackingItem, Plan, PlanType, ScheduleItem, TravelPlan, VisitedPlace,
};
use gotravel_core::share_code::ShareCode;
use gotravel_core::types::Timestamp;
use gotravel_firestore::codec::{self, fields};
use gotravel_firestore::{
    CollectionPath, Document, FieldsBuilder, FirestoreStore, MemoryDocumentDatabase, Value,
};
use gotravel_storage::LocalImageStore;
use image::{DynamicImage, Rgb, RgbImage};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct Fixture {
    db: Arc<MemoryDocumentDatabase>,
    images: tempfile::TempDir,
}

impl Fixture {
    fn new() -> Self {
        Self {
            db: Arc::new(MemoryDocumentDatabase::new()),
            images: tempfile::tempdir().expect("create temp dir"),
        }
    }

    fn store_for(&self, user: &str) -> FirestoreStore {
        self.store_with(StaticAuth::signed_in(user))
    }

    fn store_with(&self, auth: StaticAuth) -> FirestoreStore {
        FirestoreStore::new(
            self.db.clone(),
            Arc::new(auth),
            LocalImageStore::new(self.images.path()),
        )
    }
}

fn at(day: u32, hour: u32) -> Timestamp {
    chrono::Utc.with_ymd_and_hms(2025, 8, day, hour, 0, 0).unwrap()
}

fn travel_plan(title: &str, start_day: u32) -> TravelPlan {
    TravelPlan::new(title, "Hakone", at(start_day, 0), at(start_day + 1, 0), "ignored")
}

fn photo(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([200, 40, 40])))
}

// ---------------------------------------------------------------------------
// Authentication
// ---------------------------------------------------------------------------

#[tokio::test]
async fn signed_out_caller_is_rejected_before_any_call() {
    let f = Fixture::new();
    let store = f.store_with(StaticAuth::signed_out());

    assert_matches!(
        store.save_travel_plan(&travel_plan("Trip", 1)).await,
        Err(CoreError::AuthenticationRequired)
    );
    assert_matches!(store.fetch_plans().await, Err(CoreError::AuthenticationRequired));
    assert_matches!(
        store.join_by_share_code("TRAVEL-AB12CD34").await,
        Err(CoreError::AuthenticationRequired)
    );
    assert!(store.observe_visited_places().is_err());
    assert_eq!(f.db.call_count(), 0);
}

// ---------------------------------------------------------------------------
// TravelPlan
// ---------------------------------------------------------------------------

#[tokio::test]
async fn private_plan_round_trips_nested_schedules() {
    let f = Fixture::new();
    let store = f.store_for("u1");

    let mut plan = travel_plan("Hakone weekend", 1);
    for day in 1..=2u32 {
        let mut schedule = DaySchedule::new(i64::from(day), at(day, 0));
        for n in 0..3u32 {
            let mut item = ScheduleItem::new(at(day, 9 + n), format!("Stop {n}"));
            item.notes = (n == 1).then(|| "Ropeway".to_string());
            schedule.items.push(item);
        }
        plan.schedules.push(schedule);
    }
    plan.packing_items.push(PackingItem::new("Towel"));

    let saved = store.save_travel_plan(&plan).await.unwrap();
    assert_eq!(saved.user_id, "u1");
    let id = saved.id.clone().expect("assigned id");
    assert_eq!(f.db.len(&CollectionPath::user_travel_plans("u1")), 1);

    let fetched = store.fetch_travel_plan(&id).await.unwrap();
    assert_eq!(fetched.schedules.len(), 2);
    assert!(fetched.schedules.iter().all(|d| d.items.len() == 3));
    assert_eq!(fetched.schedules, plan.schedules);
    assert_eq!(fetched.packing_items, plan.packing_items);
}

#[tokio::test]
async fn shared_plan_routes_to_shared_collection() {
    let f = Fixture::new();
    let store = f.store_for("u1");

    let mut plan = travel_plan("Group trip", 3);
    plan.is_shared = true;
    let saved = store.save_travel_plan(&plan).await.unwrap();

    assert_eq!(f.db.len(&CollectionPath::user_travel_plans("u1")), 0);
    assert_eq!(f.db.len(&CollectionPath::shared_travel_plans()), 1);
    assert_eq!(saved.owner_id.as_deref(), Some("u1"));
    assert_eq!(saved.shared_with, vec!["u1".to_string()]);
    assert_eq!(saved.last_edited_by.as_deref(), Some("u1"));
    let code = saved.share_code.as_deref().expect("share code");
    assert!(ShareCode::parse(code).is_ok());
}

#[tokio::test]
async fn legacy_documents_without_sharing_fields_decode() {
    let f = Fixture::new();
    let legacy = FieldsBuilder::new()
        .set(fields::TITLE, "Before sharing existed")
        .set(fields::START_DATE, at(1, 0))
        .set(fields::END_DATE, at(2, 0))
        .build();
    f.db.seed(&CollectionPath::user_travel_plans("u1"), Document::new("old", legacy));

    let plans = f.store_for("u1").fetch_travel_plans().await.unwrap();
    assert_eq!(plans.len(), 1);
    assert!(!plans[0].is_shared);
    assert!(plans[0].shared_with.is_empty());
    assert!(plans[0].owner_id.is_none());
}

#[tokio::test]
async fn fetch_merges_owned_and_shared_sorted_by_start() {
    let f = Fixture::new();
    let owner = f.store_for("u2");
    let mut shared = travel_plan("Shared", 1);
    shared.is_shared = true;
    let shared = owner.save_travel_plan(&shared).await.unwrap();

    let member = f.store_for("u1");
    member.save_travel_plan(&travel_plan("Mine", 5)).await.unwrap();
    member
        .join_by_share_code(shared.share_code.as_deref().unwrap())
        .await
        .unwrap();

    let plans = member.fetch_travel_plans().await.unwrap();
    let titles: Vec<_> = plans.iter().map(|p| p.title.as_str()).collect();
    assert_eq!(titles, ["Shared", "Mine"]);
}

#[tokio::test]
async fn missing_shared_field_yields_owned_plans_only() {
    let f = Fixture::new();
    let store = f.store_for("u1");
    store.save_travel_plan(&travel_plan("Mine", 1)).await.unwrap();
    f.db.undeclare_field(fields::SHARED_WITH);

    assert_eq!(store.fetch_travel_plans().await.unwrap().len(), 1);
}

#[tokio::test]
async fn other_shared_query_failures_propagate() {
    let f = Fixture::new();
    f.db.fail_queries_on(fields::SHARED_WITH, RemoteError::network("offline"));
    assert_matches!(
        f.store_for("u1").fetch_travel_plans().await,
        Err(CoreError::Remote(_))
    );
}

#[tokio::test]
async fn join_accepts_any_case_and_adds_member() {
    let f = Fixture::new();
    let mut plan = travel_plan("Festival", 2);
    plan.is_shared = true;
    let saved = f.store_for("owner").save_travel_plan(&plan).await.unwrap();
    let code = saved.share_code.clone().unwrap();

    let joined = f
        .store_for("friend")
        .join_by_share_code(&format!("  {}  ", code.to_lowercase()))
        .await
        .unwrap();
    assert_eq!(joined.id, saved.id);
    assert_eq!(joined.shared_with, vec!["owner".to_string(), "friend".to_string()]);

    let again = f.store_for("friend").join_by_share_code(&code).await.unwrap();
    assert_eq!(again.shared_with.len(), 2);
}

#[tokio::test]
async fn join_with_unknown_code_is_not_found() {
    let f = Fixture::new();
    assert_matches!(
        f.store_for("u1").join_by_share_code("TRAVEL-ZZZZZZZZ").await,
        Err(CoreError::NotFound { entity: "TravelPlan", .. })
    );
}

#[tokio::test]
async fn enable_sharing_moves_plan_out_of_private_collection() {
    let f = Fixture::new();
    let store = f.store_for("u1");
    let saved = store.save_travel_plan(&travel_plan("Solo", 1)).await.unwrap();

    let shared = store.enable_sharing(&saved).await.unwrap();
    assert!(shared.is_shared);
    assert_eq!(shared.id, saved.id);
    assert_eq!(f.db.len(&CollectionPath::user_travel_plans("u1")), 0);
    assert_eq!(f.db.len(&CollectionPath::shared_travel_plans()), 1);

    store.leave_shared_plan(shared.id.as_deref().unwrap()).await.unwrap();
    let doc = f
        .db
        .document(&CollectionPath::shared_travel_plans(), shared.id.as_deref().unwrap())
        .unwrap();
    assert_eq!(doc.fields[fields::SHARED_WITH], Value::Array(Vec::new()));
}

#[tokio::test]
async fn disabling_sharing_moves_plan_back_to_private_collection() {
    let f = Fixture::new();
    let store = f.store_for("u1");
    let saved = store.save_travel_plan(&travel_plan("Trip", 1)).await.unwrap();
    let mut unshared = store.enable_sharing(&saved).await.unwrap();

    unshared.is_shared = false;
    unshared.title = "Edited privately".into();
    store.save_travel_plan(&unshared).await.unwrap();

    assert_eq!(f.db.len(&CollectionPath::shared_travel_plans()), 0);
    assert_eq!(f.db.len(&CollectionPath::user_travel_plans("u1")), 1);
    let plans = store.fetch_travel_plans().await.unwrap();
    assert_eq!(plans.len(), 1);
    assert_eq!(plans[0].title, "Edited privately");
    assert!(!plans[0].is_shared);
}

#[tokio::test]
async fn private_save_keeps_shared_copy_of_another_owner() {
    let f = Fixture::new();
    let mut plan = travel_plan("Their trip", 1);
    plan.is_shared = true;
    let shared = f.store_for("u2").save_travel_plan(&plan).await.unwrap();

    let member = f.store_for("u1");
    let mut copy = member
        .join_by_share_code(shared.share_code.as_deref().unwrap())
        .await
        .unwrap();
    copy.is_shared = false;
    member.save_travel_plan(&copy).await.unwrap();

    let doc = f
        .db
        .document(&CollectionPath::shared_travel_plans(), shared.id.as_deref().unwrap())
        .expect("shared copy kept");
    assert_eq!(doc.fields[fields::TITLE], Value::from("Their trip"));
}

#[tokio::test]
async fn update_stamps_editor() {
    let f = Fixture::new();
    let mut plan = travel_plan("Shared", 1);
    plan.is_shared = true;
    let saved = f.store_for("owner").save_travel_plan(&plan).await.unwrap();

    let edited = f.store_for("editor").update_travel_plan(&saved).await.unwrap();
    assert_eq!(edited.owner_id.as_deref(), Some("owner"));
    assert_eq!(edited.user_id, "owner");
    assert_eq!(edited.last_edited_by.as_deref(), Some("editor"));
    assert!(edited.updated_at >= saved.updated_at);
}

#[tokio::test]
async fn delete_removes_document_and_cover() {
    let f = Fixture::new();
    let store = f.store_for("u1");
    let mut plan = travel_plan("Covered", 1);
    plan.local_image_file_name = Some(store.save_cover_image(&photo(8, 8), 0.8).unwrap());
    let saved = store.save_travel_plan(&plan).await.unwrap();
    let filename = saved.local_image_file_name.clone().unwrap();
    assert!(store.images().exists(&filename));

    store.delete_travel_plan(&saved).await.unwrap();
    assert!(!store.exists_travel_plan(saved.id.as_deref().unwrap()).await.unwrap());
    assert!(!store.images().exists(&filename));
}

#[tokio::test]
async fn observe_emits_once_both_listeners_report() {
    let f = Fixture::new();
    let store = f.store_for("u1");
    store.save_travel_plan(&travel_plan("First", 1)).await.unwrap();

    let mut stream = store.observe_travel_plans().unwrap();
    assert_eq!(stream.next().await.unwrap().unwrap().len(), 1);

    store.save_travel_plan(&travel_plan("Second", 2)).await.unwrap();
    assert_eq!(stream.next().await.unwrap().unwrap().len(), 2);
}

#[tokio::test]
async fn observe_tolerates_missing_shared_field() {
    let f = Fixture::new();
    f.db.undeclare_field(fields::SHARED_WITH);
    let store = f.store_for("u1");
    store.save_travel_plan(&travel_plan("First", 1)).await.unwrap();

    let mut stream = store.observe_travel_plans().unwrap();
    assert_eq!(stream.next().await.unwrap().unwrap().len(), 1);
}

// ---------------------------------------------------------------------------
// Plan & VisitedPlace
// ---------------------------------------------------------------------------

#[tokio::test]
async fn plan_crud_and_observe() {
    let f = Fixture::new();
    let store = f.store_for("u1");
    let mut stream = store.observe_plans().unwrap();
    assert!(stream.next().await.unwrap().unwrap().is_empty());

    let later = Plan::new("Dinner", at(9, 19), at(9, 21), PlanType::Outing, "x");
    let earlier = Plan::new("Market", at(2, 7), at(2, 9), PlanType::Daily, "x");
    store.save_plan(&later).await.unwrap();
    store.save_plan(&earlier).await.unwrap();

    let titles: Vec<_> = store
        .fetch_plans()
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.title)
        .collect();
    assert_eq!(titles, ["Market", "Dinner"]);
    assert!(store.exists_plan(&later.id).await.unwrap());

    store.delete_plan(&later.id).await.unwrap();
    assert!(!store.exists_plan(&later.id).await.unwrap());

    let mut sizes = Vec::new();
    let mut last = Vec::new();
    for _ in 0..3 {
        last = stream.next().await.unwrap().unwrap();
        sizes.push(last.len());
    }
    assert_eq!(sizes, [1, 2, 1]);
    assert_eq!(last[0].title, "Market");
    assert_eq!(last[0].user_id, "u1");
}

#[tokio::test]
async fn visited_place_photo_is_stored_locally() {
    let f = Fixture::new();
    let store = f.store_for("u1");
    let place = VisitedPlace::new("Matsumoto Castle", 36.238, 137.969, "x");

    let saved = store
        .save_visited_place(&place, Some(&photo(20, 10)))
        .await
        .unwrap();
    let filename = saved.local_photo_file_name.clone().expect("photo filename");
    let bytes = store.images().load(&filename).unwrap().expect("photo bytes");
    let decoded = gotravel_core::jpeg::decode_image(&bytes).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (20, 10));

    let doc = f
        .db
        .document(&CollectionPath::user_visited_places("u1"), &saved.id)
        .unwrap();
    assert_eq!(
        doc.fields[fields::LOCAL_PHOTO_FILE_NAME],
        Value::String(filename.clone())
    );

    store.delete_visited_place(&saved).await.unwrap();
    assert!(!store.images().exists(&filename));
}

#[tokio::test]
async fn unusable_photo_still_saves_place() {
    let f = Fixture::new();
    let store = f.store_for("u1");
    let place = VisitedPlace::new("Empty photo", 0.0, 0.0, "x");

    let saved = store.save_visited_place(&place, Some(&photo(0, 0))).await.unwrap();
    assert!(saved.local_photo_file_name.is_none());
    assert!(store.exists_visited_place(&saved.id).await.unwrap());
}

#[tokio::test]
async fn visited_places_newest_first() {
    let f = Fixture::new();
    let store = f.store_for("u1");
    let mut old = VisitedPlace::new("Old", 0.0, 0.0, "x");
    old.created_at = at(1, 0);
    let mut new = VisitedPlace::new("New", 0.0, 0.0, "x");
    new.created_at = at(20, 0);
    store.save_visited_place(&old, None).await.unwrap();
    store.save_visited_place(&new, None).await.unwrap();

    let titles: Vec<_> = store
        .fetch_visited_places()
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.title)
        .collect();
    assert_eq!(titles, ["New", "Old"]);
}

#[tokio::test]
async fn unreadable_documents_are_dropped() {
    let f = Fixture::new();
    let path = CollectionPath::user_visited_places("u1");
    f.db.seed(&path, Document::new("bad", FieldsBuilder::new().set(fields::TITLE, 7i64).build()));
    let good = VisitedPlace::new("Good", 1.0, 2.0, "u1");
    f.db.seed(&path, Document::new(good.id.as_str(), codec::encode_visited_place(&good)));

    let places = f.store_for("u1").fetch_visited_places().await.unwrap();
    assert_eq!(places.len(), 1);
    assert_eq!(places[0].title, "Good");
}
