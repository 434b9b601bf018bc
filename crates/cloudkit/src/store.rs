//! CRUD adapter over a [`RecordDatabase`].
//!
//! Cover images and place photos travel as assets: the JPEG is staged in a
//! temp file, uploaded with the record, and the temp file removed whatever
//! the outcome.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use gotravel_core::error::{CoreError, DecodeError};
use gotravel_core::jpeg::{decode_image, encode_jpeg, COVER_JPEG_QUALITY, PHOTO_JPEG_QUALITY};
use gotravel_core::model::travel_plan::merge_by_id;
use gotravel_core::model::{
    Plan, TravelPlan, VisitedPlace, PLAN_RECORD_TYPE, TRAVEL_PLAN_RECORD_TYPE,
    VISITED_PLACE_RECORD_TYPE,
};
use gotravel_core::types::new_record_id;
use image::DynamicImage;

use crate::codec::{self, fields};
use crate::database::RecordDatabase;
use crate::record::{Asset, DatabaseScope, Predicate, Query, Record};

/// An entity together with the image its record carried, if any.
#[derive(Debug, Clone)]
pub struct FetchedRecord<T> {
    pub entity: T,
    pub image: Option<DynamicImage>,
}

/// CloudKit-shaped store for the three entity types.
pub struct CloudKitStore {
    db: Arc<dyn RecordDatabase>,
    staging_dir: PathBuf,
}

impl CloudKitStore {
    /// `staging_dir` holds temp JPEGs while their upload is in flight.
    pub fn new(db: Arc<dyn RecordDatabase>, staging_dir: impl Into<PathBuf>) -> Self {
        Self {
            db,
            staging_dir: staging_dir.into(),
        }
    }

    // -----------------------------------------------------------------------
    // TravelPlan
    // -----------------------------------------------------------------------

    /// Save `plan`, assigning an id when it has none. Shared plans go to the
    /// public database; a copy left in the other database is removed.
    pub async fn save_travel_plan(
        &self,
        plan: &TravelPlan,
        image: Option<&DynamicImage>,
    ) -> Result<TravelPlan, CoreError> {
        let id = plan.id.clone().unwrap_or_else(new_record_id);
        let record = codec::encode_travel_plan(plan, &id)?;
        let scope = travel_plan_scope(plan);

        self.save_with_asset(scope, record, fields::IMAGE, image, COVER_JPEG_QUALITY)
            .await?;
        tracing::info!(record_id = %id, ?scope, "Saved travel plan");
        self.remove_stale_copy(plan, &id, scope).await?;

        let mut saved = plan.clone();
        saved.id = Some(id);
        Ok(saved)
    }

    /// Plans owned by `user_id`, private and shared.
    pub async fn fetch_travel_plans(&self, user_id: &str) -> Result<Vec<TravelPlan>, CoreError> {
        let records = self.owned_travel_plan_records(user_id).await?;
        Ok(decode_all(&records, codec::decode_travel_plan))
    }

    /// Owned plans plus plans shared with `user_id`, deduplicated by id.
    ///
    /// The backend has no OR query, so this issues two queries. A schema
    /// without the `sharedWith` field predates sharing and yields no shared
    /// plans; any other failure propagates.
    pub async fn fetch_travel_plans_including_shared(
        &self,
        user_id: &str,
    ) -> Result<Vec<TravelPlan>, CoreError> {
        let owned = self.fetch_travel_plans(user_id).await?;

        let shared_query = Query::new(
            TRAVEL_PLAN_RECORD_TYPE,
            Predicate::list_contains(fields::SHARED_WITH, user_id),
        );
        let shared_records = match self.db.query(DatabaseScope::Public, &shared_query).await {
            Ok(records) => records,
            Err(e) if e.is_unknown_field(fields::SHARED_WITH) => {
                tracing::debug!(user_id, "Schema has no sharedWith field yet; no shared plans");
                Vec::new()
            }
            Err(e) => return Err(e.into()),
        };
        let shared = decode_all(&shared_records, codec::decode_travel_plan);

        Ok(merge_by_id(owned, shared))
    }

    /// Look a plan up in the private database, then the public one.
    pub async fn fetch_travel_plan(&self, id: &str) -> Result<TravelPlan, CoreError> {
        for scope in [DatabaseScope::Private, DatabaseScope::Public] {
            if let Some(record) = self.db.fetch(scope, id).await? {
                return codec::decode_travel_plan(&record).map_err(|e| {
                    tracing::warn!(record_id = id, error = %e, "Unreadable travel plan record");
                    CoreError::not_found("TravelPlan", id)
                });
            }
        }
        Err(CoreError::not_found("TravelPlan", id))
    }

    /// Owned plans with their cover image, for migration. Includes plans the
    /// user owns and has shared, which live in the public database.
    pub async fn fetch_travel_plan_sources(
        &self,
        user_id: &str,
    ) -> Result<Vec<FetchedRecord<TravelPlan>>, CoreError> {
        let records = self.owned_travel_plan_records(user_id).await?;
        Ok(decode_with_images(&records, codec::decode_travel_plan, fields::IMAGE))
    }

    pub async fn delete_travel_plan(&self, plan: &TravelPlan) -> Result<(), CoreError> {
        let Some(id) = plan.id.as_deref() else {
            return Ok(());
        };
        self.db.delete(travel_plan_scope(plan), id).await?;
        tracing::info!(record_id = id, "Deleted travel plan");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Plan
    // -----------------------------------------------------------------------

    pub async fn save_plan(&self, plan: &Plan) -> Result<Plan, CoreError> {
        let record = codec::encode_plan(plan)?;
        self.db.save(DatabaseScope::Private, record).await?;
        tracing::info!(record_id = %plan.id, "Saved plan");
        Ok(plan.clone())
    }

    pub async fn fetch_plans(&self, user_id: &str) -> Result<Vec<Plan>, CoreError> {
        let records = self
            .query(DatabaseScope::Private, PLAN_RECORD_TYPE, owner_predicate(user_id))
            .await?;
        Ok(decode_all(&records, codec::decode_plan))
    }

    pub async fn delete_plan(&self, id: &str) -> Result<(), CoreError> {
        self.db.delete(DatabaseScope::Private, id).await?;
        tracing::info!(record_id = id, "Deleted plan");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // VisitedPlace
    // -----------------------------------------------------------------------

    pub async fn save_visited_place(
        &self,
        place: &VisitedPlace,
        photo: Option<&DynamicImage>,
    ) -> Result<VisitedPlace, CoreError> {
        let mut place = place.clone();
        if place.id.is_empty() {
            place.id = new_record_id();
        }
        let record = codec::encode_visited_place(&place);
        self.save_with_asset(DatabaseScope::Private, record, fields::PHOTO, photo, PHOTO_JPEG_QUALITY)
            .await?;
        tracing::info!(record_id = %place.id, "Saved visited place");
        Ok(place)
    }

    pub async fn fetch_visited_places(&self, user_id: &str) -> Result<Vec<VisitedPlace>, CoreError> {
        let records = self
            .query(DatabaseScope::Private, VISITED_PLACE_RECORD_TYPE, owner_predicate(user_id))
            .await?;
        Ok(decode_all(&records, codec::decode_visited_place))
    }

    pub async fn fetch_visited_place(&self, id: &str) -> Result<VisitedPlace, CoreError> {
        let record = self
            .db
            .fetch(DatabaseScope::Private, id)
            .await?
            .ok_or_else(|| CoreError::not_found("VisitedPlace", id))?;
        codec::decode_visited_place(&record).map_err(|e| {
            tracing::warn!(record_id = id, error = %e, "Unreadable visited place record");
            CoreError::not_found("VisitedPlace", id)
        })
    }

    /// Places with their photo, for migration.
    pub async fn fetch_visited_place_sources(
        &self,
        user_id: &str,
    ) -> Result<Vec<FetchedRecord<VisitedPlace>>, CoreError> {
        let records = self
            .query(DatabaseScope::Private, VISITED_PLACE_RECORD_TYPE, owner_predicate(user_id))
            .await?;
        Ok(decode_with_images(&records, codec::decode_visited_place, fields::PHOTO))
    }

    pub async fn delete_visited_place(&self, id: &str) -> Result<(), CoreError> {
        self.db.delete(DatabaseScope::Private, id).await?;
        tracing::info!(record_id = id, "Deleted visited place");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    /// Private and public records owned by `user_id`, one per id. A record
    /// present in both databases resolves to the public copy.
    async fn owned_travel_plan_records(&self, user_id: &str) -> Result<Vec<Record>, CoreError> {
        let mut records = self
            .query(DatabaseScope::Private, TRAVEL_PLAN_RECORD_TYPE, owner_predicate(user_id))
            .await?;
        let public = self
            .query(DatabaseScope::Public, TRAVEL_PLAN_RECORD_TYPE, owner_predicate(user_id))
            .await?;
        for record in public {
            match records.iter_mut().find(|r| r.id == record.id) {
                Some(existing) => *existing = record,
                None => records.push(record),
            }
        }
        Ok(records)
    }

    /// Drop the copy of a just-saved plan left in the other database after
    /// its sharing state changed. Public copies owned by someone else stay.
    async fn remove_stale_copy(
        &self,
        plan: &TravelPlan,
        id: &str,
        saved_scope: DatabaseScope,
    ) -> Result<(), CoreError> {
        let other = match saved_scope {
            DatabaseScope::Private => DatabaseScope::Public,
            DatabaseScope::Public => DatabaseScope::Private,
        };
        let Some(record) = self.db.fetch(other, id).await? else {
            return Ok(());
        };
        if other == DatabaseScope::Public {
            let owned = codec::decode_travel_plan(&record)
                .is_ok_and(|stale| stale.owner() == plan.owner());
            if !owned {
                tracing::warn!(record_id = id, "Shared copy belongs to another owner; leaving it");
                return Ok(());
            }
        }
        self.db.delete(other, id).await?;
        tracing::info!(record_id = id, from = ?other, "Removed stale travel plan copy");
        Ok(())
    }

    async fn query(
        &self,
        scope: DatabaseScope,
        record_type: &str,
        predicate: Predicate,
    ) -> Result<Vec<Record>, CoreError> {
        Ok(self.db.query(scope, &Query::new(record_type, predicate)).await?)
    }

    /// Encode `image` (before any network call), stage it, save the record
    /// with the asset attached, then remove the staged file.
    async fn save_with_asset(
        &self,
        scope: DatabaseScope,
        mut record: Record,
        asset_field: &str,
        image: Option<&DynamicImage>,
        quality: f32,
    ) -> Result<Record, CoreError> {
        let Some(image) = image else {
            return Ok(self.db.save(scope, record).await?);
        };

        let jpeg = encode_jpeg(image, quality)?;
        tokio::fs::create_dir_all(&self.staging_dir).await?;
        let staged = self.staging_dir.join(format!("{}.jpg", uuid::Uuid::new_v4()));

        let result = match tokio::fs::write(&staged, &jpeg).await {
            Ok(()) => {
                record.set(asset_field, Asset::File(staged.clone()));
                self.db.save(scope, record).await.map_err(CoreError::from)
            }
            Err(e) => Err(e.into()),
        };

        remove_staged(&staged).await;
        result
    }
}

/// A write that failed partway may still have left a file behind.
async fn remove_staged(staged: &Path) {
    match tokio::fs::remove_file(staged).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            tracing::warn!(path = %staged.display(), error = %e, "Failed to remove staged asset");
        }
    }
}

fn travel_plan_scope(plan: &TravelPlan) -> DatabaseScope {
    if plan.is_shared {
        DatabaseScope::Public
    } else {
        DatabaseScope::Private
    }
}

fn owner_predicate(user_id: &str) -> Predicate {
    Predicate::equals(fields::USER_ID, user_id)
}

/// Decode every record, logging and dropping the ones that fail.
fn decode_all<T>(records: &[Record], decode: fn(&Record) -> Result<T, DecodeError>) -> Vec<T> {
    records
        .iter()
        .filter_map(|record| match decode(record) {
            Ok(entity) => Some(entity),
            Err(e) => {
                tracing::warn!(record_id = %record.id, error = %e, "Dropping unreadable record");
                None
            }
        })
        .collect()
}

fn decode_with_images<T>(
    records: &[Record],
    decode: fn(&Record) -> Result<T, DecodeError>,
    asset_field: &str,
) -> Vec<FetchedRecord<T>> {
    records
        .iter()
        .filter_map(|record| {
            let entity = match decode(record) {
                Ok(entity) => entity,
                Err(e) => {
                    tracing::warn!(record_id = %record.id, error = %e, "Dropping unreadable record");
                    return None;
                }
            };
            let image = record.asset(asset_field).and_then(|asset| {
                let decoded = asset
                    .read()
                    .map_err(CoreError::from)
                    .and_then(|bytes| decode_image(&bytes));
                match decoded {
                    Ok(image) => Some(image),
                    Err(e) => {
                        tracing::warn!(record_id = %record.id, error = %e, "Unreadable image asset");
                        None
                    }
                }
            });
            Some(FetchedRecord { entity, image })
        })
        .collect()
}
