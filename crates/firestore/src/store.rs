//! CRUD adapter over a [`DocumentDatabase`], scoped to the signed-in user.
//!
//! Private entities live under `users/{uid}/...`; shared travel plans live
//! in the top-level shared collection. Images never reach this backend:
//! covers and photos are written to the [`LocalImageStore`] and only their
//! filenames are stored in documents.

use std::sync::Arc;

use gotravel_core::auth::AuthProvider;
use gotravel_core::error::{CoreError, DecodeError};
use gotravel_core::jpeg::{encode_jpeg, PHOTO_JPEG_QUALITY};
use gotravel_core::model::travel_plan::merge_by_id;
use gotravel_core::model::{Plan, TravelPlan, VisitedPlace};
use gotravel_core::share_code::ShareCode;
use gotravel_core::types::{new_record_id, UserId};
use gotravel_storage::LocalImageStore;
use image::DynamicImage;

use crate::codec::{self, fields};
use crate::database::{DocumentDatabase, Filter};
use crate::observe::{self, EntityStream};
use crate::paths::CollectionPath;
use crate::value::{Document, Value};

pub struct FirestoreStore {
    db: Arc<dyn DocumentDatabase>,
    auth: Arc<dyn AuthProvider>,
    images: LocalImageStore,
    photo_quality: f32,
}

impl FirestoreStore {
    pub fn new(
        db: Arc<dyn DocumentDatabase>,
        auth: Arc<dyn AuthProvider>,
        images: LocalImageStore,
    ) -> Self {
        Self {
            db,
            auth,
            images,
            photo_quality: PHOTO_JPEG_QUALITY,
        }
    }

    /// JPEG quality for visited-place photos saved alongside the document.
    pub fn with_photo_quality(mut self, quality: f32) -> Self {
        self.photo_quality = quality;
        self
    }

    pub fn images(&self) -> &LocalImageStore {
        &self.images
    }

    fn require_user(&self) -> Result<UserId, CoreError> {
        self.auth
            .current_user_id()
            .ok_or(CoreError::AuthenticationRequired)
    }

    // -----------------------------------------------------------------------
    // TravelPlan
    // -----------------------------------------------------------------------

    /// Save `plan` to the collection matching its sharing state.
    ///
    /// Private plans are stamped with the caller as owner. Shared plans keep
    /// their owner (the caller when unset), gain a share code if missing,
    /// always list the owner as a member, and record the caller as last
    /// editor.
    pub async fn save_travel_plan(&self, plan: &TravelPlan) -> Result<TravelPlan, CoreError> {
        let user_id = self.require_user()?;
        let mut saved = plan.clone();
        let id = saved.id.get_or_insert_with(new_record_id).clone();

        let collection = if saved.is_shared {
            let owner = saved.owner_id.get_or_insert_with(|| user_id.clone()).clone();
            if !saved.shared_with.contains(&owner) {
                saved.shared_with.insert(0, owner.clone());
            }
            if saved.share_code.is_none() {
                saved.share_code = Some(ShareCode::generate().into_string());
            }
            saved.user_id = owner;
            saved.last_edited_by = Some(user_id.clone());
            CollectionPath::shared_travel_plans()
        } else {
            saved.user_id = user_id.clone();
            CollectionPath::user_travel_plans(&user_id)
        };

        self.db
            .set(&collection, Document::new(id.as_str(), codec::encode_travel_plan(&saved)))
            .await?;
        tracing::info!(user_id = %user_id, record_id = %id, %collection, "Saved travel plan");
        self.remove_stale_copy(&saved, &user_id).await?;
        Ok(saved)
    }

    /// Record an edit by the caller, then save.
    pub async fn update_travel_plan(&self, plan: &TravelPlan) -> Result<TravelPlan, CoreError> {
        let user_id = self.require_user()?;
        let mut edited = plan.clone();
        edited.touch(&user_id);
        self.save_travel_plan(&edited).await
    }

    /// Compress a card cover into local storage and return its filename.
    pub fn save_cover_image(&self, image: &DynamicImage, quality: f32) -> Result<String, CoreError> {
        self.images.save_image(image, quality)
    }

    /// The caller's own plans plus plans shared with them, deduplicated by
    /// id and ordered by start date.
    pub async fn fetch_travel_plans(&self) -> Result<Vec<TravelPlan>, CoreError> {
        let user_id = self.require_user()?;

        let own_docs = self
            .db
            .query(&CollectionPath::user_travel_plans(&user_id), None)
            .await?;
        let own = codec::decode_all(&own_docs, codec::decode_travel_plan);

        let member = Filter::array_contains(fields::SHARED_WITH, user_id.as_str());
        let shared_docs = match self
            .db
            .query(&CollectionPath::shared_travel_plans(), Some(&member))
            .await
        {
            Ok(docs) => docs,
            Err(e) if e.is_unknown_field(fields::SHARED_WITH) => {
                tracing::debug!(user_id = %user_id, "Schema has no sharedWith field yet; no shared plans");
                Vec::new()
            }
            Err(e) => return Err(e.into()),
        };
        let shared = codec::decode_all(&shared_docs, codec::decode_travel_plan);

        let mut plans = merge_by_id(own, shared);
        observe::sort_travel_plans(&mut plans);
        Ok(plans)
    }

    /// Look a plan up in the caller's collection, then the shared one.
    pub async fn fetch_travel_plan(&self, id: &str) -> Result<TravelPlan, CoreError> {
        let user_id = self.require_user()?;
        for collection in [
            CollectionPath::user_travel_plans(&user_id),
            CollectionPath::shared_travel_plans(),
        ] {
            if let Some(document) = self.db.get(&collection, id).await? {
                return decode_one(&document, codec::decode_travel_plan, "TravelPlan");
            }
        }
        Err(CoreError::not_found("TravelPlan", id))
    }

    pub async fn exists_travel_plan(&self, id: &str) -> Result<bool, CoreError> {
        let user_id = self.require_user()?;
        if self
            .db
            .get(&CollectionPath::user_travel_plans(&user_id), id)
            .await?
            .is_some()
        {
            return Ok(true);
        }
        Ok(self
            .db
            .get(&CollectionPath::shared_travel_plans(), id)
            .await?
            .is_some())
    }

    /// Delete from the collection matching `plan.is_shared` and drop its
    /// local cover image.
    pub async fn delete_travel_plan(&self, plan: &TravelPlan) -> Result<(), CoreError> {
        let user_id = self.require_user()?;
        let Some(id) = plan.id.as_deref() else {
            return Ok(());
        };
        let collection = if plan.is_shared {
            CollectionPath::shared_travel_plans()
        } else {
            CollectionPath::user_travel_plans(&user_id)
        };
        self.db.delete(&collection, id).await?;
        tracing::info!(user_id = %user_id, record_id = id, "Deleted travel plan");

        if let Some(filename) = plan.local_image_file_name.as_deref() {
            self.remove_local_image(id, filename);
        }
        Ok(())
    }

    /// Move a private plan into the shared collection under a fresh code.
    /// The private copy is removed by the save.
    pub async fn enable_sharing(&self, plan: &TravelPlan) -> Result<TravelPlan, CoreError> {
        let user_id = self.require_user()?;
        let mut shared = plan.clone();
        shared.is_shared = true;
        shared.share_code = Some(ShareCode::generate().into_string());
        shared.owner_id = Some(user_id.clone());
        shared.shared_with = vec![user_id.clone()];

        let saved = self.save_travel_plan(&shared).await?;
        tracing::info!(
            user_id = %user_id,
            record_id = ?saved.id,
            share_code = ?saved.share_code,
            "Enabled sharing"
        );
        Ok(saved)
    }

    /// Add the caller to the plan carrying `code`. Input is trimmed and
    /// uppercased before the lookup.
    pub async fn join_by_share_code(&self, code: &str) -> Result<TravelPlan, CoreError> {
        let user_id = self.require_user()?;
        let code = ShareCode::normalize(code);
        let shared = CollectionPath::shared_travel_plans();

        let matches = self
            .db
            .query(&shared, Some(&Filter::equals(fields::SHARE_CODE, code.as_str())))
            .await?;
        let Some(document) = matches.into_iter().next() else {
            return Err(CoreError::not_found("TravelPlan", code));
        };

        self.db
            .array_union(
                &shared,
                &document.id,
                fields::SHARED_WITH,
                vec![Value::from(user_id.as_str())],
            )
            .await?;

        let updated = self
            .db
            .get(&shared, &document.id)
            .await?
            .ok_or_else(|| CoreError::not_found("TravelPlan", document.id.as_str()))?;
        tracing::info!(user_id = %user_id, record_id = %document.id, "Joined shared travel plan");
        decode_one(&updated, codec::decode_travel_plan, "TravelPlan")
    }

    /// Remove the caller from a shared plan's member list.
    pub async fn leave_shared_plan(&self, id: &str) -> Result<(), CoreError> {
        let user_id = self.require_user()?;
        self.db
            .array_remove(
                &CollectionPath::shared_travel_plans(),
                id,
                fields::SHARED_WITH,
                vec![Value::from(user_id.as_str())],
            )
            .await?;
        tracing::info!(user_id = %user_id, record_id = id, "Left shared travel plan");
        Ok(())
    }

    /// Live merged list of owned and shared plans. The first item arrives
    /// once both listeners have reported.
    pub fn observe_travel_plans(&self) -> Result<EntityStream<TravelPlan>, CoreError> {
        let user_id = self.require_user()?;
        let own = self.db.listen(&CollectionPath::user_travel_plans(&user_id), None);
        let shared = self.db.listen(
            &CollectionPath::shared_travel_plans(),
            Some(Filter::array_contains(fields::SHARED_WITH, user_id.as_str())),
        );
        Ok(observe::merge_own_and_shared(own, shared))
    }

    // -----------------------------------------------------------------------
    // Plan
    // -----------------------------------------------------------------------

    pub async fn save_plan(&self, plan: &Plan) -> Result<Plan, CoreError> {
        let user_id = self.require_user()?;
        let mut saved = plan.clone();
        if saved.id.is_empty() {
            saved.id = new_record_id();
        }
        saved.user_id = user_id.clone();

        self.db
            .set(
                &CollectionPath::user_plans(&user_id),
                Document::new(saved.id.as_str(), codec::encode_plan(&saved)),
            )
            .await?;
        tracing::info!(user_id = %user_id, record_id = %saved.id, "Saved plan");
        Ok(saved)
    }

    /// Ordered by start date.
    pub async fn fetch_plans(&self) -> Result<Vec<Plan>, CoreError> {
        let user_id = self.require_user()?;
        let docs = self.db.query(&CollectionPath::user_plans(&user_id), None).await?;
        let mut plans = codec::decode_all(&docs, codec::decode_plan);
        sort_plans(&mut plans);
        Ok(plans)
    }

    pub async fn exists_plan(&self, id: &str) -> Result<bool, CoreError> {
        let user_id = self.require_user()?;
        Ok(self.db.get(&CollectionPath::user_plans(&user_id), id).await?.is_some())
    }

    pub async fn delete_plan(&self, id: &str) -> Result<(), CoreError> {
        let user_id = self.require_user()?;
        self.db.delete(&CollectionPath::user_plans(&user_id), id).await?;
        tracing::info!(user_id = %user_id, record_id = id, "Deleted plan");
        Ok(())
    }

    pub fn observe_plans(&self) -> Result<EntityStream<Plan>, CoreError> {
        let user_id = self.require_user()?;
        let snapshots = self.db.listen(&CollectionPath::user_plans(&user_id), None);
        Ok(observe::decode_snapshots(snapshots, codec::decode_plan, sort_plans))
    }

    // -----------------------------------------------------------------------
    // VisitedPlace
    // -----------------------------------------------------------------------

    /// Save `place`. A supplied photo is written to local storage first; if
    /// that fails the place is still saved, without a photo reference.
    pub async fn save_visited_place(
        &self,
        place: &VisitedPlace,
        photo: Option<&DynamicImage>,
    ) -> Result<VisitedPlace, CoreError> {
        let user_id = self.require_user()?;
        let mut saved = place.clone();
        if saved.id.is_empty() {
            saved.id = new_record_id();
        }
        saved.user_id = user_id.clone();

        if let Some(photo) = photo {
            match self.store_photo(photo).await {
                Ok(filename) => saved.local_photo_file_name = Some(filename),
                Err(e) => {
                    tracing::warn!(record_id = %saved.id, error = %e, "Failed to store photo locally");
                }
            }
        }

        self.db
            .set(
                &CollectionPath::user_visited_places(&user_id),
                Document::new(saved.id.as_str(), codec::encode_visited_place(&saved)),
            )
            .await?;
        tracing::info!(user_id = %user_id, record_id = %saved.id, "Saved visited place");
        Ok(saved)
    }

    /// Most recent first.
    pub async fn fetch_visited_places(&self) -> Result<Vec<VisitedPlace>, CoreError> {
        let user_id = self.require_user()?;
        let docs = self
            .db
            .query(&CollectionPath::user_visited_places(&user_id), None)
            .await?;
        let mut places = codec::decode_all(&docs, codec::decode_visited_place);
        sort_visited_places(&mut places);
        Ok(places)
    }

    pub async fn exists_visited_place(&self, id: &str) -> Result<bool, CoreError> {
        let user_id = self.require_user()?;
        Ok(self
            .db
            .get(&CollectionPath::user_visited_places(&user_id), id)
            .await?
            .is_some())
    }

    /// Delete the document and its local photo.
    pub async fn delete_visited_place(&self, place: &VisitedPlace) -> Result<(), CoreError> {
        let user_id = self.require_user()?;
        self.db
            .delete(&CollectionPath::user_visited_places(&user_id), &place.id)
            .await?;
        tracing::info!(user_id = %user_id, record_id = %place.id, "Deleted visited place");

        if let Some(filename) = place.local_photo_file_name.as_deref() {
            self.remove_local_image(&place.id, filename);
        }
        Ok(())
    }

    pub fn observe_visited_places(&self) -> Result<EntityStream<VisitedPlace>, CoreError> {
        let user_id = self.require_user()?;
        let snapshots = self
            .db
            .listen(&CollectionPath::user_visited_places(&user_id), None);
        Ok(observe::decode_snapshots(
            snapshots,
            codec::decode_visited_place,
            sort_visited_places,
        ))
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    /// After a save, delete the copy of the plan still sitting in the
    /// collection for its previous sharing state. A shared copy owned by
    /// someone else is left alone.
    async fn remove_stale_copy(&self, saved: &TravelPlan, user_id: &str) -> Result<(), CoreError> {
        let Some(id) = saved.id.as_deref() else {
            return Ok(());
        };
        let other = if saved.is_shared {
            CollectionPath::user_travel_plans(user_id)
        } else {
            CollectionPath::shared_travel_plans()
        };
        let Some(document) = self.db.get(&other, id).await? else {
            return Ok(());
        };
        if !saved.is_shared {
            let owned = codec::decode_travel_plan(&document)
                .is_ok_and(|stale| stale.owner() == user_id);
            if !owned {
                tracing::warn!(user_id, record_id = id, "Shared copy belongs to another owner; leaving it");
                return Ok(());
            }
        }
        self.db.delete(&other, id).await?;
        tracing::info!(user_id, record_id = id, %other, "Removed stale travel plan copy");
        Ok(())
    }

    /// Encode on the caller's task, write the file on the blocking pool.
    async fn store_photo(&self, photo: &DynamicImage) -> Result<String, CoreError> {
        let bytes = encode_jpeg(photo, self.photo_quality)?;
        let filename = LocalImageStore::generate_filename();
        let images = self.images.clone();
        let name = filename.clone();
        tokio::task::spawn_blocking(move || images.save(&bytes, &name))
            .await
            .map_err(|e| CoreError::LocalStorage(e.to_string()))??;
        Ok(filename)
    }

    fn remove_local_image(&self, record_id: &str, filename: &str) {
        if let Err(e) = self.images.delete(filename) {
            tracing::warn!(record_id, filename, error = %e, "Failed to remove local image");
        }
    }
}

fn decode_one<T>(
    document: &Document,
    decode: fn(&Document) -> Result<T, DecodeError>,
    entity: &'static str,
) -> Result<T, CoreError> {
    decode(document).map_err(|e| {
        tracing::warn!(document_id = %document.id, error = %e, "Unreadable document");
        CoreError::not_found(entity, document.id.as_str())
    })
}

fn sort_plans(plans: &mut [Plan]) {
    plans.sort_by_key(|p| p.start_date);
}

fn sort_visited_places(places: &mut [VisitedPlace]) {
    places.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}
