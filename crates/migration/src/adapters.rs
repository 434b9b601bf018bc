//! Bindings of the concrete store adapters to the migration seams.

use async_trait::async_trait;
use gotravel_cloudkit::CloudKitStore;
use gotravel_core::error::CoreError;
use gotravel_core::model::{Plan, TravelPlan, VisitedPlace};
use gotravel_firestore::FirestoreStore;

use crate::collection::{SourceCollection, SourceRecord, TargetCollection};

// ---------------------------------------------------------------------------
// CloudKit as source
// ---------------------------------------------------------------------------

#[async_trait]
impl SourceCollection<TravelPlan> for CloudKitStore {
    async fn fetch_all(&self, user_id: &str) -> Result<Vec<SourceRecord<TravelPlan>>, CoreError> {
        self.fetch_travel_plan_sources(user_id).await
    }
}

/// Plan records carry no asset.
#[async_trait]
impl SourceCollection<Plan> for CloudKitStore {
    async fn fetch_all(&self, user_id: &str) -> Result<Vec<SourceRecord<Plan>>, CoreError> {
        let plans = self.fetch_plans(user_id).await?;
        Ok(plans
            .into_iter()
            .map(|entity| SourceRecord {
                entity,
                image: None,
            })
            .collect())
    }
}

#[async_trait]
impl SourceCollection<VisitedPlace> for CloudKitStore {
    async fn fetch_all(
        &self,
        user_id: &str,
    ) -> Result<Vec<SourceRecord<VisitedPlace>>, CoreError> {
        self.fetch_visited_place_sources(user_id).await
    }
}

// ---------------------------------------------------------------------------
// Firestore as target
// ---------------------------------------------------------------------------

#[async_trait]
impl TargetCollection<TravelPlan> for FirestoreStore {
    async fn exists(&self, id: &str) -> Result<bool, CoreError> {
        self.exists_travel_plan(id).await
    }

    async fn insert(&self, entity: &TravelPlan) -> Result<(), CoreError> {
        self.save_travel_plan(entity).await.map(|_| ())
    }
}

#[async_trait]
impl TargetCollection<Plan> for FirestoreStore {
    async fn exists(&self, id: &str) -> Result<bool, CoreError> {
        self.exists_plan(id).await
    }

    async fn insert(&self, entity: &Plan) -> Result<(), CoreError> {
        self.save_plan(entity).await.map(|_| ())
    }
}

/// The photo, if any, is already in local storage by the time this runs.
#[async_trait]
impl TargetCollection<VisitedPlace> for FirestoreStore {
    async fn exists(&self, id: &str) -> Result<bool, CoreError> {
        self.exists_visited_place(id).await
    }

    async fn insert(&self, entity: &VisitedPlace) -> Result<(), CoreError> {
        self.save_visited_place(entity, None).await.map(|_| ())
    }
}
