//! Collection layout: per-user subcollections plus one top-level
//! collection for shared travel plans.

use serde::{Deserialize, Serialize};

pub const USERS: &str = "users";
pub const TRAVEL_PLANS: &str = "travelPlans";
pub const PLANS: &str = "plans";
pub const VISITED_PLACES: &str = "visitedPlaces";
pub const SHARED_TRAVEL_PLANS: &str = "sharedTravelPlans";

/// Slash-separated collection path, e.g. `users/u1/plans`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CollectionPath(String);

impl CollectionPath {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn user_travel_plans(user_id: &str) -> Self {
        Self(format!("{USERS}/{user_id}/{TRAVEL_PLANS}"))
    }

    pub fn user_plans(user_id: &str) -> Self {
        Self(format!("{USERS}/{user_id}/{PLANS}"))
    }

    pub fn user_visited_places(user_id: &str) -> Self {
        Self(format!("{USERS}/{user_id}/{VISITED_PLACES}"))
    }

    pub fn shared_travel_plans() -> Self {
        Self(SHARED_TRAVEL_PLANS.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
