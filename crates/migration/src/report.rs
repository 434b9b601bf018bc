//! Counters describing what a migration run did.

use serde::Serialize;

/// Per-entity-type counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TypeReport {
    /// Records read from the source.
    pub fetched: usize,
    /// Records written to the target.
    pub migrated: usize,
    /// Records left alone because the target already had them (or they
    /// had no id to check).
    pub skipped: usize,
    /// Images written to local storage on the way.
    pub images_rehomed: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    /// The completion flag was already set; nothing was read or written.
    pub already_completed: bool,
    pub travel_plans: TypeReport,
    pub plans: TypeReport,
    pub visited_places: TypeReport,
}

impl MigrationReport {
    pub fn previously_completed() -> Self {
        Self {
            already_completed: true,
            ..Self::default()
        }
    }

    pub fn total_migrated(&self) -> usize {
        self.travel_plans.migrated + self.plans.migrated + self.visited_places.migrated
    }

    pub fn total_skipped(&self) -> usize {
        self.travel_plans.skipped + self.plans.skipped + self.visited_places.skipped
    }
}
