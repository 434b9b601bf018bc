//! Domain records for the three persisted entity types.

pub mod plan;
pub mod travel_plan;
pub mod visited_place;

pub use plan::{Plan, PlanScheduleItem, PlanType, PlannedPlace, PLAN_RECORD_TYPE};
pub use travel_plan::{DaySchedule, PackingItem, ScheduleItem, TravelPlan, TRAVEL_PLAN_RECORD_TYPE};
pub use visited_place::{PlaceCategory, VisitedPlace, VISITED_PLACE_RECORD_TYPE};
