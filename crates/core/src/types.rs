/// Opaque string identifier used by both remote stores.
pub type RecordId = String;

/// Authenticated user identifier.
pub type UserId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Generate a fresh client-side identifier (UUID v4, uppercase like the
/// identifiers the mobile client produces).
pub fn new_record_id() -> RecordId {
    uuid::Uuid::new_v4().to_string().to_uppercase()
}
