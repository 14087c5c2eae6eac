/// All database primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// External-facing notebook identifier (UUID v4, generated at submission).
pub type NotebookId = uuid::Uuid;
