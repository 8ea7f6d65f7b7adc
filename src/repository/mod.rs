//! Repository layer for database persistence.
//!
//! All database access uses Diesel ORM with compile-time query checking
//! over SQLite, wrapped async via diesel-async.

pub mod category;
pub mod migrations;
pub mod models;
pub mod pool;
pub mod product;

pub use category::CategoryRepository;
pub use migrations::run_migrations;
pub use pool::{AsyncSqlitePool, DieselError};
pub use product::ProductRepository;

use chrono::{DateTime, NaiveDate, Utc};

/// Parse a datetime string from the database, defaulting to Unix epoch on
/// error.
pub fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(DateTime::UNIX_EPOCH)
}

/// Parse an optional datetime string from the database.
pub fn parse_datetime_opt(s: Option<String>) -> Option<DateTime<Utc>> {
    s.and_then(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
    })
}

/// Parse an optional date column (YYYY-MM-DD).
pub fn parse_date_opt(s: Option<String>) -> Option<NaiveDate> {
    s.and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok())
}

/// Current timestamp in the RFC3339 form all tables store.
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

/// True when the error is a unique-constraint violation (the benign race
/// the reconciler recovers from by re-querying the natural key).
pub fn is_unique_violation(err: &DieselError) -> bool {
    matches!(
        err,
        DieselError::DatabaseError(diesel::result::DatabaseErrorKind::UniqueViolation, _)
    )
}
