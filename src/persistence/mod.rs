//! Persistence layer modules.

pub mod conversation_repo;
pub mod db;
pub mod message_repo;
pub mod profile_repo;
pub mod schema;
pub mod store;

/// Re-export the database pool type for convenience.
pub use sqlx::SqlitePool;

use chrono::{DateTime, Utc};

use crate::{AppError, Result};

/// Parse an RFC 3339 column value into a UTC timestamp.
pub(crate) fn parse_timestamp(column: &str, raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| AppError::Db(format!("invalid {column}: {e}")))
}
