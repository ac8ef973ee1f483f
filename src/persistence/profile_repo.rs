//! User profile repository for `SQLite` persistence.

use std::sync::Arc;

use crate::models::profile::{Profile, UserRole};
use crate::{AppError, Result};

use super::db::Database;
use super::parse_timestamp;

/// Repository for user profile records.
#[derive(Clone)]
pub struct ProfileRepo {
    db: Arc<Database>,
}

#[derive(sqlx::FromRow)]
struct ProfileRow {
    user_id: String,
    role: String,
    standard: Option<i64>,
    updated_at: String,
}

impl ProfileRow {
    fn into_profile(self) -> Result<Profile> {
        let role = UserRole::parse(&self.role)
            .map_err(|_| AppError::Db(format!("invalid profile role: {}", self.role)))?;
        let standard = self
            .standard
            .map(u8::try_from)
            .transpose()
            .map_err(|e| AppError::Db(format!("invalid standard: {e}")))?;

        Ok(Profile {
            updated_at: parse_timestamp("updated_at", &self.updated_at)?,
            user_id: self.user_id,
            role,
            standard,
        })
    }
}

impl ProfileRepo {
    /// Create a new repository instance.
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Fetch a user's profile, if one has been set.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn get(&self, user_id: &str) -> Result<Option<Profile>> {
        let row: Option<ProfileRow> = sqlx::query_as(
            "SELECT user_id, role, standard, updated_at FROM user_profile WHERE user_id = ?1",
        )
        .bind(user_id)
        .fetch_optional(self.db.as_ref())
        .await?;

        row.map(ProfileRow::into_profile).transpose()
    }

    /// Insert or replace a user's profile.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the upsert fails.
    pub async fn upsert(&self, profile: &Profile) -> Result<Profile> {
        sqlx::query(
            "INSERT INTO user_profile (user_id, role, standard, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(user_id) DO UPDATE SET
                role = excluded.role,
                standard = excluded.standard,
                updated_at = excluded.updated_at",
        )
        .bind(&profile.user_id)
        .bind(profile.role.as_str())
        .bind(profile.standard.map(i64::from))
        .bind(profile.updated_at.to_rfc3339())
        .execute(self.db.as_ref())
        .await?;

        Ok(profile.clone())
    }
}
