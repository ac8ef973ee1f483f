//! User profile model: role and school standard.

use std::ops::RangeInclusive;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AppError, Result};

/// Valid school standards (grades).
pub const STANDARDS: RangeInclusive<u8> = 1..=12;

/// Role a user plays in the classroom.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Educator.
    Teacher,
    /// Learner in a given standard.
    Student,
}

impl UserRole {
    /// Storage / wire representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Teacher => "teacher",
            Self::Student => "student",
        }
    }

    /// Parse the storage representation.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` for anything but `teacher` / `student`.
    pub fn parse(raw: &str) -> Result<Self> {
        match raw {
            "teacher" => Ok(Self::Teacher),
            "student" => Ok(Self::Student),
            _ => Err(AppError::BadRequest(
                "role must be 'teacher' or 'student'".into(),
            )),
        }
    }
}

/// Profile entity persisted in `SQLite`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Profile {
    /// Owning user identifier.
    pub user_id: String,
    /// Classroom role.
    pub role: UserRole,
    /// Standard 1-12 for students; always `None` for teachers.
    pub standard: Option<u8>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// Build a validated profile.
    ///
    /// Students must name a standard within [`STANDARDS`]; a standard given
    /// for a teacher is discarded.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` when a student has no valid standard.
    pub fn new(user_id: String, role: UserRole, standard: Option<u8>) -> Result<Self> {
        let standard = match role {
            UserRole::Teacher => None,
            UserRole::Student => match standard {
                Some(s) if STANDARDS.contains(&s) => Some(s),
                _ => {
                    return Err(AppError::BadRequest(
                        "students must specify standard 1-12".into(),
                    ))
                }
            },
        };

        Ok(Self {
            user_id,
            role,
            standard,
            updated_at: Utc::now(),
        })
    }
}
