//! Identity and profile handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use super::{AppState, CurrentUser};
use crate::models::profile::{Profile, UserRole};
use crate::persistence::profile_repo::ProfileRepo;
use crate::Result;

/// Body of `PUT /api/auth/profile`.
#[derive(Debug, Deserialize)]
pub struct ProfileUpdate {
    /// `teacher` or `student`.
    pub role: String,
    /// School standard; required for students.
    #[serde(default)]
    pub standard: Option<u8>,
}

/// `GET /api/auth/me`
pub async fn me(CurrentUser(user): CurrentUser) -> Json<Value> {
    Json(json!({ "id": user.id, "email": user.email }))
}

/// `GET /api/auth/profile`; nulls when no profile is stored.
///
/// # Errors
///
/// Returns `AppError::Db` if the lookup fails.
pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Value>> {
    let profile = ProfileRepo::new(Arc::clone(&state.db)).get(&user.id).await?;
    Ok(Json(profile_body(profile.as_ref())))
}

/// `PUT /api/auth/profile`
///
/// # Errors
///
/// Returns `AppError::BadRequest` for an unknown role or a student without
/// a standard in 1-12.
pub async fn put_profile(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<ProfileUpdate>,
) -> Result<Json<Value>> {
    let role = UserRole::parse(&body.role)?;
    let profile = Profile::new(user.id.clone(), role, body.standard)?;
    let saved = ProfileRepo::new(Arc::clone(&state.db)).upsert(&profile).await?;
    info!(user_id = user.id, role = role.as_str(), standard = ?saved.standard, "profile updated");
    Ok(Json(profile_body(Some(&saved))))
}

fn profile_body(profile: Option<&Profile>) -> Value {
    json!({
        "role": profile.map(|p| p.role.as_str()),
        "standard": profile.and_then(|p| p.standard),
    })
}
