use crate::{
    auth::AuthenticatedUserId,
    error::AppError,
    models::{Patch, UpdateProfileRequest},
    state::AppState,
};
use actix_web::{delete, put, web, HttpResponse, Responder};
use chrono::Utc;
use serde_json::json;
use validator::Validate;

/// Updates the caller's profile.
///
/// Absent fields are left alone; `bio` and `avatar` are cleared by `null` or `""`.
/// A new password is hashed before it is stored.
///
/// ## Responses:
/// - `200 OK`: the updated profile.
/// - `400 Bad Request`: validation failure, or the new email is taken.
/// - `404 Not Found`: the account no longer exists.
#[put("/profile")]
pub async fn update_profile(
    state: web::Data<AppState>,
    profile_data: web::Json<UpdateProfileRequest>,
    user_id: AuthenticatedUserId,
) -> Result<impl Responder, AppError> {
    let request = profile_data.into_inner().normalized();
    request.validate()?;

    let existing = state
        .store
        .users
        .find_by_id(user_id.0)
        .await?
        .ok_or_else(AppError::user_not_found)?;

    let (mut patch, password) = request.into_patch();

    if let Some(email) = patch.email.as_set() {
        if *email != existing.email && state.store.users.find_by_email(email).await?.is_some() {
            return Err(AppError::DuplicateEmail);
        }
    }
    if let Some(password) = password {
        patch.password_hash = Patch::Set(state.passwords.hash(password).await?);
    }

    let user = state
        .store
        .users
        .update(patch.apply(&existing, Utc::now()))
        .await?
        .ok_or_else(AppError::user_not_found)?;

    log::info!("User profile updated: {}", user.id);
    Ok(HttpResponse::Ok().json(user.profile()))
}

/// Deletes the caller's account and every task it owns in one store operation.
///
/// ## Responses:
/// - `200 OK`: `{ message }`.
/// - `404 Not Found`: the account no longer exists.
#[delete("/account")]
pub async fn delete_account(
    state: web::Data<AppState>,
    user_id: AuthenticatedUserId,
) -> Result<impl Responder, AppError> {
    let removed_tasks = state
        .store
        .users
        .delete_with_tasks(user_id.0)
        .await?
        .ok_or_else(AppError::user_not_found)?;

    log::info!(
        "User account deleted: {} ({} tasks removed)",
        user_id.0,
        removed_tasks
    );
    Ok(HttpResponse::Ok().json(json!({
        "message": "User account deleted successfully"
    })))
}
