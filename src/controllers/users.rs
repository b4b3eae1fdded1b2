use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::{issue_token, AuthUser};
use crate::models::{ApiResponse, UpdateRoleRequest, User, UserUpdateRequest};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/user", get(list_users))
        .route("/user/role", put(update_role))
        .route("/user/self/{id}", put(update_self))
        .route("/user/{id}", put(update_user).delete(delete_user))
}

/// Returned after editing your own profile: the old token carries stale
/// claims, so a fresh one comes back with the user.
#[derive(Debug, Serialize)]
struct AuthResponse {
    token: String,
    user: User,
}

// GET /api/user
async fn list_users(State(state): State<Arc<AppState>>, user: AuthUser) -> AppResult<impl IntoResponse> {
    user.require_admin()?;
    let users = User::list(&state.db.pool).await?;
    Ok(Json(ApiResponse::ok("All users retrieved successfully.", users)))
}

// PUT /api/user/role
async fn update_role(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<UpdateRoleRequest>,
) -> AppResult<impl IntoResponse> {
    user.require_admin()?;
    req.validate()?;

    let updated = User::set_role_by_email(&state.db.pool, req.email.trim(), req.role)
        .await?
        .ok_or_else(|| AppError::BadRequest("User role update failed.".to_string()))?;
    info!("User {} is now {:?} (changed by {})", updated.email, updated.role, user.email);
    Ok(Json(ApiResponse::ok("User role updated successfully.", updated)))
}

// PUT /api/user/{id}
async fn update_user(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(req): Json<UserUpdateRequest>,
) -> AppResult<impl IntoResponse> {
    user.require_admin()?;
    let updated = update_details(&state, id, &req).await?;
    Ok(Json(ApiResponse::ok("User details updated successfully.", updated)))
}

// PUT /api/user/self/{id}
async fn update_self(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(req): Json<UserUpdateRequest>,
) -> AppResult<impl IntoResponse> {
    if user.user_id != id {
        return Err(AppError::Forbidden("You can only update your own profile".to_string()));
    }
    let updated = update_details(&state, id, &req).await?;

    let token = issue_token(&state.config.jwt, &updated).map_err(|e| {
        error!("Failed to issue token for user {}: {}", updated.id, e);
        AppError::Internal("token issuing failed".to_string())
    })?;
    Ok(Json(ApiResponse::ok(
        "User details updated successfully.",
        AuthResponse { token, user: updated },
    )))
}

// DELETE /api/user/{id}
async fn delete_user(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    user.require_admin()?;
    if !User::delete(&state.db.pool, id).await? {
        return Err(not_found(id));
    }
    info!("User {} deleted by {}", id, user.email);
    Ok(Json(ApiResponse::message("User deleted successfully.")))
}

/* ---------- helpers ---------- */

async fn update_details(state: &AppState, id: i64, req: &UserUpdateRequest) -> AppResult<User> {
    req.validate()?;
    User::update_details(&state.db.pool, id, req)
        .await?
        .ok_or_else(|| not_found(id))
}

fn not_found(id: i64) -> AppError {
    AppError::NotFound(format!("User not found with ID: {}", id))
}
