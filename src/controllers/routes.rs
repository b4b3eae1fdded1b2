use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use std::sync::Arc;
use tracing::info;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::models::{ApiResponse, Route, RouteRequest};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/routes", get(list_routes).post(create_route))
        .route("/routes/{id}", get(get_route).put(update_route).delete(delete_route))
}

/* ---------- READ ---------- */

// GET /api/routes
async fn list_routes(State(state): State<Arc<AppState>>, _user: AuthUser) -> AppResult<impl IntoResponse> {
    let routes = Route::list(&state.db.pool).await?;
    Ok(Json(ApiResponse::ok("Routes retrieved successfully", routes)))
}

// GET /api/routes/{id}
async fn get_route(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    let route = Route::find(&state.db.pool, id).await?.ok_or_else(|| not_found(id))?;
    Ok(Json(ApiResponse::ok("Route retrieved successfully", route)))
}

/* ---------- WRITE ---------- */

// POST /api/routes
async fn create_route(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<RouteRequest>,
) -> AppResult<impl IntoResponse> {
    user.require_admin()?;
    req.validate()?;

    let route = Route::create(&state.db.pool, &req).await?;
    info!("Route {} created: {} -> {}", route.id, route.origin, route.destination);
    Ok((StatusCode::CREATED, Json(ApiResponse::ok("Route created successfully", route))))
}

// PUT /api/routes/{id}
async fn update_route(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(req): Json<RouteRequest>,
) -> AppResult<impl IntoResponse> {
    user.require_admin()?;
    req.validate()?;

    let route = Route::update(&state.db.pool, id, &req)
        .await?
        .ok_or_else(|| not_found(id))?;
    info!("Route {} updated", route.id);
    Ok(Json(ApiResponse::ok("Route updated successfully", route)))
}

// DELETE /api/routes/{id}
async fn delete_route(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    user.require_admin()?;

    if let Some(trip_id) = Route::trip_id(&state.db.pool, id).await? {
        return Err(AppError::Conflict(format!(
            "Route {} is used by trip {} and cannot be deleted",
            id, trip_id
        )));
    }
    if !Route::delete(&state.db.pool, id).await? {
        return Err(not_found(id));
    }
    info!("Route {} deleted", id);
    Ok(Json(ApiResponse::message("Route deleted successfully")))
}

fn not_found(id: i64) -> AppError {
    AppError::NotFound(format!("Route not found with ID: {}", id))
}
