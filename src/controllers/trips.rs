use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::models::trip::{SeatMapQuery, TripsQuery};
use crate::models::{ApiResponse, Trip, TripCreateRequest, TripUpdateRequest};
use crate::seatmap::Selection;
use crate::services::{seats, trips};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/trips", get(list_trips).post(create_trip))
        .route("/trips/{id}", get(get_trip).put(update_trip).delete(delete_trip))
        .route("/trips/{id}/seat-map", get(seat_map))
}

/* ---------- READ ---------- */

// GET /api/trips[?date=YYYY-MM-DD]
async fn list_trips(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Query(query): Query<TripsQuery>,
) -> AppResult<impl IntoResponse> {
    let rows = match query.date {
        Some(date) => Trip::list_by_date(&state.db.pool, date).await?,
        None => Trip::list(&state.db.pool).await?,
    };
    let views = trips::trip_views(&state, rows).await?;
    Ok(Json(ApiResponse::ok("Trips retrieved successfully", views)))
}

// GET /api/trips/{id}
async fn get_trip(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    let trip = trips::find_trip(&state, id).await?;
    let view = trips::trip_view(&state, trip).await?;
    Ok(Json(ApiResponse::ok("Trip retrieved successfully", view)))
}

// GET /api/trips/{id}/seat-map[?selected=3B]
async fn seat_map(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Path(id): Path<i64>,
    Query(query): Query<SeatMapQuery>,
) -> AppResult<impl IntoResponse> {
    let trip = trips::find_trip(&state, id).await?;
    let (_, map) = seats::seat_map_for_trip(&state, &trip).await?;

    let mut selection = Selection::default();
    if let Some(seat) = query.selected.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        if !map.select(&mut selection, seat) {
            debug!("{:?} is not an open seat on trip {}, selection ignored", seat, id);
        }
    }

    Ok(Json(ApiResponse::ok(
        "Seat map retrieved successfully",
        map.view(selection.as_deref()),
    )))
}

/* ---------- WRITE ---------- */

// POST /api/trips
async fn create_trip(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<TripCreateRequest>,
) -> AppResult<impl IntoResponse> {
    user.require_admin()?;
    let view = trips::create_trip(&state, req).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok("Trip created successfully", view))))
}

// PUT /api/trips/{id}
async fn update_trip(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(req): Json<TripUpdateRequest>,
) -> AppResult<impl IntoResponse> {
    user.require_admin()?;
    let view = trips::update_trip(&state, id, req).await?;
    Ok(Json(ApiResponse::ok("Trip updated successfully", view)))
}

// DELETE /api/trips/{id}
async fn delete_trip(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    user.require_admin()?;
    if !Trip::delete(&state.db.pool, id).await? {
        return Err(AppError::NotFound(format!("Trip not found with ID: {}", id)));
    }
    seats::invalidate(&state, id).await;
    info!("Trip {} deleted", id);
    Ok(Json(ApiResponse::message("Trip deleted successfully")))
}
