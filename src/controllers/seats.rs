use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, patch},
    Json, Router,
};
use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::models::{ApiResponse, SeatStatusRequest, Trip};
use crate::services::seats;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/seats/by-trip/{trip_id}", get(seats_by_trip))
        .route("/seats/by-trip/{trip_id}/status", patch(set_status))
}

// GET /api/seats/by-trip/{trip_id}
async fn seats_by_trip(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Path(trip_id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    if !Trip::exists(&state.db.pool, trip_id).await? {
        return Err(AppError::NotFound(format!("Trip not found with ID: {}", trip_id)));
    }
    let records = seats::seats_for_trip(&state, trip_id).await?;
    Ok(Json(ApiResponse::ok("Seats retrieved successfully", records)))
}

// PATCH /api/seats/by-trip/{trip_id}/status
async fn set_status(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(trip_id): Path<i64>,
    Json(req): Json<SeatStatusRequest>,
) -> AppResult<impl IntoResponse> {
    user.require_admin()?;
    let seat = seats::set_seat_status(&state, trip_id, &req).await?;
    Ok(Json(ApiResponse::ok("Seat status updated successfully", seat)))
}
