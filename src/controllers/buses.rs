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
use crate::models::{ApiResponse, Bus, BusRequest, BusResponse};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/buses", get(list_buses).post(create_bus))
        .route("/buses/{id}", get(get_bus).put(update_bus).delete(delete_bus))
}

/* ---------- READ ---------- */

// GET /api/buses
async fn list_buses(State(state): State<Arc<AppState>>, user: AuthUser) -> AppResult<impl IntoResponse> {
    user.require_staff()?;
    let buses: Vec<BusResponse> = Bus::list(&state.db.pool)
        .await?
        .into_iter()
        .map(BusResponse::from)
        .collect();
    Ok(Json(ApiResponse::ok("Buses retrieved successfully", buses)))
}

// GET /api/buses/{id}
async fn get_bus(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    user.require_staff()?;
    let bus = find_bus(&state, id).await?;
    Ok(Json(ApiResponse::ok("Bus retrieved successfully", BusResponse::from(bus))))
}

/* ---------- WRITE ---------- */

// POST /api/buses
async fn create_bus(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<BusRequest>,
) -> AppResult<impl IntoResponse> {
    user.require_admin()?;
    req.validate()?;

    let bus = Bus::create(&state.db.pool, &req).await.map_err(|e| duplicate_plate(e, &req))?;
    info!("Bus {} ({}) created with {}x{} seats", bus.id, bus.plate_number, bus.row_count, bus.column_count);

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok("Bus created successfully", BusResponse::from(bus))),
    ))
}

// PUT /api/buses/{id}
async fn update_bus(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(req): Json<BusRequest>,
) -> AppResult<impl IntoResponse> {
    user.require_admin()?;
    req.validate()?;

    let bus = Bus::update(&state.db.pool, id, &req)
        .await
        .map_err(|e| duplicate_plate(e, &req))?
        .ok_or_else(|| not_found(id))?;
    info!("Bus {} updated", bus.id);

    Ok(Json(ApiResponse::ok("Bus updated successfully", BusResponse::from(bus))))
}

// DELETE /api/buses/{id}
async fn delete_bus(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    user.require_admin()?;
    if !Bus::delete(&state.db.pool, id).await? {
        return Err(not_found(id));
    }
    info!("Bus {} deleted", id);
    Ok(Json(ApiResponse::message("Bus deleted successfully")))
}

/* ---------- helpers ---------- */

async fn find_bus(state: &AppState, id: i64) -> AppResult<Bus> {
    Bus::find(&state.db.pool, id).await?.ok_or_else(|| not_found(id))
}

fn not_found(id: i64) -> AppError {
    AppError::NotFound(format!("Bus not found with ID: {}", id))
}

fn duplicate_plate(err: sqlx::Error, req: &BusRequest) -> AppError {
    match AppError::from(err) {
        AppError::Conflict(_) => AppError::Conflict(format!(
            "Bus with plate number {} already exists",
            req.plate_number.trim()
        )),
        other => other,
    }
}
