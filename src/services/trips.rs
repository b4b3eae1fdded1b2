use tracing::info;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::models::{Bus, BusResponse, Route, Trip, TripCreateRequest, TripResponse, TripUpdateRequest};
use crate::services::seats;
use crate::AppState;

pub async fn find_trip(state: &AppState, id: i64) -> AppResult<Trip> {
    Trip::find(&state.db.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Trip not found with ID: {}", id)))
}

/// Trip with bus, route and the number of seats still open on its map.
pub async fn trip_view(state: &AppState, trip: Trip) -> AppResult<TripResponse> {
    let (route, (bus, map)) = futures::try_join!(
        route_of(state, &trip),
        seats::seat_map_for_trip(state, &trip),
    )?;

    Ok(TripResponse {
        id: trip.id,
        departure_time: trip.departure_time,
        status: trip.status,
        available_seats: map.open_count(),
        bus: BusResponse::from(bus),
        route,
    })
}

async fn route_of(state: &AppState, trip: &Trip) -> AppResult<Route> {
    Route::find(&state.db.pool, trip.route_id)
        .await?
        .ok_or_else(|| AppError::Internal(format!("Trip {} has no route", trip.id)))
}

pub async fn trip_views(state: &AppState, trips: Vec<Trip>) -> AppResult<Vec<TripResponse>> {
    let mut views = Vec::with_capacity(trips.len());
    for trip in trips {
        views.push(trip_view(state, trip).await?);
    }
    Ok(views)
}

/// Creates a fresh route from the request and a trip on it.
pub async fn create_trip(state: &AppState, req: TripCreateRequest) -> AppResult<TripResponse> {
    req.validate()?;

    let mut tx = state.db.pool.begin().await?;
    if Bus::find(&mut *tx, req.bus_id).await?.is_none() {
        return Err(AppError::NotFound(format!("Bus not found with ID: {}", req.bus_id)));
    }
    let route = Route::create(&mut *tx, &req.route_details).await?;
    let trip = Trip::create(
        &mut *tx,
        req.departure_time,
        req.status.unwrap_or_default(),
        req.bus_id,
        route.id,
    )
    .await?;
    tx.commit().await?;

    info!(
        "Trip {} created: {} -> {} at {}",
        trip.id, route.origin, route.destination, trip.departure_time
    );
    trip_view(state, trip).await
}

/// Partial update. A different route must exist and must not belong to
/// another trip.
pub async fn update_trip(state: &AppState, id: i64, req: TripUpdateRequest) -> AppResult<TripResponse> {
    req.validate()?;

    let mut trip = find_trip(state, id).await?;

    if let Some(departure_time) = req.departure_time {
        trip.departure_time = departure_time;
    }
    if let Some(status) = req.status {
        trip.status = status;
    }
    if let Some(bus_id) = req.bus_id.filter(|&bus_id| bus_id != trip.bus_id) {
        if Bus::find(&state.db.pool, bus_id).await?.is_none() {
            return Err(AppError::NotFound(format!("New Bus not found with ID: {}", bus_id)));
        }
        trip.bus_id = bus_id;
    }
    if let Some(route_id) = req.route_id.filter(|&route_id| route_id != trip.route_id) {
        if Route::find(&state.db.pool, route_id).await?.is_none() {
            return Err(AppError::NotFound(format!("New Route not found with ID: {}", route_id)));
        }
        if let Some(other) = Route::trip_id(&state.db.pool, route_id).await? {
            return Err(AppError::Conflict(format!(
                "Route with ID {} is already assigned to another Trip (ID: {}).",
                route_id, other
            )));
        }
        trip.route_id = route_id;
    }

    trip.save(&state.db.pool).await?;
    // A new bus changes the layout the seat map is drawn on
    seats::invalidate(state, trip.id).await;

    info!("Trip {} updated", trip.id);
    trip_view(state, trip).await
}
