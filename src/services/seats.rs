//! Seat records of a trip and the seat map built from them.

use sqlx::PgConnection;
use tracing::{debug, info};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::models::{Bus, Seat, SeatStatus, SeatStatusRequest, Trip};
use crate::seatmap::{BusLayout, SeatId, SeatMap, SeatRecord};
use crate::AppState;

/// Seat records of a trip, from the cache when possible.
///
/// The generation is read before the database, so a result that raced a
/// booking is filed under a generation the booking already retired.
pub async fn seats_for_trip(state: &AppState, trip_id: i64) -> AppResult<Vec<Seat>> {
    let cached = match &state.cache {
        Some(cache) => cache.generation(trip_id).await.map(|generation| (cache, generation)),
        None => None,
    };

    if let Some((cache, generation)) = cached {
        if let Some(seats) = cache.get_seats(trip_id, generation).await {
            return Ok(seats);
        }
        let seats = Seat::by_trip(&state.db.pool, trip_id).await?;
        cache.put_seats(trip_id, generation, &seats).await;
        return Ok(seats);
    }

    Ok(Seat::by_trip(&state.db.pool, trip_id).await?)
}

pub async fn invalidate(state: &AppState, trip_id: i64) {
    if let Some(cache) = &state.cache {
        cache.invalidate(trip_id).await;
    }
}

pub fn seat_map(layout: BusLayout, seats: &[Seat]) -> SeatMap {
    SeatMap::from_records(layout, seats.iter().map(SeatRecord::from))
}

/// Seat map of a trip laid over its bus.
pub async fn seat_map_for_trip(state: &AppState, trip: &Trip) -> AppResult<(Bus, SeatMap)> {
    let bus = Bus::find(&state.db.pool, trip.bus_id)
        .await?
        .ok_or_else(|| AppError::Internal(format!("Trip {} has no bus", trip.id)))?;
    let seats = seats_for_trip(state, trip.id).await?;
    let map = seat_map(bus.layout(), &seats);
    Ok((bus, map))
}

/// Takes the seat at a position for a booking, inside the caller's
/// transaction.
///
/// The position has to lie inside the layout and be selectable on the
/// current seat map. A record left open by an earlier booking is reused.
pub async fn claim_seat(
    conn: &mut PgConnection,
    trip_id: i64,
    layout: BusLayout,
    row_position: i32,
    column_position: i32,
    status: SeatStatus,
) -> AppResult<Seat> {
    let seat_id = SeatId::new(row_position, column_position);
    if !layout.contains(row_position, column_position) {
        return Err(AppError::BadRequest(format!(
            "Seat {} is outside the {}x{} layout of this bus",
            seat_id, layout.row_count, layout.column_count
        )));
    }

    let existing = Seat::find_at_for_update(&mut *conn, trip_id, row_position, column_position).await?;
    let seats = Seat::by_trip(&mut *conn, trip_id).await?;
    let map = seat_map(layout, &seats);
    if !map.can_select(seat_id.as_str()) {
        return Err(AppError::Conflict(format!(
            "Seat {} is {:?} on trip {}",
            seat_id,
            map.classify(seat_id.as_str(), None),
            trip_id
        )));
    }

    let seat = match existing {
        Some(open) => Seat::set_status(&mut *conn, open.id, status).await?,
        None => Seat::insert(&mut *conn, trip_id, row_position, column_position, status).await?,
    };
    debug!("Seat {} on trip {} is now {:?}", seat_id, trip_id, seat.status);
    Ok(seat)
}

/// Administrative status change: block a seat or open it again.
///
/// Only open and unavailable are accepted here; bookings and reservations
/// go through tickets and payments.
pub async fn set_seat_status(state: &AppState, trip_id: i64, req: &SeatStatusRequest) -> AppResult<Seat> {
    req.validate()?;
    if !matches!(req.status, SeatStatus::Open | SeatStatus::Unavailable) {
        return Err(AppError::BadRequest(
            "Seats can only be marked OPEN or UNAVAILABLE directly".to_string(),
        ));
    }

    let mut tx = state.db.pool.begin().await?;
    let trip = Trip::find(&mut *tx, trip_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Trip not found with ID: {}", trip_id)))?;
    let bus = Bus::find(&mut *tx, trip.bus_id)
        .await?
        .ok_or_else(|| AppError::Internal(format!("Trip {} has no bus", trip.id)))?;

    let seat_id = SeatId::new(req.row_position, req.column_position);
    let existing = Seat::find_at_for_update(&mut tx, trip_id, req.row_position, req.column_position).await?;
    let seat = match existing {
        Some(seat) if matches!(seat.status, SeatStatus::Booked | SeatStatus::Reserved) => {
            return Err(AppError::Conflict(format!(
                "Seat {} is held by a ticket and cannot be changed directly",
                seat_id
            )));
        }
        Some(seat) => Seat::set_status(&mut *tx, seat.id, req.status).await?,
        None => {
            claim_seat(&mut tx, trip_id, bus.layout(), req.row_position, req.column_position, req.status)
                .await?
        }
    };
    tx.commit().await?;

    invalidate(state, trip_id).await;
    info!("Seat {} on trip {} marked {:?}", seat_id, trip_id, seat.status);
    Ok(seat)
}
