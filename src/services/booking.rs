//! Tickets: issuing a seat to a passenger, moving it, and giving it back.

use tracing::info;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::models::{
    Bus, Payment, PaymentPurpose, PaymentType, Seat, Ticket, TicketRequest,
    TicketResponse, TicketUpdateRequest, Trip, User,
};
use crate::services::{seats, trips};
use crate::AppState;

/// Checks that a ticket request fits the endpoint it was sent to.
///
/// Cash bookings carry no receipt, online bookings must carry one.
pub fn check_payment(req: &TicketRequest, expected: PaymentType) -> AppResult<()> {
    if req.payment_type != expected {
        let endpoint = match expected {
            PaymentType::Cash => "CASH",
            PaymentType::Online => "ONLINE",
        };
        return Err(AppError::BadRequest(format!(
            "This endpoint is for {} payments only.",
            endpoint
        )));
    }

    match (expected, req.online_receipt.is_some()) {
        (PaymentType::Cash, true) => Err(AppError::BadRequest(
            "Cash payments should not include an online receipt.".to_string(),
        )),
        (PaymentType::Online, false) => Err(AppError::BadRequest(
            "Online receipt is required for online payments.".to_string(),
        )),
        _ => Ok(()),
    }
}

/// Seats can only be taken on trips that still sell tickets.
pub fn ensure_bookable(trip: &Trip) -> AppResult<()> {
    if trip.status.accepts_bookings() {
        return Ok(());
    }
    Err(AppError::Conflict(format!(
        "Trip {} is {:?} and no longer accepts bookings",
        trip.id, trip.status
    )))
}

pub async fn find_ticket(state: &AppState, id: i64) -> AppResult<Ticket> {
    Ticket::find(&state.db.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Ticket not found with ID: {}", id)))
}

/// Books the requested seat and records the fare payment, all in one
/// transaction.
pub async fn create_ticket(
    state: &AppState,
    auth: &AuthUser,
    req: TicketRequest,
    expected: PaymentType,
) -> AppResult<TicketResponse> {
    req.validate()?;
    check_payment(&req, expected)?;
    auth.require_self_or_staff(req.user_id)?;

    let mut tx = state.db.pool.begin().await?;

    let trip = Trip::find(&mut *tx, req.trip_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Trip not found with ID: {}", req.trip_id)))?;
    ensure_bookable(&trip)?;
    let bus = Bus::find(&mut *tx, trip.bus_id)
        .await?
        .ok_or_else(|| AppError::Internal(format!("Trip {} has no bus", trip.id)))?;
    if !User::exists(&mut *tx, req.user_id).await? {
        return Err(AppError::NotFound(format!(
            "User (passenger) not found with ID: {}",
            req.user_id
        )));
    }

    let seat = seats::claim_seat(
        &mut tx,
        trip.id,
        bus.layout(),
        req.row_position,
        req.column_position,
        req.payment_type.initial_seat_status(),
    )
    .await?;
    let ticket = Ticket::create(&mut *tx, seat.id, &req).await?;
    Seat::hold(&mut *tx, seat.id, ticket.id).await?;
    Payment::create(
        &mut *tx,
        req.fare,
        req.payment_type,
        PaymentPurpose::TicketFare,
        req.online_receipt.as_deref(),
        ticket.id,
    )
    .await?;

    tx.commit().await?;
    seats::invalidate(state, trip.id).await;

    info!(
        "Ticket {} issued: seat {} on trip {} for user {} ({:?})",
        ticket.id,
        seat.seat_id(),
        trip.id,
        ticket.user_id,
        req.payment_type
    );
    ticket_view(state, ticket).await
}

/// Ticket with its seat, trip, passenger and payments.
pub async fn ticket_view(state: &AppState, ticket: Ticket) -> AppResult<TicketResponse> {
    let seat = Seat::find(&state.db.pool, ticket.seat_id)
        .await?
        .ok_or_else(|| AppError::Internal(format!("Ticket {} has no seat", ticket.id)))?;
    let trip = trips::find_trip(state, ticket.trip_id).await?;
    let trip = trips::trip_view(state, trip).await?;
    let user = User::find(&state.db.pool, ticket.user_id)
        .await?
        .ok_or_else(|| AppError::Internal(format!("Ticket {} has no passenger", ticket.id)))?;
    let payments = Payment::by_ticket(&state.db.pool, ticket.id).await?;

    Ok(TicketResponse {
        id: ticket.id,
        fare: ticket.fare,
        drop_off: ticket.drop_off,
        seat,
        trip,
        user,
        payments,
    })
}

pub async fn ticket_views(state: &AppState, tickets: Vec<Ticket>) -> AppResult<Vec<TicketResponse>> {
    let mut views = Vec::with_capacity(tickets.len());
    for ticket in tickets {
        views.push(ticket_view(state, ticket).await?);
    }
    Ok(views)
}

/// Partial update. Moving to another position or trip claims the new seat
/// with the status of the old one and opens the old one.
pub async fn update_ticket(state: &AppState, id: i64, req: TicketUpdateRequest) -> AppResult<TicketResponse> {
    req.validate()?;

    let mut tx = state.db.pool.begin().await?;
    let mut ticket = Ticket::find(&mut *tx, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Ticket not found with ID: {}", id)))?;
    let old_seat = Seat::find(&mut *tx, ticket.seat_id)
        .await?
        .ok_or_else(|| AppError::Internal(format!("Ticket {} has no seat", ticket.id)))?;

    let trip_id = req.trip_id.unwrap_or(ticket.trip_id);
    let row_position = req.row_position.unwrap_or(old_seat.row_position);
    let column_position = req.column_position.unwrap_or(old_seat.column_position);
    let moved = trip_id != old_seat.trip_id
        || row_position != old_seat.row_position
        || column_position != old_seat.column_position;

    if moved {
        if !Seat::is_held_by(&mut *tx, old_seat.id, ticket.id).await? {
            return Err(AppError::Conflict(format!(
                "Ticket {} no longer holds seat {} and cannot be moved",
                ticket.id,
                old_seat.seat_id()
            )));
        }
        let trip = Trip::find(&mut *tx, trip_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("New Trip not found with ID: {}", trip_id)))?;
        ensure_bookable(&trip)?;
        let bus = Bus::find(&mut *tx, trip.bus_id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("Trip {} has no bus", trip.id)))?;

        let new_seat = seats::claim_seat(
            &mut tx,
            trip.id,
            bus.layout(),
            row_position,
            column_position,
            old_seat.status,
        )
        .await?;
        Seat::release(&mut *tx, old_seat.id, ticket.id).await?;
        Seat::hold(&mut *tx, new_seat.id, ticket.id).await?;

        ticket.seat_id = new_seat.id;
        ticket.trip_id = trip.id;
    }

    if let Some(user_id) = req.user_id.filter(|&user_id| user_id != ticket.user_id) {
        if !User::exists(&mut *tx, user_id).await? {
            return Err(AppError::NotFound(format!(
                "New User (passenger) not found with ID: {}",
                user_id
            )));
        }
        ticket.user_id = user_id;
    }
    if let Some(fare) = req.fare {
        ticket.fare = fare;
    }
    if let Some(drop_off) = req.drop_off.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
        ticket.drop_off = drop_off.to_string();
    }

    ticket.save(&mut *tx).await?;
    tx.commit().await?;

    if moved {
        seats::invalidate(state, old_seat.trip_id).await;
        if ticket.trip_id != old_seat.trip_id {
            seats::invalidate(state, ticket.trip_id).await;
        }
        info!(
            "Ticket {} moved from seat {} (trip {}) to {}{} (trip {})",
            ticket.id,
            old_seat.seat_id(),
            old_seat.trip_id,
            row_position,
            crate::seatmap::column_letter(column_position),
            ticket.trip_id
        );
    }

    ticket_view(state, ticket).await
}

/// Removes the ticket and its payments; the seat opens up again.
pub async fn delete_ticket(state: &AppState, id: i64) -> AppResult<()> {
    let mut tx = state.db.pool.begin().await?;
    let ticket = Ticket::find(&mut *tx, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Ticket not found with ID: {}", id)))?;

    Seat::release(&mut *tx, ticket.seat_id, ticket.id).await?;
    Ticket::delete(&mut *tx, id).await?;
    tx.commit().await?;

    seats::invalidate(state, ticket.trip_id).await;
    info!("Ticket {} deleted", id);
    Ok(())
}
