//! Payments and the seat status that follows from them.

use tracing::{info, warn};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::models::{Payment, PaymentRequest, PaymentStatus, Seat, Ticket};
use crate::services::{booking, seats};
use crate::AppState;

pub async fn find_payment(state: &AppState, id: i64) -> AppResult<Payment> {
    Payment::find(&state.db.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Payment not found with ID: {}", id)))
}

/// Payment lookup for a caller: passengers only see payments on their own
/// tickets.
pub async fn payment_for(state: &AppState, auth: &AuthUser, id: i64) -> AppResult<Payment> {
    let payment = find_payment(state, id).await?;
    let ticket = booking::find_ticket(state, payment.ticket_id).await?;
    auth.require_self_or_staff(ticket.user_id)?;
    Ok(payment)
}

pub async fn payments_for_ticket(state: &AppState, auth: &AuthUser, ticket_id: i64) -> AppResult<Vec<Payment>> {
    let ticket = booking::find_ticket(state, ticket_id).await?;
    auth.require_self_or_staff(ticket.user_id)?;
    Ok(Payment::by_ticket(&state.db.pool, ticket_id).await?)
}

/// Records an extra payment on a ticket. The seat is left untouched until
/// the payment is reviewed.
pub async fn create_payment(state: &AppState, auth: &AuthUser, req: PaymentRequest) -> AppResult<Payment> {
    req.validate()?;
    let receipt = req
        .receipt()
        .map_err(|msg| AppError::BadRequest(msg.to_string()))?;

    let ticket = booking::find_ticket(state, req.ticket_id).await?;
    auth.require_self_or_staff(ticket.user_id)?;

    let payment = Payment::create(
        &state.db.pool,
        req.amount,
        req.payment_type,
        req.purpose,
        receipt,
        ticket.id,
    )
    .await?;

    info!(
        "Payment {} of {:.2} ({:?}) recorded for ticket {}",
        payment.id, payment.amount, payment.payment_type, ticket.id
    );
    Ok(payment)
}

/// Whether a payment may move from `current` to `next`.
///
/// `Ok(false)` means there is nothing to do: a final status set again.
pub fn check_transition(current: PaymentStatus, next: PaymentStatus) -> AppResult<bool> {
    if current == PaymentStatus::Approved && next == PaymentStatus::Pending {
        return Err(AppError::BadRequest(
            "Cannot change status from APPROVED to PENDING.".to_string(),
        ));
    }
    Ok(!(current.is_final() && current == next))
}

/// Reviews a payment and carries the outcome over to the ticket's seat.
///
/// The payment row stays locked from the transition check to the commit,
/// so concurrent reviews apply one after the other.
///
/// The seat only follows the payment while the ticket holds it. A ticket
/// whose seat was released may take it back if nobody else has, otherwise
/// it can still be rejected but not approved again.
pub async fn update_status(state: &AppState, id: i64, status: PaymentStatus) -> AppResult<Payment> {
    let mut tx = state.db.pool.begin().await?;
    let payment = Payment::find_for_update(&mut tx, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Payment not found with ID: {}", id)))?;
    if !check_transition(payment.status, status)? {
        return Ok(payment);
    }

    let ticket = Ticket::find(&mut *tx, payment.ticket_id)
        .await?
        .ok_or_else(|| AppError::Internal(format!("Payment {} has no ticket", payment.id)))?;

    if status == PaymentStatus::Rejected {
        if Seat::release(&mut *tx, ticket.seat_id, ticket.id).await? {
            info!("Seat record {} released after payment {} was rejected", ticket.seat_id, payment.id);
        }
    } else {
        let seat = Seat::set_status_for_ticket(&mut *tx, ticket.seat_id, ticket.id, status.seat_status())
            .await?
            .ok_or_else(|| {
                warn!(
                    "Payment {} belongs to ticket {} which no longer holds seat record {}",
                    payment.id, ticket.id, ticket.seat_id
                );
                AppError::Conflict(format!(
                    "The seat of ticket {} has been given to another booking",
                    ticket.id
                ))
            })?;
        info!(
            "Seat {} on trip {} is now {:?} after payment {}",
            seat.seat_id(),
            seat.trip_id,
            seat.status,
            payment.id
        );
    }

    let updated = Payment::set_status(&mut *tx, payment.id, status).await?;
    tx.commit().await?;

    seats::invalidate(state, ticket.trip_id).await;
    info!("Payment {} moved from {:?} to {:?}", payment.id, payment.status, updated.status);
    Ok(updated)
}

pub async fn delete_payment(state: &AppState, id: i64) -> AppResult<()> {
    if !Payment::delete(&state.db.pool, id).await? {
        return Err(AppError::NotFound(format!("Payment not found with ID: {}", id)));
    }
    info!("Payment {} deleted", id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn approved_cannot_go_back_to_pending() {
        let err = check_transition(PaymentStatus::Approved, PaymentStatus::Pending).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn repeating_a_final_status_is_a_no_op() {
        assert!(!check_transition(PaymentStatus::Approved, PaymentStatus::Approved).unwrap());
        assert!(!check_transition(PaymentStatus::Rejected, PaymentStatus::Rejected).unwrap());
    }

    #[test]
    fn other_transitions_apply() {
        assert!(check_transition(PaymentStatus::Pending, PaymentStatus::Approved).unwrap());
        assert!(check_transition(PaymentStatus::Pending, PaymentStatus::Rejected).unwrap());
        assert!(check_transition(PaymentStatus::Rejected, PaymentStatus::Pending).unwrap());
        assert!(check_transition(PaymentStatus::Approved, PaymentStatus::Rejected).unwrap());
        assert!(check_transition(PaymentStatus::Pending, PaymentStatus::Pending).unwrap());
    }
}
