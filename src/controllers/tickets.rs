use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;

use crate::error::AppResult;
use crate::middleware::AuthUser;
use crate::models::{ApiResponse, PaymentType, Ticket, TicketRequest, TicketUpdateRequest};
use crate::services::booking;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/tickets", get(list_tickets))
        .route("/tickets/cash", post(book_cash))
        .route("/tickets/online", post(book_online))
        .route("/tickets/my-tickets", get(my_tickets))
        .route("/tickets/{id}", get(get_ticket).put(update_ticket).delete(delete_ticket))
}

/* ---------- BOOKING ---------- */

// POST /api/tickets/cash
async fn book_cash(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<TicketRequest>,
) -> AppResult<impl IntoResponse> {
    let ticket = booking::create_ticket(&state, &user, req, PaymentType::Cash).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok("Ticket booked with cash payment", ticket)),
    ))
}

// POST /api/tickets/online
async fn book_online(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<TicketRequest>,
) -> AppResult<impl IntoResponse> {
    let ticket = booking::create_ticket(&state, &user, req, PaymentType::Online).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok("Ticket reserved, online payment pending review", ticket)),
    ))
}

/* ---------- READ ---------- */

// GET /api/tickets
async fn list_tickets(State(state): State<Arc<AppState>>, user: AuthUser) -> AppResult<impl IntoResponse> {
    user.require_staff()?;
    let tickets = Ticket::list(&state.db.pool).await?;
    let views = booking::ticket_views(&state, tickets).await?;
    Ok(Json(ApiResponse::ok("Tickets retrieved successfully", views)))
}

// GET /api/tickets/my-tickets
async fn my_tickets(State(state): State<Arc<AppState>>, user: AuthUser) -> AppResult<impl IntoResponse> {
    let tickets = Ticket::by_user(&state.db.pool, user.user_id).await?;
    let views = booking::ticket_views(&state, tickets).await?;
    Ok(Json(ApiResponse::ok("Your tickets retrieved successfully", views)))
}

// GET /api/tickets/{id}
async fn get_ticket(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    let ticket = booking::find_ticket(&state, id).await?;
    user.require_self_or_staff(ticket.user_id)?;
    let view = booking::ticket_view(&state, ticket).await?;
    Ok(Json(ApiResponse::ok("Ticket retrieved successfully", view)))
}

/* ---------- WRITE ---------- */

// PUT /api/tickets/{id}
async fn update_ticket(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(req): Json<TicketUpdateRequest>,
) -> AppResult<impl IntoResponse> {
    user.require_staff()?;
    let view = booking::update_ticket(&state, id, req).await?;
    Ok(Json(ApiResponse::ok("Ticket updated successfully", view)))
}

// DELETE /api/tickets/{id}
async fn delete_ticket(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    user.require_staff()?;
    booking::delete_ticket(&state, id).await?;
    Ok(Json(ApiResponse::message("Ticket deleted successfully")))
}
