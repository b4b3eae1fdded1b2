use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch},
    Json, Router,
};
use std::sync::Arc;

use crate::error::AppResult;
use crate::middleware::AuthUser;
use crate::models::{ApiResponse, Payment, PaymentRequest, PaymentStatusRequest};
use crate::services::payments;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/payments", get(list_payments).post(create_payment))
        .route("/payments/ticket/{ticket_id}", get(payments_by_ticket))
        .route("/payments/{id}", get(get_payment).delete(delete_payment))
        .route("/payments/{id}/status", patch(update_status))
}

// POST /api/payments
async fn create_payment(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<PaymentRequest>,
) -> AppResult<impl IntoResponse> {
    let payment = payments::create_payment(&state, &user, req).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok("Payment created successfully", payment))))
}

// GET /api/payments
async fn list_payments(State(state): State<Arc<AppState>>, user: AuthUser) -> AppResult<impl IntoResponse> {
    user.require_staff()?;
    let all = Payment::list(&state.db.pool).await?;
    Ok(Json(ApiResponse::ok("Payments retrieved successfully", all)))
}

// GET /api/payments/{id}
async fn get_payment(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    let payment = payments::payment_for(&state, &user, id).await?;
    Ok(Json(ApiResponse::ok("Payment retrieved successfully", payment)))
}

// GET /api/payments/ticket/{ticket_id}
async fn payments_by_ticket(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(ticket_id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    let list = payments::payments_for_ticket(&state, &user, ticket_id).await?;
    Ok(Json(ApiResponse::ok("Payments retrieved successfully", list)))
}

// PATCH /api/payments/{id}/status
async fn update_status(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(req): Json<PaymentStatusRequest>,
) -> AppResult<impl IntoResponse> {
    user.require_staff()?;
    let payment = payments::update_status(&state, id, req.status).await?;
    Ok(Json(ApiResponse::ok("Payment status updated successfully", payment)))
}

// DELETE /api/payments/{id}
async fn delete_payment(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    user.require_staff()?;
    payments::delete_payment(&state, id).await?;
    Ok(Json(ApiResponse::message("Payment deleted successfully")))
}
