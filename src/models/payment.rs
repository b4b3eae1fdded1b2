use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection, PgExecutor};
use validator::Validate;

use crate::seatmap::SeatStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "payment_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Approved,
    Rejected,
}

impl PaymentStatus {
    /// Seat status that follows from a payment reaching this state.
    pub fn seat_status(self) -> SeatStatus {
        match self {
            PaymentStatus::Pending => SeatStatus::Reserved,
            PaymentStatus::Approved => SeatStatus::Booked,
            PaymentStatus::Rejected => SeatStatus::Open,
        }
    }

    pub fn is_final(self) -> bool {
        matches!(self, PaymentStatus::Approved | PaymentStatus::Rejected)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "payment_type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentType {
    Cash,
    Online,
}

impl PaymentType {
    /// Cash is settled at the counter; online payments wait for the
    /// uploaded receipt to be checked.
    pub fn initial_seat_status(self) -> SeatStatus {
        match self {
            PaymentType::Cash => SeatStatus::Booked,
            PaymentType::Online => SeatStatus::Reserved,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "payment_purpose", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentPurpose {
    TicketFare,
}

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: i64,
    pub amount: f64,
    pub status: PaymentStatus,
    #[serde(rename = "type")]
    pub payment_type: PaymentType,
    pub purpose: PaymentPurpose,
    pub date: NaiveDateTime,
    #[serde(with = "super::base64_bytes")]
    pub online_receipt: Option<Vec<u8>>,
    pub ticket_id: i64,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    #[validate(range(exclusive_min = 0.0))]
    pub amount: f64,
    #[serde(rename = "type")]
    pub payment_type: PaymentType,
    pub purpose: PaymentPurpose,
    #[serde(default, with = "super::base64_bytes")]
    pub online_receipt: Option<Vec<u8>>,
    #[validate(range(min = 1))]
    pub ticket_id: i64,
}

impl PaymentRequest {
    /// Receipt to store: required for online payments, dropped for cash.
    pub fn receipt(&self) -> Result<Option<&[u8]>, &'static str> {
        match (self.payment_type, self.online_receipt.as_deref()) {
            (PaymentType::Online, None) => Err("Online receipt is required for online payments."),
            (PaymentType::Online, Some(receipt)) => Ok(Some(receipt)),
            (PaymentType::Cash, _) => Ok(None),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PaymentStatusRequest {
    pub status: PaymentStatus,
}

const COLUMNS: &str = "id, amount, status, payment_type, purpose, date, online_receipt, ticket_id";

impl Payment {
    pub async fn list<'e, E: PgExecutor<'e>>(db: E) -> Result<Vec<Payment>, sqlx::Error> {
        sqlx::query_as::<_, Payment>(&format!("SELECT {COLUMNS} FROM payments ORDER BY id"))
            .fetch_all(db)
            .await
    }

    pub async fn find<'e, E: PgExecutor<'e>>(db: E, id: i64) -> Result<Option<Payment>, sqlx::Error> {
        sqlx::query_as::<_, Payment>(&format!("SELECT {COLUMNS} FROM payments WHERE id = $1"))
            .bind(id)
            .fetch_optional(db)
            .await
    }

    /// Locks the payment for the rest of the transaction.
    pub async fn find_for_update(conn: &mut PgConnection, id: i64) -> Result<Option<Payment>, sqlx::Error> {
        sqlx::query_as::<_, Payment>(&format!("SELECT {COLUMNS} FROM payments WHERE id = $1 FOR UPDATE"))
            .bind(id)
            .fetch_optional(conn)
            .await
    }

    pub async fn by_ticket<'e, E: PgExecutor<'e>>(db: E, ticket_id: i64) -> Result<Vec<Payment>, sqlx::Error> {
        sqlx::query_as::<_, Payment>(&format!(
            "SELECT {COLUMNS} FROM payments WHERE ticket_id = $1 ORDER BY date"
        ))
        .bind(ticket_id)
        .fetch_all(db)
        .await
    }

    /// New payments always start out pending.
    pub async fn create<'e, E: PgExecutor<'e>>(
        db: E,
        amount: f64,
        payment_type: PaymentType,
        purpose: PaymentPurpose,
        online_receipt: Option<&[u8]>,
        ticket_id: i64,
    ) -> Result<Payment, sqlx::Error> {
        sqlx::query_as::<_, Payment>(&format!(
            "INSERT INTO payments (amount, status, payment_type, purpose, date, online_receipt, ticket_id)
             VALUES ($1, 'PENDING', $2, $3, NOW(), $4, $5)
             RETURNING {COLUMNS}"
        ))
        .bind(amount)
        .bind(payment_type)
        .bind(purpose)
        .bind(online_receipt)
        .bind(ticket_id)
        .fetch_one(db)
        .await
    }

    pub async fn set_status<'e, E: PgExecutor<'e>>(
        db: E,
        id: i64,
        status: PaymentStatus,
    ) -> Result<Payment, sqlx::Error> {
        sqlx::query_as::<_, Payment>(&format!(
            "UPDATE payments SET status = $2 WHERE id = $1 RETURNING {COLUMNS}"
        ))
        .bind(id)
        .bind(status)
        .fetch_one(db)
        .await
    }

    pub async fn delete<'e, E: PgExecutor<'e>>(db: E, id: i64) -> Result<bool, sqlx::Error> {
        sqlx::query("DELETE FROM payments WHERE id = $1")
            .bind(id)
            .execute(db)
            .await
            .map(|r| r.rows_affected() > 0)
    }
}
