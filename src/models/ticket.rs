use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgExecutor};
use validator::Validate;

use super::{Payment, PaymentType, Seat, TripResponse, User};

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: i64,
    pub seat_id: i64,
    pub trip_id: i64,
    pub fare: f64,
    pub drop_off: String,
    pub user_id: i64,
}

/// Booking of one seat on one trip for one passenger.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TicketRequest {
    #[validate(range(min = 1))]
    pub row_position: i32,
    #[validate(range(min = 1))]
    pub column_position: i32,
    #[validate(range(min = 1))]
    pub trip_id: i64,
    #[validate(range(exclusive_min = 0.0))]
    pub fare: f64,
    #[validate(length(min = 1, max = 100), custom(function = "super::not_blank"))]
    pub drop_off: String,
    #[validate(range(min = 1))]
    pub user_id: i64,
    pub payment_type: PaymentType,
    #[serde(default, with = "super::base64_bytes")]
    pub online_receipt: Option<Vec<u8>>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TicketUpdateRequest {
    #[validate(range(min = 1))]
    pub row_position: Option<i32>,
    #[validate(range(min = 1))]
    pub column_position: Option<i32>,
    #[validate(range(min = 1))]
    pub trip_id: Option<i64>,
    #[validate(range(exclusive_min = 0.0))]
    pub fare: Option<f64>,
    #[validate(length(max = 100))]
    pub drop_off: Option<String>,
    #[validate(range(min = 1))]
    pub user_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketResponse {
    pub id: i64,
    pub fare: f64,
    pub drop_off: String,
    pub seat: Seat,
    pub trip: TripResponse,
    pub user: User,
    pub payments: Vec<Payment>,
}

const COLUMNS: &str = "id, seat_id, trip_id, fare, drop_off, user_id";

impl Ticket {
    pub async fn list<'e, E: PgExecutor<'e>>(db: E) -> Result<Vec<Ticket>, sqlx::Error> {
        sqlx::query_as::<_, Ticket>(&format!("SELECT {COLUMNS} FROM tickets ORDER BY id"))
            .fetch_all(db)
            .await
    }

    pub async fn by_user<'e, E: PgExecutor<'e>>(db: E, user_id: i64) -> Result<Vec<Ticket>, sqlx::Error> {
        sqlx::query_as::<_, Ticket>(&format!("SELECT {COLUMNS} FROM tickets WHERE user_id = $1 ORDER BY id"))
            .bind(user_id)
            .fetch_all(db)
            .await
    }

    pub async fn find<'e, E: PgExecutor<'e>>(db: E, id: i64) -> Result<Option<Ticket>, sqlx::Error> {
        sqlx::query_as::<_, Ticket>(&format!("SELECT {COLUMNS} FROM tickets WHERE id = $1"))
            .bind(id)
            .fetch_optional(db)
            .await
    }

    pub async fn create<'e, E: PgExecutor<'e>>(
        db: E,
        seat_id: i64,
        req: &TicketRequest,
    ) -> Result<Ticket, sqlx::Error> {
        sqlx::query_as::<_, Ticket>(&format!(
            "INSERT INTO tickets (seat_id, trip_id, fare, drop_off, user_id)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        ))
        .bind(seat_id)
        .bind(req.trip_id)
        .bind(req.fare)
        .bind(req.drop_off.trim())
        .bind(req.user_id)
        .fetch_one(db)
        .await
    }

    pub async fn save<'e, E: PgExecutor<'e>>(&self, db: E) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE tickets SET seat_id = $2, trip_id = $3, fare = $4, drop_off = $5, user_id = $6
             WHERE id = $1",
        )
        .bind(self.id)
        .bind(self.seat_id)
        .bind(self.trip_id)
        .bind(self.fare)
        .bind(&self.drop_off)
        .bind(self.user_id)
        .execute(db)
        .await?;
        Ok(())
    }

    pub async fn delete<'e, E: PgExecutor<'e>>(db: E, id: i64) -> Result<bool, sqlx::Error> {
        sqlx::query("DELETE FROM tickets WHERE id = $1")
            .bind(id)
            .execute(db)
            .await
            .map(|r| r.rows_affected() > 0)
    }
}
