use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection, PgExecutor};
use validator::Validate;

use crate::seatmap::{SeatId, SeatRecord, SeatStatus};

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Seat {
    pub id: i64,
    pub trip_id: i64,
    pub row_position: i32,
    pub column_position: i32,
    pub status: SeatStatus,
}

impl Seat {
    pub fn seat_id(&self) -> SeatId {
        SeatId::new(self.row_position, self.column_position)
    }
}

impl From<&Seat> for SeatRecord {
    fn from(seat: &Seat) -> Self {
        SeatRecord {
            row_position: seat.row_position,
            column_position: seat.column_position,
            status: seat.status,
        }
    }
}

/// Administrative status change for one seat position (blocking a broken
/// seat, or opening it again).
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SeatStatusRequest {
    #[validate(range(min = 1))]
    pub row_position: i32,
    #[validate(range(min = 1))]
    pub column_position: i32,
    pub status: SeatStatus,
}

const COLUMNS: &str = "id, trip_id, row_position, column_position, status";

impl Seat {
    pub async fn by_trip<'e, E: PgExecutor<'e>>(db: E, trip_id: i64) -> Result<Vec<Seat>, sqlx::Error> {
        sqlx::query_as::<_, Seat>(&format!(
            "SELECT {COLUMNS} FROM seats WHERE trip_id = $1 ORDER BY row_position, column_position"
        ))
        .bind(trip_id)
        .fetch_all(db)
        .await
    }

    pub async fn find<'e, E: PgExecutor<'e>>(db: E, id: i64) -> Result<Option<Seat>, sqlx::Error> {
        sqlx::query_as::<_, Seat>(&format!("SELECT {COLUMNS} FROM seats WHERE id = $1"))
            .bind(id)
            .fetch_optional(db)
            .await
    }

    /// Locks the record at a position for the rest of the transaction.
    pub async fn find_at_for_update(
        conn: &mut PgConnection,
        trip_id: i64,
        row_position: i32,
        column_position: i32,
    ) -> Result<Option<Seat>, sqlx::Error> {
        sqlx::query_as::<_, Seat>(&format!(
            "SELECT {COLUMNS} FROM seats
             WHERE trip_id = $1 AND row_position = $2 AND column_position = $3
             FOR UPDATE"
        ))
        .bind(trip_id)
        .bind(row_position)
        .bind(column_position)
        .fetch_optional(conn)
        .await
    }

    pub async fn insert<'e, E: PgExecutor<'e>>(
        db: E,
        trip_id: i64,
        row_position: i32,
        column_position: i32,
        status: SeatStatus,
    ) -> Result<Seat, sqlx::Error> {
        sqlx::query_as::<_, Seat>(&format!(
            "INSERT INTO seats (trip_id, row_position, column_position, status)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        ))
        .bind(trip_id)
        .bind(row_position)
        .bind(column_position)
        .bind(status)
        .fetch_one(db)
        .await
    }

    /// Records `ticket_id` as the holder of a freshly claimed seat.
    pub async fn hold<'e, E: PgExecutor<'e>>(db: E, id: i64, ticket_id: i64) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE seats SET held_by = $2 WHERE id = $1")
            .bind(id)
            .bind(ticket_id)
            .execute(db)
            .await?;
        Ok(())
    }

    /// Whether `ticket_id` still holds the seat.
    pub async fn is_held_by<'e, E: PgExecutor<'e>>(db: E, id: i64, ticket_id: i64) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM seats WHERE id = $1 AND held_by = $2)")
            .bind(id)
            .bind(ticket_id)
            .fetch_one(db)
            .await
    }

    /// Sets the status on behalf of a ticket. Succeeds while the ticket holds
    /// the seat, or when the seat is open and unheld, in which case the
    /// ticket takes it back.
    pub async fn set_status_for_ticket<'e, E: PgExecutor<'e>>(
        db: E,
        id: i64,
        ticket_id: i64,
        status: SeatStatus,
    ) -> Result<Option<Seat>, sqlx::Error> {
        sqlx::query_as::<_, Seat>(&format!(
            "UPDATE seats SET status = $3, held_by = $2
             WHERE id = $1 AND (held_by = $2 OR (held_by IS NULL AND status = 'OPEN'))
             RETURNING {COLUMNS}"
        ))
        .bind(id)
        .bind(ticket_id)
        .bind(status)
        .fetch_optional(db)
        .await
    }

    /// Opens the seat again if `ticket_id` holds it. Returns whether it did.
    pub async fn release<'e, E: PgExecutor<'e>>(db: E, id: i64, ticket_id: i64) -> Result<bool, sqlx::Error> {
        sqlx::query("UPDATE seats SET status = 'OPEN', held_by = NULL WHERE id = $1 AND held_by = $2")
            .bind(id)
            .bind(ticket_id)
            .execute(db)
            .await
            .map(|r| r.rows_affected() > 0)
    }

    pub async fn set_status<'e, E: PgExecutor<'e>>(
        db: E,
        id: i64,
        status: SeatStatus,
    ) -> Result<Seat, sqlx::Error> {
        sqlx::query_as::<_, Seat>(&format!(
            "UPDATE seats SET status = $2 WHERE id = $1 RETURNING {COLUMNS}"
        ))
        .bind(id)
        .bind(status)
        .fetch_one(db)
        .await
    }
}
