use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgExecutor};
use validator::Validate;

use super::{BusResponse, Route, RouteRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "trip_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TripStatus {
    #[default]
    Scheduled,
    Boarding,
    Departed,
    Cancelled,
}

impl TripStatus {
    /// Tickets can only be sold before the bus leaves.
    pub fn accepts_bookings(self) -> bool {
        match self {
            TripStatus::Scheduled | TripStatus::Boarding => true,
            TripStatus::Departed | TripStatus::Cancelled => false,
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    pub id: i64,
    pub departure_time: NaiveDateTime,
    pub status: TripStatus,
    pub bus_id: i64,
    pub route_id: i64,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TripCreateRequest {
    #[validate(custom(function = "super::not_in_past"))]
    pub departure_time: NaiveDateTime,
    pub status: Option<TripStatus>,
    #[validate(range(min = 1))]
    pub bus_id: i64,
    #[validate(nested)]
    pub route_details: RouteRequest,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TripUpdateRequest {
    #[validate(custom(function = "super::not_in_past"))]
    pub departure_time: Option<NaiveDateTime>,
    pub status: Option<TripStatus>,
    #[validate(range(min = 1))]
    pub bus_id: Option<i64>,
    #[validate(range(min = 1))]
    pub route_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct TripsQuery {
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct SeatMapQuery {
    pub selected: Option<String>,
}

/// Trip with its bus, route and remaining capacity.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TripResponse {
    pub id: i64,
    pub departure_time: NaiveDateTime,
    pub status: TripStatus,
    pub bus: BusResponse,
    pub route: Route,
    pub available_seats: usize,
}

const COLUMNS: &str = "id, departure_time, status, bus_id, route_id";

impl Trip {
    pub async fn list<'e, E: PgExecutor<'e>>(db: E) -> Result<Vec<Trip>, sqlx::Error> {
        sqlx::query_as::<_, Trip>(&format!("SELECT {COLUMNS} FROM trips ORDER BY departure_time ASC"))
            .fetch_all(db)
            .await
    }

    /// Trips departing on the given calendar day.
    pub async fn list_by_date<'e, E: PgExecutor<'e>>(
        db: E,
        date: NaiveDate,
    ) -> Result<Vec<Trip>, sqlx::Error> {
        let start = date.and_time(chrono::NaiveTime::MIN);
        let end = start + chrono::Duration::days(1);
        sqlx::query_as::<_, Trip>(&format!(
            "SELECT {COLUMNS} FROM trips
             WHERE departure_time >= $1 AND departure_time < $2
             ORDER BY departure_time ASC"
        ))
        .bind(start)
        .bind(end)
        .fetch_all(db)
        .await
    }

    pub async fn find<'e, E: PgExecutor<'e>>(db: E, id: i64) -> Result<Option<Trip>, sqlx::Error> {
        sqlx::query_as::<_, Trip>(&format!("SELECT {COLUMNS} FROM trips WHERE id = $1"))
            .bind(id)
            .fetch_optional(db)
            .await
    }

    pub async fn exists<'e, E: PgExecutor<'e>>(db: E, id: i64) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM trips WHERE id = $1)")
            .bind(id)
            .fetch_one(db)
            .await
    }

    pub async fn create<'e, E: PgExecutor<'e>>(
        db: E,
        departure_time: NaiveDateTime,
        status: TripStatus,
        bus_id: i64,
        route_id: i64,
    ) -> Result<Trip, sqlx::Error> {
        sqlx::query_as::<_, Trip>(&format!(
            "INSERT INTO trips (departure_time, status, bus_id, route_id)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        ))
        .bind(departure_time)
        .bind(status)
        .bind(bus_id)
        .bind(route_id)
        .fetch_one(db)
        .await
    }

    pub async fn save<'e, E: PgExecutor<'e>>(&self, db: E) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE trips SET departure_time = $2, status = $3, bus_id = $4, route_id = $5 WHERE id = $1",
        )
        .bind(self.id)
        .bind(self.departure_time)
        .bind(self.status)
        .bind(self.bus_id)
        .bind(self.route_id)
        .execute(db)
        .await?;
        Ok(())
    }

    pub async fn delete<'e, E: PgExecutor<'e>>(db: E, id: i64) -> Result<bool, sqlx::Error> {
        sqlx::query("DELETE FROM trips WHERE id = $1")
            .bind(id)
            .execute(db)
            .await
            .map(|r| r.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_defaults_to_scheduled() {
        assert_eq!(TripStatus::default(), TripStatus::Scheduled);
        assert_eq!(serde_json::to_string(&TripStatus::Boarding).unwrap(), "\"BOARDING\"");
    }

    #[test]
    fn only_pending_departures_take_bookings() {
        assert!(TripStatus::Scheduled.accepts_bookings());
        assert!(TripStatus::Boarding.accepts_bookings());
        assert!(!TripStatus::Departed.accepts_bookings());
        assert!(!TripStatus::Cancelled.accepts_bookings());
    }

    #[test]
    fn create_request_validates_nested_route() {
        let req: TripCreateRequest = serde_json::from_value(serde_json::json!({
            "departureTime": "2099-01-01T08:30:00",
            "busId": 3,
            "routeDetails": {
                "origin": "Cebu City",
                "destination": "",
                "stops": ["Naga"],
                "basePrice": 120.0
            }
        }))
        .unwrap();

        assert!(req.status.is_none());
        assert!(req.validate().is_err());
    }

    #[test]
    fn update_request_rejects_past_departure() {
        let req = TripUpdateRequest {
            departure_time: Some(chrono::Local::now().naive_local() - chrono::Duration::hours(2)),
            ..Default::default()
        };
        assert!(req.validate().is_err());
        assert!(TripUpdateRequest::default().validate().is_ok());
    }
}
