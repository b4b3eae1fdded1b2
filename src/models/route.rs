use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgExecutor};
use validator::Validate;

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub id: i64,
    pub origin: String,
    pub destination: String,
    pub stops: Vec<String>,
    pub base_price: f64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RouteRequest {
    #[validate(length(min = 1, max = 100), custom(function = "super::not_blank"))]
    pub origin: String,
    #[validate(length(min = 1, max = 100), custom(function = "super::not_blank"))]
    pub destination: String,
    #[validate(length(min = 1, max = 10))]
    pub stops: Vec<String>,
    #[validate(range(min = 0.0))]
    pub base_price: f64,
}

impl Route {
    pub async fn list<'e, E: PgExecutor<'e>>(db: E) -> Result<Vec<Route>, sqlx::Error> {
        sqlx::query_as::<_, Route>(
            "SELECT id, origin, destination, stops, base_price FROM routes ORDER BY id",
        )
        .fetch_all(db)
        .await
    }

    pub async fn find<'e, E: PgExecutor<'e>>(db: E, id: i64) -> Result<Option<Route>, sqlx::Error> {
        sqlx::query_as::<_, Route>(
            "SELECT id, origin, destination, stops, base_price FROM routes WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(db)
        .await
    }

    pub async fn create<'e, E: PgExecutor<'e>>(db: E, req: &RouteRequest) -> Result<Route, sqlx::Error> {
        sqlx::query_as::<_, Route>(
            "INSERT INTO routes (origin, destination, stops, base_price)
             VALUES ($1, $2, $3, $4)
             RETURNING id, origin, destination, stops, base_price",
        )
        .bind(req.origin.trim())
        .bind(req.destination.trim())
        .bind(clean_stops(&req.stops))
        .bind(req.base_price)
        .fetch_one(db)
        .await
    }

    pub async fn update<'e, E: PgExecutor<'e>>(
        db: E,
        id: i64,
        req: &RouteRequest,
    ) -> Result<Option<Route>, sqlx::Error> {
        sqlx::query_as::<_, Route>(
            "UPDATE routes SET origin = $2, destination = $3, stops = $4, base_price = $5
             WHERE id = $1
             RETURNING id, origin, destination, stops, base_price",
        )
        .bind(id)
        .bind(req.origin.trim())
        .bind(req.destination.trim())
        .bind(clean_stops(&req.stops))
        .bind(req.base_price)
        .fetch_optional(db)
        .await
    }

    /// Trip currently using this route, if any.
    pub async fn trip_id<'e, E: PgExecutor<'e>>(db: E, id: i64) -> Result<Option<i64>, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT id FROM trips WHERE route_id = $1")
            .bind(id)
            .fetch_optional(db)
            .await
    }

    pub async fn delete<'e, E: PgExecutor<'e>>(db: E, id: i64) -> Result<bool, sqlx::Error> {
        sqlx::query("DELETE FROM routes WHERE id = $1")
            .bind(id)
            .execute(db)
            .await
            .map(|r| r.rows_affected() > 0)
    }
}

// Blank stop names are dropped, the rest keep their order
fn clean_stops(stops: &[String]) -> Vec<String> {
    stops
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
