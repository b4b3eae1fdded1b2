use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgExecutor};
use validator::Validate;

use crate::seatmap::BusLayout;

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bus {
    pub id: i64,
    pub plate_number: String,
    pub name: String,
    pub operator: String,
    pub row_count: i32,
    pub column_count: i32,
    pub row_label: String,
    pub column_label: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BusRequest {
    #[validate(length(min = 1, max = 20), custom(function = "super::not_blank"))]
    pub plate_number: String,
    #[validate(length(min = 1, max = 100), custom(function = "super::not_blank"))]
    pub name: String,
    #[validate(length(min = 1, max = 100), custom(function = "super::not_blank"))]
    pub operator: String,
    #[validate(range(min = 1, max = 100))]
    pub row_count: i32,
    #[validate(range(min = 1, max = 6))]
    pub column_count: i32,
}

/// Bus as returned to clients, with the labels split out.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BusResponse {
    #[serde(flatten)]
    pub bus: Bus,
    pub row_labels_as_list: Vec<String>,
    pub column_labels_as_list: Vec<String>,
}

impl From<Bus> for BusResponse {
    fn from(bus: Bus) -> Self {
        let layout = bus.layout();
        Self {
            row_labels_as_list: layout.row_labels(),
            column_labels_as_list: layout.column_labels(),
            bus,
        }
    }
}

const COLUMNS: &str = "id, plate_number, name, operator, row_count, column_count, row_label, column_label";

impl Bus {
    pub fn layout(&self) -> BusLayout {
        BusLayout::new(self.row_count, self.column_count)
    }

    pub async fn list<'e, E: PgExecutor<'e>>(db: E) -> Result<Vec<Bus>, sqlx::Error> {
        sqlx::query_as::<_, Bus>(&format!("SELECT {COLUMNS} FROM buses ORDER BY id"))
            .fetch_all(db)
            .await
    }

    pub async fn find<'e, E: PgExecutor<'e>>(db: E, id: i64) -> Result<Option<Bus>, sqlx::Error> {
        sqlx::query_as::<_, Bus>(&format!("SELECT {COLUMNS} FROM buses WHERE id = $1"))
            .bind(id)
            .fetch_optional(db)
            .await
    }

    pub async fn create<'e, E: PgExecutor<'e>>(db: E, req: &BusRequest) -> Result<Bus, sqlx::Error> {
        let layout = BusLayout::new(req.row_count, req.column_count);
        sqlx::query_as::<_, Bus>(&format!(
            "INSERT INTO buses (plate_number, name, operator, row_count, column_count, row_label, column_label)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {COLUMNS}"
        ))
        .bind(req.plate_number.trim())
        .bind(req.name.trim())
        .bind(req.operator.trim())
        .bind(req.row_count)
        .bind(req.column_count)
        .bind(layout.joined_row_labels())
        .bind(layout.joined_column_labels())
        .fetch_one(db)
        .await
    }

    /// Replaces every field and regenerates the labels.
    pub async fn update<'e, E: PgExecutor<'e>>(
        db: E,
        id: i64,
        req: &BusRequest,
    ) -> Result<Option<Bus>, sqlx::Error> {
        let layout = BusLayout::new(req.row_count, req.column_count);
        sqlx::query_as::<_, Bus>(&format!(
            "UPDATE buses
             SET plate_number = $2, name = $3, operator = $4, row_count = $5, column_count = $6,
                 row_label = $7, column_label = $8
             WHERE id = $1
             RETURNING {COLUMNS}"
        ))
        .bind(id)
        .bind(req.plate_number.trim())
        .bind(req.name.trim())
        .bind(req.operator.trim())
        .bind(req.row_count)
        .bind(req.column_count)
        .bind(layout.joined_row_labels())
        .bind(layout.joined_column_labels())
        .fetch_optional(db)
        .await
    }

    pub async fn delete<'e, E: PgExecutor<'e>>(db: E, id: i64) -> Result<bool, sqlx::Error> {
        sqlx::query("DELETE FROM buses WHERE id = $1")
            .bind(id)
            .execute(db)
            .await
            .map(|r| r.rows_affected() > 0)
    }
}
