use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgExecutor};
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "user_role", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    #[default]
    Passenger,
    TicketStaff,
    TransitAdmin,
}

impl Role {
    /// Ticket staff and transit admins work the counter.
    pub fn is_staff(self) -> bool {
        matches!(self, Role::TicketStaff | Role::TransitAdmin)
    }
}

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Role,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRoleRequest {
    #[validate(email)]
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdateRequest {
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 100))]
    pub first_name: Option<String>,
    #[validate(length(max = 100))]
    pub last_name: Option<String>,
}

const COLUMNS: &str = "id, email, first_name, last_name, role";

impl User {
    pub async fn list<'e, E: PgExecutor<'e>>(db: E) -> Result<Vec<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!("SELECT {COLUMNS} FROM users ORDER BY id"))
            .fetch_all(db)
            .await
    }

    pub async fn find<'e, E: PgExecutor<'e>>(db: E, id: i64) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!("SELECT {COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(db)
            .await
    }

    pub async fn find_by_email<'e, E: PgExecutor<'e>>(
        db: E,
        email: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!("SELECT {COLUMNS} FROM users WHERE lower(email) = lower($1)"))
            .bind(email)
            .fetch_optional(db)
            .await
    }

    pub async fn exists<'e, E: PgExecutor<'e>>(db: E, id: i64) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
            .bind(id)
            .fetch_one(db)
            .await
    }

    pub async fn set_role_by_email<'e, E: PgExecutor<'e>>(
        db: E,
        email: &str,
        role: Role,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET role = $2 WHERE lower(email) = lower($1) RETURNING {COLUMNS}"
        ))
        .bind(email)
        .bind(role)
        .fetch_optional(db)
        .await
    }

    /// Applies the provided fields, leaving the others unchanged.
    pub async fn update_details<'e, E: PgExecutor<'e>>(
        db: E,
        id: i64,
        req: &UserUpdateRequest,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "UPDATE users
             SET email = COALESCE($2, email),
                 first_name = COALESCE($3, first_name),
                 last_name = COALESCE($4, last_name)
             WHERE id = $1
             RETURNING {COLUMNS}"
        ))
        .bind(id)
        .bind(req.email.as_deref())
        .bind(req.first_name.as_deref())
        .bind(req.last_name.as_deref())
        .fetch_optional(db)
        .await
    }

    pub async fn delete<'e, E: PgExecutor<'e>>(db: E, id: i64) -> Result<bool, sqlx::Error> {
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(db)
            .await
            .map(|r| r.rows_affected() > 0)
    }
}
