//! Database operations for the `users` table.

use chrono::{DateTime, NaiveDate, Utc};
use lemonade_core::{Plan, User};
use sqlx::PgPool;

use crate::DbError;

/// A row from the `users` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    pub id: i64,
    pub email: String,
    /// `'free'` or `'pro'`, enforced by a CHECK constraint.
    pub plan: String,
    pub daily_query_count: i32,
    pub last_query_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

impl UserRow {
    /// Convert to the domain type, parsing the plan column.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::InvalidData`] if `plan` holds an unknown value.
    pub fn into_user(self) -> Result<User, DbError> {
        let plan = self
            .plan
            .parse::<Plan>()
            .map_err(|reason| DbError::InvalidData {
                column: "users.plan",
                reason,
            })?;
        Ok(User {
            id: self.id,
            email: self.email,
            plan,
            daily_query_count: self.daily_query_count,
            last_query_date: self.last_query_date,
            created_at: self.created_at,
        })
    }
}

const USER_COLUMNS: &str = "id, email, plan, daily_query_count, last_query_date, created_at";

/// Inserts a user. Emails are stored lower-cased and trimmed.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on failure, including a unique violation when
/// the email already exists.
pub async fn create_user(pool: &PgPool, email: &str, plan: Plan) -> Result<UserRow, DbError> {
    let row = sqlx::query_as::<_, UserRow>(&format!(
        "INSERT INTO users (email, plan) VALUES ($1, $2) RETURNING {USER_COLUMNS}"
    ))
    .bind(email.trim().to_lowercase())
    .bind(plan.as_str())
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_user_by_email(pool: &PgPool, email: &str) -> Result<Option<UserRow>, DbError> {
    let row = sqlx::query_as::<_, UserRow>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
    ))
    .bind(email.trim().to_lowercase())
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_user_by_id(pool: &PgPool, id: i64) -> Result<Option<UserRow>, DbError> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
    let row = sqlx::query_as::<_, UserRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

/// Changes a user's plan.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no user has that id, or [`DbError::Sqlx`]
/// if the update fails.
pub async fn set_user_plan(pool: &PgPool, id: i64, plan: Plan) -> Result<UserRow, DbError> {
    sqlx::query_as::<_, UserRow>(&format!(
        "UPDATE users SET plan = $2, updated_at = NOW() WHERE id = $1 RETURNING {USER_COLUMNS}"
    ))
    .bind(id)
    .bind(plan.as_str())
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}
