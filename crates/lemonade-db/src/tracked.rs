//! Database operations for `tracked_competitors`.
//!
//! The per-user cap is enforced inside a transaction that first locks the
//! owning `users` row, so concurrent tracking batches for the same user are
//! serialised and cannot overshoot the cap.

use chrono::{DateTime, Utc};
use lemonade_core::{TrackOutcome, TrackedCompetitor};
use sqlx::PgPool;

use crate::DbError;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TrackedRow {
    pub id: i64,
    pub user_id: i64,
    pub competitor_name: String,
    pub canonical_name: String,
    pub is_active: bool,
    pub added_at: DateTime<Utc>,
    pub last_analyzed_at: Option<DateTime<Utc>>,
}

impl From<TrackedRow> for TrackedCompetitor {
    fn from(row: TrackedRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            competitor_name: row.competitor_name,
            canonical_name: row.canonical_name,
            is_active: row.is_active,
            added_at: row.added_at,
            last_analyzed_at: row.last_analyzed_at,
        }
    }
}

/// Tracks `name` (keyed by `canonical`) for `user_id`.
///
/// - Active entry with the same canonical name: [`TrackOutcome::AlreadyTracked`],
///   refreshing `last_analyzed_at` when `analyzed_at` is set.
/// - Inactive entry: reactivated unless the user already has `cap` active.
/// - No entry: inserted unless the user already has `cap` active.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the user does not exist, or
/// [`DbError::Sqlx`] if any statement fails.
pub async fn track_competitor(
    pool: &PgPool,
    user_id: i64,
    name: &str,
    canonical: &str,
    cap: u32,
    analyzed_at: Option<DateTime<Utc>>,
) -> Result<TrackOutcome, DbError> {
    let mut tx = pool.begin().await?;

    sqlx::query_scalar::<_, i64>("SELECT id FROM users WHERE id = $1 FOR UPDATE")
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(DbError::NotFound)?;

    let existing = sqlx::query_as::<_, (i64, bool)>(
        "SELECT id, is_active FROM tracked_competitors \
         WHERE user_id = $1 AND canonical_name = $2",
    )
    .bind(user_id)
    .bind(canonical)
    .fetch_optional(&mut *tx)
    .await?;

    if let Some((id, true)) = existing {
        sqlx::query(
            "UPDATE tracked_competitors \
             SET last_analyzed_at = COALESCE($2, last_analyzed_at) \
             WHERE id = $1",
        )
        .bind(id)
        .bind(analyzed_at)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        return Ok(TrackOutcome::AlreadyTracked);
    }

    let active: i64 = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM tracked_competitors WHERE user_id = $1 AND is_active",
    )
    .bind(user_id)
    .fetch_one(&mut *tx)
    .await?;

    if active >= i64::from(cap) {
        tx.commit().await?;
        return Ok(TrackOutcome::LimitReached);
    }

    let outcome = if let Some((id, _)) = existing {
        sqlx::query(
            "UPDATE tracked_competitors \
             SET is_active = TRUE, competitor_name = $2, \
                 last_analyzed_at = COALESCE($3, last_analyzed_at) \
             WHERE id = $1",
        )
        .bind(id)
        .bind(name)
        .bind(analyzed_at)
        .execute(&mut *tx)
        .await?;
        TrackOutcome::Reactivated
    } else {
        sqlx::query(
            "INSERT INTO tracked_competitors \
                 (user_id, competitor_name, canonical_name, last_analyzed_at) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(user_id)
        .bind(name)
        .bind(canonical)
        .bind(analyzed_at)
        .execute(&mut *tx)
        .await?;
        TrackOutcome::Added
    };

    tx.commit().await?;
    Ok(outcome)
}

/// Active entries in the order they were added.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_active_tracked(pool: &PgPool, user_id: i64) -> Result<Vec<TrackedRow>, DbError> {
    let rows = sqlx::query_as::<_, TrackedRow>(
        "SELECT id, user_id, competitor_name, canonical_name, is_active, added_at, last_analyzed_at \
         FROM tracked_competitors \
         WHERE user_id = $1 AND is_active \
         ORDER BY added_at ASC, id ASC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Soft-deletes one entry. Returns `false` when nothing active matched.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn deactivate_tracked(pool: &PgPool, user_id: i64, id: i64) -> Result<bool, DbError> {
    let result = sqlx::query(
        "UPDATE tracked_competitors SET is_active = FALSE \
         WHERE id = $1 AND user_id = $2 AND is_active",
    )
    .bind(id)
    .bind(user_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_active_tracked(pool: &PgPool, user_id: i64) -> Result<i64, DbError> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM tracked_competitors WHERE user_id = $1 AND is_active",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    Ok(count)
}

/// Hard-deletes every entry for a user, active or not.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn clear_tracked(pool: &PgPool, user_id: i64) -> Result<u64, DbError> {
    let result = sqlx::query("DELETE FROM tracked_competitors WHERE user_id = $1")
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}
