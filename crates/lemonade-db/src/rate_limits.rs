//! Per-identity usage counters in `rate_limits`.
//!
//! Each identity owns one row, keyed by `user_id` for accounts or
//! `session_id` for guests. Check, day rollover, and increment happen in a
//! single conditional upsert, so two concurrent requests can never both take
//! the last unit. For accounts the resulting count is mirrored onto
//! `users.daily_query_count` in the same transaction.

use chrono::{DateTime, NaiveDate, Utc};
use lemonade_core::{Identity, QuotaCounter, QuotaDecision, QuotaPolicy, QuotaUsage};
use sqlx::{PgConnection, PgPool};

use crate::DbError;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RateLimitRow {
    pub id: i64,
    pub user_id: Option<i64>,
    pub session_id: Option<String>,
    pub query_count: i32,
    pub last_reset: NaiveDate,
    pub updated_at: DateTime<Utc>,
}

impl RateLimitRow {
    #[must_use]
    pub fn counter(&self) -> QuotaCounter {
        QuotaCounter {
            query_count: u32::try_from(self.query_count).unwrap_or(0),
            last_reset: self.last_reset,
        }
    }
}

fn conflict_column(identity: &Identity) -> &'static str {
    match identity {
        Identity::User { .. } => "user_id",
        Identity::Guest { .. } => "session_id",
    }
}

/// Fetches the counter row for an identity, if one has been created.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_rate_limit(
    pool: &PgPool,
    identity: &Identity,
) -> Result<Option<RateLimitRow>, DbError> {
    let row = sqlx::query_as::<_, RateLimitRow>(
        "SELECT id, user_id, session_id, query_count, last_reset, updated_at \
         FROM rate_limits \
         WHERE user_id = $1 OR session_id = $2",
    )
    .bind(identity.user_id())
    .bind(identity.session_id())
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Atomically roll over, check, and consume one unit of quota.
///
/// The row is created on first use with a count of one. An existing row is
/// only updated when the day has rolled over (daily policies) or the count is
/// still below `policy.limit`; otherwise the upsert returns nothing and the
/// request is denied without any change.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any statement fails.
pub async fn check_and_increment(
    pool: &PgPool,
    identity: &Identity,
    policy: QuotaPolicy,
    today: NaiveDate,
) -> Result<QuotaDecision, DbError> {
    let limit = i32::try_from(policy.limit).unwrap_or(i32::MAX);
    let mut tx = pool.begin().await?;

    let consumed = if limit == 0 {
        None
    } else {
        let column = conflict_column(identity);
        sqlx::query_as::<_, (i32, NaiveDate)>(&format!(
            "INSERT INTO rate_limits (user_id, session_id, query_count, last_reset) \
             VALUES ($1, $2, 1, $3) \
             ON CONFLICT ({column}) DO UPDATE SET \
                 query_count = CASE \
                     WHEN $4 AND rate_limits.last_reset <> EXCLUDED.last_reset THEN 1 \
                     ELSE rate_limits.query_count + 1 END, \
                 last_reset = CASE \
                     WHEN $4 AND rate_limits.last_reset <> EXCLUDED.last_reset THEN EXCLUDED.last_reset \
                     ELSE rate_limits.last_reset END, \
                 updated_at = NOW() \
             WHERE ($4 AND rate_limits.last_reset <> EXCLUDED.last_reset) \
                OR rate_limits.query_count < $5 \
             RETURNING query_count, last_reset"
        ))
        .bind(identity.user_id())
        .bind(identity.session_id())
        .bind(today)
        .bind(policy.resets_daily)
        .bind(limit)
        .fetch_optional(&mut *tx)
        .await?
    };

    let decision = match consumed {
        Some((count, last_reset)) => {
            if let Some(user_id) = identity.user_id() {
                mirror_user_counter(&mut *tx, user_id, count, last_reset).await?;
            }
            QuotaDecision::Allowed {
                used: u32::try_from(count).unwrap_or(0),
                limit: policy.limit,
            }
        }
        None => {
            let current = sqlx::query_as::<_, (i32, NaiveDate)>(
                "SELECT query_count, last_reset FROM rate_limits \
                 WHERE user_id = $1 OR session_id = $2",
            )
            .bind(identity.user_id())
            .bind(identity.session_id())
            .fetch_optional(&mut *tx)
            .await?;
            let used = current.map_or(0, |(count, last_reset)| {
                QuotaCounter {
                    query_count: u32::try_from(count).unwrap_or(0),
                    last_reset,
                }
                .usage(today, policy)
                .used
            });
            QuotaDecision::Denied {
                used,
                limit: policy.limit,
            }
        }
    };

    tx.commit().await?;
    Ok(decision)
}

/// Gives back one unit after a failed analysis. Never goes below zero and is
/// a no-op for identities without a counter row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any statement fails.
pub async fn refund_query(pool: &PgPool, identity: &Identity) -> Result<(), DbError> {
    let mut tx = pool.begin().await?;

    let updated = sqlx::query_as::<_, (i32, NaiveDate)>(
        "UPDATE rate_limits \
         SET query_count = GREATEST(query_count - 1, 0), updated_at = NOW() \
         WHERE user_id = $1 OR session_id = $2 \
         RETURNING query_count, last_reset",
    )
    .bind(identity.user_id())
    .bind(identity.session_id())
    .fetch_optional(&mut *tx)
    .await?;

    if let (Some((count, last_reset)), Some(user_id)) = (updated, identity.user_id()) {
        mirror_user_counter(&mut *tx, user_id, count, last_reset).await?;
    }

    tx.commit().await?;
    Ok(())
}

/// Usage as evaluated on `today`. Identities without a row have used nothing.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn quota_usage(
    pool: &PgPool,
    identity: &Identity,
    policy: QuotaPolicy,
    today: NaiveDate,
) -> Result<QuotaUsage, DbError> {
    let counter = get_rate_limit(pool, identity)
        .await?
        .map_or_else(|| QuotaCounter::new(today), |row| row.counter());
    Ok(counter.usage(today, policy))
}

async fn mirror_user_counter(
    conn: &mut PgConnection,
    user_id: i64,
    count: i32,
    last_reset: NaiveDate,
) -> Result<(), DbError> {
    sqlx::query(
        "UPDATE users SET daily_query_count = $2, last_query_date = $3, updated_at = NOW() \
         WHERE id = $1",
    )
    .bind(user_id)
    .bind(count)
    .bind(last_reset)
    .execute(conn)
    .await?;

    Ok(())
}
