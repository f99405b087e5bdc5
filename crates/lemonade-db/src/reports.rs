//! Database operations for `competitor_reports`.
//!
//! Signals and metadata are stored as JSONB; the metadata fingerprint is also
//! copied into its own indexed column for the report cache lookup.

use chrono::{DateTime, Utc};
use lemonade_core::{
    CompetitorReport, CompetitorSignal, Identity, NewReport, ReportListItem, ReportMetadata,
};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ReportRow {
    pub id: Uuid,
    pub user_id: Option<i64>,
    pub guest_session_id: Option<String>,
    pub title: String,
    pub competitors: Vec<String>,
    pub signals: Json<Vec<CompetitorSignal>>,
    pub summary: String,
    pub metadata: Json<ReportMetadata>,
    pub fingerprint: String,
    pub created_at: DateTime<Utc>,
}

impl From<ReportRow> for CompetitorReport {
    fn from(row: ReportRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            guest_session_id: row.guest_session_id,
            title: row.title,
            competitors: row.competitors,
            signals: row.signals.0,
            summary: row.summary,
            metadata: row.metadata.0,
            created_at: row.created_at,
        }
    }
}

/// History projection: no signal payload, total pulled from metadata.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ReportListRow {
    pub id: Uuid,
    pub title: String,
    pub competitors: Vec<String>,
    pub total_signals: i64,
    pub created_at: DateTime<Utc>,
}

impl From<ReportListRow> for ReportListItem {
    fn from(row: ReportListRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            competitors: row.competitors,
            total_signals: row.total_signals,
            created_at: row.created_at,
        }
    }
}

const REPORT_COLUMNS: &str = "id, user_id, guest_session_id, title, competitors, signals, \
                              summary, metadata, fingerprint, created_at";

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Inserts a report with a freshly generated UUID.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails, including the owner CHECK
/// when both or neither of `user_id` and `guest_session_id` are set.
pub async fn insert_report(pool: &PgPool, report: &NewReport) -> Result<ReportRow, DbError> {
    let row = sqlx::query_as::<_, ReportRow>(&format!(
        "INSERT INTO competitor_reports \
             (id, user_id, guest_session_id, title, competitors, signals, summary, metadata, fingerprint) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
         RETURNING {REPORT_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(report.user_id)
    .bind(report.guest_session_id.as_deref())
    .bind(&report.title)
    .bind(&report.competitors)
    .bind(Json(&report.signals))
    .bind(&report.summary)
    .bind(Json(&report.metadata))
    .bind(&report.metadata.fingerprint)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query or JSON decoding fails.
pub async fn get_report(pool: &PgPool, id: Uuid) -> Result<Option<ReportRow>, DbError> {
    let row = sqlx::query_as::<_, ReportRow>(&format!(
        "SELECT {REPORT_COLUMNS} FROM competitor_reports WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Newest-first report history for one user.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_reports_for_user(
    pool: &PgPool,
    user_id: i64,
    limit: i64,
) -> Result<Vec<ReportListRow>, DbError> {
    let rows = sqlx::query_as::<_, ReportListRow>(
        "SELECT id, title, competitors, \
                COALESCE((metadata->>'total_signals')::BIGINT, 0) AS total_signals, \
                created_at \
         FROM competitor_reports \
         WHERE user_id = $1 \
         ORDER BY created_at DESC \
         LIMIT $2",
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Most recent report with `fingerprint` owned by `identity`, created at or
/// after `since`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn find_cached_report(
    pool: &PgPool,
    identity: &Identity,
    fingerprint: &str,
    since: DateTime<Utc>,
) -> Result<Option<ReportRow>, DbError> {
    let row = sqlx::query_as::<_, ReportRow>(&format!(
        "SELECT {REPORT_COLUMNS} FROM competitor_reports \
         WHERE fingerprint = $1 \
           AND created_at >= $2 \
           AND (user_id = $3 OR guest_session_id = $4) \
         ORDER BY created_at DESC \
         LIMIT 1"
    ))
    .bind(fingerprint)
    .bind(since)
    .bind(identity.user_id())
    .bind(identity.session_id())
    .fetch_optional(pool)
    .await?;

    Ok(row)
}
