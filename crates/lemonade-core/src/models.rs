//! Persisted records: users, reports, and tracked competitors.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::quota::Plan;
use crate::signals::CompetitorSignal;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub plan: Plan,
    /// Mirror of the rate-limit counter, kept for display only.
    pub daily_query_count: i32,
    pub last_query_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

/// Bookkeeping stored alongside every report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub total_signals: usize,
    pub sources: Vec<String>,
    pub model: String,
    pub premium: bool,
    pub fingerprint: String,
    #[serde(default)]
    pub unavailable_sources: usize,
}

/// A report about to be inserted.
#[derive(Debug, Clone)]
pub struct NewReport {
    pub user_id: Option<i64>,
    pub guest_session_id: Option<String>,
    pub title: String,
    pub competitors: Vec<String>,
    pub signals: Vec<CompetitorSignal>,
    pub summary: String,
    pub metadata: ReportMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompetitorReport {
    pub id: Uuid,
    pub user_id: Option<i64>,
    #[serde(skip)]
    pub guest_session_id: Option<String>,
    pub title: String,
    pub competitors: Vec<String>,
    pub signals: Vec<CompetitorSignal>,
    /// JSON-serialised analysis produced by the summariser.
    pub summary: String,
    pub metadata: ReportMetadata,
    pub created_at: DateTime<Utc>,
}

/// History row: a report without its signal payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportListItem {
    pub id: Uuid,
    pub title: String,
    pub competitors: Vec<String>,
    pub total_signals: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackedCompetitor {
    pub id: i64,
    pub user_id: i64,
    pub competitor_name: String,
    pub canonical_name: String,
    pub is_active: bool,
    pub added_at: DateTime<Utc>,
    pub last_analyzed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackOutcome {
    Added,
    Reactivated,
    AlreadyTracked,
    LimitReached,
}

/// Per-competitor result of a tracking batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackResult {
    pub competitor: String,
    pub canonical: String,
    pub outcome: TrackOutcome,
}
