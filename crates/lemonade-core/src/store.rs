//! Storage seams the analysis pipeline and HTTP layer are written against.
//!
//! `lemonade-db` implements these over PostgreSQL; tests use in-memory doubles.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    CompetitorReport, NewReport, ReportListItem, TrackOutcome, TrackedCompetitor, User,
};
use crate::quota::{Identity, QuotaDecision, QuotaPolicy, QuotaUsage};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    #[error("storage backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    pub fn backend<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Backend(Box::new(error))
    }
}

/// Daily/lifetime analysis counters keyed by identity.
#[async_trait]
pub trait QuotaLedger: Send + Sync {
    /// Atomically apply day rollover, compare against `policy.limit`, and
    /// consume one unit when allowed.
    async fn check_and_increment(
        &self,
        identity: &Identity,
        policy: QuotaPolicy,
        today: NaiveDate,
    ) -> Result<QuotaDecision, StoreError>;

    /// Return one unit consumed by an analysis that then failed.
    async fn refund(&self, identity: &Identity) -> Result<(), StoreError>;

    async fn usage(
        &self,
        identity: &Identity,
        policy: QuotaPolicy,
        today: NaiveDate,
    ) -> Result<QuotaUsage, StoreError>;
}

#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn create_report(&self, report: NewReport) -> Result<CompetitorReport, StoreError>;

    async fn get_report(&self, id: Uuid) -> Result<Option<CompetitorReport>, StoreError>;

    async fn list_reports(
        &self,
        user_id: i64,
        limit: i64,
    ) -> Result<Vec<ReportListItem>, StoreError>;

    /// Most recent report by the same owner with the same fingerprint created
    /// at or after `since`.
    async fn find_cached_report(
        &self,
        identity: &Identity,
        fingerprint: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<CompetitorReport>, StoreError>;
}

/// The per-user tracked-competitor watch-list.
#[async_trait]
pub trait WatchList: Send + Sync {
    /// Track one competitor, honouring `cap` active entries per user.
    ///
    /// An active entry with the same canonical name is left in place (its
    /// `last_analyzed_at` is refreshed when `analyzed_at` is set); an inactive
    /// one is reactivated, subject to the cap.
    async fn track_competitor(
        &self,
        user_id: i64,
        name: &str,
        canonical: &str,
        cap: u32,
        analyzed_at: Option<DateTime<Utc>>,
    ) -> Result<TrackOutcome, StoreError>;

    async fn list_tracked(&self, user_id: i64) -> Result<Vec<TrackedCompetitor>, StoreError>;

    /// Soft-delete. Returns `false` if no active entry matched.
    async fn deactivate_tracked(&self, user_id: i64, id: i64) -> Result<bool, StoreError>;

    async fn count_active_tracked(&self, user_id: i64) -> Result<i64, StoreError>;

    /// Maintenance: hard-delete every entry for a user.
    async fn clear_tracked(&self, user_id: i64) -> Result<u64, StoreError>;
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Resolve a hashed bearer token to its user if the session is live.
    async fn user_for_session(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, StoreError>;
}

#[async_trait]
pub trait StoreHealth: Send + Sync {
    async fn ping(&self) -> Result<(), StoreError>;
}

/// Everything the HTTP service needs from storage.
pub trait Store: QuotaLedger + ReportStore + WatchList + AccountStore + StoreHealth {}

impl<T> Store for T where T: QuotaLedger + ReportStore + WatchList + AccountStore + StoreHealth {}
