//! [`PgStore`]: the PostgreSQL implementation of the storage traits in
//! `lemonade-core`.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use lemonade_core::{
    AccountStore, CompetitorReport, Identity, NewReport, QuotaDecision, QuotaLedger, QuotaPolicy,
    QuotaUsage, ReportListItem, ReportStore, StoreError, StoreHealth, TrackOutcome,
    TrackedCompetitor, User, WatchList,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{rate_limits, reports, sessions, tracked, DbError};

impl From<DbError> for StoreError {
    fn from(error: DbError) -> Self {
        match error {
            DbError::NotFound => StoreError::NotFound,
            other => StoreError::backend(other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl QuotaLedger for PgStore {
    async fn check_and_increment(
        &self,
        identity: &Identity,
        policy: QuotaPolicy,
        today: NaiveDate,
    ) -> Result<QuotaDecision, StoreError> {
        Ok(rate_limits::check_and_increment(&self.pool, identity, policy, today).await?)
    }

    async fn refund(&self, identity: &Identity) -> Result<(), StoreError> {
        Ok(rate_limits::refund_query(&self.pool, identity).await?)
    }

    async fn usage(
        &self,
        identity: &Identity,
        policy: QuotaPolicy,
        today: NaiveDate,
    ) -> Result<QuotaUsage, StoreError> {
        Ok(rate_limits::quota_usage(&self.pool, identity, policy, today).await?)
    }
}

#[async_trait]
impl ReportStore for PgStore {
    async fn create_report(&self, report: NewReport) -> Result<CompetitorReport, StoreError> {
        let row = reports::insert_report(&self.pool, &report).await?;
        tracing::debug!(report_id = %row.id, title = %row.title, "report persisted");
        Ok(row.into())
    }

    async fn get_report(&self, id: Uuid) -> Result<Option<CompetitorReport>, StoreError> {
        Ok(reports::get_report(&self.pool, id).await?.map(Into::into))
    }

    async fn list_reports(
        &self,
        user_id: i64,
        limit: i64,
    ) -> Result<Vec<ReportListItem>, StoreError> {
        let rows = reports::list_reports_for_user(&self.pool, user_id, limit).await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn find_cached_report(
        &self,
        identity: &Identity,
        fingerprint: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<CompetitorReport>, StoreError> {
        let row = reports::find_cached_report(&self.pool, identity, fingerprint, since).await?;
        Ok(row.map(Into::into))
    }
}

#[async_trait]
impl WatchList for PgStore {
    async fn track_competitor(
        &self,
        user_id: i64,
        name: &str,
        canonical: &str,
        cap: u32,
        analyzed_at: Option<DateTime<Utc>>,
    ) -> Result<TrackOutcome, StoreError> {
        Ok(tracked::track_competitor(&self.pool, user_id, name, canonical, cap, analyzed_at).await?)
    }

    async fn list_tracked(&self, user_id: i64) -> Result<Vec<TrackedCompetitor>, StoreError> {
        let rows = tracked::list_active_tracked(&self.pool, user_id).await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn deactivate_tracked(&self, user_id: i64, id: i64) -> Result<bool, StoreError> {
        Ok(tracked::deactivate_tracked(&self.pool, user_id, id).await?)
    }

    async fn count_active_tracked(&self, user_id: i64) -> Result<i64, StoreError> {
        Ok(tracked::count_active_tracked(&self.pool, user_id).await?)
    }

    async fn clear_tracked(&self, user_id: i64) -> Result<u64, StoreError> {
        Ok(tracked::clear_tracked(&self.pool, user_id).await?)
    }
}

#[async_trait]
impl AccountStore for PgStore {
    async fn user_for_session(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, StoreError> {
        match sessions::find_user_by_token_hash(&self.pool, token_hash, now).await? {
            Some(row) => Ok(Some(row.into_user()?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl StoreHealth for PgStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(crate::health_check(&self.pool).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_store_not_found() {
        assert!(matches!(StoreError::from(DbError::NotFound), StoreError::NotFound));
        assert!(matches!(
            StoreError::from(DbError::MissingDatabaseUrl),
            StoreError::Backend(_)
        ));
    }
}
