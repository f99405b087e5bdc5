//! The analysis pipeline: quota gate, signal collection, summarisation,
//! persistence, and auto-tracking for one request.
//!
//! Quota is consumed before any external call is made and refunded if the
//! report cannot be produced, so only successful analyses count against the
//! caller's allowance.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use lemonade_core::{
    canonical_identity, report_fingerprint, AppConfig, CompetitorReport, CompetitorSignal,
    Identity, InputError, NewReport, Plan, QuotaDecision, QuotaLedger, QuotaLimits, QuotaPolicy,
    ReportMetadata, ReportStore, SourceToggles, Store, StoreError, TrackResult, WatchList,
};
use lemonade_llm::{LlmError, PreviewAnalysis, ReportSummarizer};
use lemonade_signals::SignalAggregator;
use serde::Serialize;
use thiserror::Error;

const MAX_CACHE_HOURS: i64 = 24 * 365;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error("enable at least one signal source")]
    NoSources,

    #[error("analysis limit reached ({used} of {limit} used)")]
    QuotaExceeded {
        used: u32,
        limit: u32,
        sign_up_required: bool,
    },

    #[error("report generation failed: {0}")]
    Report(#[source] LlmError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Copy)]
pub struct AnalysisSettings {
    pub limits: QuotaLimits,
    pub max_competitors: usize,
    pub report_cache_hours: u64,
}

impl AnalysisSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            limits: config.quota,
            max_competitors: config.max_competitors,
            report_cache_hours: config.report_cache_hours,
        }
    }
}

/// One validated analysis request.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub competitors: Vec<String>,
    pub sources: SourceToggles,
    pub auto_track: bool,
    pub nocache: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisOutcome {
    pub report: CompetitorReport,
    pub tracking: Vec<TrackResult>,
    pub cached: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PreviewOutcome {
    pub competitors: Vec<String>,
    pub analysis: PreviewAnalysis,
    pub model: String,
    pub total_signals: usize,
}

pub struct AnalysisService {
    store: Arc<dyn Store>,
    aggregator: Arc<SignalAggregator>,
    summarizer: ReportSummarizer,
    settings: AnalysisSettings,
}

impl AnalysisService {
    #[must_use]
    pub fn new(
        store: Arc<dyn Store>,
        aggregator: Arc<SignalAggregator>,
        summarizer: ReportSummarizer,
        settings: AnalysisSettings,
    ) -> Self {
        Self {
            store,
            aggregator,
            summarizer,
            settings,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &AnalysisSettings {
        &self.settings
    }

    /// Run a full analysis and persist the report.
    ///
    /// # Errors
    ///
    /// [`AnalysisError::QuotaExceeded`] before any fetch when the caller is at
    /// its limit, [`AnalysisError::Report`] when the summariser fails, and
    /// [`AnalysisError::Store`] on persistence failures.
    pub async fn analyze(
        &self,
        identity: &Identity,
        request: AnalysisRequest,
        now: DateTime<Utc>,
    ) -> Result<AnalysisOutcome, AnalysisError> {
        if !request.sources.any() {
            return Err(AnalysisError::NoSources);
        }
        let fingerprint = report_fingerprint(&request.competitors, &request.sources);

        if !request.nocache {
            if let Some(report) = self.cached_report(identity, &fingerprint, now).await? {
                tracing::info!(report_id = %report.id, fingerprint, "serving cached report");
                let tracking = self
                    .auto_track(identity, &request, &report.competitors, now)
                    .await;
                return Ok(AnalysisOutcome {
                    report,
                    tracking,
                    cached: true,
                });
            }
        }

        self.consume_quota(identity, now).await?;

        tracing::info!(
            competitors = ?request.competitors,
            sources = ?request.sources.enabled(),
            "starting analysis"
        );
        let signals = self
            .aggregator
            .collect(&request.competitors, &request.sources)
            .await;

        let premium = identity.plan() == Some(Plan::Pro);
        let summary = match self
            .summarizer
            .summarize(&request.competitors, &signals, premium)
            .await
        {
            Ok(summary) => summary,
            Err(e) => {
                tracing::error!(error = %e, "report summarisation failed");
                self.refund(identity).await;
                return Err(AnalysisError::Report(e));
            }
        };

        let metadata = ReportMetadata {
            total_signals: count_items(&signals),
            sources: request
                .sources
                .enabled()
                .into_iter()
                .map(str::to_string)
                .collect(),
            model: summary.model,
            premium,
            fingerprint,
            unavailable_sources: signals.iter().filter(|s| s.unavailable.is_some()).count(),
        };
        let new_report = NewReport {
            user_id: identity.user_id(),
            guest_session_id: identity.session_id().map(str::to_string),
            title: report_title(&request.competitors),
            competitors: request.competitors.clone(),
            signals,
            summary: summary.json,
            metadata,
        };

        let report = match self.store.create_report(new_report).await {
            Ok(report) => report,
            Err(e) => {
                self.refund(identity).await;
                return Err(e.into());
            }
        };

        let tracking = self
            .auto_track(identity, &request, &report.competitors, now)
            .await;

        tracing::info!(
            report_id = %report.id,
            total_signals = report.metadata.total_signals,
            model = %report.metadata.model,
            "analysis complete"
        );
        Ok(AnalysisOutcome {
            report,
            tracking,
            cached: false,
        })
    }

    /// Run the fast preview. Nothing is persisted, but quota is consumed.
    ///
    /// # Errors
    ///
    /// Same as [`AnalysisService::analyze`], minus persistence.
    pub async fn preview(
        &self,
        identity: &Identity,
        competitors: Vec<String>,
        sources: SourceToggles,
        now: DateTime<Utc>,
    ) -> Result<PreviewOutcome, AnalysisError> {
        if !sources.any() {
            return Err(AnalysisError::NoSources);
        }
        self.consume_quota(identity, now).await?;

        let signals = self.aggregator.collect(&competitors, &sources).await;
        match self.summarizer.preview(&competitors, &signals).await {
            Ok(summary) => Ok(PreviewOutcome {
                total_signals: summary.analysis.methodology.total_signals,
                analysis: summary.analysis,
                model: summary.model,
                competitors,
            }),
            Err(e) => {
                tracing::error!(error = %e, "preview summarisation failed");
                self.refund(identity).await;
                Err(AnalysisError::Report(e))
            }
        }
    }

    /// Track a batch of competitors for a user.
    ///
    /// Names are de-duplicated by canonical identity. Each one is tracked on
    /// its own, so hitting the plan cap only marks the remaining names as
    /// `limit_reached`.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::Store`] if any tracking write fails.
    pub async fn track_competitors(
        &self,
        user_id: i64,
        plan: Plan,
        names: &[String],
        analyzed_at: Option<DateTime<Utc>>,
    ) -> Result<Vec<TrackResult>, AnalysisError> {
        let cap = self.settings.limits.tracked_cap(plan);
        let mut seen = HashSet::new();
        let mut results = Vec::new();

        for name in names {
            let canonical = canonical_identity(name);
            if canonical.is_empty() || !seen.insert(canonical.clone()) {
                continue;
            }
            let outcome = self
                .store
                .track_competitor(user_id, name, &canonical, cap, analyzed_at)
                .await?;
            results.push(TrackResult {
                competitor: name.clone(),
                canonical,
                outcome,
            });
        }
        Ok(results)
    }

    async fn cached_report(
        &self,
        identity: &Identity,
        fingerprint: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<CompetitorReport>, AnalysisError> {
        if self.settings.report_cache_hours == 0 {
            return Ok(None);
        }
        let hours = i64::try_from(self.settings.report_cache_hours)
            .unwrap_or(MAX_CACHE_HOURS)
            .min(MAX_CACHE_HOURS);
        let since = now - Duration::hours(hours);
        Ok(self
            .store
            .find_cached_report(identity, fingerprint, since)
            .await?)
    }

    async fn consume_quota(
        &self,
        identity: &Identity,
        now: DateTime<Utc>,
    ) -> Result<(), AnalysisError> {
        let policy = QuotaPolicy::for_identity(identity, &self.settings.limits);
        match self
            .store
            .check_and_increment(identity, policy, now.date_naive())
            .await?
        {
            QuotaDecision::Allowed { used, limit } => {
                tracing::debug!(used, limit, "quota consumed");
                Ok(())
            }
            QuotaDecision::Denied { used, limit } => {
                tracing::info!(used, limit, guest = identity.is_guest(), "quota exceeded");
                Err(AnalysisError::QuotaExceeded {
                    used,
                    limit,
                    sign_up_required: identity.is_guest(),
                })
            }
        }
    }

    async fn refund(&self, identity: &Identity) {
        if let Err(e) = self.store.refund(identity).await {
            tracing::error!(error = %e, "failed to refund quota after failed analysis");
        }
    }

    /// Tracking runs after the report exists, so its failures are logged and
    /// reported as an empty result rather than failing the analysis.
    async fn auto_track(
        &self,
        identity: &Identity,
        request: &AnalysisRequest,
        competitors: &[String],
        now: DateTime<Utc>,
    ) -> Vec<TrackResult> {
        let Identity::User { id, plan } = identity else {
            return Vec::new();
        };
        if !request.auto_track {
            return Vec::new();
        }
        match self
            .track_competitors(*id, *plan, competitors, Some(now))
            .await
        {
            Ok(results) => results,
            Err(e) => {
                tracing::warn!(user_id = id, error = %e, "auto-track failed");
                Vec::new()
            }
        }
    }
}

fn count_items(signals: &[CompetitorSignal]) -> usize {
    signals.iter().map(|s| s.items.len()).sum()
}

fn report_title(competitors: &[String]) -> String {
    format!("Competitor analysis: {}", competitors.join(", "))
}

#[cfg(test)]
#[path = "pipeline_test.rs"]
mod tests;
