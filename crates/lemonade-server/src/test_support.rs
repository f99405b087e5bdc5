//! In-memory doubles for the storage traits, the LLM client, and signal
//! sources, shared by the pipeline and handler tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use lemonade_core::{
    AccountStore, CompetitorReport, Identity, NewReport, Plan, QuotaCounter, QuotaDecision,
    QuotaLedger, QuotaLimits, QuotaPolicy, QuotaUsage, ReportListItem, ReportStore, SignalItem,
    SignalType, StoreError, StoreHealth, TrackOutcome, TrackedCompetitor, User, WatchList,
};
use lemonade_llm::{ChatRequest, Completion, LlmClient, LlmError, ReportSummarizer};
use lemonade_signals::{
    BingNewsClient, SignalAggregator, SignalSource, SocialSentimentAnalyzer, SourceOutcome,
    SuggestionFinder,
};
use uuid::Uuid;

use crate::api::AppState;
use crate::pipeline::{AnalysisService, AnalysisSettings};

pub const FIXED_REPORT: &str = r#"{
  "executive_summary": "Acme is shipping quickly; Beta is quiet.",
  "competitors": [
    {"name": "Acme", "activity_level": "high", "recent_developments": ["Seed round"],
     "funding_and_business": [], "sentiment": {"score": 70, "mentions": 2}, "key_insights": []},
    {"name": "Beta", "activity_level": "low", "recent_developments": [],
     "funding_and_business": [], "sentiment": {"score": 50, "mentions": 0}, "key_insights": []}
  ],
  "strategic_insights": ["Watch Acme pricing"]
}"#;

#[derive(Default)]
struct MemoryState {
    users: HashMap<i64, User>,
    sessions: HashMap<String, (i64, DateTime<Utc>)>,
    counters: HashMap<String, QuotaCounter>,
    reports: Vec<CompetitorReport>,
    tracked: Vec<TrackedCompetitor>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    pub quota_checks: AtomicUsize,
    pub refunds: AtomicUsize,
}

fn counter_key(identity: &Identity) -> String {
    match identity {
        Identity::User { id, .. } => format!("user:{id}"),
        Identity::Guest { session_id } => format!("guest:{session_id}"),
    }
}

fn poisoned() -> StoreError {
    StoreError::Backend("memory store lock poisoned".into())
}

impl MemoryStore {
    pub fn add_user(&self, id: i64, plan: Plan) -> User {
        let user = User {
            id,
            email: format!("user{id}@example.com"),
            plan,
            daily_query_count: 0,
            last_query_date: None,
            created_at: Utc::now(),
        };
        self.state
            .lock()
            .expect("lock")
            .users
            .insert(id, user.clone());
        user
    }

    pub fn add_session(&self, token_hash: &str, user_id: i64, expires_at: DateTime<Utc>) {
        self.state
            .lock()
            .expect("lock")
            .sessions
            .insert(token_hash.to_string(), (user_id, expires_at));
    }

    pub fn set_counter(&self, identity: &Identity, query_count: u32, last_reset: NaiveDate) {
        self.state.lock().expect("lock").counters.insert(
            counter_key(identity),
            QuotaCounter {
                query_count,
                last_reset,
            },
        );
    }

    pub fn counter(&self, identity: &Identity) -> Option<QuotaCounter> {
        self.state
            .lock()
            .expect("lock")
            .counters
            .get(&counter_key(identity))
            .copied()
    }

    pub fn reports(&self) -> Vec<CompetitorReport> {
        self.state.lock().expect("lock").reports.clone()
    }

    pub fn tracked(&self) -> Vec<TrackedCompetitor> {
        self.state.lock().expect("lock").tracked.clone()
    }
}

#[async_trait]
impl QuotaLedger for MemoryStore {
    async fn check_and_increment(
        &self,
        identity: &Identity,
        policy: QuotaPolicy,
        today: NaiveDate,
    ) -> Result<QuotaDecision, StoreError> {
        self.quota_checks.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().map_err(|_| poisoned())?;
        let counter = state
            .counters
            .entry(counter_key(identity))
            .or_insert_with(|| QuotaCounter::new(today));
        Ok(counter.try_consume(today, policy))
    }

    async fn refund(&self, identity: &Identity) -> Result<(), StoreError> {
        self.refunds.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().map_err(|_| poisoned())?;
        if let Some(counter) = state.counters.get_mut(&counter_key(identity)) {
            counter.refund();
        }
        Ok(())
    }

    async fn usage(
        &self,
        identity: &Identity,
        policy: QuotaPolicy,
        today: NaiveDate,
    ) -> Result<QuotaUsage, StoreError> {
        let state = self.state.lock().map_err(|_| poisoned())?;
        let counter = state
            .counters
            .get(&counter_key(identity))
            .copied()
            .unwrap_or_else(|| QuotaCounter::new(today));
        Ok(counter.usage(today, policy))
    }
}

#[async_trait]
impl ReportStore for MemoryStore {
    async fn create_report(&self, report: NewReport) -> Result<CompetitorReport, StoreError> {
        let created = CompetitorReport {
            id: Uuid::new_v4(),
            user_id: report.user_id,
            guest_session_id: report.guest_session_id,
            title: report.title,
            competitors: report.competitors,
            signals: report.signals,
            summary: report.summary,
            metadata: report.metadata,
            created_at: Utc::now(),
        };
        let mut state = self.state.lock().map_err(|_| poisoned())?;
        state.reports.push(created.clone());
        Ok(created)
    }

    async fn get_report(&self, id: Uuid) -> Result<Option<CompetitorReport>, StoreError> {
        let state = self.state.lock().map_err(|_| poisoned())?;
        Ok(state.reports.iter().find(|r| r.id == id).cloned())
    }

    async fn list_reports(
        &self,
        user_id: i64,
        limit: i64,
    ) -> Result<Vec<ReportListItem>, StoreError> {
        let state = self.state.lock().map_err(|_| poisoned())?;
        Ok(state
            .reports
            .iter()
            .rev()
            .filter(|r| r.user_id == Some(user_id))
            .take(usize::try_from(limit).unwrap_or(0))
            .map(|r| ReportListItem {
                id: r.id,
                title: r.title.clone(),
                competitors: r.competitors.clone(),
                total_signals: i64::try_from(r.metadata.total_signals).unwrap_or(0),
                created_at: r.created_at,
            })
            .collect())
    }

    async fn find_cached_report(
        &self,
        identity: &Identity,
        fingerprint: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<CompetitorReport>, StoreError> {
        let state = self.state.lock().map_err(|_| poisoned())?;
        Ok(state
            .reports
            .iter()
            .rev()
            .find(|r| {
                r.metadata.fingerprint == fingerprint
                    && r.created_at >= since
                    && (r.user_id.is_some() && r.user_id == identity.user_id()
                        || r.guest_session_id.is_some()
                            && r.guest_session_id.as_deref() == identity.session_id())
            })
            .cloned())
    }
}

#[async_trait]
impl WatchList for MemoryStore {
    async fn track_competitor(
        &self,
        user_id: i64,
        name: &str,
        canonical: &str,
        cap: u32,
        analyzed_at: Option<DateTime<Utc>>,
    ) -> Result<TrackOutcome, StoreError> {
        let mut state = self.state.lock().map_err(|_| poisoned())?;
        let active = state
            .tracked
            .iter()
            .filter(|t| t.user_id == user_id && t.is_active)
            .count();
        let next_id = i64::try_from(state.tracked.len()).unwrap_or(0) + 1;

        if let Some(entry) = state
            .tracked
            .iter_mut()
            .find(|t| t.user_id == user_id && t.canonical_name == canonical)
        {
            if entry.is_active {
                entry.last_analyzed_at = analyzed_at.or(entry.last_analyzed_at);
                return Ok(TrackOutcome::AlreadyTracked);
            }
            if active >= cap as usize {
                return Ok(TrackOutcome::LimitReached);
            }
            entry.is_active = true;
            entry.competitor_name = name.to_string();
            entry.last_analyzed_at = analyzed_at.or(entry.last_analyzed_at);
            return Ok(TrackOutcome::Reactivated);
        }

        if active >= cap as usize {
            return Ok(TrackOutcome::LimitReached);
        }
        state.tracked.push(TrackedCompetitor {
            id: next_id,
            user_id,
            competitor_name: name.to_string(),
            canonical_name: canonical.to_string(),
            is_active: true,
            added_at: Utc::now(),
            last_analyzed_at: analyzed_at,
        });
        Ok(TrackOutcome::Added)
    }

    async fn list_tracked(&self, user_id: i64) -> Result<Vec<TrackedCompetitor>, StoreError> {
        let state = self.state.lock().map_err(|_| poisoned())?;
        Ok(state
            .tracked
            .iter()
            .filter(|t| t.user_id == user_id && t.is_active)
            .cloned()
            .collect())
    }

    async fn deactivate_tracked(&self, user_id: i64, id: i64) -> Result<bool, StoreError> {
        let mut state = self.state.lock().map_err(|_| poisoned())?;
        match state
            .tracked
            .iter_mut()
            .find(|t| t.id == id && t.user_id == user_id && t.is_active)
        {
            Some(entry) => {
                entry.is_active = false;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn count_active_tracked(&self, user_id: i64) -> Result<i64, StoreError> {
        let state = self.state.lock().map_err(|_| poisoned())?;
        let count = state
            .tracked
            .iter()
            .filter(|t| t.user_id == user_id && t.is_active)
            .count();
        Ok(i64::try_from(count).unwrap_or(0))
    }

    async fn clear_tracked(&self, user_id: i64) -> Result<u64, StoreError> {
        let mut state = self.state.lock().map_err(|_| poisoned())?;
        let before = state.tracked.len();
        state.tracked.retain(|t| t.user_id != user_id);
        Ok((before - state.tracked.len()) as u64)
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn user_for_session(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, StoreError> {
        let state = self.state.lock().map_err(|_| poisoned())?;
        Ok(state
            .sessions
            .get(token_hash)
            .filter(|(_, expires_at)| *expires_at > now)
            .and_then(|(user_id, _)| state.users.get(user_id).cloned()))
    }
}

#[async_trait]
impl StoreHealth for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Replies with the same content to every request and records the models used.
pub struct ScriptedLlm {
    reply: Result<String, ()>,
    pub calls: AtomicUsize,
    pub tiers: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    pub fn replying(content: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(content.to_string()),
            calls: AtomicUsize::new(0),
            tiers: Mutex::new(Vec::new()),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            reply: Err(()),
            calls: AtomicUsize::new(0),
            tiers: Mutex::new(Vec::new()),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn complete(&self, request: &ChatRequest) -> Result<Completion, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let model = format!("{:?}", request.tier).to_lowercase();
        self.tiers.lock().expect("lock").push(model.clone());
        match &self.reply {
            Ok(content) => Ok(Completion {
                content: content.clone(),
                model,
            }),
            Err(()) => Err(LlmError::Api {
                status: 500,
                body: "scripted failure".to_string(),
            }),
        }
    }
}

/// A `news` source returning `per_competitor[name]` items for each name.
pub struct FixedNews {
    per_competitor: HashMap<String, usize>,
    pub calls: AtomicUsize,
}

impl FixedNews {
    pub fn new(per_competitor: &[(&str, usize)]) -> Arc<Self> {
        Arc::new(Self {
            per_competitor: per_competitor
                .iter()
                .map(|(name, n)| ((*name).to_string(), *n))
                .collect(),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SignalSource for FixedNews {
    fn name(&self) -> &'static str {
        "news"
    }

    async fn fetch(&self, competitor: &str) -> SourceOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let n = self.per_competitor.get(competitor).copied().unwrap_or(0);
        SourceOutcome::Items(
            (0..n)
                .filter_map(|i| {
                    SignalItem::new(
                        &format!("{competitor} story {i}"),
                        "Something happened.",
                        SignalType::News,
                    )
                    .map(|item| {
                        item.with_url(Some(format!("https://news.example/{competitor}/{i}")))
                    })
                })
                .collect(),
        )
    }
}

pub fn settings() -> AnalysisSettings {
    AnalysisSettings {
        limits: QuotaLimits::default(),
        max_competitors: 5,
        report_cache_hours: 6,
    }
}

pub fn service(
    store: Arc<MemoryStore>,
    news: Arc<FixedNews>,
    llm: Arc<ScriptedLlm>,
) -> AnalysisService {
    let sources: Vec<Arc<dyn SignalSource>> = vec![news as Arc<dyn SignalSource>];
    AnalysisService::new(
        store,
        Arc::new(SignalAggregator::new(sources)),
        ReportSummarizer::new(llm),
        settings(),
    )
}

/// Router state over the in-memory store. Social and suggestion lookups have
/// no live backends: sentiment comes back neutral and news search fails fast.
pub fn app_state(store: Arc<MemoryStore>, news: Arc<FixedNews>, llm: Arc<ScriptedLlm>) -> AppState {
    let social = SocialSentimentAnalyzer::new(Vec::new(), llm.clone());
    let bing = BingNewsClient::new(reqwest::Client::new(), "http://127.0.0.1:9/news/search");
    AppState {
        store: store.clone(),
        analysis: Arc::new(service(store, news, llm.clone())),
        social: Arc::new(social),
        suggestions: Arc::new(SuggestionFinder::new(bing, llm)),
        limits: settings().limits,
    }
}
