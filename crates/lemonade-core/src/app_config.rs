use std::net::SocketAddr;

use crate::quota::Plan;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Usage caps per plan. Guest sessions get a lifetime allowance instead of a
/// daily one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaLimits {
    pub free_daily: u32,
    pub pro_daily: u32,
    pub guest_lifetime: u32,
    pub free_tracked: u32,
    pub pro_tracked: u32,
}

impl Default for QuotaLimits {
    fn default() -> Self {
        Self {
            free_daily: 5,
            pro_daily: 100,
            guest_lifetime: 1,
            free_tracked: 10,
            pro_tracked: 50,
        }
    }
}

impl QuotaLimits {
    /// Maximum number of active tracked competitors for a plan.
    #[must_use]
    pub fn tracked_cap(&self, plan: Plan) -> u32 {
        match plan {
            Plan::Free => self.free_tracked,
            Plan::Pro => self.pro_tracked,
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub openai_api_key: Option<String>,
    pub llm_base_url: String,
    pub llm_fast_model: String,
    pub llm_standard_model: String,
    pub llm_premium_model: String,
    pub http_timeout_secs: u64,
    pub user_agent: String,
    pub quota: QuotaLimits,
    pub max_competitors: usize,
    pub report_cache_hours: u64,
    pub reddit_sentiment_enabled: bool,
    pub reddit_comment_delay_ms: u64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field(
                "openai_api_key",
                &self.openai_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("llm_base_url", &self.llm_base_url)
            .field("llm_fast_model", &self.llm_fast_model)
            .field("llm_standard_model", &self.llm_standard_model)
            .field("llm_premium_model", &self.llm_premium_model)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("quota", &self.quota)
            .field("max_competitors", &self.max_competitors)
            .field("report_cache_hours", &self.report_cache_hours)
            .field("reddit_sentiment_enabled", &self.reddit_sentiment_enabled)
            .field("reddit_comment_delay_ms", &self.reddit_comment_delay_ms)
            .finish()
    }
}
