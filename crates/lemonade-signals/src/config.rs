//! HTTP and source settings for signal collection.

use std::time::Duration;

use lemonade_core::AppConfig;

use crate::error::SignalError;

pub const BING_NEWS_URL: &str = "https://www.bing.com/news/search";
pub const REDDIT_BASE_URL: &str = "https://www.reddit.com";
pub const HACKER_NEWS_BASE_URL: &str = "https://hn.algolia.com/api/v1";

#[derive(Debug, Clone)]
pub struct SignalsConfig {
    pub http_timeout_secs: u64,
    pub user_agent: String,
    pub bing_news_url: String,
    pub reddit_base_url: String,
    pub hacker_news_base_url: String,
    /// Reddit comments feed social sentiment only when this is set.
    pub reddit_enabled: bool,
    pub reddit_comment_delay: Duration,
}

impl SignalsConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            http_timeout_secs: config.http_timeout_secs,
            user_agent: config.user_agent.clone(),
            reddit_enabled: config.reddit_sentiment_enabled,
            reddit_comment_delay: Duration::from_millis(config.reddit_comment_delay_ms),
            ..Self::default()
        }
    }

    /// Shared client for every outbound source request.
    ///
    /// # Errors
    ///
    /// Returns [`SignalError::Http`] if the client cannot be built.
    pub fn http_client(&self) -> Result<reqwest::Client, SignalError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(self.http_timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(&self.user_agent)
            .build()?;
        Ok(client)
    }
}

impl Default for SignalsConfig {
    fn default() -> Self {
        Self {
            http_timeout_secs: 30,
            user_agent: "competitor-lemonade/0.1 (competitive-intelligence)".to_string(),
            bing_news_url: BING_NEWS_URL.to_string(),
            reddit_base_url: REDDIT_BASE_URL.to_string(),
            hacker_news_base_url: HACKER_NEWS_BASE_URL.to_string(),
            reddit_enabled: false,
            reddit_comment_delay: Duration::from_millis(500),
        }
    }
}
