//! Public signal collection for Competitor Lemonade.
//!
//! News, funding and product items come from Bing News RSS; social items come
//! from Hacker News (and optionally Reddit) comments summarised by the LLM.
//! Every source degrades to an "unavailable" outcome instead of failing the
//! analysis.

pub mod aggregator;
pub mod config;
pub mod error;
pub mod links;
pub mod rss;
pub mod social;
pub mod sources;
pub mod suggest;

use std::sync::Arc;

use lemonade_llm::LlmClient;

pub use aggregator::SignalAggregator;
pub use config::SignalsConfig;
pub use error::SignalError;
pub use links::normalize_link;
pub use rss::{classify, parse_rss_items};
pub use social::{SocialSentiment, SocialSentimentAnalyzer, SocialSource};
pub use sources::{
    BingNewsClient, Comment, CommentSource, HackerNewsSource, RedditSource, RssQuery, RssSource,
    SignalSource, SourceOutcome,
};
pub use suggest::{extract_candidates, SuggestionFinder};

/// Everything the service needs from this crate, wired from config.
pub struct SignalServices {
    pub aggregator: SignalAggregator,
    pub social: Arc<SocialSentimentAnalyzer>,
    pub suggestions: SuggestionFinder,
}

impl SignalServices {
    /// # Errors
    ///
    /// Returns [`SignalError::Http`] if the HTTP client cannot be built.
    pub fn from_config(
        config: &SignalsConfig,
        llm: Arc<dyn LlmClient>,
    ) -> Result<Self, SignalError> {
        let http = config.http_client()?;
        let bing = BingNewsClient::new(http.clone(), &config.bing_news_url);

        let mut comment_sources: Vec<Arc<dyn CommentSource>> = vec![Arc::new(
            HackerNewsSource::new(http.clone(), &config.hacker_news_base_url),
        )];
        if config.reddit_enabled {
            comment_sources.push(Arc::new(RedditSource::new(
                http,
                &config.reddit_base_url,
                config.reddit_comment_delay,
            )));
        }
        let social = Arc::new(SocialSentimentAnalyzer::new(comment_sources, llm.clone()));

        let sources: Vec<Arc<dyn SignalSource>> = vec![
            Arc::new(RssSource::new(bing.clone(), RssQuery::News)),
            Arc::new(RssSource::new(bing.clone(), RssQuery::Funding)),
            Arc::new(SocialSource::new(social.clone())),
            Arc::new(RssSource::new(bing.clone(), RssQuery::Products)),
        ];
        let aggregator = SignalAggregator::new(sources);

        tracing::info!(
            sources = ?aggregator.source_names(),
            platforms = ?social.platforms(),
            "signal sources configured"
        );

        Ok(Self {
            aggregator,
            social,
            suggestions: SuggestionFinder::new(bing, llm),
        })
    }
}
