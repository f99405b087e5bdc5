//! Signal source abstractions.
//!
//! A [`SignalSource`] produces items for one competitor and never fails the
//! request: upstream errors come back as [`SourceOutcome::Unavailable`] so the
//! aggregator can record them and carry on.

mod bing;
mod hackernews;
mod reddit;

pub use bing::{BingNewsClient, RssQuery, RssSource};
pub use hackernews::HackerNewsSource;
pub use reddit::RedditSource;

use async_trait::async_trait;
use lemonade_core::SignalItem;
use serde::{Deserialize, Serialize};

use crate::error::SignalError;

#[derive(Debug, Clone, PartialEq)]
pub enum SourceOutcome {
    /// The source answered; the list may be empty.
    Items(Vec<SignalItem>),
    /// The source errored; the string says why.
    Unavailable(String),
}

impl SourceOutcome {
    /// Log and wrap a fetch result.
    pub(crate) fn from_result(
        source: &str,
        competitor: &str,
        result: Result<Vec<SignalItem>, SignalError>,
    ) -> Self {
        match result {
            Ok(items) => {
                tracing::debug!(source, competitor, count = items.len(), "collected signals");
                SourceOutcome::Items(items)
            }
            Err(e) => {
                tracing::warn!(source, competitor, error = %e, "signal source unavailable");
                SourceOutcome::Unavailable(e.to_string())
            }
        }
    }
}

#[async_trait]
pub trait SignalSource: Send + Sync {
    /// Family name; matches the request toggle that enables this source.
    fn name(&self) -> &'static str;

    async fn fetch(&self, competitor: &str) -> SourceOutcome;
}

/// A single community comment mentioning a competitor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub text: String,
    pub url: Option<String>,
}

/// A platform that yields recent comments about a competitor.
#[async_trait]
pub trait CommentSource: Send + Sync {
    /// Display name used in sentiment output, e.g. `hackernews`.
    fn platform(&self) -> &'static str;

    /// # Errors
    ///
    /// Returns [`SignalError`] when the platform cannot be reached or answers
    /// with something unreadable.
    async fn recent_comments(&self, competitor: &str) -> Result<Vec<Comment>, SignalError>;
}
