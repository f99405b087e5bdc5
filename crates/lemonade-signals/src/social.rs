//! Social sentiment: comments from each platform, summarised per platform and
//! classified overall.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use lemonade_core::{SignalItem, SignalType};
use lemonade_llm::{classify_overall, summarize_platform, LlmClient, PlatformSentiment, Sentiment};
use serde::Serialize;

use crate::sources::{CommentSource, SignalSource, SourceOutcome};

const MAX_TOP_QUOTES: usize = 6;

#[derive(Debug, Clone, Serialize)]
pub struct SocialSentiment {
    pub competitor: String,
    pub sentiment: Sentiment,
    pub total_mentions: usize,
    pub platforms: Vec<PlatformSentiment>,
    pub top_quotes: Vec<String>,
    /// `platform: reason` for every platform that could not be reached.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unavailable: Vec<String>,
}

pub struct SocialSentimentAnalyzer {
    sources: Vec<Arc<dyn CommentSource>>,
    llm: Arc<dyn LlmClient>,
}

impl SocialSentimentAnalyzer {
    #[must_use]
    pub fn new(sources: Vec<Arc<dyn CommentSource>>, llm: Arc<dyn LlmClient>) -> Self {
        Self { sources, llm }
    }

    #[must_use]
    pub fn platforms(&self) -> Vec<&'static str> {
        self.sources.iter().map(|s| s.platform()).collect()
    }

    pub async fn analyze(&self, competitor: &str) -> SocialSentiment {
        let fetched = join_all(self.sources.iter().map(|source| async move {
            (source.platform(), source.recent_comments(competitor).await)
        }))
        .await;

        let mut platforms = Vec::new();
        let mut unavailable = Vec::new();
        let mut comment_texts = Vec::new();

        for (platform, result) in fetched {
            match result {
                Ok(comments) => {
                    let texts: Vec<String> = comments.into_iter().map(|c| c.text).collect();
                    let summary =
                        summarize_platform(self.llm.as_ref(), platform, competitor, &texts).await;
                    comment_texts.extend(texts);
                    platforms.push(summary);
                }
                Err(e) => {
                    tracing::warn!(platform, competitor, error = %e, "comment source unavailable");
                    unavailable.push(format!("{platform}: {e}"));
                }
            }
        }

        let active: Vec<PlatformSentiment> = platforms
            .iter()
            .filter(|p| p.mentions > 0)
            .cloned()
            .collect();
        let sentiment =
            classify_overall(self.llm.as_ref(), competitor, &active, &comment_texts).await;

        SocialSentiment {
            competitor: competitor.to_string(),
            sentiment,
            total_mentions: platforms.iter().map(|p| p.mentions).sum(),
            top_quotes: interleave_quotes(&platforms, MAX_TOP_QUOTES),
            platforms,
            unavailable,
        }
    }
}

/// Take quotes round-robin across platforms so no single one dominates.
fn interleave_quotes(platforms: &[PlatformSentiment], max: usize) -> Vec<String> {
    let mut out = Vec::new();
    let longest = platforms.iter().map(|p| p.quotes.len()).max().unwrap_or(0);
    for i in 0..longest {
        for platform in platforms {
            if let Some(quote) = platform.quotes.get(i) {
                if out.len() == max {
                    return out;
                }
                out.push(quote.clone());
            }
        }
    }
    out
}

/// The `social` request family: one item per platform that had discussion.
pub struct SocialSource {
    analyzer: Arc<SocialSentimentAnalyzer>,
}

impl SocialSource {
    #[must_use]
    pub fn new(analyzer: Arc<SocialSentimentAnalyzer>) -> Self {
        Self { analyzer }
    }
}

#[async_trait]
impl SignalSource for SocialSource {
    fn name(&self) -> &'static str {
        "social"
    }

    async fn fetch(&self, competitor: &str) -> SourceOutcome {
        let social = self.analyzer.analyze(competitor).await;
        if social.platforms.is_empty() && !social.unavailable.is_empty() {
            return SourceOutcome::Unavailable(social.unavailable.join("; "));
        }

        let items: Vec<SignalItem> = social
            .platforms
            .iter()
            .filter(|p| p.mentions > 0)
            .filter_map(|p| {
                let mut content = p.summary.clone();
                for quote in &p.quotes {
                    content.push_str(&format!(" \"{quote}\""));
                }
                SignalItem::new(
                    &format!(
                        "{} discussion ({} mentions): {}",
                        p.platform,
                        p.mentions,
                        p.sentiment.as_str()
                    ),
                    &content,
                    SignalType::Social,
                )
            })
            .collect();

        tracing::debug!(competitor, count = items.len(), "collected social signals");
        SourceOutcome::Items(items)
    }
}
