//! Comment-level sentiment: per-platform summaries and the overall label.

use serde::{Deserialize, Serialize};

use crate::client::{LlmClient, ModelTier};
use crate::lexicon::fallback_sentiment;
use crate::structured::{call_json, StructuredCall};

const MAX_QUOTES: usize = 3;
const QUOTE_CHARS: usize = 200;
const COMMENT_CHARS: usize = 600;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl Sentiment {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Negative => "negative",
            Sentiment::Neutral => "neutral",
        }
    }

    /// Lenient parse of a model label; anything unrecognised is `None`.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim().to_lowercase();
        if label.starts_with("pos") {
            Some(Sentiment::Positive)
        } else if label.starts_with("neg") {
            Some(Sentiment::Negative)
        } else if label.starts_with("neu") || label == "mixed" {
            Some(Sentiment::Neutral)
        } else {
            None
        }
    }
}

/// What one platform's discussion says about a competitor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformSentiment {
    pub platform: String,
    pub sentiment: Sentiment,
    pub summary: String,
    pub quotes: Vec<String>,
    pub mentions: usize,
}

#[derive(Deserialize)]
struct PlatformReply {
    sentiment: String,
    summary: String,
    #[serde(default)]
    quotes: Vec<String>,
}

#[derive(Deserialize)]
struct OverallReply {
    sentiment: String,
}

/// Summarise a platform's comments about `competitor`.
///
/// Falls back to the keyword lexicon and the first comments as quotes when the
/// LLM is unavailable or replies with something unusable.
pub async fn summarize_platform(
    llm: &dyn LlmClient,
    platform: &str,
    competitor: &str,
    comments: &[String],
) -> PlatformSentiment {
    let mentions = comments.len();
    if comments.is_empty() {
        return PlatformSentiment {
            platform: platform.to_string(),
            sentiment: Sentiment::Neutral,
            summary: format!("No recent {platform} discussion found for {competitor}."),
            quotes: Vec::new(),
            mentions,
        };
    }

    let numbered = comments
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{}. {}", i + 1, truncate(c, COMMENT_CHARS)))
        .collect::<Vec<_>>()
        .join("\n");

    let call = StructuredCall {
        name: "platform_sentiment",
        tier: ModelTier::Fast,
        system: "You analyse public developer and business community comments about companies. \
                 Reply with JSON only."
            .to_string(),
        user: format!(
            "Below are {mentions} recent {platform} comments mentioning \"{competitor}\".\n\
             Return JSON with keys:\n\
             - \"sentiment\": one of \"positive\", \"negative\", \"neutral\"\n\
             - \"summary\": two sentences on how people talk about {competitor}\n\
             - \"quotes\": up to 3 short representative quotes copied from the comments\n\n\
             Comments:\n{numbered}"
        ),
        temperature: 0.2,
        max_tokens: Some(500),
    };

    match call_json::<PlatformReply>(llm, call).await {
        Ok(reply) => {
            let sentiment = Sentiment::from_label(&reply.value.sentiment)
                .unwrap_or_else(|| fallback_sentiment(&comments.join(" ")));
            PlatformSentiment {
                platform: platform.to_string(),
                sentiment,
                summary: reply.value.summary.trim().to_string(),
                quotes: reply
                    .value
                    .quotes
                    .iter()
                    .map(|q| truncate(q.trim(), QUOTE_CHARS))
                    .filter(|q| !q.is_empty())
                    .take(MAX_QUOTES)
                    .collect(),
                mentions,
            }
        }
        Err(e) => {
            tracing::warn!(
                platform,
                competitor,
                error = %e,
                "platform sentiment LLM call failed; using keyword fallback"
            );
            keyword_platform_summary(platform, competitor, comments)
        }
    }
}

fn keyword_platform_summary(
    platform: &str,
    competitor: &str,
    comments: &[String],
) -> PlatformSentiment {
    let sentiment = fallback_sentiment(&comments.join(" "));
    let label = match sentiment {
        Sentiment::Positive => "mostly positive",
        Sentiment::Negative => "mostly negative",
        Sentiment::Neutral => "mixed or neutral",
    };
    PlatformSentiment {
        platform: platform.to_string(),
        sentiment,
        summary: format!(
            "{} recent {platform} comments mention {competitor}; keyword analysis reads them as {label}.",
            comments.len()
        ),
        quotes: comments
            .iter()
            .take(MAX_QUOTES)
            .map(|c| truncate(c, QUOTE_CHARS))
            .collect(),
        mentions: comments.len(),
    }
}

/// Classify the combined platform summaries into a single label.
///
/// Without a usable LLM reply, counts lexicon keywords over `comment_texts`
/// (or over the summaries when no raw comments are available).
pub async fn classify_overall(
    llm: &dyn LlmClient,
    competitor: &str,
    platforms: &[PlatformSentiment],
    comment_texts: &[String],
) -> Sentiment {
    if platforms.is_empty() && comment_texts.is_empty() {
        return Sentiment::Neutral;
    }

    let combined = platforms
        .iter()
        .map(|p| format!("[{}] {}", p.platform, p.summary))
        .collect::<Vec<_>>()
        .join("\n");

    let call = StructuredCall {
        name: "overall_sentiment",
        tier: ModelTier::Fast,
        system: "You classify sentiment. Reply with JSON only.".to_string(),
        user: format!(
            "Classify the overall public sentiment toward \"{competitor}\" from these \
             per-platform summaries as exactly one of \"positive\", \"negative\" or \"neutral\".\n\
             Return {{\"sentiment\": \"...\"}}.\n\n{combined}"
        ),
        temperature: 0.0,
        max_tokens: Some(50),
    };

    match call_json::<OverallReply>(llm, call).await {
        Ok(reply) => match Sentiment::from_label(&reply.value.sentiment) {
            Some(sentiment) => sentiment,
            None => {
                tracing::warn!(
                    competitor,
                    label = %reply.value.sentiment,
                    "unrecognised overall sentiment label; using keyword fallback"
                );
                keyword_overall(platforms, comment_texts)
            }
        },
        Err(e) => {
            tracing::warn!(
                competitor,
                error = %e,
                "overall sentiment LLM call failed; using keyword fallback"
            );
            keyword_overall(platforms, comment_texts)
        }
    }
}

fn keyword_overall(platforms: &[PlatformSentiment], comment_texts: &[String]) -> Sentiment {
    if comment_texts.is_empty() {
        let summaries = platforms
            .iter()
            .map(|p| p.summary.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        fallback_sentiment(&summaries)
    } else {
        fallback_sentiment(&comment_texts.join(" "))
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::DisabledLlm;

    #[test]
    fn label_parsing_is_lenient() {
        assert_eq!(Sentiment::from_label(" Positive "), Some(Sentiment::Positive));
        assert_eq!(Sentiment::from_label("NEGATIVE."), Some(Sentiment::Negative));
        assert_eq!(Sentiment::from_label("mixed"), Some(Sentiment::Neutral));
        assert_eq!(Sentiment::from_label("unclear"), None);
    }

    #[tokio::test]
    async fn overall_falls_back_to_keywords_without_llm() {
        let comments = vec![
            "Great tool, love it".to_string(),
            "I recommend it, though the docs are bad".to_string(),
        ];
        let sentiment = classify_overall(&DisabledLlm, "Acme", &[], &comments).await;
        assert_eq!(sentiment, Sentiment::Positive);
    }

    #[tokio::test]
    async fn overall_tie_is_neutral_without_llm() {
        let comments = vec!["great onboarding".to_string(), "terrible billing".to_string()];
        let sentiment = classify_overall(&DisabledLlm, "Acme", &[], &comments).await;
        assert_eq!(sentiment, Sentiment::Neutral);
    }

    #[tokio::test]
    async fn platform_fallback_quotes_first_comments() {
        let comments: Vec<String> = (1..=5)
            .map(|i| format!("comment number {i} is good"))
            .collect();
        let summary = summarize_platform(&DisabledLlm, "hackernews", "Acme", &comments).await;
        assert_eq!(summary.mentions, 5);
        assert_eq!(summary.quotes.len(), 3);
        assert_eq!(summary.sentiment, Sentiment::Positive);
        assert!(summary.summary.contains("keyword analysis"));
    }

    #[tokio::test]
    async fn empty_platform_is_neutral() {
        let summary = summarize_platform(&DisabledLlm, "reddit", "Acme", &[]).await;
        assert_eq!(summary.sentiment, Sentiment::Neutral);
        assert_eq!(summary.mentions, 0);
    }

    #[test]
    fn truncate_appends_ellipsis() {
        assert_eq!(truncate("abcdef", 3), "abc...");
        assert_eq!(truncate("abc", 3), "abc");
    }
}
