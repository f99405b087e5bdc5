//! LLM-backed analysis for Competitor Lemonade.
//!
//! Every model interaction goes through [`LlmClient`] and, for JSON-contract
//! calls, the [`structured::call_json`] helper. Services built on top:
//! the report summariser, the competitor-suggestion analyser, and the
//! per-platform / overall sentiment classifiers with their keyword fallback.

pub mod client;
pub mod error;
pub mod lexicon;
pub mod sentiment;
pub mod structured;
pub mod suggestions;
pub mod summarizer;

pub use client::{
    ChatRequest, Completion, DisabledLlm, LlmClient, ModelTier, OpenAiClient, OpenAiConfig,
};
pub use error::LlmError;
pub use lexicon::{fallback_sentiment, keyword_counts};
pub use sentiment::{classify_overall, summarize_platform, PlatformSentiment, Sentiment};
pub use suggestions::{Suggestion, SuggestionAnalyzer};
pub use summarizer::{
    ActivityLevel, CompetitiveAnalysis, CompetitorAnalysis, Methodology, PreviewAnalysis,
    PreviewCompetitor, ReportSummarizer, SentimentScore, Summary,
};
