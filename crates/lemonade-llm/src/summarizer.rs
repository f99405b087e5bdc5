//! Turns a request's collected signals into the structured report.
//!
//! Unlike the sentiment helpers there is no fallback here: a reply that is
//! missing, not JSON, or lacks an executive summary fails the analysis.
//! Everything else in the reply is optional and filled with defaults.

use std::fmt::Write as _;
use std::sync::Arc;

use lemonade_core::CompetitorSignal;
use serde::{Deserialize, Serialize};

use crate::client::{LlmClient, ModelTier};
use crate::error::LlmError;
use crate::structured::{call_json, StructuredCall};

const PREVIEW_ITEMS_PER_SOURCE: usize = 3;
const ITEM_CONTENT_CHARS: usize = 400;
const NEUTRAL_SCORE: f64 = 50.0;

/// Labels the model invents beyond high, moderate and low land in `Unknown`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum ActivityLevel {
    High,
    Moderate,
    Low,
    #[default]
    Unknown,
}

impl From<String> for ActivityLevel {
    fn from(value: String) -> Self {
        match value.trim().to_lowercase().as_str() {
            "high" => ActivityLevel::High,
            "moderate" | "medium" => ActivityLevel::Moderate,
            "low" => ActivityLevel::Low,
            _ => ActivityLevel::Unknown,
        }
    }
}

fn neutral_score() -> f64 {
    NEUTRAL_SCORE
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentScore {
    /// 0 (very negative) to 100 (very positive).
    #[serde(default = "neutral_score")]
    pub score: f64,
    #[serde(default)]
    pub mentions: u32,
}

impl Default for SentimentScore {
    fn default() -> Self {
        Self {
            score: NEUTRAL_SCORE,
            mentions: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetitorAnalysis {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub activity_level: ActivityLevel,
    #[serde(default)]
    pub recent_developments: Vec<String>,
    #[serde(default)]
    pub funding_and_business: Vec<String>,
    #[serde(default)]
    pub sentiment: SentimentScore,
    #[serde(default)]
    pub key_insights: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Methodology {
    #[serde(default)]
    pub sources_analyzed: Vec<String>,
    #[serde(default)]
    pub total_signals: usize,
}

impl Methodology {
    /// What was actually fed to the model, regardless of what it claims.
    #[must_use]
    pub fn from_signals(signals: &[CompetitorSignal]) -> Self {
        let mut sources_analyzed: Vec<String> = Vec::new();
        for signal in signals {
            if !sources_analyzed.contains(&signal.source) {
                sources_analyzed.push(signal.source.clone());
            }
        }
        Self {
            sources_analyzed,
            total_signals: signals.iter().map(|s| s.items.len()).sum(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetitiveAnalysis {
    #[serde(default)]
    pub executive_summary: String,
    #[serde(default)]
    pub competitors: Vec<CompetitorAnalysis>,
    #[serde(default)]
    pub strategic_insights: Vec<String>,
    #[serde(default)]
    pub methodology: Methodology,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewCompetitor {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub activity_level: ActivityLevel,
    #[serde(default)]
    pub highlights: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewAnalysis {
    #[serde(default)]
    pub executive_summary: String,
    #[serde(default)]
    pub competitors: Vec<PreviewCompetitor>,
    #[serde(default)]
    pub methodology: Methodology,
}

/// A parsed analysis plus the model that produced it and its JSON form.
#[derive(Debug, Clone)]
pub struct Summary<A> {
    pub analysis: A,
    pub model: String,
    /// `analysis` re-serialised; stored as the report's `summary` column.
    pub json: String,
}

pub struct ReportSummarizer {
    llm: Arc<dyn LlmClient>,
}

impl ReportSummarizer {
    #[must_use]
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// Produce the full report.
    ///
    /// `premium` selects the premium model tier instead of the standard one.
    ///
    /// # Errors
    ///
    /// Any [`LlmError`]: the provider is unavailable or failed, the reply was
    /// empty or not valid JSON, or it had no executive summary.
    pub async fn summarize(
        &self,
        competitors: &[String],
        signals: &[CompetitorSignal],
        premium: bool,
    ) -> Result<Summary<CompetitiveAnalysis>, LlmError> {
        let call = StructuredCall {
            name: "report_summary",
            tier: if premium {
                ModelTier::Premium
            } else {
                ModelTier::Standard
            },
            system: SYSTEM_PROMPT.to_string(),
            user: format!(
                "Competitors: {}\n\n{}\n\nSignals:\n{}",
                competitors.join(", "),
                FULL_SCHEMA,
                render_signals(signals)
            ),
            temperature: 0.3,
            max_tokens: Some(4000),
        };

        let reply = call_json::<CompetitiveAnalysis>(self.llm.as_ref(), call).await?;
        let mut analysis = reply.value;
        require_summary("report_summary", &analysis.executive_summary)?;
        analysis.methodology = Methodology::from_signals(signals);

        finish(analysis, reply.model, "report_summary")
    }

    /// Produce the short preview from at most three items per source.
    ///
    /// # Errors
    ///
    /// Same as [`ReportSummarizer::summarize`].
    pub async fn preview(
        &self,
        competitors: &[String],
        signals: &[CompetitorSignal],
    ) -> Result<Summary<PreviewAnalysis>, LlmError> {
        let trimmed: Vec<CompetitorSignal> = signals
            .iter()
            .map(|s| s.truncated(PREVIEW_ITEMS_PER_SOURCE))
            .collect();

        let call = StructuredCall {
            name: "report_preview",
            tier: ModelTier::Fast,
            system: SYSTEM_PROMPT.to_string(),
            user: format!(
                "Competitors: {}\n\n{}\n\nSignals:\n{}",
                competitors.join(", "),
                PREVIEW_SCHEMA,
                render_signals(&trimmed)
            ),
            temperature: 0.3,
            max_tokens: Some(1200),
        };

        let reply = call_json::<PreviewAnalysis>(self.llm.as_ref(), call).await?;
        let mut analysis = reply.value;
        require_summary("report_preview", &analysis.executive_summary)?;
        analysis.methodology = Methodology::from_signals(&trimmed);

        finish(analysis, reply.model, "report_preview")
    }
}

fn require_summary(call: &str, executive_summary: &str) -> Result<(), LlmError> {
    if executive_summary.trim().is_empty() {
        return Err(LlmError::Contract {
            call: call.to_string(),
            reason: "executive_summary is empty".to_string(),
        });
    }
    Ok(())
}

fn finish<A: Serialize>(analysis: A, model: String, call: &str) -> Result<Summary<A>, LlmError> {
    let json = serde_json::to_string(&analysis).map_err(|source| LlmError::InvalidJson {
        call: call.to_string(),
        source,
    })?;
    Ok(Summary {
        analysis,
        model,
        json,
    })
}

/// Plain-text rendering of the signals for the prompt.
pub(crate) fn render_signals(signals: &[CompetitorSignal]) -> String {
    let mut out = String::new();
    for signal in signals {
        let _ = writeln!(out, "## {} ({})", signal.competitor, signal.source);
        if let Some(reason) = &signal.unavailable {
            let _ = writeln!(out, "(source unavailable: {reason})");
            continue;
        }
        if signal.items.is_empty() {
            let _ = writeln!(out, "(no items found)");
            continue;
        }
        for item in &signal.items {
            let content: String = item.content.chars().take(ITEM_CONTENT_CHARS).collect();
            let _ = write!(out, "- [{}] {}: {}", item.kind, item.title, content);
            if let Some(date) = item.published_at {
                let _ = write!(out, " ({})", date.format("%Y-%m-%d"));
            }
            out.push('\n');
        }
    }
    out
}

const SYSTEM_PROMPT: &str = "You are a competitive-intelligence analyst. You read raw public \
signals (news, funding announcements, product launches, community discussion) about a set of \
companies and write a concise, factual briefing. Only use facts present in the signals. \
Reply with a single JSON object and nothing else.";

const FULL_SCHEMA: &str = r#"Return JSON with exactly this shape:
{
  "executive_summary": "3-4 sentences covering the whole competitive landscape",
  "competitors": [
    {
      "name": "competitor name as given",
      "activity_level": "high" | "moderate" | "low",
      "recent_developments": ["bullet", "..."],
      "funding_and_business": ["bullet", "..."],
      "sentiment": {"score": 0-100, "mentions": number of signals mentioning it},
      "key_insights": ["bullet", "..."]
    }
  ],
  "strategic_insights": ["cross-competitor insight", "..."],
  "methodology": {"sources_analyzed": ["source", "..."], "total_signals": number}
}
Include one entry in "competitors" for every competitor listed above."#;

const PREVIEW_SCHEMA: &str = r#"Return JSON with exactly this shape:
{
  "executive_summary": "2 sentences",
  "competitors": [
    {"name": "competitor name", "activity_level": "high" | "moderate" | "low", "highlights": ["at most 2 bullets"]}
  ]
}"#;

#[cfg(test)]
mod tests {
    use super::*;
    use lemonade_core::{SignalItem, SignalType};

    fn signal(competitor: &str, source: &str, n: usize) -> CompetitorSignal {
        CompetitorSignal {
            source: source.to_string(),
            competitor: competitor.to_string(),
            items: (0..n)
                .filter_map(|i| SignalItem::new(&format!("Headline {i}"), "body", SignalType::News))
                .collect(),
            unavailable: None,
        }
    }

    #[test]
    fn activity_level_accepts_medium_alias_and_case() {
        let level: ActivityLevel = serde_json::from_str("\"Medium\"").expect("alias");
        assert_eq!(level, ActivityLevel::Moderate);
        let level: ActivityLevel = serde_json::from_str("\"HIGH\"").expect("case");
        assert_eq!(level, ActivityLevel::High);
        let level: ActivityLevel = serde_json::from_str("\"very high\"").expect("fallback");
        assert_eq!(level, ActivityLevel::Unknown);
        assert_eq!(
            serde_json::to_string(&ActivityLevel::Moderate).expect("serialize"),
            "\"moderate\""
        );
    }

    #[test]
    fn methodology_counts_items_and_dedupes_sources() {
        let signals = vec![
            signal("Acme", "news", 2),
            signal("Beta", "news", 0),
            signal("Acme", "funding", 1),
        ];
        let m = Methodology::from_signals(&signals);
        assert_eq!(m.sources_analyzed, vec!["news", "funding"]);
        assert_eq!(m.total_signals, 3);
    }

    #[test]
    fn render_marks_unavailable_and_empty_sources() {
        let mut down = signal("Beta", "news", 0);
        down.unavailable = Some("timeout".to_string());
        let text = render_signals(&[signal("Acme", "news", 1), down, signal("Gamma", "news", 0)]);
        assert!(text.contains("## Acme (news)"));
        assert!(text.contains("- [news] Headline 0: body"));
        assert!(text.contains("(source unavailable: timeout)"));
        assert!(text.contains("(no items found)"));
    }

    #[test]
    fn analysis_parses_with_missing_optional_lists() {
        let json = r#"{
            "executive_summary": "Acme is busy.",
            "competitors": [{"name": "Acme", "activity_level": "high", "sentiment": {"score": 72}}]
        }"#;
        let parsed: CompetitiveAnalysis = serde_json::from_str(json).expect("parse");
        assert_eq!(parsed.competitors[0].activity_level, ActivityLevel::High);
        assert!(parsed.competitors[0].recent_developments.is_empty());
        assert_eq!(parsed.methodology, Methodology::default());
    }

    #[test]
    fn analysis_tolerates_missing_sentiment_and_unknown_activity() {
        let json = r#"{
            "executive_summary": "Acme is everywhere.",
            "competitors": [{"name": "Acme", "activity_level": "very high"}, {"name": "Beta"}]
        }"#;
        let parsed: CompetitiveAnalysis = serde_json::from_str(json).expect("parse");
        assert_eq!(parsed.competitors[0].activity_level, ActivityLevel::Unknown);
        assert_eq!(parsed.competitors[0].sentiment, SentimentScore::default());
        assert_eq!(parsed.competitors[1].activity_level, ActivityLevel::Unknown);
        assert!(parsed.competitors[1].key_insights.is_empty());
    }

    #[test]
    fn missing_executive_summary_is_a_contract_error() {
        let parsed: CompetitiveAnalysis =
            serde_json::from_str(r#"{"competitors": []}"#).expect("parse");
        assert!(matches!(
            require_summary("report_summary", &parsed.executive_summary),
            Err(LlmError::Contract { .. })
        ));
    }
}
