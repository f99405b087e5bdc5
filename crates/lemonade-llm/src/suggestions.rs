//! Scores candidate competitors for relevance to the one the user entered.

use std::collections::HashSet;
use std::sync::Arc;

use lemonade_core::canonical_identity;
use serde::{Deserialize, Serialize};

use crate::client::{LlmClient, ModelTier};
use crate::structured::{call_json, StructuredCall};

const MIN_SCORE: u8 = 50;
const MAX_SUGGESTIONS: usize = 5;
const MAX_KNOWLEDGE_CANDIDATES: usize = 8;
const FALLBACK_SCORE: u8 = 60;
const FALLBACK_REASON: &str = "Could not analyze relevance; listed from raw search results.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub name: String,
    /// Relevance from 0 to 100.
    pub score: u8,
    pub is_valid: bool,
    pub reason: String,
}

#[derive(Deserialize)]
struct ScoredReply {
    #[serde(default)]
    suggestions: Vec<ScoredCandidate>,
}

#[derive(Deserialize)]
struct ScoredCandidate {
    name: String,
    score: f64,
    #[serde(default)]
    is_valid: bool,
    #[serde(default)]
    reason: String,
}

#[derive(Deserialize)]
struct KnowledgeReply {
    #[serde(default)]
    competitors: Vec<String>,
}

pub struct SuggestionAnalyzer {
    llm: Arc<dyn LlmClient>,
}

impl SuggestionAnalyzer {
    #[must_use]
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// Ask the model which companies it knows compete with `competitor`.
    ///
    /// Returns an empty list when the model is unavailable.
    pub async fn knowledge_candidates(&self, competitor: &str) -> Vec<String> {
        let call = StructuredCall {
            name: "competitor_knowledge",
            tier: ModelTier::Fast,
            system: "You are a market analyst. Reply with JSON only.".to_string(),
            user: format!(
                "List up to {MAX_KNOWLEDGE_CANDIDATES} companies that compete directly with \
                 \"{competitor}\". Return {{\"competitors\": [\"Name\", ...]}}. \
                 Use company names only, no descriptions."
            ),
            temperature: 0.3,
            max_tokens: Some(300),
        };

        match call_json::<KnowledgeReply>(self.llm.as_ref(), call).await {
            Ok(reply) => reply
                .value
                .competitors
                .into_iter()
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty())
                .take(MAX_KNOWLEDGE_CANDIDATES)
                .collect(),
            Err(e) => {
                tracing::warn!(competitor, error = %e, "knowledge candidate lookup failed");
                Vec::new()
            }
        }
    }

    /// Score `candidates` against `original` and return the best few.
    ///
    /// Candidates that canonicalise to the original (or to each other) are
    /// collapsed first. When scoring fails the cleaned candidates are returned
    /// unscored so the caller still has something to show.
    pub async fn analyze(&self, original: &str, candidates: &[String]) -> Vec<Suggestion> {
        let candidates = clean_candidates(original, candidates);
        if candidates.is_empty() {
            return Vec::new();
        }

        let listed = candidates
            .iter()
            .map(|c| format!("- {c}"))
            .collect::<Vec<_>>()
            .join("\n");

        let call = StructuredCall {
            name: "suggestion_scoring",
            tier: ModelTier::Fast,
            system: "You evaluate whether companies are genuine competitors. Reply with JSON only."
                .to_string(),
            user: format!(
                "The user is researching competitors of \"{original}\". Score each candidate \
                 below from 0 to 100 for how directly it competes with {original}. Set \
                 \"is_valid\" to false for anything that is not a real company (people, \
                 publications, generic words, products of {original} itself).\n\
                 Return {{\"suggestions\": [{{\"name\": \"...\", \"score\": 0, \
                 \"is_valid\": true, \"reason\": \"one sentence\"}}]}}.\n\n\
                 Candidates:\n{listed}"
            ),
            temperature: 0.1,
            max_tokens: Some(800),
        };

        match call_json::<ScoredReply>(self.llm.as_ref(), call).await {
            Ok(reply) => rank(reply.value.suggestions),
            Err(e) => {
                tracing::warn!(
                    competitor = original,
                    error = %e,
                    "suggestion scoring failed; returning raw candidates"
                );
                candidates
                    .into_iter()
                    .take(MAX_SUGGESTIONS)
                    .map(|name| Suggestion {
                        name,
                        score: FALLBACK_SCORE,
                        is_valid: true,
                        reason: FALLBACK_REASON.to_string(),
                    })
                    .collect()
            }
        }
    }
}

fn clean_candidates(original: &str, candidates: &[String]) -> Vec<String> {
    let original_key = canonical_identity(original);
    let mut seen = HashSet::new();
    candidates
        .iter()
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .filter(|c| {
            let key = canonical_identity(c);
            !key.is_empty() && key != original_key && seen.insert(key)
        })
        .map(str::to_string)
        .collect()
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn rank(scored: Vec<ScoredCandidate>) -> Vec<Suggestion> {
    let mut out: Vec<Suggestion> = scored
        .into_iter()
        .filter(|c| !c.name.trim().is_empty())
        .map(|c| Suggestion {
            name: c.name.trim().to_string(),
            score: c.score.clamp(0.0, 100.0).round() as u8,
            is_valid: c.is_valid,
            reason: c.reason.trim().to_string(),
        })
        .filter(|s| s.is_valid && s.score >= MIN_SCORE)
        .collect();
    out.sort_by(|a, b| b.score.cmp(&a.score));
    out.truncate(MAX_SUGGESTIONS);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::DisabledLlm;

    fn scored(name: &str, score: f64, is_valid: bool) -> ScoredCandidate {
        ScoredCandidate {
            name: name.to_string(),
            score,
            is_valid,
            reason: String::new(),
        }
    }

    #[test]
    fn rank_filters_sorts_and_caps() {
        let ranked = rank(vec![
            scored("Low", 40.0, true),
            scored("Invalid", 95.0, false),
            scored("B", 70.0, true),
            scored("A", 90.0, true),
            scored("C", 50.0, true),
            scored("D", 65.0, true),
            scored("E", 80.0, true),
            scored("F", 55.0, true),
        ]);
        let names: Vec<_> = ranked.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["A", "E", "B", "D", "F"]);
    }

    #[test]
    fn rank_clamps_out_of_range_scores() {
        let ranked = rank(vec![scored("Big", 250.0, true)]);
        assert_eq!(ranked[0].score, 100);
    }

    #[test]
    fn clean_candidates_drops_original_and_duplicates() {
        let cleaned = clean_candidates(
            "Stripe",
            &[
                "stripe.com".to_string(),
                "Adyen".to_string(),
                " adyen ".to_string(),
                "PayPal".to_string(),
                String::new(),
            ],
        );
        assert_eq!(cleaned, vec!["Adyen".to_string(), "PayPal".to_string()]);
    }

    #[tokio::test]
    async fn unavailable_llm_falls_back_to_fixed_score() {
        let analyzer = SuggestionAnalyzer::new(Arc::new(DisabledLlm));
        let out = analyzer
            .analyze("Stripe", &["Adyen".to_string(), "PayPal".to_string()])
            .await;
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|s| s.score == 60 && s.is_valid));
        assert!(out[0].reason.contains("Could not analyze"));
    }

    #[tokio::test]
    async fn knowledge_candidates_empty_without_llm() {
        let analyzer = SuggestionAnalyzer::new(Arc::new(DisabledLlm));
        assert!(analyzer.knowledge_candidates("Stripe").await.is_empty());
    }
}
