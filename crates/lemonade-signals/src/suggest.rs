//! Candidate competitor discovery for the suggestion endpoint.
//!
//! Candidates come from news headlines that compare the competitor with
//! something else, plus the model's own knowledge; the suggestion analyzer
//! then scores them.

use std::collections::HashSet;
use std::sync::{Arc, LazyLock};

use lemonade_core::canonical_identity;
use lemonade_llm::{LlmClient, Suggestion, SuggestionAnalyzer};
use regex::Regex;

use crate::sources::BingNewsClient;

const NAME: &str = r"([A-Z][\w&'.-]*(?:\s+[A-Z][\w&'.-]*){0,2})";
static VS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+(?i:vs\.?|versus)\s+").expect("valid regex"));
static NAME_BEFORE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!("{NAME}$")).expect("valid regex"));
static NAME_AFTER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!("^{NAME}")).expect("valid regex"));
static ALTERNATIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"{NAME}\s+(?i:alternatives?)\b")).expect("valid regex")
});

const LEADING_STOPWORDS: &[&str] = &[
    "best", "top", "why", "how", "what", "which", "the", "is", "new", "free", "cheaper",
];

pub struct SuggestionFinder {
    news: BingNewsClient,
    analyzer: SuggestionAnalyzer,
}

impl SuggestionFinder {
    #[must_use]
    pub fn new(news: BingNewsClient, llm: Arc<dyn LlmClient>) -> Self {
        Self {
            news,
            analyzer: SuggestionAnalyzer::new(llm),
        }
    }

    pub async fn suggest(&self, competitor: &str) -> Vec<Suggestion> {
        let (mut candidates, knowledge) = tokio::join!(
            self.search_candidates(competitor),
            self.analyzer.knowledge_candidates(competitor)
        );
        candidates.extend(knowledge);
        tracing::debug!(competitor, candidates = candidates.len(), "scoring suggestion candidates");
        self.analyzer.analyze(competitor, &candidates).await
    }

    async fn search_candidates(&self, competitor: &str) -> Vec<String> {
        let query = format!("\"{competitor}\" (vs OR alternative OR alternatives OR competitor)");
        match self.news.search_titles(&query).await {
            Ok(titles) => extract_candidates(&titles, competitor),
            Err(e) => {
                tracing::warn!(
                    competitor,
                    source = "bing_news",
                    error = %e,
                    "suggestion search failed"
                );
                Vec::new()
            }
        }
    }
}

/// Pull comparison targets out of headlines.
///
/// Recognises `<name> vs X`, `X vs <name>` and `X alternative(s)`. Results are
/// de-duplicated by canonical identity and never include `competitor` itself.
#[must_use]
pub fn extract_candidates(titles: &[String], competitor: &str) -> Vec<String> {
    let needle = competitor.trim().to_lowercase();
    let original = canonical_identity(competitor);
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for title in titles {
        for raw in title_candidates(title, &needle) {
            let found = strip_leading_stopwords(raw);
            let key = canonical_identity(&found);
            if key.is_empty() || key == original || !seen.insert(key) {
                continue;
            }
            out.push(found);
        }
    }
    out
}

/// Raw names from one headline, comparisons first, in headline order.
fn title_candidates<'a>(title: &'a str, needle: &str) -> Vec<&'a str> {
    let mut found = Vec::new();
    if !needle.is_empty() {
        for sep in VS_RE.find_iter(title) {
            let before = &title[..sep.start()];
            let after = &title[sep.end()..];
            let capture = if ends_with_word(before, needle) {
                NAME_AFTER_RE.captures(after)
            } else if starts_with_word(after, needle) {
                NAME_BEFORE_RE.captures(before)
            } else {
                None
            };
            found.extend(capture.and_then(|c| c.get(1)).map(|m| m.as_str()));
        }
    }
    found.extend(
        ALTERNATIVE_RE
            .captures_iter(title)
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str()),
    );
    found
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn ends_with_word(text: &str, needle: &str) -> bool {
    let lower = text.to_lowercase();
    lower
        .strip_suffix(needle)
        .is_some_and(|rest| !rest.chars().next_back().is_some_and(is_word_char))
}

fn starts_with_word(text: &str, needle: &str) -> bool {
    let lower = text.to_lowercase();
    lower
        .strip_prefix(needle)
        .is_some_and(|rest| !rest.chars().next().is_some_and(is_word_char))
}

fn strip_leading_stopwords(raw: &str) -> String {
    let words: Vec<&str> = raw
        .split_whitespace()
        .skip_while(|w| LEADING_STOPWORDS.contains(&w.to_lowercase().as_str()))
        .collect();
    words
        .join(" ")
        .trim_end_matches(['.', '\'', '-'])
        .to_string()
}
