//! Keyword sentiment used when no LLM is reachable.

use crate::sentiment::Sentiment;

const POSITIVE: &[&str] = &[
    "great",
    "good",
    "excellent",
    "love",
    "loved",
    "best",
    "amazing",
    "awesome",
    "recommend",
    "impressive",
    "fast",
    "reliable",
    "easy",
    "helpful",
    "useful",
    "solid",
    "innovative",
    "growing",
    "happy",
    "better",
];

const NEGATIVE: &[&str] = &[
    "bad",
    "terrible",
    "awful",
    "worst",
    "hate",
    "slow",
    "buggy",
    "broken",
    "expensive",
    "overpriced",
    "disappointing",
    "disappointed",
    "unreliable",
    "outage",
    "layoffs",
    "lawsuit",
    "scam",
    "poor",
    "worse",
    "problem",
];

/// Count positive and negative keyword hits in `text`.
///
/// Words are lower-cased and trimmed of surrounding punctuation before lookup.
#[must_use]
pub fn keyword_counts(text: &str) -> (usize, usize) {
    let mut positive = 0;
    let mut negative = 0;
    for word in text.split_whitespace() {
        let w = word
            .trim_matches(|c: char| !c.is_alphabetic())
            .to_lowercase();
        if POSITIVE.contains(&w.as_str()) {
            positive += 1;
        } else if NEGATIVE.contains(&w.as_str()) {
            negative += 1;
        }
    }
    (positive, negative)
}

/// Label `text` by comparing keyword counts; ties are neutral.
#[must_use]
pub fn fallback_sentiment(text: &str) -> Sentiment {
    let (positive, negative) = keyword_counts(text);
    match positive.cmp(&negative) {
        std::cmp::Ordering::Greater => Sentiment::Positive,
        std::cmp::Ordering::Less => Sentiment::Negative,
        std::cmp::Ordering::Equal => Sentiment::Neutral,
    }
}
