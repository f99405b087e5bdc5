//! Competitor name parsing and canonical identity.

use std::collections::HashSet;

use thiserror::Error;

use crate::signals::SourceToggles;

const MAX_NAME_LEN: usize = 100;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InputError {
    #[error("at least one competitor name is required")]
    Empty,

    #[error("at most {max} competitors can be analysed at once, got {got}")]
    TooMany { max: usize, got: usize },

    #[error("competitor name '{0}' is longer than 100 characters")]
    NameTooLong(String),
}

/// Reduce a competitor name or URL to the key used for deduplication.
///
/// Lower-cases, drops the scheme and a leading `www.`, keeps the first path
/// segment, keeps only the first label of a domain-shaped value, and strips
/// everything that is not ASCII alphanumeric. `"OpenAI"` and
/// `"https://www.openai.com/blog"` both become `"openai"`.
#[must_use]
pub fn canonical_identity(input: &str) -> String {
    let lowered = input.trim().to_lowercase();
    let without_scheme = lowered
        .split_once("://")
        .map_or(lowered.as_str(), |(_, rest)| rest);
    let without_www = without_scheme
        .strip_prefix("www.")
        .unwrap_or(without_scheme);
    let first_segment = without_www
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default();

    let label = if looks_like_domain(first_segment) {
        first_segment.split('.').next().unwrap_or_default()
    } else {
        first_segment
    };

    label.chars().filter(char::is_ascii_alphanumeric).collect()
}

fn looks_like_domain(value: &str) -> bool {
    if value.contains(char::is_whitespace) {
        return false;
    }
    match value.rsplit_once('.') {
        Some((head, tld)) => {
            !head.is_empty() && tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic())
        }
        None => false,
    }
}

/// Merge the free-text and list forms of the competitor input.
///
/// Free text is split on newlines and commas. Names are trimmed, blanks are
/// dropped, and later names whose canonical identity matches an earlier one
/// are discarded, so input order is otherwise preserved.
///
/// # Errors
///
/// Returns [`InputError`] when nothing usable remains, when more than `max`
/// distinct competitors were given, or when a name is unreasonably long.
pub fn parse_competitor_input(
    text: Option<&str>,
    list: Option<&[String]>,
    max: usize,
) -> Result<Vec<String>, InputError> {
    let from_text = text
        .into_iter()
        .flat_map(|t| t.split(['\n', ',']))
        .map(str::to_string);
    let from_list = list.into_iter().flatten().cloned();

    let mut seen = HashSet::new();
    let mut names = Vec::new();
    for raw in from_text.chain(from_list) {
        let name = raw.trim();
        if name.is_empty() {
            continue;
        }
        if name.chars().count() > MAX_NAME_LEN {
            return Err(InputError::NameTooLong(name.chars().take(40).collect()));
        }
        let canonical = canonical_identity(name);
        if canonical.is_empty() || !seen.insert(canonical) {
            continue;
        }
        names.push(name.to_string());
    }

    if names.is_empty() {
        return Err(InputError::Empty);
    }
    if names.len() > max {
        return Err(InputError::TooMany {
            max,
            got: names.len(),
        });
    }
    Ok(names)
}

/// Stable key for "the same analysis": sorted canonical names plus the enabled
/// source families.
#[must_use]
pub fn report_fingerprint(competitors: &[String], sources: &SourceToggles) -> String {
    let mut keys: Vec<String> = competitors.iter().map(|c| canonical_identity(c)).collect();
    keys.sort();
    keys.dedup();
    format!("{}|{}", keys.join(","), sources.enabled().join(","))
}
