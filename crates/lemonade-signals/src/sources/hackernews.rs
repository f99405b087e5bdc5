//! Hacker News comments via the Algolia search API.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde::Deserialize;

use super::{Comment, CommentSource};
use crate::error::SignalError;
use crate::rss::clean_text;

const LOOKBACK_DAYS: i64 = 7;
const HITS_PER_PAGE: usize = 50;
const MIN_COMMENT_CHARS: usize = 50;
const MAX_COMMENTS: usize = 15;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
struct Hit {
    #[serde(rename = "objectID")]
    object_id: String,
    comment_text: Option<String>,
    story_title: Option<String>,
}

pub struct HackerNewsSource {
    client: reqwest::Client,
    base_url: String,
}

impl HackerNewsSource {
    #[must_use]
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl CommentSource for HackerNewsSource {
    fn platform(&self) -> &'static str {
        "hackernews"
    }

    async fn recent_comments(&self, competitor: &str) -> Result<Vec<Comment>, SignalError> {
        let since = (Utc::now() - Duration::days(LOOKBACK_DAYS)).timestamp();
        let url = format!("{}/search_by_date", self.base_url);

        let response = self
            .client
            .get(url)
            .query(&[
                ("query", competitor.to_string()),
                ("tags", "comment".to_string()),
                ("numericFilters", format!("created_at_i>{since}")),
                ("hitsPerPage", HITS_PER_PAGE.to_string()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SignalError::Status {
                source_name: "hackernews",
                status: response.status().as_u16(),
            });
        }

        let body: SearchResponse = response.json().await.map_err(|e| SignalError::Parse {
            source_name: "hackernews",
            reason: e.to_string(),
        })?;

        Ok(relevant_comments(body.hits, competitor))
    }
}

fn relevant_comments(hits: Vec<Hit>, competitor: &str) -> Vec<Comment> {
    let needle = competitor.trim().to_lowercase();
    hits.into_iter()
        .filter_map(|hit| {
            let text = clean_text(hit.comment_text.as_deref()?);
            if text.chars().count() < MIN_COMMENT_CHARS {
                return None;
            }
            let in_text = text.to_lowercase().contains(&needle);
            let in_story = hit
                .story_title
                .as_deref()
                .is_some_and(|t| t.to_lowercase().contains(&needle));
            (in_text || in_story).then(|| Comment {
                text,
                url: Some(format!(
                    "https://news.ycombinator.com/item?id={}",
                    hit.object_id
                )),
            })
        })
        .take(MAX_COMMENTS)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(id: &str, text: &str, story: Option<&str>) -> Hit {
        Hit {
            object_id: id.to_string(),
            comment_text: Some(text.to_string()),
            story_title: story.map(str::to_string),
        }
    }

    #[test]
    fn keeps_long_relevant_comments_only() {
        let long_acme = "We moved our billing to Acme last year and it has been reliable since.";
        let long_other = "This comment is long enough but talks about a different vendor entirely.";
        let hits = vec![
            hit("1", long_acme, None),
            hit("2", "Acme is fine.", None),
            hit("3", long_other, None),
            hit("4", long_other, Some("Ask HN: Is Acme worth it?")),
        ];
        let comments = relevant_comments(hits, "Acme");
        let ids: Vec<_> = comments
            .iter()
            .map(|c| c.url.as_deref().unwrap_or_default())
            .collect();
        assert_eq!(
            ids,
            vec![
                "https://news.ycombinator.com/item?id=1",
                "https://news.ycombinator.com/item?id=4"
            ]
        );
    }

    #[test]
    fn html_in_comments_is_cleaned() {
        let hits = vec![hit(
            "9",
            "<p>I&#x27;d pick <i>Acme</i> again, the onboarding was great and support answered fast.",
            None,
        )];
        let comments = relevant_comments(hits, "acme");
        assert_eq!(comments.len(), 1);
        assert!(comments[0].text.starts_with("I'd pick Acme again"));
    }

    #[test]
    fn forwards_at_most_fifteen() {
        let text = "Acme comes up constantly in our planning meetings these days, honestly.";
        let hits = (0..30).map(|i| hit(&i.to_string(), text, None)).collect();
        assert_eq!(relevant_comments(hits, "Acme").len(), 15);
    }
}
