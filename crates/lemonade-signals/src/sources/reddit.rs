//! Reddit comments from a fixed set of business and tech subreddits.
//!
//! Uses the public `.json` listings, so no OAuth credentials are needed.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::{Comment, CommentSource};
use crate::error::SignalError;

const SUBREDDITS: &[&str] = &[
    "startups",
    "technology",
    "SaaS",
    "Entrepreneur",
    "business",
    "smallbusiness",
    "marketing",
    "ProductManagement",
];
const POSTS_PER_SUBREDDIT: usize = 3;
const COMMENTS_PER_POST: usize = 10;
const MIN_COMMENT_CHARS: usize = 20;

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Thing>,
}

#[derive(Debug, Deserialize)]
struct Thing {
    kind: String,
    data: ThingData,
}

#[derive(Debug, Deserialize)]
struct ThingData {
    permalink: Option<String>,
    body: Option<String>,
}

pub struct RedditSource {
    client: reqwest::Client,
    base_url: String,
    comment_delay: Duration,
}

impl RedditSource {
    #[must_use]
    pub fn new(client: reqwest::Client, base_url: &str, comment_delay: Duration) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            comment_delay,
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: String,
        query: &[(&str, String)],
    ) -> Result<T, SignalError> {
        let response = self.client.get(url).query(query).send().await?;
        if !response.status().is_success() {
            return Err(SignalError::Status {
                source_name: "reddit",
                status: response.status().as_u16(),
            });
        }
        response.json().await.map_err(|e| SignalError::Parse {
            source_name: "reddit",
            reason: e.to_string(),
        })
    }

    async fn search_posts(
        &self,
        subreddit: &str,
        competitor: &str,
    ) -> Result<Vec<String>, SignalError> {
        let listing: Listing = self
            .get_json(
                format!("{}/r/{subreddit}/search.json", self.base_url),
                &[
                    ("q", format!("\"{competitor}\"")),
                    ("restrict_sr", "1".to_string()),
                    ("t", "week".to_string()),
                    ("sort", "relevance".to_string()),
                    ("limit", POSTS_PER_SUBREDDIT.to_string()),
                ],
            )
            .await?;

        Ok(listing
            .data
            .children
            .into_iter()
            .filter(|t| t.kind == "t3")
            .filter_map(|t| t.data.permalink)
            .take(POSTS_PER_SUBREDDIT)
            .collect())
    }

    async fn post_comments(&self, permalink: &str) -> Result<Vec<Comment>, SignalError> {
        // A post's JSON is `[post_listing, comment_listing]`.
        let listings: Vec<Listing> = self
            .get_json(
                format!("{}{}.json", self.base_url, permalink.trim_end_matches('/')),
                &[
                    ("limit", COMMENTS_PER_POST.to_string()),
                    ("depth", "1".to_string()),
                ],
            )
            .await?;

        Ok(listings
            .into_iter()
            .nth(1)
            .map(|l| top_level_comments(l.data.children))
            .unwrap_or_default())
    }
}

fn top_level_comments(children: Vec<Thing>) -> Vec<Comment> {
    children
        .into_iter()
        .filter(|t| t.kind == "t1")
        .filter_map(|t| {
            let body = t.data.body?;
            let body = body.trim();
            if body == "[deleted]"
                || body == "[removed]"
                || body.chars().count() < MIN_COMMENT_CHARS
            {
                return None;
            }
            Some(Comment {
                text: body.to_string(),
                url: t.data.permalink.map(|p| format!("https://www.reddit.com{p}")),
            })
        })
        .take(COMMENTS_PER_POST)
        .collect()
}

#[async_trait]
impl CommentSource for RedditSource {
    fn platform(&self) -> &'static str {
        "reddit"
    }

    /// Per-subreddit failures are logged and skipped; the call only errors
    /// when every subreddit search failed.
    async fn recent_comments(&self, competitor: &str) -> Result<Vec<Comment>, SignalError> {
        let mut comments = Vec::new();
        let mut last_error = None;
        let mut any_ok = false;

        for subreddit in SUBREDDITS {
            let permalinks = match self.search_posts(subreddit, competitor).await {
                Ok(p) => {
                    any_ok = true;
                    p
                }
                Err(e) => {
                    tracing::warn!(subreddit, competitor, error = %e, "Reddit search failed");
                    last_error = Some(e);
                    continue;
                }
            };

            for permalink in permalinks {
                if !self.comment_delay.is_zero() {
                    tokio::time::sleep(self.comment_delay).await;
                }
                match self.post_comments(&permalink).await {
                    Ok(found) => comments.extend(found),
                    Err(e) => {
                        tracing::warn!(permalink, error = %e, "Reddit comment fetch failed");
                    }
                }
            }
        }

        match last_error {
            Some(e) if !any_ok => Err(e),
            _ => Ok(comments),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thing(kind: &str, body: &str) -> Thing {
        Thing {
            kind: kind.to_string(),
            data: ThingData {
                permalink: Some("/r/startups/comments/abc/x/def/".to_string()),
                body: Some(body.to_string()),
            },
        }
    }

    #[test]
    fn filters_deleted_removed_short_and_non_comments() {
        let children = vec![
            thing("t1", "[deleted]"),
            thing("t1", "[removed]"),
            thing("t1", "too short"),
            thing("more", "This is a 'load more' stub, not a real comment."),
            thing("t1", "  Acme's pricing page is much clearer than it used to be.  "),
        ];
        let comments = top_level_comments(children);
        assert_eq!(comments.len(), 1);
        assert_eq!(
            comments[0].text,
            "Acme's pricing page is much clearer than it used to be."
        );
        assert_eq!(
            comments[0].url.as_deref(),
            Some("https://www.reddit.com/r/startups/comments/abc/x/def/")
        );
    }

    #[test]
    fn caps_comments_per_post() {
        let children = (0..25)
            .map(|i| thing("t1", &format!("comment {i} with enough characters to count")))
            .collect();
        assert_eq!(top_level_comments(children).len(), COMMENTS_PER_POST);
    }
}
