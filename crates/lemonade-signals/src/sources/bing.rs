//! Bing News RSS collector.

use async_trait::async_trait;
use lemonade_core::SignalItem;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};

use super::{SignalSource, SourceOutcome};
use crate::error::SignalError;
use crate::rss;

const MAX_ITEMS: usize = 10;

/// Thin client over the Bing News RSS search endpoint.
#[derive(Clone)]
pub struct BingNewsClient {
    client: reqwest::Client,
    base_url: String,
}

impl BingNewsClient {
    #[must_use]
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn fetch_feed(&self, query: &str) -> Result<String, SignalError> {
        let encoded = utf8_percent_encode(query, NON_ALPHANUMERIC).to_string();
        let url = format!("{}?q={encoded}&format=rss&mkt=en-US", self.base_url);

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(SignalError::Status {
                source_name: "bing_news",
                status: response.status().as_u16(),
            });
        }
        Ok(response.text().await?)
    }

    /// Search and parse up to `max_items` items.
    ///
    /// # Errors
    ///
    /// Returns [`SignalError`] on network failure or a non-success status.
    pub async fn search(
        &self,
        query: &str,
        max_items: usize,
    ) -> Result<Vec<SignalItem>, SignalError> {
        let body = self.fetch_feed(query).await?;
        Ok(rss::parse_rss_items(&body, max_items))
    }

    /// Search and return every item title, for suggestion mining.
    ///
    /// # Errors
    ///
    /// Same as [`BingNewsClient::search`].
    pub async fn search_titles(&self, query: &str) -> Result<Vec<String>, SignalError> {
        let body = self.fetch_feed(query).await?;
        Ok(rss::parse_rss_titles(&body))
    }
}

/// Which news angle an [`RssSource`] searches for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RssQuery {
    News,
    Funding,
    Products,
}

impl RssQuery {
    fn name(self) -> &'static str {
        match self {
            RssQuery::News => "news",
            RssQuery::Funding => "funding",
            RssQuery::Products => "products",
        }
    }

    fn query(self, competitor: &str) -> String {
        match self {
            RssQuery::News => format!("\"{competitor}\""),
            RssQuery::Funding => format!("\"{competitor}\" (funding OR raised OR investment)"),
            RssQuery::Products => format!("\"{competitor}\" (launch OR release OR product)"),
        }
    }
}

pub struct RssSource {
    client: BingNewsClient,
    query: RssQuery,
}

impl RssSource {
    #[must_use]
    pub fn new(client: BingNewsClient, query: RssQuery) -> Self {
        Self { client, query }
    }
}

#[async_trait]
impl SignalSource for RssSource {
    fn name(&self) -> &'static str {
        self.query.name()
    }

    async fn fetch(&self, competitor: &str) -> SourceOutcome {
        let result = self
            .client
            .search(&self.query.query(competitor), MAX_ITEMS)
            .await;
        SourceOutcome::from_result(self.name(), competitor, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queries_quote_the_competitor() {
        assert_eq!(RssQuery::News.query("Acme Inc"), "\"Acme Inc\"");
        assert!(RssQuery::Funding.query("Acme").contains("(funding OR raised OR investment)"));
        assert!(RssQuery::Products.query("Acme").starts_with("\"Acme\""));
    }

    #[test]
    fn names_match_request_toggles() {
        assert_eq!(RssQuery::News.name(), "news");
        assert_eq!(RssQuery::Funding.name(), "funding");
        assert_eq!(RssQuery::Products.name(), "products");
    }
}
