//! Integration tests for the signal sources using wiremock HTTP mocks.

use std::sync::Arc;
use std::time::Duration;

use lemonade_core::SignalType;
use lemonade_llm::{DisabledLlm, Sentiment};
use lemonade_signals::{
    BingNewsClient, CommentSource, HackerNewsSource, RedditSource, RssQuery, RssSource,
    SignalSource, SocialSentimentAnalyzer, SocialSource, SourceOutcome,
};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const BING_FEED: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<rss version="2.0" xmlns:News="https://www.bing.com/news/search?q=Acme&amp;format=rss">
<channel>
  <title>Acme - BingNews</title>
  <item>
    <title>Acme closes $12M seed round</title>
    <link>http://www.bing.com/news/apiclick.aspx?ref=FexRss&amp;aid=&amp;tid=1&amp;url=https%3a%2f%2fexample.com%2fseed&amp;c=1</link>
    <description>Investors bet on Acme&#39;s growth.</description>
    <pubDate>Tue, 14 Oct 2025 09:00:00 GMT</pubDate>
    <News:Source>Example Daily</News:Source>
  </item>
  <item>
    <title>Acme opens London office</title>
    <link>https://example.com/london</link>
    <description>The company now has 40 staff in the UK.</description>
  </item>
</channel>
</rss>"#;

fn http() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .expect("client construction should not fail")
}

#[tokio::test]
async fn rss_source_parses_bing_feed() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/news/search"))
        .and(query_param("format", "rss"))
        .and(query_param("q", "\"Acme\""))
        .respond_with(ResponseTemplate::new(200).set_body_string(BING_FEED))
        .expect(1)
        .mount(&server)
        .await;

    let client = BingNewsClient::new(http(), &format!("{}/news/search", server.uri()));
    let source = RssSource::new(client, RssQuery::News);

    let SourceOutcome::Items(items) = source.fetch("Acme").await else {
        panic!("expected items");
    };
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].kind, SignalType::Funding);
    assert_eq!(items[0].url.as_deref(), Some("https://example.com/seed"));
    assert_eq!(items[0].content, "Investors bet on Acme's growth.");
    assert_eq!(items[1].kind, SignalType::News);
}

#[tokio::test]
async fn rss_source_reports_unavailable_on_server_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = BingNewsClient::new(http(), &server.uri());
    let source = RssSource::new(client, RssQuery::Funding);

    match source.fetch("Acme").await {
        SourceOutcome::Unavailable(reason) => assert!(reason.contains("503"), "{reason}"),
        SourceOutcome::Items(items) => panic!("expected unavailable, got {} items", items.len()),
    }
}

#[tokio::test]
async fn rss_source_caps_items_at_ten() {
    let server = MockServer::start().await;

    let items: String = (0..15)
        .map(|i| {
            format!(
                "<item><title>Acme story {i}</title><link>https://example.com/{i}</link><description>Body {i}</description></item>"
            )
        })
        .collect();
    let feed = format!("<rss><channel>{items}</channel></rss>");

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(feed))
        .mount(&server)
        .await;

    let source = RssSource::new(BingNewsClient::new(http(), &server.uri()), RssQuery::Products);
    let SourceOutcome::Items(items) = source.fetch("Acme").await else {
        panic!("expected items");
    };
    assert_eq!(items.len(), 10);
}

fn hn_body() -> serde_json::Value {
    serde_json::json!({
        "hits": [
            {
                "objectID": "101",
                "comment_text": "We switched our whole team to Acme last month and the API has been rock solid.",
                "story_title": "Show HN: something else"
            },
            {
                "objectID": "102",
                "comment_text": "short",
                "story_title": "Acme launch"
            },
            {
                "objectID": "103",
                "comment_text": "Honestly the pricing changes were terrible and support took a week to answer.",
                "story_title": "Acme raises prices"
            }
        ]
    })
}

#[tokio::test]
async fn hacker_news_filters_comments() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search_by_date"))
        .and(query_param("tags", "comment"))
        .and(query_param("query", "Acme"))
        .and(query_param("hitsPerPage", "50"))
        .respond_with(ResponseTemplate::new(200).set_body_json(hn_body()))
        .expect(1)
        .mount(&server)
        .await;

    let source = HackerNewsSource::new(http(), &server.uri());
    let comments = source.recent_comments("Acme").await.expect("comments");

    assert_eq!(comments.len(), 2);
    assert_eq!(
        comments[0].url.as_deref(),
        Some("https://news.ycombinator.com/item?id=101")
    );
}

#[tokio::test]
async fn reddit_collects_top_level_comments() {
    let server = MockServer::start().await;

    let search = serde_json::json!({
        "kind": "Listing",
        "data": { "children": [
            { "kind": "t3", "data": { "permalink": "/r/startups/comments/abc/acme_review/" } }
        ]}
    });
    let empty = serde_json::json!({ "kind": "Listing", "data": { "children": [] } });
    let thread = serde_json::json!([
        { "kind": "Listing", "data": { "children": [
            { "kind": "t3", "data": { "permalink": "/r/startups/comments/abc/acme_review/" } }
        ]}},
        { "kind": "Listing", "data": { "children": [
            { "kind": "t1", "data": { "body": "[removed]" } },
            { "kind": "t1", "data": { "body": "Acme saved us hours every week, great product.",
                                      "permalink": "/r/startups/comments/abc/acme_review/c1/" } }
        ]}}
    ]);

    Mock::given(method("GET"))
        .and(path("/r/startups/search.json"))
        .and(query_param("t", "week"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&search))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/r/startups/comments/abc/acme_review.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&thread))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&empty))
        .with_priority(10)
        .mount(&server)
        .await;

    let source = RedditSource::new(http(), &server.uri(), Duration::ZERO);
    let comments = source.recent_comments("Acme").await.expect("comments");

    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].text, "Acme saved us hours every week, great product.");
}

#[tokio::test]
async fn reddit_errors_when_every_subreddit_fails() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let source = RedditSource::new(http(), &server.uri(), Duration::ZERO);
    assert!(source.recent_comments("Acme").await.is_err());
}

#[tokio::test]
async fn social_source_summarises_without_llm() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search_by_date"))
        .respond_with(ResponseTemplate::new(200).set_body_json(hn_body()))
        .mount(&server)
        .await;

    let hn: Arc<dyn CommentSource> = Arc::new(HackerNewsSource::new(http(), &server.uri()));
    let analyzer = Arc::new(SocialSentimentAnalyzer::new(vec![hn], Arc::new(DisabledLlm)));

    let sentiment = analyzer.analyze("Acme").await;
    assert_eq!(sentiment.total_mentions, 2);
    assert_eq!(sentiment.platforms.len(), 1);
    assert_eq!(sentiment.top_quotes.len(), 2);
    // "solid" vs "terrible": one each, so the keyword fallback ties to neutral.
    assert_eq!(sentiment.sentiment, Sentiment::Neutral);

    let source = SocialSource::new(analyzer);
    let SourceOutcome::Items(items) = source.fetch("Acme").await else {
        panic!("expected items");
    };
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].kind, SignalType::Social);
    assert!(items[0].title.starts_with("hackernews discussion (2 mentions)"));
}

#[tokio::test]
async fn social_source_unavailable_when_all_platforms_fail() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let hn: Arc<dyn CommentSource> = Arc::new(HackerNewsSource::new(http(), &server.uri()));
    let analyzer = Arc::new(SocialSentimentAnalyzer::new(vec![hn], Arc::new(DisabledLlm)));
    let source = SocialSource::new(analyzer);

    assert!(matches!(
        source.fetch("Acme").await,
        SourceOutcome::Unavailable(reason) if reason.starts_with("hackernews:")
    ));
}
