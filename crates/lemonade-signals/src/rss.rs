//! Tolerant RSS scanning.
//!
//! Items are located with tag scanning rather than a full XML parse so that
//! feeds with stray markup or bad escaping still yield whatever is readable.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use lemonade_core::{SignalItem, SignalType};
use regex::Regex;

use crate::links::normalize_link;

static ITEM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<item\b[^>]*>(.*?)</item>").expect("valid regex"));
static TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title\b[^>]*>(.*?)</title>").expect("valid regex"));
static LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<link\b[^>]*>(.*?)</link>").expect("valid regex"));
static DESCRIPTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<description\b[^>]*>(.*?)</description>").expect("valid regex")
});
static PUB_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<pubDate\b[^>]*>(.*?)</pubDate>").expect("valid regex"));
static CDATA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!\[CDATA\[(.*?)\]\]>").expect("valid regex"));
/// Comments and tags whose name starts with a letter; a bare `<` in text such
/// as `<5%` is left alone.
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<!--.*?-->|</?[A-Za-z][A-Za-z0-9:-]*(?:\s[^>]*)?/?>").expect("valid regex")
});
static ENTITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(?:#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[A-Za-z][A-Za-z0-9]{1,15});")
        .expect("valid regex")
});

/// Parse up to `max_items` signal items out of an RSS document.
///
/// Items whose title or description is empty after cleaning are skipped.
#[must_use]
pub fn parse_rss_items(xml: &str, max_items: usize) -> Vec<SignalItem> {
    ITEM_RE
        .captures_iter(xml)
        .filter_map(|cap| cap.get(1).map(|m| m.as_str()))
        .filter_map(parse_item)
        .take(max_items)
        .collect()
}

/// Titles of every item in the feed, cleaned; used for suggestion mining.
#[must_use]
pub fn parse_rss_titles(xml: &str) -> Vec<String> {
    ITEM_RE
        .captures_iter(xml)
        .filter_map(|cap| cap.get(1))
        .filter_map(|block| tag_text(&TITLE_RE, block.as_str()))
        .collect()
}

fn parse_item(block: &str) -> Option<SignalItem> {
    let title = tag_text(&TITLE_RE, block)?;
    let content = tag_text(&DESCRIPTION_RE, block)?;
    let kind = classify(&title, &content);

    let url = LINK_RE
        .captures(block)
        .and_then(|c| c.get(1))
        .map(|m| decode_entities(unwrap_cdata(m.as_str()).trim()))
        .and_then(|link| normalize_link(&link));

    let published_at = PUB_DATE_RE
        .captures(block)
        .and_then(|c| c.get(1))
        .and_then(|m| parse_pub_date(unwrap_cdata(m.as_str())));

    SignalItem::new(&title, &content, kind)
        .map(|item| item.with_url(url).with_published_at(published_at))
}

fn tag_text(re: &Regex, block: &str) -> Option<String> {
    let raw = re.captures(block)?.get(1)?.as_str();
    let text = clean_text(raw);
    (!text.is_empty()).then_some(text)
}

fn unwrap_cdata(raw: &str) -> &str {
    CDATA_RE
        .captures(raw)
        .and_then(|c| c.get(1))
        .map_or(raw, |m| m.as_str())
}

/// CDATA unwrap, entity decode, tag strip, second decode, whitespace collapse.
///
/// Feeds commonly escape their HTML descriptions, so tags only become visible
/// after the first decode and the text inside them may itself carry entities.
#[must_use]
pub fn clean_text(raw: &str) -> String {
    let unwrapped = unwrap_cdata(raw);
    let decoded = decode_entities(unwrapped);
    let stripped = TAG_RE.replace_all(&decoded, " ");
    let decoded = decode_entities(&stripped);
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Decode XML, numeric and common HTML entities. Unknown entities are kept.
#[must_use]
pub fn decode_entities(text: &str) -> String {
    ENTITY_RE
        .replace_all(text, |caps: &regex::Captures<'_>| {
            let entity = &caps[0];
            quick_xml::escape::unescape_with(entity, resolve_entity)
                .map_or_else(|_| entity.to_string(), std::borrow::Cow::into_owned)
        })
        .into_owned()
}

fn resolve_entity(name: &str) -> Option<&'static str> {
    let value = match name {
        "amp" => "&",
        "lt" => "<",
        "gt" => ">",
        "quot" => "\"",
        "apos" => "'",
        "nbsp" => " ",
        "ndash" => "\u{2013}",
        "mdash" => "\u{2014}",
        "hellip" => "\u{2026}",
        "lsquo" => "\u{2018}",
        "rsquo" => "\u{2019}",
        "ldquo" => "\u{201c}",
        "rdquo" => "\u{201d}",
        "copy" => "\u{a9}",
        "reg" => "\u{ae}",
        "trade" => "\u{2122}",
        "euro" => "\u{20ac}",
        "pound" => "\u{a3}",
        "middot" => "\u{b7}",
        "bull" => "\u{2022}",
        _ => return None,
    };
    Some(value)
}

fn parse_pub_date(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

const FUNDING_WORDS: &[&str] = &["funding", "investment", "round", "raised"];
const PRODUCT_WORDS: &[&str] = &["launch", "release", "feature", "product"];
const SOCIAL_WORDS: &[&str] = &["twitter", "social", "tweet"];

/// Categorise an item from keywords in its title and content.
///
/// Checked in priority order funding, product, social; anything else is news.
#[must_use]
pub fn classify(title: &str, content: &str) -> SignalType {
    let text = format!("{title} {content}").to_lowercase();
    let words: Vec<&str> = text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    let hit = |keywords: &[&str]| {
        words
            .iter()
            .any(|w| keywords.iter().any(|k| w.starts_with(k)))
    };

    if hit(FUNDING_WORDS) {
        SignalType::Funding
    } else if hit(PRODUCT_WORDS) {
        SignalType::Product
    } else if hit(SOCIAL_WORDS) {
        SignalType::Social
    } else {
        SignalType::News
    }
}
