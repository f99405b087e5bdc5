//! Resolution of click-tracking redirect links.

use reqwest::Url;

/// Query parameters that carry the real destination, by redirector.
const BING_TARGET_PARAMS: &[&str] = &["url"];
const GOOGLE_TARGET_PARAMS: &[&str] = &["q", "url"];
const GENERIC_TARGET_PARAMS: &[&str] = &["url", "u"];

/// Normalise a feed link: resolve known redirect wrappers to the article URL.
///
/// Returns `None` for blank or unparseable links and anything that is not
/// http(s). Links that are not recognised redirects pass through unchanged.
#[must_use]
pub fn normalize_link(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let url = Url::parse(raw).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }

    let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
    let path = url.path().to_ascii_lowercase();

    let params: &[&str] = if host.ends_with("bing.com") && path.contains("apiclick.aspx") {
        BING_TARGET_PARAMS
    } else if host.contains("google.") && path == "/url" {
        GOOGLE_TARGET_PARAMS
    } else {
        GENERIC_TARGET_PARAMS
    };

    Some(redirect_target(&url, params).unwrap_or_else(|| url.to_string()))
}

fn redirect_target(url: &Url, params: &[&str]) -> Option<String> {
    params.iter().find_map(|name| {
        url.query_pairs()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .and_then(|(_, value)| Url::parse(value.trim()).ok())
            .filter(|target| matches!(target.scheme(), "http" | "https"))
            .map(|target| target.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_bing_click_through() {
        let link = "http://www.bing.com/news/apiclick.aspx?ref=FexRss&aid=&tid=abc&url=https%3a%2f%2fwww.example.com%2fnews%2fstory%3fid%3d7&c=99&mkt=en-us";
        assert_eq!(
            normalize_link(link).as_deref(),
            Some("https://www.example.com/news/story?id=7")
        );
    }

    #[test]
    fn resolves_google_redirects() {
        assert_eq!(
            normalize_link("https://www.google.com/url?rct=j&sa=t&url=https://example.com/a&ct=ga")
                .as_deref(),
            Some("https://example.com/a")
        );
        assert_eq!(
            normalize_link("https://www.google.com/url?q=https%3A%2F%2Fexample.com%2Fb&sa=D")
                .as_deref(),
            Some("https://example.com/b")
        );
    }

    #[test]
    fn resolves_generic_url_and_u_params() {
        assert_eq!(
            normalize_link("https://track.example.net/click?u=https%3A%2F%2Facme.com%2Fblog")
                .as_deref(),
            Some("https://acme.com/blog")
        );
    }

    #[test]
    fn ignores_non_url_redirect_values() {
        assert_eq!(
            normalize_link("https://example.com/search?u=alice").as_deref(),
            Some("https://example.com/search?u=alice")
        );
    }

    #[test]
    fn plain_links_pass_through_and_junk_is_dropped() {
        assert_eq!(
            normalize_link(" https://example.com/post ").as_deref(),
            Some("https://example.com/post")
        );
        assert_eq!(normalize_link(""), None);
        assert_eq!(normalize_link("not a url"), None);
        assert_eq!(normalize_link("javascript:alert(1)"), None);
    }
}
