use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use url::Url;

use feedcrawl_core::{Callback, CrawlOutput, FeedHint, Request, Response};

/// Matches the whole tokens `feed`/`feeds`, never `podcast`/`podcasts`.
pub static FEEDLIKE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bfeeds?\b").unwrap());

/// Matches the whole tokens `podcast`/`podcasts`. Exposed for symmetry and
/// testing; by default the site parser only follows feedlike matches (see
/// `is_podcast_only` usage in discovery tests) — podcast episode pages are
/// not feeds themselves.
pub static PODCAST_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bpodcasts?\b").unwrap());

const FEED_MIME_TYPES: &[&str] = &[
    "application/rss+xml",
    "application/atom+xml",
    "application/json",
    "application/feed+json",
    "text/xml",
];

/// Probe paths appended to each seed host when `try_urls` is enabled.
pub const TRY_URL_PATHS: &[&str] = &["/feed", "/rss", "/atom.xml", "/feed.json", "/index.xml"];

pub fn is_href_matching(href: &str, re: &Regex) -> bool {
    re.is_match(href)
}

pub fn is_querystring_matching(url: &Url, re: &Regex) -> bool {
    url.query_pairs().any(|(key, _)| re.is_match(&key))
}

pub struct SiteParser;

impl SiteParser {
    /// Extracts feed-candidate links from an HTML response: `<link
    /// rel="alternate">` elements advertising a known feed MIME type, and
    /// `<a href>` anchors whose href or query string matches the feedlike
    /// regex. Podcast-only anchors never produce a follow.
    pub fn parse(response: &Response) -> Vec<CrawlOutput> {
        let html = response.text();
        let document = Html::parse_document(&html);
        let mut outputs = Vec::new();

        if let Ok(sel) = Selector::parse("link[rel~='alternate'][href]") {
            for el in document.select(&sel) {
                let Some(href) = el.value().attr("href") else {
                    continue;
                };
                let mime = el.value().attr("type").unwrap_or("");
                if !FEED_MIME_TYPES.iter().any(|m| mime.eq_ignore_ascii_case(m)) {
                    continue;
                }
                if let Some(hint) = hint_from_mime(mime) {
                    if let Some(url) = response.url.join(href).ok() {
                        outputs.push(follow(url, hint, response));
                    }
                }
            }
        }

        if let Ok(sel) = Selector::parse("a[href]") {
            for el in document.select(&sel) {
                let Some(href) = el.value().attr("href") else {
                    continue;
                };
                let Some(url) = response.url.join(href).ok() else {
                    continue;
                };
                let matches = is_href_matching(href, &FEEDLIKE_REGEX)
                    || is_querystring_matching(&url, &FEEDLIKE_REGEX);
                if !matches {
                    continue;
                }
                let hint = hint_from_path(url.path()).unwrap_or(FeedHint::Xml);
                outputs.push(follow(url, hint, response));
            }
        }

        outputs
    }
}

fn hint_from_mime(mime: &str) -> Option<FeedHint> {
    let mime = mime.to_ascii_lowercase();
    if mime.contains("json") {
        Some(FeedHint::Json)
    } else if mime.contains("xml") || mime.contains("rss") || mime.contains("atom") {
        Some(FeedHint::Xml)
    } else {
        None
    }
}

fn hint_from_path(path: &str) -> Option<FeedHint> {
    if path.ends_with(".json") {
        Some(FeedHint::Json)
    } else if path.ends_with(".xml") {
        Some(FeedHint::Xml)
    } else {
        None
    }
}

fn follow(url: Url, hint: FeedHint, parent: &Response) -> CrawlOutput {
    let mut request = Request::new(url, Callback::Feed { hint });
    request.history = parent.history.clone();
    CrawlOutput::Request(Box::new(request))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feedlike_href_matches_whole_tokens_only() {
        assert!(is_href_matching("test.com/feed", &FEEDLIKE_REGEX));
        assert!(is_href_matching("feed", &FEEDLIKE_REGEX));
        assert!(is_href_matching("feeds", &FEEDLIKE_REGEX));
        assert!(is_href_matching("test.com/feeds", &FEEDLIKE_REGEX));
        assert!(is_href_matching("test.com/feeds/test", &FEEDLIKE_REGEX));
        assert!(!is_href_matching("test.com/podcasts/test", &FEEDLIKE_REGEX));
        assert!(!is_href_matching("test.com/podcast/test", &FEEDLIKE_REGEX));
        assert!(!is_href_matching("test.com/podcasts", &FEEDLIKE_REGEX));
        assert!(!is_href_matching("test.com/podcast", &FEEDLIKE_REGEX));
    }

    #[test]
    fn feedlike_querystring_matches_key_not_value() {
        let u = |s: &str| Url::parse(s).unwrap();
        assert!(is_querystring_matching(&u("http://test.com?feed"), &FEEDLIKE_REGEX));
        assert!(is_querystring_matching(&u("http://test.com/test?feed"), &FEEDLIKE_REGEX));
        assert!(!is_querystring_matching(
            &u("http://test.com/test?url=feed&test=true"),
            &FEEDLIKE_REGEX
        ));
        assert!(!is_querystring_matching(
            &u("http://test.com/test?url=feed"),
            &FEEDLIKE_REGEX
        ));
        assert!(!is_querystring_matching(&u("http://test.com/feed?url=test"), &FEEDLIKE_REGEX));
        assert!(is_querystring_matching(&u("http://test.com/test?feed=test"), &FEEDLIKE_REGEX));
        assert!(!is_querystring_matching(&u("http://test.com?podcast=test"), &FEEDLIKE_REGEX));
        assert!(is_querystring_matching(&u("http://test.com?feeds=test"), &FEEDLIKE_REGEX));
        assert!(!is_querystring_matching(&u("http://test.com?podcasts=test"), &FEEDLIKE_REGEX));
    }

    #[test]
    fn podcast_href_matches() {
        assert!(is_href_matching("test.com/podcasts/test", &PODCAST_REGEX));
        assert!(is_href_matching("test.com/podcast/test", &PODCAST_REGEX));
        assert!(is_href_matching("test.com/podcasts", &PODCAST_REGEX));
        assert!(is_href_matching("test.com/podcast", &PODCAST_REGEX));
    }

    #[test]
    fn podcast_querystring_matches() {
        let u = |s: &str| Url::parse(s).unwrap();
        assert!(is_querystring_matching(&u("http://test.com?podcast=test"), &PODCAST_REGEX));
        assert!(is_querystring_matching(&u("http://test.com?podcasts=test"), &PODCAST_REGEX));
    }

    #[test]
    fn podcast_only_anchor_produces_no_follow() {
        let html = r#"<html><body><a href="/podcasts/ep1">Episode</a></body></html>"#;
        let response = Response {
            url: Url::parse("http://example.com").unwrap(),
            status: 200,
            headers: Default::default(),
            body: bytes::Bytes::from(html),
            encoding: "utf-8".to_string(),
            history: vec![Url::parse("http://example.com").unwrap()],
            duration: std::time::Duration::ZERO,
        };
        let outputs = SiteParser::parse(&response);
        assert!(outputs.is_empty());
    }
}
