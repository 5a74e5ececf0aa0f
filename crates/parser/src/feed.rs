use scraper::Html;
use url::Url;

use feedcrawl_core::url_utils::parse_header_links;
use feedcrawl_core::{CrawlOutput, FeedHint, FeedInfo, Response};
use feedcrawl_score::url_feed_score;

pub struct FeedParser;

impl FeedParser {
    /// Validates and describes a fetched feed. Always returns exactly one
    /// `CrawlOutput::Item`; bozo feeds are still emitted so callers see
    /// partial discoveries instead of silent drops.
    pub fn parse(response: &Response, hint: FeedHint) -> Vec<CrawlOutput> {
        let content_type = response.header("content-type").unwrap_or("").to_string();
        let mut item = FeedInfo::new(response.url.clone(), content_type);

        let (header_hubs, header_self) = header_links(response);
        item.hubs = header_hubs;
        item.self_url = header_self;

        match hint {
            FeedHint::Json => parse_json(&mut item, response),
            FeedHint::Xml => parse_xml(&mut item, response),
        }

        if !item.hubs.is_empty() && !item.self_url.is_empty() {
            item.is_push = true;
        }

        let originator = response.originator_url().to_string();
        item.score = url_feed_score(item.url.as_str(), &originator);

        vec![CrawlOutput::Item(Box::new(item))]
    }
}

fn header_links(response: &Response) -> (Vec<String>, String) {
    let Some(link_header) = response.header("link") else {
        return (Vec::new(), String::new());
    };
    find_hubs_and_self(&parse_header_links(link_header))
}

fn find_hubs_and_self(links: &[feedcrawl_core::url_utils::LinkHeaderEntry]) -> (Vec<String>, String) {
    let mut hubs = Vec::new();
    let mut self_url = String::new();
    for link in links {
        if link.rel == "hub" {
            hubs.push(link.href.clone());
        } else if link.rel == "self" && self_url.is_empty() {
            self_url = link.href.clone();
        }
    }
    (hubs, self_url)
}

fn parse_json(item: &mut FeedInfo, response: &Response) {
    item.content_type = "application/json".to_string();
    let data = match response.json() {
        Ok(v) => v,
        Err(_) => {
            item.bozo = 1;
            return;
        }
    };

    let version = data.get("version").and_then(|v| v.as_str());
    match version {
        Some(v) if v.contains("https://jsonfeed.org/version/") => item.version = v.to_string(),
        _ => {
            item.bozo = 1;
            return;
        }
    }

    item.title = data
        .get("title")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();
    item.description = data
        .get("description")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();

    if let Some(favicon) = data.get("favicon").and_then(|v| v.as_str()) {
        item.favicon = Url::parse(favicon).ok();
    }

    if item.hubs.is_empty() {
        if let Some(hubs) = data.get("hubs").and_then(|v| v.as_array()) {
            item.hubs = hubs
                .iter()
                .filter_map(|h| h.get("url").and_then(|u| u.as_str()).map(str::to_string))
                .collect();
        }
    }
}

fn parse_xml(item: &mut FeedInfo, response: &Response) {
    let parsed = match feed_rs::parser::parse(response.body.as_ref()) {
        Ok(feed) => feed,
        Err(e) => {
            item.bozo = 1;
            tracing::warn!(url = %item.url, error = %e, "no valid feed data");
            return;
        }
    };

    if item.content_type.is_empty() {
        item.content_type = "text/xml".to_string();
    }
    item.version = feed_type_name(&parsed.feed_type).to_string();

    if item.hubs.is_empty() {
        let entries: Vec<feedcrawl_core::url_utils::LinkHeaderEntry> = parsed
            .links
            .iter()
            .map(|l| feedcrawl_core::url_utils::LinkHeaderEntry {
                href: l.href.clone(),
                rel: l.rel.clone().unwrap_or_default(),
            })
            .collect();
        let (hubs, self_url) = find_hubs_and_self(&entries);
        item.hubs = hubs;
        item.self_url = self_url;
    }

    item.title = parsed
        .title
        .map(|t| clean_title(&t.content))
        .unwrap_or_default();
    item.description = parsed.description.map(|t| t.content).unwrap_or_default();

    if let Some(icon) = parsed.icon {
        item.favicon = Url::parse(&icon.uri).ok();
    }
}

fn feed_type_name(feed_type: &feed_rs::model::FeedType) -> &'static str {
    use feed_rs::model::FeedType;
    match feed_type {
        FeedType::Atom => "atom10",
        FeedType::RSS0 => "rss090",
        FeedType::RSS1 => "rss10",
        FeedType::RSS2 => "rss20",
        FeedType::JSON => "json1",
    }
}

/// Strips HTML markup from a title and truncates to 1024 chars, matching
/// the original crawler's defensive handling of malformed feed titles.
fn clean_title(title: &str) -> String {
    let text = Html::parse_fragment(title)
        .root_element()
        .text()
        .collect::<String>();
    let text = if text.is_empty() { title.to_string() } else { text };
    if text.chars().count() > 1024 {
        let truncated: String = text.chars().take(1020).collect();
        format!("{}...", truncated)
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn response(body: &str, headers: Vec<(&str, &str)>) -> Response {
        Response {
            url: Url::parse("http://example.com/feed.xml").unwrap(),
            status: 200,
            headers: headers
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            body: bytes::Bytes::from(body.to_string()),
            encoding: "utf-8".to_string(),
            history: vec![Url::parse("http://example.com").unwrap()],
            duration: Duration::ZERO,
        }
    }

    #[test]
    fn parses_valid_rss() {
        let body = r#"<?xml version="1.0"?>
        <rss version="2.0"><channel>
        <title>Example Feed</title>
        <description>An example</description>
        <link>http://example.com</link>
        </channel></rss>"#;
        let response = response(body, vec![]);
        let outputs = FeedParser::parse(&response, FeedHint::Xml);
        let CrawlOutput::Item(item) = outputs.into_iter().next().unwrap() else {
            panic!("expected item");
        };
        assert_eq!(item.bozo, 0);
        assert_eq!(item.title, "Example Feed");
    }

    #[test]
    fn marks_bozo_on_malformed_xml() {
        let response = response("not xml at all {{{", vec![]);
        let outputs = FeedParser::parse(&response, FeedHint::Xml);
        let CrawlOutput::Item(item) = outputs.into_iter().next().unwrap() else {
            panic!("expected item");
        };
        assert_eq!(item.bozo, 1);
    }

    #[test]
    fn json_feed_missing_version_is_bozo() {
        let response = response(r#"{"title": "no version here"}"#, vec![]);
        let outputs = FeedParser::parse(&response, FeedHint::Json);
        let CrawlOutput::Item(item) = outputs.into_iter().next().unwrap() else {
            panic!("expected item");
        };
        assert_eq!(item.bozo, 1);
    }

    #[test]
    fn json_feed_valid_version_parses() {
        let response = response(
            r#"{"version": "https://jsonfeed.org/version/1.1", "title": "JSON Feed"}"#,
            vec![],
        );
        let outputs = FeedParser::parse(&response, FeedHint::Json);
        let CrawlOutput::Item(item) = outputs.into_iter().next().unwrap() else {
            panic!("expected item");
        };
        assert_eq!(item.bozo, 0);
        assert_eq!(item.title, "JSON Feed");
    }

    #[test]
    fn header_hubs_and_self_extracted() {
        let response = response(
            r#"<?xml version="1.0"?><rss version="2.0"><channel><title>T</title></channel></rss>"#,
            vec![(
                "Link",
                r#"<https://hub.example.com/>; rel="hub", <http://example.com/feed.xml>; rel="self""#,
            )],
        );
        let outputs = FeedParser::parse(&response, FeedHint::Xml);
        let CrawlOutput::Item(item) = outputs.into_iter().next().unwrap() else {
            panic!("expected item");
        };
        assert_eq!(item.hubs, vec!["https://hub.example.com/".to_string()]);
        assert_eq!(item.self_url, "http://example.com/feed.xml");
        assert!(item.is_push);
    }
}
