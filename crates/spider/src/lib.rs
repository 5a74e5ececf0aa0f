use std::sync::Arc;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use dashmap::DashSet;
use futures::stream::{self, StreamExt};
use tracing::warn;

use feedcrawl_core::url_utils::coerce_url;
use feedcrawl_core::{Callback, CrawlError, CrawlOutput, CrawlerConfig, FeedHint, FeedInfo, Request, Response};
use feedcrawl_engine::{Callbacks, Engine, EngineStats};
use feedcrawl_parser::{FeedParser, SiteParser, TRY_URL_PATHS};
use feedcrawl_score::sort_feeds;

/// Ties the HTML and feed parsers, and favicon inlining, to the engine's
/// `Callbacks` boundary. Also tracks, per host, whether a non-bozo feed has
/// already been found, to drive the `full_crawl=false` stop-fanout rule.
pub struct FeedsearchSpider {
    config: CrawlerConfig,
    confirmed_hosts: DashSet<String>,
}

impl FeedsearchSpider {
    pub fn new(config: CrawlerConfig) -> Self {
        Self {
            config,
            confirmed_hosts: DashSet::new(),
        }
    }
}

#[async_trait]
impl Callbacks for FeedsearchSpider {
    async fn dispatch(&self, request: &Request, response: &Response) -> CrawlOutput {
        match &request.callback {
            Callback::Site => {
                let outputs = SiteParser::parse(response);
                CrawlOutput::Stream(stream::iter(outputs).boxed())
            }
            Callback::Feed { hint } => {
                let mut outputs = FeedParser::parse(response, *hint);
                if self.config.favicon_data_uri {
                    if let Some(CrawlOutput::Item(item)) = outputs.first() {
                        if let Some(favicon_url) = &item.favicon {
                            if matches!(favicon_url.scheme(), "http" | "https") {
                                let favicon_request = Request::new(
                                    favicon_url.clone(),
                                    Callback::Favicon {
                                        feed_url: item.url.clone(),
                                    },
                                );
                                outputs.push(CrawlOutput::Request(Box::new(favicon_request)));
                            }
                        }
                    }
                }
                CrawlOutput::Stream(stream::iter(outputs).boxed())
            }
            Callback::Favicon { feed_url } => {
                let mime = response.header("content-type").unwrap_or("image/x-icon");
                let encoded = STANDARD.encode(response.body.as_ref());
                let data_uri = format!("data:{};base64,{}", mime, encoded);
                CrawlOutput::PatchFavicon(feed_url.clone(), data_uri)
            }
        }
    }

    async fn process_item(&self, item: &FeedInfo) -> bool {
        if item.bozo == 0 {
            if let Some(host) = item.url.host_str() {
                self.confirmed_hosts.insert(host.to_string());
            }
        }
        true
    }

    fn should_suppress_host(&self, host: &str) -> bool {
        if self.config.full_crawl {
            return false;
        }
        self.confirmed_hosts.contains(host)
    }
}

/// Expands each seed URL into a site-page request and, when `try_urls` is
/// enabled, a direct feed-candidate request per well-known path.
fn build_seeds(urls: &[String], config: &CrawlerConfig) -> Vec<Request> {
    let mut seeds = Vec::new();
    for raw in urls {
        let url = match coerce_url(raw) {
            Ok(url) => url,
            Err(e) => {
                warn!(raw, error = %e, "skipping unusable seed URL");
                continue;
            }
        };

        if config.try_urls {
            for try_path in TRY_URL_PATHS {
                if let Ok(candidate) = url.join(try_path) {
                    let hint = if try_path.ends_with(".json") {
                        FeedHint::Json
                    } else {
                        FeedHint::Xml
                    };
                    seeds.push(Request::new(candidate, Callback::Feed { hint }));
                }
            }
        }

        seeds.push(Request::new(url, Callback::Site));
    }
    seeds
}

/// Top-level entry point: crawl `urls` under `config` and return the
/// discovered feeds, scored and sorted, plus the crawl's statistics.
pub async fn crawl(urls: &[String], config: CrawlerConfig) -> Result<(Vec<FeedInfo>, EngineStats), CrawlError> {
    let seeds = build_seeds(urls, &config);
    let spider = Arc::new(FeedsearchSpider::new(config.clone()));
    let engine = Engine::new(config, spider)?;

    let stats = engine.crawl(seeds).await;
    let items = sort_feeds(engine.take_items());
    Ok((items, stats))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_seeds_expands_try_urls() {
        let config = CrawlerConfig::default();
        let seeds = build_seeds(&["example.com".to_string()], &config);
        assert_eq!(seeds.len(), TRY_URL_PATHS.len() + 1);
        assert!(seeds.iter().any(|r| matches!(r.callback, Callback::Site)));
    }

    #[test]
    fn build_seeds_skips_invalid_urls() {
        let config = CrawlerConfig::default();
        let seeds = build_seeds(&["ftp://bad.example.com".to_string()], &config);
        assert!(seeds.is_empty());
    }

    #[tokio::test]
    async fn crawl_end_to_end_against_mock_server() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<html><head><link rel="alternate" type="application/rss+xml" href="/feed.xml"></head></html>"#,
            ))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/feed.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<?xml version="1.0"?><rss version="2.0"><channel><title>Example</title></channel></rss>"#,
            ))
            .mount(&server)
            .await;
        for miss in TRY_URL_PATHS {
            Mock::given(method("GET"))
                .and(path(*miss))
                .respond_with(ResponseTemplate::new(404))
                .mount(&server)
                .await;
        }

        let mut config = CrawlerConfig::default();
        config.total_timeout = std::time::Duration::from_secs(5);
        let (items, stats) = crawl(&[server.uri()], config).await.unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Example");
        assert!(stats.items_processed >= 1);
    }
}
