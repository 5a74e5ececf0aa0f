use feedcrawl_core::{CrawlError, CrawlerConfig};

/// A single long-lived HTTP client shared by every fetch in the crawl,
/// carrying the connection pool, default headers, and TLS configuration.
pub struct Session {
    pub client: reqwest::Client,
}

impl Session {
    pub fn build(config: &CrawlerConfig) -> Result<Self, CrawlError> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::UPGRADE_INSECURE_REQUESTS,
            reqwest::header::HeaderValue::from_static("1"),
        );

        let client = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .default_headers(headers)
            .danger_accept_invalid_certs(!config.ssl)
            .redirect(reqwest::redirect::Policy::none())
            .timeout(config.total_timeout)
            .build()
            .map_err(|e| CrawlError::Config(e.to_string()))?;

        Ok(Self { client })
    }
}
