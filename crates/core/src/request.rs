use std::collections::HashMap;
use std::time::Duration;

use url::Url;

/// Which parser a fetched [`crate::response::Response`] should be handed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedHint {
    Xml,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Callback {
    /// Parse an HTML page for feed candidates.
    Site,
    /// Parse a fetched feed document.
    Feed { hint: FeedHint },
    /// Convert a fetched favicon into a data URI and patch it onto `feed_url`'s item.
    Favicon { feed_url: Url },
}

/// A pending fetch. Requests are cheap value objects created by `follow`
/// and consumed exactly once by the engine's fetch/dispatch step.
#[derive(Debug, Clone)]
pub struct Request {
    pub url: Url,
    pub method: String,
    pub headers: HashMap<String, String>,
    pub body: Option<Vec<u8>>,
    /// URLs of prior hops (redirects and follows) that led to this request.
    /// `history.len()` is this request's crawl depth.
    pub history: Vec<Url>,
    pub callback: Callback,
    pub max_retries: u32,
    pub timeout: Duration,
    pub max_content_length: usize,
    pub has_run: bool,
}

impl Request {
    pub fn new(url: Url, callback: Callback) -> Self {
        Self {
            url,
            method: "GET".to_string(),
            headers: HashMap::new(),
            body: None,
            history: Vec::new(),
            callback,
            max_retries: 2,
            timeout: Duration::from_secs(30),
            max_content_length: 10 * 1024 * 1024,
            has_run: false,
        }
    }

    pub fn depth(&self) -> usize {
        self.history.len()
    }
}
