use std::collections::HashMap;
use std::time::Duration;

use bytes::Bytes;
use url::Url;

/// Result of a single HTTP exchange, after redirects have been followed.
#[derive(Debug, Clone)]
pub struct Response {
    pub url: Url,
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Bytes,
    pub encoding: String,
    /// Prior hops (request history) with the final URL appended.
    pub history: Vec<Url>,
    pub duration: Duration,
}

impl Response {
    pub fn originator_url(&self) -> &Url {
        self.history.first().unwrap_or(&self.url)
    }

    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_length(&self) -> usize {
        self.body.len()
    }
}
