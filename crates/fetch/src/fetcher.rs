use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::BytesMut;
use futures::StreamExt;
use rand::Rng;
use tokio::sync::Semaphore;
use tracing::{debug, warn};
use url::Url;

use feedcrawl_core::{CrawlError, Request, Response};

use crate::session::Session;

const MAX_REDIRECTS: u32 = 10;

pub struct Fetcher;

impl Fetcher {
    /// Performs the HTTP exchange for `request`, retrying transient
    /// failures up to `request.max_retries` times and never running past
    /// `deadline`. The concurrency `semaphore` is held only for the actual
    /// network exchange, not for backoff sleeps.
    pub async fn fetch(
        request: &Request,
        session: &Session,
        semaphore: &Arc<Semaphore>,
        deadline: Instant,
    ) -> Result<Response, CrawlError> {
        let mut attempt = 0;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(CrawlError::Timeout(Duration::ZERO));
            }
            let per_try_timeout = request.timeout.min(remaining);

            let outcome = {
                let _permit = semaphore.acquire().await.map_err(|_| {
                    CrawlError::Other(anyhow::anyhow!("concurrency semaphore closed"))
                })?;
                tokio::time::timeout(
                    per_try_timeout,
                    Self::fetch_once(request, session),
                )
                .await
            };

            let result = match outcome {
                Ok(inner) => inner,
                Err(_) => Err(CrawlError::Timeout(per_try_timeout)),
            };

            match result {
                Ok(response) if attempt < request.max_retries && Self::is_retryable_status(response.status) => {
                    attempt += 1;
                    let backoff = Self::backoff(attempt);
                    warn!(url = %request.url, attempt, status = response.status, ?backoff, "retrying transient server error");
                    tokio::time::sleep(backoff.min(deadline.saturating_duration_since(Instant::now()))).await;
                }
                Ok(response) => return Ok(response),
                Err(err) if attempt < request.max_retries && Self::is_retryable(&err) => {
                    attempt += 1;
                    let backoff = Self::backoff(attempt);
                    warn!(url = %request.url, attempt, ?backoff, error = %err, "retrying fetch");
                    tokio::time::sleep(backoff.min(deadline.saturating_duration_since(Instant::now()))).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn is_retryable(err: &CrawlError) -> bool {
        matches!(err, CrawlError::Network(_) | CrawlError::Timeout(_))
    }

    /// Transient server errors worth a retry; 4xx are the caller's fault
    /// and are returned immediately instead.
    fn is_retryable_status(status: u16) -> bool {
        (500..600).contains(&status)
    }

    fn backoff(attempt: u32) -> Duration {
        let base = Duration::from_millis(200 * 2u64.pow(attempt.min(5)));
        let jitter_ms = rand::thread_rng().gen_range(0..100);
        base + Duration::from_millis(jitter_ms)
    }

    async fn fetch_once(request: &Request, session: &Session) -> Result<Response, CrawlError> {
        let start = Instant::now();
        let mut history = request.history.clone();
        let mut current_url = request.url.clone();

        for hop in 0..=MAX_REDIRECTS {
            let mut builder = session
                .client
                .request(
                    request.method.parse().unwrap_or(reqwest::Method::GET),
                    current_url.clone(),
                )
                .timeout(request.timeout);
            for (k, v) in &request.headers {
                builder = builder.header(k, v);
            }
            if let Some(body) = &request.body {
                builder = builder.body(body.clone());
            }

            let response = builder
                .send()
                .await
                .map_err(|e| CrawlError::Network(e.to_string()))?;

            let status = response.status();
            if status.is_redirection() {
                if hop == MAX_REDIRECTS {
                    return Err(CrawlError::Network("too many redirects".to_string()));
                }
                let location = response
                    .headers()
                    .get(reqwest::header::LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .ok_or_else(|| CrawlError::Network("redirect missing Location".to_string()))?;
                let next = current_url
                    .join(location)
                    .map_err(|e| CrawlError::InvalidUrl(e.to_string()))?;
                history.push(current_url.clone());
                current_url = next;
                debug!(from = %history.last().unwrap(), to = %current_url, "following redirect");
                continue;
            }

            let headers = Self::collect_headers(response.headers());
            let encoding = Self::charset_from_content_type(headers.get("content-type"));
            let body = Self::read_capped_body(response, request.max_content_length).await?;

            history.push(current_url.clone());
            return Ok(Response {
                url: current_url,
                status: status.as_u16(),
                headers,
                body,
                encoding,
                history,
                duration: start.elapsed(),
            });
        }

        Err(CrawlError::Network("too many redirects".to_string()))
    }

    fn collect_headers(headers: &reqwest::header::HeaderMap) -> HashMap<String, String> {
        let mut joined: HashMap<String, Vec<String>> = HashMap::new();
        for (name, value) in headers.iter() {
            if let Ok(v) = value.to_str() {
                joined
                    .entry(name.as_str().to_string())
                    .or_default()
                    .push(v.to_string());
            }
        }
        joined
            .into_iter()
            .map(|(k, vs)| (k, vs.join(", ")))
            .collect()
    }

    fn charset_from_content_type(content_type: Option<&String>) -> String {
        content_type
            .and_then(|ct| {
                ct.split(';')
                    .find_map(|part| part.trim().strip_prefix("charset="))
                    .map(|c| c.trim_matches('"').to_string())
            })
            .unwrap_or_else(|| "utf-8".to_string())
    }

    async fn read_capped_body(
        response: reqwest::Response,
        max_content_length: usize,
    ) -> Result<bytes::Bytes, CrawlError> {
        if let Some(len) = response.content_length() {
            if len as usize > max_content_length {
                return Err(CrawlError::ContentTooLarge {
                    size: len as usize,
                    max: max_content_length,
                });
            }
        }

        let mut buf = BytesMut::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| CrawlError::Network(e.to_string()))?;
            if buf.len() + chunk.len() > max_content_length {
                return Err(CrawlError::ContentTooLarge {
                    size: buf.len() + chunk.len(),
                    max: max_content_length,
                });
            }
            buf.extend_from_slice(&chunk);
        }
        Ok(buf.freeze())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feedcrawl_core::{CrawlerConfig, FeedHint};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn fetches_and_records_history() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/feed.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<rss></rss>"))
            .mount(&server)
            .await;

        let config = CrawlerConfig::default();
        let session = Session::build(&config).unwrap();
        let semaphore = Arc::new(Semaphore::new(1));
        let url = Url::parse(&format!("{}/feed.xml", server.uri())).unwrap();
        let request = Request::new(
            url.clone(),
            feedcrawl_core::Callback::Feed { hint: FeedHint::Xml },
        );

        let response = Fetcher::fetch(&request, &session, &semaphore, Instant::now() + Duration::from_secs(5))
            .await
            .unwrap();

        assert!(response.ok());
        assert_eq!(response.history.last(), Some(&url));
        assert_eq!(response.text(), "<rss></rss>");
    }

    #[tokio::test]
    async fn retries_transient_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(ResponseTemplate::new(503))
            .expect(2)
            .mount(&server)
            .await;

        let config = CrawlerConfig::default();
        let session = Session::build(&config).unwrap();
        let semaphore = Arc::new(Semaphore::new(1));
        let url = Url::parse(&format!("{}/flaky", server.uri())).unwrap();
        let mut request = Request::new(url, feedcrawl_core::Callback::Site);
        request.max_retries = 1;

        let response = Fetcher::fetch(&request, &session, &semaphore, Instant::now() + Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(response.status, 503);
    }

    #[tokio::test]
    async fn enforces_content_length_cap() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/big"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 64]))
            .mount(&server)
            .await;

        let config = CrawlerConfig::default();
        let session = Session::build(&config).unwrap();
        let semaphore = Arc::new(Semaphore::new(1));
        let url = Url::parse(&format!("{}/big", server.uri())).unwrap();
        let mut request = Request::new(url, feedcrawl_core::Callback::Site);
        request.max_content_length = 8;

        let err = Fetcher::fetch(&request, &session, &semaphore, Instant::now() + Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, CrawlError::ContentTooLarge { .. }));
    }
}
