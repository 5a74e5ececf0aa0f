mod callbacks;
mod stats;

pub use callbacks::Callbacks;
pub use stats::EngineStats;

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use futures::StreamExt;
use tokio::sync::{Notify, Semaphore};
use tracing::{debug, warn};
use url::Url;

use feedcrawl_core::{Callback, CallbackResult, CrawlError, CrawlOutput, CrawlerConfig, FeedInfo, Request, Response};
use feedcrawl_fetch::{Fetcher, Session};
use feedcrawl_frontier::{DuplicateFilter, WorkItem, WorkQueue};
use stats::StatsAccumulator;

/// Owns the work queue, the duplicate filter, and the worker pool. Generic
/// over [`Callbacks`] so the spider facade can be swapped without the
/// engine knowing anything about HTML or feed formats.
pub struct Engine<C: Callbacks> {
    config: CrawlerConfig,
    session: Session,
    queue: WorkQueue,
    dup_filter: DuplicateFilter,
    semaphore: Arc<Semaphore>,
    callbacks: Arc<C>,
    stats: StatsAccumulator,
    items: DashMap<Url, FeedInfo>,
    outstanding: AtomicI64,
    drained: Notify,
}

impl<C: Callbacks + 'static> Engine<C> {
    pub fn new(config: CrawlerConfig, callbacks: Arc<C>) -> Result<Arc<Self>, CrawlError> {
        let session = Session::build(&config)?;
        let semaphore = Arc::new(Semaphore::new(config.concurrency));
        Ok(Arc::new(Self {
            queue: WorkQueue::new(),
            dup_filter: DuplicateFilter::new(),
            stats: StatsAccumulator::default(),
            items: DashMap::new(),
            outstanding: AtomicI64::new(0),
            drained: Notify::new(),
            session,
            semaphore,
            callbacks,
            config,
        }))
    }

    /// Builds a follow-up request for `href` relative to `parent`'s final
    /// URL, inheriting its crawl history.
    pub fn follow(&self, href: &str, callback: Callback, parent: &Response) -> Option<Request> {
        let url = parent.url.join(href).ok()?;
        let mut request = Request::new(url, callback);
        request.history = parent.history.clone();
        Some(request)
    }

    /// Applies enqueue discipline and, if the request survives it, pushes
    /// it onto the work queue: scheme allow-list, depth cap, per-host
    /// duplicate suppression, and deduplication by (method, URL).
    pub async fn enqueue(&self, mut request: Request) {
        request.timeout = self.config.request_timeout;
        request.max_retries = self.config.max_retries;
        request.max_content_length = self.config.max_content_length;

        if !self
            .config
            .allowed_schemes
            .iter()
            .any(|s| s == request.url.scheme())
        {
            debug!(url = %request.url, "scheme not allowed, dropping");
            return;
        }
        if self.config.max_depth > 0 && request.history.len() as u32 >= self.config.max_depth {
            debug!(url = %request.url, depth = request.history.len(), "max depth reached, dropping");
            return;
        }
        if matches!(request.callback, Callback::Feed { .. }) {
            if let Some(host) = request.url.host_str() {
                if self.callbacks.should_suppress_host(host) {
                    debug!(url = %request.url, host, "host suppressed, dropping candidate");
                    return;
                }
            }
        }
        if self.dup_filter.mark_and_test(&request.method, &request.url).await {
            return;
        }

        self.stats.record_added();
        self.outstanding.fetch_add(1, Ordering::SeqCst);
        self.queue.push_request(request);
    }

    /// Runs the crawl to completion: seeds the queue, spawns `2 *
    /// concurrency` workers, and waits until either the queue fully drains
    /// or `total_timeout` elapses, whichever comes first.
    pub async fn crawl(self: &Arc<Self>, start_requests: Vec<Request>) -> EngineStats {
        for request in start_requests {
            self.enqueue(request).await;
        }

        let deadline = Instant::now() + self.config.total_timeout;
        let worker_count = self.config.worker_count();
        let mut handles = Vec::with_capacity(worker_count);
        for _ in 0..worker_count {
            let engine = Arc::clone(self);
            handles.push(tokio::spawn(async move { engine.worker_loop(deadline).await }));
        }

        tokio::select! {
            _ = self.wait_for_drain() => {
                debug!("crawl queue drained");
            }
            _ = tokio::time::sleep_until(deadline_to_tokio(deadline)) => {
                warn!("crawl hit total_timeout before draining");
            }
        }

        self.queue.close();
        for handle in handles {
            handle.abort();
        }

        let urls_seen = self.dup_filter.len().await as u64;
        self.stats.finalize(urls_seen).await
    }

    pub fn take_items(&self) -> Vec<FeedInfo> {
        self.items.iter().map(|entry| entry.value().clone()).collect()
    }

    /// Blocks until `outstanding` reaches zero. The notified-future is
    /// acquired before the check so a concurrent `notify_waiters` between
    /// the check and the `.await` is never missed.
    async fn wait_for_drain(&self) {
        loop {
            let notified = self.drained.notified();
            if self.outstanding.load(Ordering::SeqCst) <= 0 {
                return;
            }
            notified.await;
        }
    }

    async fn worker_loop(self: Arc<Self>, deadline: Instant) {
        loop {
            tokio::select! {
                item = self.queue.pop() => {
                    match item {
                        Some(item) => {
                            self.process(item, deadline).await;
                            let prev = self.outstanding.fetch_sub(1, Ordering::SeqCst);
                            if prev <= 1 {
                                self.drained.notify_waiters();
                            }
                        }
                        None => break,
                    }
                }
                _ = tokio::time::sleep_until(deadline_to_tokio(deadline)) => break,
            }
        }
    }

    async fn process(&self, item: WorkItem, deadline: Instant) {
        match item {
            WorkItem::Request(request) => self.handle_request(*request, deadline).await,
            WorkItem::Callback(result) => self.process_callback_result(result).await,
        }
    }

    async fn handle_request(&self, mut request: Request, deadline: Instant) {
        if request.has_run {
            warn!(url = %request.url, "request already run, dropping");
            return;
        }
        request.has_run = true;

        match Fetcher::fetch(&request, &self.session, &self.semaphore, deadline).await {
            Ok(response) => {
                self.dup_filter.mark_and_test("GET", &response.url).await;

                if response.ok() {
                    self.stats
                        .record_success(response.duration, response.content_length() as u64)
                        .await;
                    let output = self.callbacks.dispatch(&request, &response).await;
                    self.outstanding.fetch_add(1, Ordering::SeqCst);
                    self.queue.push_callback(CallbackResult::new(output));
                } else {
                    self.stats
                        .record_failed_response(response.duration, response.content_length() as u64)
                        .await;
                    debug!(url = %response.url, status = response.status, "non-2xx response, no dispatch");
                }
            }
            Err(err) => {
                warn!(url = %request.url, error = %err, "fetch failed");
                self.stats.record_failure();
            }
        }
    }

    async fn process_callback_result(&self, result: CallbackResult) {
        if result.callback_recursion > self.config.max_callback_recursion {
            warn!(
                recursion = result.callback_recursion,
                "dropping callback output: recursion cap exceeded"
            );
            return;
        }

        match result.output {
            CrawlOutput::Request(request) => self.enqueue(*request).await,
            CrawlOutput::Item(item) => self.accept_item(*item).await,
            CrawlOutput::Stream(mut stream) => {
                while let Some(output) = stream.next().await {
                    self.outstanding.fetch_add(1, Ordering::SeqCst);
                    self.queue
                        .push_callback(CallbackResult::nested(output, result.callback_recursion + 1));
                }
            }
            CrawlOutput::PatchFavicon(feed_url, data_uri) => {
                if let Some(mut entry) = self.items.get_mut(&feed_url) {
                    entry.favicon = Url::parse(&data_uri).ok();
                } else {
                    debug!(url = %feed_url, "favicon patch arrived for unknown item");
                }
            }
        }
    }

    async fn accept_item(&self, item: FeedInfo) {
        if !self.callbacks.process_item(&item).await {
            return;
        }
        self.stats.record_item();
        self.items.entry(item.url.clone()).or_insert(item);
    }
}

fn deadline_to_tokio(deadline: Instant) -> tokio::time::Instant {
    tokio::time::Instant::from_std(deadline)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use feedcrawl_core::FeedHint;
    use std::sync::atomic::AtomicUsize;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct TestCallbacks {
        items_seen: AtomicUsize,
    }

    #[async_trait]
    impl Callbacks for TestCallbacks {
        async fn dispatch(&self, _request: &Request, response: &Response) -> CrawlOutput {
            let item = FeedInfo::new(response.url.clone(), "text/xml".to_string());
            CrawlOutput::Item(Box::new(item))
        }

        async fn process_item(&self, _item: &FeedInfo) -> bool {
            self.items_seen.fetch_add(1, Ordering::SeqCst);
            true
        }
    }

    #[tokio::test]
    async fn crawl_fetches_seed_and_collects_item() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/feed.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<rss></rss>"))
            .mount(&server)
            .await;

        let mut config = CrawlerConfig::default();
        config.total_timeout = Duration::from_secs(5);
        let callbacks = Arc::new(TestCallbacks {
            items_seen: AtomicUsize::new(0),
        });
        let engine = Engine::new(config, callbacks.clone()).unwrap();

        let url = Url::parse(&format!("{}/feed.xml", server.uri())).unwrap();
        let seed = Request::new(url.clone(), Callback::Feed { hint: FeedHint::Xml });

        let stats = engine.crawl(vec![seed]).await;

        assert_eq!(stats.requests_successful, 1);
        assert_eq!(stats.items_processed, 1);
        assert_eq!(callbacks.items_seen.load(Ordering::SeqCst), 1);
        assert_eq!(engine.take_items().len(), 1);
    }

    #[tokio::test]
    async fn enqueue_drops_disallowed_scheme() {
        let config = CrawlerConfig::default();
        let callbacks = Arc::new(TestCallbacks {
            items_seen: AtomicUsize::new(0),
        });
        let engine = Engine::new(config, callbacks).unwrap();

        let request = Request::new(Url::parse("ftp://example.com/file").unwrap(), Callback::Site);
        engine.enqueue(request).await;

        assert!(engine.queue.is_empty());
    }

    #[tokio::test]
    async fn enqueue_drops_beyond_max_depth() {
        let mut config = CrawlerConfig::default();
        config.max_depth = 1;
        let callbacks = Arc::new(TestCallbacks {
            items_seen: AtomicUsize::new(0),
        });
        let engine = Engine::new(config, callbacks).unwrap();

        let mut request = Request::new(Url::parse("http://example.com/a").unwrap(), Callback::Site);
        request.history = vec![Url::parse("http://example.com").unwrap()];
        engine.enqueue(request).await;

        assert!(engine.queue.is_empty());
    }
}
