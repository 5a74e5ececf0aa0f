use async_trait::async_trait;

use feedcrawl_core::{CrawlOutput, FeedInfo, Request, Response};

/// What the engine calls back into. Implemented once, by the spider
/// facade, which owns the concrete parsers.
#[async_trait]
pub trait Callbacks: Send + Sync {
    /// Invoked after a successful fetch; dispatches to whichever parser
    /// `request.callback` names.
    async fn dispatch(&self, request: &Request, response: &Response) -> CrawlOutput;

    /// Decides whether a parsed Item joins the result set. Default engine
    /// behavior is to add every item; implementations may return `false`
    /// to filter, and use this call to track per-host state (e.g. "a
    /// non-bozo feed was found for this host") for `should_suppress_host`.
    async fn process_item(&self, item: &FeedInfo) -> bool;

    /// Consulted before enqueuing a feed-candidate Request. Default: never
    /// suppress. The spider overrides this to implement the
    /// stop-after-first-feed-per-host heuristic under `full_crawl=false`.
    fn should_suppress_host(&self, _host: &str) -> bool {
        false
    }
}
