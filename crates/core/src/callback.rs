use futures::stream::BoxStream;
use url::Url;

use crate::item::FeedInfo;
use crate::request::Request;

/// Whatever a parser callback produces. Parsers may yield plain values,
/// lazy sequences of further values, or ask the engine to patch a
/// previously emitted item (the favicon-inlining follow-up).
pub enum CrawlOutput {
    Request(Box<Request>),
    Item(Box<FeedInfo>),
    /// An asynchronously produced sequence of further outputs.
    Stream(BoxStream<'static, CrawlOutput>),
    /// Patch the favicon of an already-emitted FeedInfo, keyed by its URL.
    PatchFavicon(Url, String),
}

impl std::fmt::Debug for CrawlOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CrawlOutput::Request(r) => f.debug_tuple("Request").field(&r.url).finish(),
            CrawlOutput::Item(i) => f.debug_tuple("Item").field(&i.url).finish(),
            CrawlOutput::Stream(_) => f.write_str("Stream(..)"),
            CrawlOutput::PatchFavicon(u, _) => f.debug_tuple("PatchFavicon").field(u).finish(),
        }
    }
}

/// Envelope pairing a produced output with how many levels of lazy-sequence
/// expansion it has already been through. Bounds recursive dispatch.
pub struct CallbackResult {
    pub output: CrawlOutput,
    pub callback_recursion: u32,
}

impl CallbackResult {
    pub fn new(output: CrawlOutput) -> Self {
        Self {
            output,
            callback_recursion: 0,
        }
    }

    pub fn nested(output: CrawlOutput, recursion: u32) -> Self {
        Self {
            output,
            callback_recursion: recursion,
        }
    }
}
