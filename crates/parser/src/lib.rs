pub mod feed;
pub mod site;

pub use feed::FeedParser;
pub use site::{SiteParser, FEEDLIKE_REGEX, PODCAST_REGEX, TRY_URL_PATHS};
