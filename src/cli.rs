use clap::Parser;

/// `<setup_type> <url1> [url2...]` — the same contract as the original
/// `app.py` entry point. `setup_type` selects one of the two crawl
/// presets in `CrawlerConfig::preset`; any other value falls back to the
/// base defaults.
#[derive(Parser)]
#[command(name = "feedcrawl", about = "Feed discovery crawler")]
pub struct Cli {
    /// Crawl preset: 1 (shallow, fast, single-host) or 2 (deep, full site)
    pub setup_type: i32,

    /// Seed URLs to crawl for feeds
    #[arg(required = true)]
    pub urls: Vec<String>,
}
