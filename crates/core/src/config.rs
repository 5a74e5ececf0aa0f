use std::time::Duration;

use serde::{Deserialize, Serialize};

/// All tunable knobs for a single crawl. There is no on-disk config file —
/// the CLI exposes only the `setup_type` preset (see [`CrawlerConfig::preset`]),
/// matching the original `app.py` entry point exactly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    pub concurrency: usize,
    #[serde(with = "duration_secs")]
    pub total_timeout: Duration,
    #[serde(with = "duration_secs")]
    pub request_timeout: Duration,
    pub user_agent: String,
    pub max_content_length: usize,
    pub max_depth: u32,
    pub allowed_schemes: Vec<String>,
    pub max_retries: u32,
    pub ssl: bool,
    pub full_crawl: bool,
    #[serde(with = "duration_secs")]
    pub delay: Duration,
    pub try_urls: bool,
    pub favicon_data_uri: bool,
    pub max_callback_recursion: u32,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            concurrency: 15,
            total_timeout: Duration::from_secs(3),
            request_timeout: Duration::from_secs(30),
            user_agent: "Mozilla/5.0 (Compatible; Feedsearch Bot)".to_string(),
            max_content_length: 1024 * 1024 * 10,
            max_depth: 4,
            allowed_schemes: vec!["http".to_string(), "https".to_string()],
            max_retries: 2,
            ssl: true,
            full_crawl: false,
            delay: Duration::ZERO,
            try_urls: true,
            favicon_data_uri: false,
            max_callback_recursion: 10,
        }
    }
}

impl CrawlerConfig {
    /// Mirrors the two `setup_type` presets from the original crawler's
    /// `run_crawl`. Any other value falls back to the base defaults above.
    pub fn preset(setup_type: i32) -> Self {
        let mut config = Self::default();
        match setup_type {
            1 => {
                config.concurrency = 15;
                config.total_timeout = Duration::from_secs(8);
                config.max_depth = 10;
                config.full_crawl = false;
            }
            2 => {
                config.concurrency = 20;
                config.total_timeout = Duration::from_secs(20);
                config.max_depth = 5;
                config.full_crawl = true;
            }
            _ => {}
        }
        config
    }

    pub fn worker_count(&self) -> usize {
        self.concurrency * 2
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Ok(Duration::from_secs_f64(secs))
    }
}
