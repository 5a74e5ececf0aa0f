use std::collections::HashSet;

use tokio::sync::Mutex;
use url::Url;

use feedcrawl_core::url_utils::fingerprint;

/// Tracks which (method, URL) fingerprints have already been scheduled.
/// Guarded by a mutex so that worker tasks spread across OS threads still
/// observe it as a single serialized owner, matching the conceptual
/// single-scheduler model this crawler is built around.
pub struct DuplicateFilter {
    seen: Mutex<HashSet<String>>,
}

impl Default for DuplicateFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl DuplicateFilter {
    pub fn new() -> Self {
        Self {
            seen: Mutex::new(HashSet::new()),
        }
    }

    /// Marks the fingerprint as seen and reports whether it was already present.
    pub async fn mark_and_test(&self, method: &str, url: &Url) -> bool {
        let fp = fingerprint(method, url);
        let mut seen = self.seen.lock().await;
        !seen.insert(fp)
    }

    pub async fn len(&self) -> usize {
        self.seen.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.seen.lock().await.is_empty()
    }
}
