use std::time::Duration;

use tokio::sync::Mutex;

/// Per-crawl statistics, computed once at the end of `Engine::crawl`.
#[derive(Debug, Clone, Default)]
pub struct EngineStats {
    pub requests_added: u64,
    pub requests_successful: u64,
    pub requests_failed: u64,
    pub items_processed: u64,
    pub urls_seen: u64,
    pub content_length_total: u64,
    pub content_length_max: u64,
    pub content_length_min: u64,
    pub content_length_harmonic_mean: f64,
    pub duration_total: Duration,
    pub duration_max: Duration,
    pub duration_min: Duration,
    pub duration_harmonic_mean: Duration,
}

/// Accumulates raw samples during the crawl; finalized into [`EngineStats`]
/// once workers have stopped. Mutex-guarded so every worker can record a
/// completed fetch without contending on the queue itself.
#[derive(Default)]
pub struct StatsAccumulator {
    pub requests_added: std::sync::atomic::AtomicU64,
    pub requests_successful: std::sync::atomic::AtomicU64,
    pub requests_failed: std::sync::atomic::AtomicU64,
    pub items_processed: std::sync::atomic::AtomicU64,
    samples: Mutex<Samples>,
}

#[derive(Default)]
struct Samples {
    durations: Vec<Duration>,
    content_lengths: Vec<u64>,
}

impl StatsAccumulator {
    pub async fn record_success(&self, duration: Duration, content_length: u64) {
        use std::sync::atomic::Ordering;
        self.requests_successful.fetch_add(1, Ordering::Relaxed);
        self.push_sample(duration, content_length).await;
    }

    /// Records a non-2xx HTTP response: counted as failed, but a response
    /// did come back, so its duration/content-length still feed the
    /// latency and size stats.
    pub async fn record_failed_response(&self, duration: Duration, content_length: u64) {
        use std::sync::atomic::Ordering;
        self.requests_failed.fetch_add(1, Ordering::Relaxed);
        self.push_sample(duration, content_length).await;
    }

    /// Records a request that never produced a response (network error,
    /// timeout) — no duration/content-length sample to add.
    pub fn record_failure(&self) {
        use std::sync::atomic::Ordering;
        self.requests_failed.fetch_add(1, Ordering::Relaxed);
    }

    async fn push_sample(&self, duration: Duration, content_length: u64) {
        let mut samples = self.samples.lock().await;
        samples.durations.push(duration);
        samples.content_lengths.push(content_length);
    }

    pub fn record_added(&self) {
        use std::sync::atomic::Ordering;
        self.requests_added.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_item(&self) {
        use std::sync::atomic::Ordering;
        self.items_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub async fn finalize(&self, urls_seen: u64) -> EngineStats {
        use std::sync::atomic::Ordering;
        let samples = self.samples.lock().await;

        let duration_total: Duration = samples.durations.iter().sum();
        let duration_max = samples.durations.iter().max().copied().unwrap_or_default();
        let duration_min = samples.durations.iter().min().copied().unwrap_or_default();
        let duration_harmonic_mean = harmonic_mean_duration(&samples.durations);

        let content_length_total: u64 = samples.content_lengths.iter().sum();
        let content_length_max = samples.content_lengths.iter().max().copied().unwrap_or(0);
        let content_length_min = samples.content_lengths.iter().min().copied().unwrap_or(0);
        let content_length_harmonic_mean = harmonic_mean(&samples.content_lengths);

        EngineStats {
            requests_added: self.requests_added.load(Ordering::Relaxed),
            requests_successful: self.requests_successful.load(Ordering::Relaxed),
            requests_failed: self.requests_failed.load(Ordering::Relaxed),
            items_processed: self.items_processed.load(Ordering::Relaxed),
            urls_seen,
            content_length_total,
            content_length_max,
            content_length_min,
            content_length_harmonic_mean,
            duration_total,
            duration_max,
            duration_min,
            duration_harmonic_mean,
        }
    }
}

/// Deliberately de-weights slow outliers: `n / sum(1/x)`. Any zero-valued
/// sample makes the mean zero, matching harmonic mean's definition at the
/// boundary rather than dividing by zero.
fn harmonic_mean(values: &[u64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    if values.iter().any(|&v| v == 0) {
        return 0.0;
    }
    let reciprocal_sum: f64 = values.iter().map(|&v| 1.0 / v as f64).sum();
    values.len() as f64 / reciprocal_sum
}

fn harmonic_mean_duration(values: &[Duration]) -> Duration {
    let millis: Vec<u64> = values.iter().map(|d| d.as_millis() as u64).collect();
    Duration::from_millis(harmonic_mean(&millis) as u64)
}
