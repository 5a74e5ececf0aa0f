use feedcrawl_core::{url_utils::get_site_root, FeedInfo};

const SCORE_KEYWORDS: &[&str] = &["atom", "rss", ".xml", "feed", "rdf"];

/// Estimated relevance of a feed URL to the seed that led to it. Weights
/// and penalties mirror the original crawler's `url_feed_score` exactly:
/// every matching keyword in `SCORE_KEYWORDS` contributes its own fixed
/// weight (not just the first match), on top of domain-suffix and
/// https/penalty-keyword adjustments.
pub fn url_feed_score(url: &str, original_url: &str) -> i32 {
    let mut score = 0i32;

    if !original_url.is_empty() {
        let url_domain = get_site_root(url);
        let original_domain = get_site_root(original_url);
        if !original_domain.is_empty() && !url_domain.contains(&original_domain) {
            score -= 17;
        }
    }

    if url.contains("comments") {
        score -= 15;
    }
    if url.contains("georss") {
        score -= 9;
    }
    if url.contains("alt") {
        score -= 7;
    }

    let weight_count = (SCORE_KEYWORDS.len() * 2) as i32;
    for (i, keyword) in SCORE_KEYWORDS.iter().enumerate() {
        if url.contains(keyword) {
            score += weight_count - (i as i32 * 2);
        }
    }

    if url.starts_with("https") {
        score += 9;
    }

    score
}

/// Final result-set ordering: score descending, URL ascending on ties.
pub fn sort_feeds(mut items: Vec<FeedInfo>) -> Vec<FeedInfo> {
    items.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.url.cmp(&b.url)));
    items
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulates_every_matching_keyword() {
        // "feed" (+4) and ".xml" (+6) both present, no https bonus (http://)
        let score = url_feed_score("http://example.com/feed.xml", "");
        assert_eq!(score, 4 + 6);
    }

    #[test]
    fn penalizes_domain_mismatch() {
        let score = url_feed_score("http://other.com/feed", "http://example.com");
        assert!(score < url_feed_score("http://example.com/feed", "http://example.com"));
    }

    #[test]
    fn https_never_decreases_score() {
        let plain = url_feed_score("http://example.com/feed", "http://example.com");
        let secure = url_feed_score("https://example.com/feed", "http://example.com");
        assert!(secure >= plain);
    }

    #[test]
    fn sorts_by_score_then_url() {
        let url = |s: &str| url::Url::parse(s).unwrap();
        let mut a = FeedInfo::new(url("http://example.com/b"), "application/rss+xml".into());
        a.score = 5;
        let mut b = FeedInfo::new(url("http://example.com/a"), "application/rss+xml".into());
        b.score = 5;
        let mut c = FeedInfo::new(url("http://example.com/c"), "application/rss+xml".into());
        c.score = 10;
        let sorted = sort_feeds(vec![a.clone(), b.clone(), c.clone()]);
        assert_eq!(sorted[0].url, c.url);
        assert_eq!(sorted[1].url, b.url);
        assert_eq!(sorted[2].url, a.url);
    }
}
