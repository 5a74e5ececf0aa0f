use url::Url;

use crate::error::CrawlError;

/// Parses a user-supplied URL string, defaulting to `http://` when no
/// scheme is present (bare hostnames like `example.com`).
pub fn coerce_url(raw: &str) -> Result<Url, CrawlError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(CrawlError::InvalidUrl(raw.to_string()));
    }
    match Url::parse(trimmed) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => Ok(url),
        Ok(url) => Err(CrawlError::InvalidUrl(format!(
            "unsupported scheme in {}",
            url
        ))),
        Err(_) => {
            let with_scheme = format!("http://{}", trimmed);
            Url::parse(&with_scheme).map_err(|e| CrawlError::InvalidUrl(e.to_string()))
        }
    }
}

/// Fingerprint used by the duplicate filter: lowercased method plus a
/// normalized URL string. Host and scheme are lowercased, default ports
/// stripped, fragment dropped; path case is preserved.
pub fn fingerprint(method: &str, url: &Url) -> String {
    format!("{}:{}", method.to_ascii_uppercase(), normalize_url(url))
}

pub fn normalize_url(url: &Url) -> String {
    let mut normalized = url.clone();
    normalized.set_fragment(None);
    let _ = normalized.set_host(url.host_str().map(|h| h.to_ascii_lowercase()).as_deref());
    if (normalized.scheme() == "http" && normalized.port() == Some(80))
        || (normalized.scheme() == "https" && normalized.port() == Some(443))
    {
        let _ = normalized.set_port(None);
    }
    normalized.to_string()
}

/// Registrable-ish site root used for scoring: the host minus a single
/// leading subdomain label when more than two labels are present, so that
/// `feeds.example.com` and `www.example.com` both reduce to `example.com`.
pub fn get_site_root(url_str: &str) -> String {
    let host = Url::parse(url_str)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_string()))
        .unwrap_or_default();
    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() > 2 {
        labels[labels.len() - 2..].join(".")
    } else {
        host
    }
}

/// A single entry parsed out of an HTTP `Link` header value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkHeaderEntry {
    pub href: String,
    pub rel: String,
}

/// Parses a comma-separated `Link` header value into its constituent
/// `<uri>; rel="value"; ...` entries, respecting commas inside quoted
/// parameter values (e.g. a `title` param containing a comma).
pub fn parse_header_links(value: &str) -> Vec<LinkHeaderEntry> {
    let mut entries = Vec::new();
    for raw_entry in split_respecting_quotes(value) {
        let mut parts = raw_entry.split(';').map(str::trim);
        let Some(uri_part) = parts.next() else {
            continue;
        };
        let href = uri_part.trim_start_matches('<').trim_end_matches('>').to_string();
        let mut rel = String::new();
        for param in parts {
            if let Some((key, val)) = param.split_once('=') {
                let key = key.trim();
                let val = val.trim().trim_matches('"');
                if key.eq_ignore_ascii_case("rel") {
                    rel = val.to_string();
                }
            }
        }
        if !href.is_empty() {
            entries.push(LinkHeaderEntry { href, rel });
        }
    }
    entries
}

fn split_respecting_quotes(value: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    for c in value.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                current.push(c);
            }
            ',' if !in_quotes => {
                out.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    if !current.trim().is_empty() {
        out.push(current);
    }
    out
}
