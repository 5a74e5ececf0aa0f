use serde::{Serialize, Serializer};
use url::Url;

/// A discovered and validated (or bozo) feed. Serialized field names and
/// empty-value conventions match the external JSON output contract.
#[derive(Debug, Clone, Serialize)]
pub struct FeedInfo {
    pub url: Url,
    pub content_type: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub hubs: Vec<String>,
    #[serde(default)]
    pub self_url: String,
    pub is_push: bool,
    #[serde(default, serialize_with = "serialize_favicon")]
    pub favicon: Option<Url>,
    pub bozo: u8,
    pub score: i32,
}

/// Emits `""` rather than `null` when no favicon was found, matching the
/// output contract's empty-string convention for absent string fields.
fn serialize_favicon<S: Serializer>(favicon: &Option<Url>, serializer: S) -> Result<S::Ok, S::Error> {
    match favicon {
        Some(url) => serializer.serialize_str(url.as_str()),
        None => serializer.serialize_str(""),
    }
}

impl FeedInfo {
    pub fn new(url: Url, content_type: String) -> Self {
        Self {
            url,
            content_type,
            title: String::new(),
            description: String::new(),
            version: String::new(),
            hubs: Vec::new(),
            self_url: String::new(),
            is_push: false,
            favicon: None,
            bozo: 0,
            score: 0,
        }
    }
}
