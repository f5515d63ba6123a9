// 🌐 Endpoint - network address of an organization's API

use crate::normalize::{normalize_endpoint_id, normalize_endpoint_url};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Endpoint {
    /// Row id (UUID)
    pub id: String,

    /// Always carries an http(s) scheme and a trailing '/'
    pub url: String,
    pub source_url: String,
    pub platform_type: String,
}

impl Endpoint {
    pub fn new(url: &str, source_url: &str, platform_type: &str) -> Self {
        Endpoint {
            id: uuid::Uuid::new_v4().to_string(),
            url: normalize_endpoint_url(url),
            source_url: source_url.to_string(),
            platform_type: platform_type.to_string(),
        }
    }

    pub fn canonical_url(&self) -> String {
        normalize_endpoint_id(&self.url)
    }
}

impl PartialEq for Endpoint {
    fn eq(&self, other: &Self) -> bool {
        self.canonical_url() == other.canonical_url()
            && self.source_url == other.source_url
            && self.platform_type == other.platform_type
    }
}

impl Eq for Endpoint {}
