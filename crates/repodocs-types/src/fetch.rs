use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Response from [`Fetcher`](crate) or [`Renderer`](crate): created once per
/// fetch, passed once into the pipeline, never persisted beyond the cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchResponse {
    pub status: u16,
    pub body: Vec<u8>,
    pub content_type: String,
    /// The URL reached after following redirects.
    pub final_url: String,
    pub headers: HashMap<String, String>,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn body_as_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}
