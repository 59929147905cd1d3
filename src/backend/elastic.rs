//! HTTP implementation of the search backend
//!
//! Speaks the scroll wire shape:
//! - open:     `POST /{index}/_search?scroll=<ttl>` with `{"query": ..., "size": n}`
//! - continue: `POST /_search/scroll` with `{"scroll": <ttl>, "scroll_id": <token>}`

use super::SearchBackend;
use crate::auth::AuthConfig;
use crate::error::{Error, Result};
use crate::http::{HttpClient, HttpClientConfig, RequestConfig};
use crate::types::{CursorToken, JsonValue, ScrollTtl};
use async_trait::async_trait;
use serde_json::json;
use tracing::debug;
use url::Url;

/// Search backend reached over HTTP
#[derive(Debug)]
pub struct HttpSearchBackend {
    client: HttpClient,
    base_url: Url,
}

impl HttpSearchBackend {
    /// Create a backend for the cluster at `base_url`
    pub fn new(base_url: &str, config: HttpClientConfig, auth: AuthConfig) -> Result<Self> {
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(Error::invalid_value(
                "backend.url",
                format!("'{base_url}' cannot be used as a base URL"),
            ));
        }

        let client = HttpClient::with_auth(config, auth)?;
        Ok(Self { client, base_url })
    }

    /// The cluster URL requests are sent to
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Fetch the cluster banner (`GET /`), useful as a connectivity check
    pub async fn info(&self) -> Result<JsonValue> {
        self.client.get_json(self.base_url.as_str()).await
    }

    /// Build an absolute URL from path segments, percent-encoding each one
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::config(format!("'{}' cannot be a base URL", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

#[async_trait]
impl SearchBackend for HttpSearchBackend {
    async fn open_scroll(
        &self,
        index: &str,
        body: &JsonValue,
        ttl: ScrollTtl,
    ) -> Result<JsonValue> {
        if index.is_empty() {
            return Err(Error::missing_field("index"));
        }

        let url = self.endpoint(&[index, "_search"])?;
        debug!("Opening scroll on {} (ttl {})", url, ttl);

        let request = RequestConfig::new()
            .query("scroll", ttl.to_param())
            .json(body.clone());
        self.client.post_json(url.as_str(), request).await
    }

    async fn continue_scroll(&self, cursor: &CursorToken, ttl: ScrollTtl) -> Result<JsonValue> {
        let url = self.endpoint(&["_search", "scroll"])?;
        debug!("Continuing scroll {} (ttl {})", cursor, ttl);

        let request = RequestConfig::new().json(json!({
            "scroll": ttl.to_param(),
            "scroll_id": cursor.as_str(),
        }));
        self.client.post_json(url.as_str(), request).await
    }
}
