//! HTTP/network layer for repodocs (component A, spec §4.A).
//!
//! Applies a configured per-request timeout, user-agent, and bounded
//! redirect chain. Never retries internally — retry policy belongs to the
//! calling strategy.

use async_trait::async_trait;
use repodocs_types::{FetchResponse, RepodocsError, Result};
use std::collections::HashMap;
use std::time::Duration;
use tracing::instrument;

/// Construction-time configuration for a [`Fetcher`]. Passed explicitly by
/// the orchestrator — never a global/singleton.
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    pub timeout: Duration,
    pub user_agent: String,
    pub max_redirects: usize,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(15),
            user_agent: "repodocs/0.1".to_string(),
            max_redirects: 10,
        }
    }
}

/// GET/HEAD with timeout, user-agent, and redirect policy.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn get(&self, url: &str) -> Result<FetchResponse>;
    async fn head(&self, url: &str) -> Result<FetchResponse>;
}

/// Default [`Fetcher`] backed by `reqwest`.
pub struct ReqwestFetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl ReqwestFetcher {
    pub fn new(config: FetcherConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| RepodocsError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            timeout: config.timeout,
        })
    }

    async fn convert(resp: reqwest::Response) -> Result<FetchResponse> {
        let status = resp.status().as_u16();
        let final_url = resp.url().to_string();
        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        let mut headers = HashMap::new();
        for (key, value) in resp.headers() {
            if let Ok(value_str) = value.to_str() {
                headers.insert(key.to_string(), value_str.to_string());
            }
        }
        let body = resp
            .bytes()
            .await
            .map_err(|e| RepodocsError::Network(format!("failed to read response body: {e}")))?
            .to_vec();

        if !(200..400).contains(&status) {
            return Err(RepodocsError::Http { status });
        }

        Ok(FetchResponse {
            status,
            body,
            content_type,
            final_url,
            headers,
        })
    }
}

#[async_trait]
impl Fetcher for ReqwestFetcher {
    #[instrument(skip(self), fields(url = %url))]
    async fn get(&self, url: &str) -> Result<FetchResponse> {
        let resp = self.client.get(url).send().await.map_err(|e| self.classify(e))?;
        Self::convert(resp).await
    }

    #[instrument(skip(self), fields(url = %url))]
    async fn head(&self, url: &str) -> Result<FetchResponse> {
        let resp = self.client.head(url).send().await.map_err(|e| self.classify(e))?;
        Self::convert(resp).await
    }
}

impl ReqwestFetcher {
    fn classify(&self, err: reqwest::Error) -> RepodocsError {
        if err.is_timeout() {
            RepodocsError::Timeout(self.timeout)
        } else {
            RepodocsError::Network(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn get_returns_body_and_final_url() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .respond_with(ResponseTemplate::new(200).set_body_string("hello"))
            .mount(&server)
            .await;

        let fetcher = ReqwestFetcher::new(FetcherConfig::default()).unwrap();
        let resp = fetcher.get(&format!("{}/page", server.uri())).await.unwrap();

        assert_eq!(resp.status, 200);
        assert_eq!(resp.body_as_str(), "hello");
    }

    #[tokio::test]
    async fn non_2xx_status_is_an_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let fetcher = ReqwestFetcher::new(FetcherConfig::default()).unwrap();
        let err = fetcher
            .get(&format!("{}/missing", server.uri()))
            .await
            .unwrap_err();

        assert!(matches!(err, RepodocsError::Http { status: 404 }));
    }

    #[tokio::test]
    async fn head_request_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/page"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let fetcher = ReqwestFetcher::new(FetcherConfig::default()).unwrap();
        let resp = fetcher.head(&format!("{}/page", server.uri())).await.unwrap();
        assert!(resp.is_success());
    }
}
