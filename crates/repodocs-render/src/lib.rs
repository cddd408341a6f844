//! Optional headless-browser DOM rendering (component B, spec §4.B).
//!
//! Disabled at construction by default. When the `headless` feature is
//! enabled, [`HeadlessRenderer`] drives a `chromiumoxide` browser instance
//! behind a single-permit semaphore — callers must not assume parallelism,
//! matching spec §5's "Renderer: treat as a single-permit resource".

use async_trait::async_trait;
use repodocs_types::{FetchResponse, RepodocsError, Result};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::instrument;

/// Construction-time configuration for a [`Renderer`].
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// How long to wait for DOM quiescence (network idle) before giving up.
    pub js_timeout: Duration,
    /// Scroll to the bottom of the page once to trigger lazy-loaded content.
    pub scroll_to_bottom: bool,
    /// Maximum browser pages rendered concurrently. Spec §5 default is 1.
    pub pool_size: usize,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            js_timeout: Duration::from_secs(10),
            scroll_to_bottom: true,
            pool_size: 1,
        }
    }
}

#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(&self, url: &str) -> Result<FetchResponse>;
}

/// A [`Renderer`] that always reports itself unavailable. Used when the
/// orchestrator is built without headless support — `render_js` options
/// on a source then fail fast with `RendererUnavailable` rather than
/// silently falling back to a plain fetch.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledRenderer;

#[async_trait]
impl Renderer for DisabledRenderer {
    async fn render(&self, _url: &str) -> Result<FetchResponse> {
        Err(RepodocsError::RendererUnavailable(
            "no headless browser binary configured".to_string(),
        ))
    }
}

#[cfg(feature = "headless")]
pub use headless::HeadlessRenderer;

#[cfg(feature = "headless")]
mod headless {
    use super::*;
    use chromiumoxide::{Browser, BrowserConfig};
    use futures::StreamExt;
    use tokio::time::timeout;

    /// Drives a headless Chromium instance via CDP.
    pub struct HeadlessRenderer {
        browser: Browser,
        _handler: tokio::task::JoinHandle<()>,
        permit: Semaphore,
        config: RendererConfig,
    }

    impl HeadlessRenderer {
        /// Launches a headless Chromium instance. Fails with
        /// `RendererUnavailable` if no browser binary can be found.
        pub async fn launch(config: RendererConfig) -> Result<Self> {
            let browser_config = BrowserConfig::builder()
                .build()
                .map_err(|e| RepodocsError::RendererUnavailable(e.to_string()))?;

            let (browser, mut handler) = Browser::launch(browser_config)
                .await
                .map_err(|e| RepodocsError::RendererUnavailable(e.to_string()))?;

            let handler = tokio::spawn(async move { while handler.next().await.is_some() {} });

            Ok(Self {
                browser,
                _handler: handler,
                permit: Semaphore::new(config.pool_size.max(1)),
                config,
            })
        }
    }

    #[async_trait]
    impl Renderer for HeadlessRenderer {
        #[instrument(skip(self), fields(url = %url))]
        async fn render(&self, url: &str) -> Result<FetchResponse> {
            let _permit = self
                .permit
                .acquire()
                .await
                .map_err(|e| RepodocsError::Other(anyhow::anyhow!(e)))?;

            let render = async {
                let page = self
                    .browser
                    .new_page(url)
                    .await
                    .map_err(|e| RepodocsError::Network(e.to_string()))?;

                page.wait_for_navigation()
                    .await
                    .map_err(|e| RepodocsError::Network(e.to_string()))?;

                if self.config.scroll_to_bottom {
                    let _ = page
                        .evaluate("window.scrollTo(0, document.body.scrollHeight)")
                        .await;
                }

                let html = page
                    .content()
                    .await
                    .map_err(|e| RepodocsError::Parse(e.to_string()))?;

                let final_url = page
                    .url()
                    .await
                    .ok()
                    .flatten()
                    .unwrap_or_else(|| url.to_string());

                page.close().await.ok();

                Ok::<_, RepodocsError>(FetchResponse {
                    status: 200,
                    body: html.into_bytes(),
                    content_type: "text/html".to_string(),
                    final_url,
                    headers: HashMap::new(),
                })
            };

            timeout(self.config.js_timeout, render)
                .await
                .map_err(|_| RepodocsError::RendererTimeout(self.config.js_timeout))?
        }
    }
}
