//! Render capability: turn a URL into page HTML.
//!
//! The extractor only depends on the [`PageRenderer`] / [`RenderSession`]
//! pair, so a headless-browser backend can replace [`HttpRenderer`] without
//! touching the rest of the pipeline. A session is acquired per `load` and
//! must be closed on every exit path; [`crate::extract::ContentExtractor`]
//! takes care of that.

use async_trait::async_trait;
use std::time::Duration;

use crate::config::ExtractConfig;
use crate::errors::ExtractionError;

/// A fetched (or rendered) page.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    /// Final URL after redirects.
    pub url: String,
    pub html: String,
}

/// Factory for render sessions.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &str;

    /// Acquire a session (a browser tab, an HTTP client, ...).
    async fn open(&self) -> Result<Box<dyn RenderSession>, ExtractionError>;
}

/// One acquired render resource.
#[async_trait]
pub trait RenderSession: Send {
    /// Load `url`, waiting at most `timeout`.
    async fn navigate(
        &mut self,
        url: &str,
        timeout: Duration,
    ) -> Result<RenderedPage, ExtractionError>;

    /// Release the resource. Called exactly once per session.
    async fn close(self: Box<Self>);
}

/// Parse-based backend: plain HTTP GET, no script execution.
pub struct HttpRenderer {
    user_agent: String,
}

impl HttpRenderer {
    pub fn new(config: &ExtractConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
        }
    }
}

#[async_trait]
impl PageRenderer for HttpRenderer {
    fn name(&self) -> &str {
        "http"
    }

    async fn open(&self) -> Result<Box<dyn RenderSession>, ExtractionError> {
        let client = reqwest::Client::builder()
            .user_agent(&self.user_agent)
            .build()
            .map_err(|e| ExtractionError::Open(e.to_string()))?;
        Ok(Box::new(HttpSession { client }))
    }
}

struct HttpSession {
    client: reqwest::Client,
}

#[async_trait]
impl RenderSession for HttpSession {
    async fn navigate(
        &mut self,
        url: &str,
        timeout: Duration,
    ) -> Result<RenderedPage, ExtractionError> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| navigation_error(url, timeout, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExtractionError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let final_url = response.url().to_string();
        let html = response
            .text()
            .await
            .map_err(|e| navigation_error(url, timeout, e))?;

        Ok(RenderedPage {
            url: final_url,
            html,
        })
    }

    async fn close(self: Box<Self>) {
        tracing::debug!("closing http render session");
    }
}

fn navigation_error(url: &str, timeout: Duration, err: reqwest::Error) -> ExtractionError {
    if err.is_timeout() {
        ExtractionError::Timeout {
            url: url.to_string(),
            secs: timeout.as_secs(),
        }
    } else {
        ExtractionError::Navigation {
            url: url.to_string(),
            message: err.to_string(),
        }
    }
}
