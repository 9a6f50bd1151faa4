//! Introspection endpoint client.
//!
//! `GET http://localhost:<port>/json` lists the windows Discord exposes for
//! debugging. While Discord is still starting the port refuses connections;
//! that is reported as "no data yet" rather than as an error.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::types::{DevtoolsError, DevtoolsResult, WindowDescriptor};
use crate::target::TargetProcess;

/// Longest body excerpt quoted in protocol errors
const BODY_EXCERPT_LEN: usize = 200;

/// Anything that can list debuggable windows
#[async_trait]
pub trait WindowSource: Send + Sync {
    /// One attempt. `Ok(None)` means the endpoint is not ready yet.
    async fn fetch_windows(&self) -> DevtoolsResult<Option<Vec<WindowDescriptor>>>;
}

/// HTTP client for the introspection URL
#[derive(Debug, Clone)]
pub struct DebugEndpoint {
    url: String,
    client: reqwest::Client,
}

impl DebugEndpoint {
    /// `timeout` bounds each request; `None` waits as long as the target does
    pub fn new(url: impl Into<String>, timeout: Option<Duration>) -> DevtoolsResult<Self> {
        let mut builder = reqwest::Client::builder().no_proxy();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| DevtoolsError::Client(e.to_string()))?;
        Ok(Self {
            url: url.into(),
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl WindowSource for DebugEndpoint {
    async fn fetch_windows(&self) -> DevtoolsResult<Option<Vec<WindowDescriptor>>> {
        let response = match self.client.get(&self.url).send().await {
            Ok(response) => response,
            Err(e) => {
                // Usually Discord has not opened the port yet, or has exited
                warn!("JSON from \"{}\" connection error {}", self.url, e);
                return Ok(None);
            }
        };
        let status = response.status();
        debug!("Got response from \"{}\": {}", self.url, status);
        if !status.is_success() {
            warn!("\"{}\" answered {}, not ready", self.url, status);
            return Ok(None);
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                warn!("Reading body from \"{}\" failed: {}", self.url, e);
                return Ok(None);
            }
        };
        let windows: Vec<WindowDescriptor> = serde_json::from_str(&body).map_err(|e| {
            let excerpt: String = body.chars().take(BODY_EXCERPT_LEN).collect();
            DevtoolsError::Protocol(format!(
                "\"{}\" did not return a window list ({}): {}",
                self.url, e, excerpt
            ))
        })?;

        if windows.is_empty() {
            debug!("\"{}\" lists no windows yet", self.url);
            return Ok(None);
        }
        debug!("{} window(s) listed", windows.len());
        Ok(Some(windows))
    }
}

/// Poll `source` until it lists windows or `process` exits.
///
/// Sleeps `interval` before every attempt. Returns `Ok(None)` once the process
/// is gone and the endpoint had nothing to offer. There is no overall deadline.
pub async fn poll_windows<S, P>(
    source: &S,
    process: &mut P,
    interval: Duration,
) -> DevtoolsResult<Option<Vec<WindowDescriptor>>>
where
    S: WindowSource + ?Sized,
    P: TargetProcess + ?Sized,
{
    loop {
        tokio::time::sleep(interval).await;
        if let Some(windows) = source.fetch_windows().await? {
            return Ok(Some(windows));
        }
        if process.has_exited()? {
            info!("Discord exited, no further window data");
            return Ok(None);
        }
    }
}
