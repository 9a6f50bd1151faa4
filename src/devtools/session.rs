//! One-shot DevTools socket sessions.
//!
//! Each evaluation opens a fresh websocket to the window, sends a single
//! `Runtime.evaluate` command, reads a single reply and drops the connection.
//! Refused, reset and rejected handshakes are expected while Discord is
//! still building its windows, so they only ever produce a non-success result.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::connect_async;
use tracing::{debug, info, warn};

use super::script::InjectionScript;
use super::types::{DevtoolsResult, EvaluateCommand, EvaluationResult, WindowDescriptor};

/// Anything that can run the injection against a window
#[async_trait]
pub trait Evaluator: Send + Sync {
    async fn evaluate(&self, window: &WindowDescriptor) -> EvaluationResult;
}

/// Evaluates one prepared payload over the DevTools socket
#[derive(Debug, Clone)]
pub struct InjectionSession {
    name: String,
    payload: String,
    denylist: Vec<String>,
    timeout: Option<Duration>,
}

impl InjectionSession {
    /// Prepare a session for `script`.
    ///
    /// `denylist` holds window titles to skip, compared case-insensitively.
    /// `timeout` bounds the connect and the reply separately.
    pub fn new(
        name: impl Into<String>,
        script: &InjectionScript,
        object_group: &str,
        denylist: &[String],
        timeout: Option<Duration>,
    ) -> DevtoolsResult<Self> {
        let payload = EvaluateCommand::new(script.source(), object_group).to_payload()?;
        Ok(Self {
            name: name.into(),
            payload,
            denylist: denylist.iter().map(|t| t.to_lowercase()).collect(),
            timeout,
        })
    }

    /// JSON text sent to every window
    pub fn payload(&self) -> &str {
        &self.payload
    }

    pub fn is_denied(&self, title: &str) -> bool {
        let title = title.to_lowercase();
        self.denylist.iter().any(|denied| *denied == title)
    }

    /// Send the payload and wait for one reply. `Err` carries the verdict
    /// when no exchange happened.
    async fn exchange(&self, url: &str) -> Result<Option<String>, EvaluationResult> {
        let connected = match bounded(self.timeout, connect_async(url)).await {
            Some(connected) => connected,
            None => {
                warn!("websocket to {} timed out connecting", url);
                return Err(EvaluationResult::Unknown);
            }
        };
        let mut ws = match connected {
            Ok((ws, _)) => ws,
            Err(WsError::Io(e)) if e.kind() == std::io::ErrorKind::ConnectionRefused => {
                // Possibly the program has exited
                warn!("websocket to {} refused", url);
                return Err(EvaluationResult::Failed);
            }
            Err(WsError::Io(e)) if e.kind() == std::io::ErrorKind::ConnectionReset => {
                // Possibly the program has crashed
                warn!("websocket to {} reset", url);
                return Err(EvaluationResult::Failed);
            }
            Err(WsError::Http(response)) => {
                // Possibly the window is gone
                warn!("websocket to {} bad status {}", url, response.status());
                return Err(EvaluationResult::Failed);
            }
            Err(e) => {
                warn!("websocket to {} failed: {}", url, e);
                return Err(EvaluationResult::Unknown);
            }
        };

        if let Err(e) = ws.send(Message::text(self.payload.clone())).await {
            warn!("sending to {} failed: {}", url, e);
            return Err(EvaluationResult::Unknown);
        }

        let reply = bounded(self.timeout, async {
            while let Some(message) = ws.next().await {
                match message {
                    Ok(Message::Text(text)) => return Some(text.as_str().to_string()),
                    Ok(Message::Binary(bytes)) => {
                        return Some(String::from_utf8_lossy(&bytes).into_owned());
                    }
                    Ok(Message::Close(frame)) => {
                        debug!("{} closed: {:?}", url, frame);
                        return None;
                    }
                    Ok(_) => continue,
                    Err(e) => {
                        warn!("receiving from {} failed: {}", url, e);
                        return None;
                    }
                }
            }
            None
        })
        .await;

        match reply {
            Some(reply) => Ok(reply),
            None => {
                warn!("websocket to {} timed out waiting for a reply", url);
                Err(EvaluationResult::Unknown)
            }
        }
    }
}

#[async_trait]
impl Evaluator for InjectionSession {
    async fn evaluate(&self, window: &WindowDescriptor) -> EvaluationResult {
        let title = format!("\"{}\"", window.title);
        debug!("{}", title);
        if self.is_denied(&window.title) {
            debug!("{} denylisted", title);
            return EvaluationResult::Failed;
        }
        let Some(url) = window.websocket_debugger_url.as_deref() else {
            warn!("{} has no socket URL, another debugger may be attached", title);
            return EvaluationResult::Failed;
        };

        match self.exchange(url).await {
            Ok(response) => interpret_response(&title, &self.name, response.as_deref()),
            Err(verdict) => verdict,
        }
    }
}

/// Classify a `Runtime.evaluate` reply
pub fn interpret_response(title: &str, name: &str, response: Option<&str>) -> EvaluationResult {
    let Some(response) = response.filter(|r| !r.trim().is_empty()) else {
        warn!("{} {} response empty", title, name);
        return EvaluationResult::Unknown;
    };
    let value: serde_json::Value = match serde_json::from_str(response) {
        Ok(value) => value,
        Err(e) => {
            warn!("{} {} response is not JSON: {}", title, name, e);
            return EvaluationResult::Unknown;
        }
    };
    let Some(result) = value.get("result") else {
        warn!("{} {} response has no 'result'", title, name);
        return EvaluationResult::Unknown;
    };

    if let Some(details) = result.get("exceptionDetails") {
        match details.get("exception") {
            Some(exception) => warn!("{} {} failed by {}", title, name, exception),
            None => warn!("{} {} failed but no details", title, name),
        }
        return EvaluationResult::Failed;
    }
    info!("{} {} successful", title, name);
    EvaluationResult::Success
}

/// Await `future`, giving up after `timeout` when one is set
async fn bounded<F: Future>(timeout: Option<Duration>, future: F) -> Option<F::Output> {
    match timeout {
        Some(timeout) => tokio::time::timeout(timeout, future).await.ok(),
        None => Some(future.await),
    }
}
