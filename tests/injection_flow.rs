//! End-to-end injection against a fake DevTools endpoint

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use httpmock::prelude::*;
use pretty_assertions::assert_eq;
use tokio::net::TcpListener;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

use hideside::config::{self, DEFAULT_OBJECT_GROUP, DEFAULT_SCRIPT_RELATIVE};
use hideside::devtools::EvaluateCommand;
use hideside::{
    DebugEndpoint, InjectionScript, InjectionSession, RunOutcome, TargetProcess, supervise,
};

const TICK: Duration = Duration::from_millis(5);

struct StubProcess {
    exited: bool,
    waits: Arc<AtomicUsize>,
}

#[async_trait]
impl TargetProcess for StubProcess {
    fn has_exited(&mut self) -> std::io::Result<bool> {
        Ok(self.exited)
    }

    async fn wait(&mut self) -> std::io::Result<Option<i32>> {
        self.waits.fetch_add(1, Ordering::SeqCst);
        Ok(Some(0))
    }
}

fn bundled_script() -> InjectionScript {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join(config::DEFAULT_RESOURCE_DIR)
        .join(DEFAULT_SCRIPT_RELATIVE);
    InjectionScript::load(path).unwrap()
}

fn session(script: &InjectionScript) -> InjectionSession {
    InjectionSession::new(
        "init.min.js",
        script,
        DEFAULT_OBJECT_GROUP,
        &["discord updater".to_string()],
        Some(Duration::from_secs(5)),
    )
    .unwrap()
}

/// Websocket server answering every evaluation with `reply`; returns its
/// address and the requests it saw
async fn devtools_socket(reply: &'static str) -> (String, tokio::task::JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let handle = tokio::spawn(async move {
        let mut requests = Vec::new();
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        if let Some(Ok(message)) = ws.next().await {
            requests.push(message.into_text().unwrap().as_str().to_string());
            ws.send(Message::text(reply)).await.unwrap();
        }
        requests
    });
    (addr, handle)
}

#[tokio::test]
async fn test_injects_bundled_script_into_main_window() {
    let (socket_addr, socket) =
        devtools_socket(r#"{"id":1,"result":{"result":{"type":"undefined"}}}"#).await;

    let server = MockServer::start_async().await;
    let listing = server
        .mock_async(|when, then| {
            when.method(GET).path("/json");
            then.status(200).json_body(serde_json::json!([
                {
                    "id": "UPD",
                    "title": "Discord Updater",
                    "type": "page",
                    "webSocketDebuggerUrl": "ws://127.0.0.1:1/devtools/page/UPD"
                },
                {
                    "id": "MAIN",
                    "title": "Discord",
                    "type": "page",
                    "webSocketDebuggerUrl": format!("ws://{}/devtools/page/MAIN", socket_addr)
                }
            ]));
        })
        .await;

    let script = bundled_script();
    let session = session(&script);
    let endpoint = DebugEndpoint::new(server.url("/json"), Some(Duration::from_secs(5))).unwrap();
    let waits = Arc::new(AtomicUsize::new(0));
    let mut process = StubProcess {
        exited: false,
        waits: waits.clone(),
    };

    let (outcome, exit_code) = supervise(&mut process, &endpoint, &session, TICK)
        .await
        .unwrap();

    assert_eq!(
        outcome,
        RunOutcome::Injected {
            title: "Discord".to_string()
        }
    );
    assert_eq!(exit_code, Some(0));
    assert_eq!(waits.load(Ordering::SeqCst), 1);
    listing.assert_calls_async(1).await;

    let requests = socket.await.unwrap();
    assert_eq!(requests.len(), 1);
    let command: EvaluateCommand = serde_json::from_str(&requests[0]).unwrap();
    assert_eq!(command.id, 1);
    assert_eq!(command.method, "Runtime.evaluate");
    assert_eq!(command.params.expression, script.source());
    assert_eq!(command.params.object_group, DEFAULT_OBJECT_GROUP);
    assert!(command.params.user_gesture);
}

#[tokio::test]
async fn test_gives_up_when_endpoint_never_answers_and_process_exits() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let endpoint = DebugEndpoint::new(config::introspection_url(port), Some(Duration::from_secs(1))).unwrap();
    let script = bundled_script();
    let session = session(&script);
    let waits = Arc::new(AtomicUsize::new(0));
    let mut process = StubProcess {
        exited: true,
        waits: waits.clone(),
    };

    let (outcome, _) = supervise(&mut process, &endpoint, &session, TICK)
        .await
        .unwrap();

    assert_eq!(outcome, RunOutcome::ProcessExited);
    assert_eq!(waits.load(Ordering::SeqCst), 1);
}

#[test]
fn test_bundled_script_is_not_empty() {
    let script = bundled_script();
    assert!(!script.source().is_empty());
    assert_eq!(script.source(), script.source().trim());
}
