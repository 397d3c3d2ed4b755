//! End-to-end tests driving a real WebSocket client against the gateway.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use simplex_llm::provider::{Provider, ProviderError, ProviderFactory, ProviderResult, TokenStream};
use simplex_server::config::ServerConfig;
use simplex_server::context::SessionContext;
use simplex_server::server::SimplexServer;
use simplex_settings::store::{AiConfig, ConfigStore};

const TIMEOUT: Duration = Duration::from_secs(5);

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

// ── Scripted providers ───────────────────────────────────────────────────────

/// Per-prompt behavior of the scripted generation backend.
#[derive(Clone)]
enum Script {
    /// Yield these tokens with a small delay between them, then end.
    Tokens(Vec<&'static str>),
    /// Yield these tokens, then fail.
    TokensThenError(Vec<&'static str>),
    /// Fail before producing a stream.
    OpenError,
    /// Never yield; runs until the stream future is dropped.
    Blocked,
}

struct ScriptedProvider {
    scripts: Arc<Mutex<HashMap<String, Script>>>,
}

#[async_trait]
impl Provider for ScriptedProvider {
    async fn open_stream(&self, prompt: &str) -> ProviderResult<TokenStream> {
        let script = self
            .scripts
            .lock()
            .get(prompt)
            .cloned()
            .unwrap_or(Script::Tokens(vec!["ok"]));
        match script {
            Script::OpenError => Err(ProviderError::Other {
                message: "scripted open failure".into(),
            }),
            Script::Tokens(tokens) => {
                let stream: TokenStream = Box::pin(async_stream::stream! {
                    for t in tokens {
                        tokio::time::sleep(Duration::from_millis(5)).await;
                        yield Ok(t.to_string());
                    }
                });
                Ok(stream)
            }
            Script::TokensThenError(tokens) => {
                let stream: TokenStream = Box::pin(async_stream::stream! {
                    for t in tokens {
                        yield Ok(t.to_string());
                    }
                    yield Err(ProviderError::Api {
                        status: 500,
                        message: "scripted stream failure".into(),
                    });
                });
                Ok(stream)
            }
            Script::Blocked => {
                let stream: TokenStream = Box::pin(async_stream::stream! {
                    futures::future::pending::<()>().await;
                    yield Ok(String::new());
                });
                Ok(stream)
            }
        }
    }
}

struct ScriptedFactory {
    scripts: Arc<Mutex<HashMap<String, Script>>>,
}

impl ProviderFactory for ScriptedFactory {
    fn create(
        &self,
        _system_prompt: &str,
        provider: &str,
        _api_key: &str,
    ) -> ProviderResult<Box<dyn Provider>> {
        if provider == "broken" {
            return Err(ProviderError::Auth {
                message: "invalid credentials".into(),
            });
        }
        Ok(Box::new(ScriptedProvider {
            scripts: self.scripts.clone(),
        }))
    }
}

// ── Harness ──────────────────────────────────────────────────────────────────

struct TestServer {
    addr: std::net::SocketAddr,
    server: SimplexServer,
    scripts: Arc<Mutex<HashMap<String, Script>>>,
    _config_dir: tempfile::TempDir,
}

impl TestServer {
    fn script(&self, prompt: &str, script: Script) {
        let _ = self.scripts.lock().insert(prompt.to_string(), script);
    }
}

async fn boot(configured: bool) -> TestServer {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(ConfigStore::new(dir.path().join("config.json")));
    if configured {
        store
            .save(&AiConfig {
                provider: "gemini".into(),
                api_key: "test-key-1234".into(),
            })
            .unwrap();
    }

    let scripts = Arc::new(Mutex::new(HashMap::new()));
    let factory = Arc::new(ScriptedFactory {
        scripts: scripts.clone(),
    });
    let ctx = SessionContext::new(store, factory);

    let server = SimplexServer::new(ServerConfig::default(), ctx);
    let (addr, _handle) = server.listen().await.unwrap();

    TestServer {
        addr,
        server,
        scripts,
        _config_dir: dir,
    }
}

/// Connect and consume the `status` connected notice.
async fn open_session(ts: &TestServer) -> WsStream {
    let (mut ws, _) = connect_async(format!("ws://{}/ws", ts.addr)).await.unwrap();
    let hello = recv_frame(&mut ws).await;
    assert_eq!(hello["type"], "status");
    assert_eq!(hello["content"], "connected");
    ws
}

async fn send_json(ws: &mut WsStream, value: Value) {
    ws.send(Message::Text(value.to_string().into()))
        .await
        .unwrap();
}

async fn send_message(ws: &mut WsStream, stream_id: &str, prompt: &str) {
    send_json(
        ws,
        json!({"type": "message", "content": prompt, "metadata": {"user_input_id": stream_id}}),
    )
    .await;
}

async fn send_cancel(ws: &mut WsStream, stream_id: &str) {
    send_json(
        ws,
        json!({"type": "cancel_stream", "metadata": {"user_input_id": stream_id}}),
    )
    .await;
}

/// Receive the next text frame as JSON, skipping transport pings.
async fn recv_frame(ws: &mut WsStream) -> Value {
    loop {
        let msg = timeout(TIMEOUT, ws.next())
            .await
            .expect("timed out waiting for frame")
            .expect("connection closed")
            .expect("transport error");
        match msg {
            Message::Text(text) => return serde_json::from_str(&text).unwrap(),
            Message::Ping(_) | Message::Pong(_) => {}
            other => panic!("unexpected message: {other:?}"),
        }
    }
}

fn stream_id_of(frame: &Value) -> &str {
    frame["metadata"]["user_input_id"].as_str().unwrap_or("")
}

/// Poll `condition` until it holds or the timeout elapses.
async fn wait_until(mut condition: impl FnMut() -> bool) {
    timeout(TIMEOUT, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

// ── Streaming ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn message_streams_tokens_in_order() {
    let ts = boot(true).await;
    ts.script("hi", Script::Tokens(vec!["He", "llo"]));
    let mut ws = open_session(&ts).await;

    send_message(&mut ws, "a", "hi").await;

    let ack = recv_frame(&mut ws).await;
    assert_eq!(ack["type"], "ack");
    assert_eq!(stream_id_of(&ack), "a");

    let chunk1 = recv_frame(&mut ws).await;
    assert_eq!(chunk1["type"], "chunk");
    assert_eq!(chunk1["content"], "He");
    assert_eq!(stream_id_of(&chunk1), "a");

    let chunk2 = recv_frame(&mut ws).await;
    assert_eq!(chunk2["type"], "chunk");
    assert_eq!(chunk2["content"], "llo");

    let end = recv_frame(&mut ws).await;
    assert_eq!(end["type"], "end_stream");
    assert_eq!(stream_id_of(&end), "a");
}

#[tokio::test]
async fn cancel_before_first_token_suppresses_the_stream() {
    let ts = boot(true).await;
    ts.script("slow", Script::Blocked);
    let mut ws = open_session(&ts).await;

    send_message(&mut ws, "b", "slow").await;
    let ack = recv_frame(&mut ws).await;
    assert_eq!(ack["type"], "ack");
    assert_eq!(stream_id_of(&ack), "b");

    send_cancel(&mut ws, "b").await;
    let cancelled = recv_frame(&mut ws).await;
    assert_eq!(cancelled["type"], "stream_cancelled");
    assert_eq!(stream_id_of(&cancelled), "b");

    // No chunk or end_stream for "b": the next frame is the reply to an
    // unrelated control frame.
    send_json(&mut ws, json!({"type": "get_config"})).await;
    let next = recv_frame(&mut ws).await;
    assert_eq!(next["type"], "config");

    wait_until(|| ts.server.streams().is_empty()).await;
}

#[tokio::test]
async fn cancel_is_idempotent_and_isolated() {
    let ts = boot(true).await;
    ts.script("work", Script::Tokens(vec!["t1", "t2", "t3", "t4"]));
    ts.script("slow", Script::Blocked);
    let mut ws = open_session(&ts).await;

    // One live stream, one cancel target.
    send_message(&mut ws, "keep", "work").await;
    send_cancel(&mut ws, "gone").await;
    send_cancel(&mut ws, "gone").await;

    let mut cancelled_acks = 0;
    let mut keep_frames = Vec::new();
    while keep_frames.last().map(|f: &Value| f["type"].clone()) != Some(json!("end_stream")) {
        let frame = recv_frame(&mut ws).await;
        if frame["type"] == "stream_cancelled" {
            assert_eq!(stream_id_of(&frame), "gone");
            cancelled_acks += 1;
        } else {
            assert_eq!(stream_id_of(&frame), "keep");
            keep_frames.push(frame);
        }
    }

    // Both cancels acknowledged; the unrelated stream ran to completion.
    assert_eq!(cancelled_acks, 2);
    let types: Vec<&str> = keep_frames
        .iter()
        .map(|f| f["type"].as_str().unwrap())
        .collect();
    assert_eq!(types, vec!["ack", "chunk", "chunk", "chunk", "chunk", "end_stream"]);
}

#[tokio::test]
async fn concurrent_streams_preserve_per_stream_order() {
    let ts = boot(true).await;
    ts.script("first", Script::Tokens(vec!["a1", "a2", "a3"]));
    ts.script("second", Script::Tokens(vec!["b1", "b2", "b3"]));
    let mut ws = open_session(&ts).await;

    send_message(&mut ws, "s1", "first").await;
    send_message(&mut ws, "s2", "second").await;

    let mut s1_chunks = Vec::new();
    let mut s2_chunks = Vec::new();
    let mut ended = 0;
    while ended < 2 {
        let frame = recv_frame(&mut ws).await;
        match frame["type"].as_str().unwrap() {
            "ack" => {}
            "chunk" => {
                let content = frame["content"].as_str().unwrap().to_string();
                match stream_id_of(&frame) {
                    "s1" => s1_chunks.push(content),
                    "s2" => s2_chunks.push(content),
                    other => panic!("unexpected stream id: {other}"),
                }
            }
            "end_stream" => ended += 1,
            other => panic!("unexpected frame type: {other}"),
        }
    }

    // Interleaving across streams is fine; per-stream order is not.
    assert_eq!(s1_chunks, vec!["a1", "a2", "a3"]);
    assert_eq!(s2_chunks, vec!["b1", "b2", "b3"]);
}

#[tokio::test]
async fn unconfigured_message_is_rejected() {
    let ts = boot(false).await;
    let mut ws = open_session(&ts).await;

    send_message(&mut ws, "a", "hi").await;

    let ack = recv_frame(&mut ws).await;
    assert_eq!(ack["type"], "ack");

    let error = recv_frame(&mut ws).await;
    assert_eq!(error["type"], "error");
    assert_eq!(error["content"], "AI not configured");
    assert_eq!(error["metadata"]["error_type"], "configuration");

    // No end_stream follows; the connection stays usable.
    send_json(&mut ws, json!({"type": "get_config"})).await;
    assert_eq!(recv_frame(&mut ws).await["type"], "config");
}

#[tokio::test]
async fn open_failure_surfaces_one_error() {
    let ts = boot(true).await;
    ts.script("doomed", Script::OpenError);
    let mut ws = open_session(&ts).await;

    send_message(&mut ws, "a", "doomed").await;
    assert_eq!(recv_frame(&mut ws).await["type"], "ack");

    let error = recv_frame(&mut ws).await;
    assert_eq!(error["type"], "error");
    assert_eq!(stream_id_of(&error), "a");

    send_json(&mut ws, json!({"type": "get_config"})).await;
    assert_eq!(recv_frame(&mut ws).await["type"], "config");
}

#[tokio::test]
async fn midstream_failure_ends_with_error_not_end_stream() {
    let ts = boot(true).await;
    ts.script("fragile", Script::TokensThenError(vec!["x"]));
    let mut ws = open_session(&ts).await;

    send_message(&mut ws, "a", "fragile").await;
    assert_eq!(recv_frame(&mut ws).await["type"], "ack");
    assert_eq!(recv_frame(&mut ws).await["type"], "chunk");

    let error = recv_frame(&mut ws).await;
    assert_eq!(error["type"], "error");
    assert!(error["content"]
        .as_str()
        .unwrap()
        .contains("scripted stream failure"));

    send_json(&mut ws, json!({"type": "get_config"})).await;
    assert_eq!(recv_frame(&mut ws).await["type"], "config");
}

// ── Protocol errors ──────────────────────────────────────────────────────────

#[tokio::test]
async fn unknown_frame_type_keeps_the_connection_open() {
    let ts = boot(true).await;
    let mut ws = open_session(&ts).await;

    send_json(&mut ws, json!({"type": "bogus"})).await;
    let error = recv_frame(&mut ws).await;
    assert_eq!(error["type"], "error");
    assert_eq!(error["metadata"]["error_type"], "invalid_message");

    send_json(&mut ws, json!({"type": "get_config"})).await;
    assert_eq!(recv_frame(&mut ws).await["type"], "config");
}

#[tokio::test]
async fn invalid_json_keeps_the_connection_open() {
    let ts = boot(true).await;
    let mut ws = open_session(&ts).await;

    ws.send(Message::Text("not json at all".into())).await.unwrap();
    let error = recv_frame(&mut ws).await;
    assert_eq!(error["type"], "error");
    assert_eq!(error["metadata"]["error_type"], "invalid_message");

    send_json(&mut ws, json!({"type": "get_config"})).await;
    assert_eq!(recv_frame(&mut ws).await["type"], "config");
}

#[tokio::test]
async fn message_without_stream_id_is_rejected() {
    let ts = boot(true).await;
    let mut ws = open_session(&ts).await;

    send_json(&mut ws, json!({"type": "message", "content": "hi"})).await;
    let error = recv_frame(&mut ws).await;
    assert_eq!(error["type"], "error");
    assert_eq!(error["metadata"]["error_type"], "invalid_message");
}

// ── Config operations ────────────────────────────────────────────────────────

#[tokio::test]
async fn config_roundtrip_over_the_wire() {
    let ts = boot(false).await;
    let mut ws = open_session(&ts).await;

    send_json(
        &mut ws,
        json!({"type": "set_config", "content": {"provider": "gemini", "api_key": "AIza-abc"}}),
    )
    .await;
    let set = recv_frame(&mut ws).await;
    assert_eq!(set["type"], "config_set");
    assert_eq!(set["content"]["success"], true);
    assert_eq!(set["content"]["provider_info"]["vendor"], "Google");

    send_json(&mut ws, json!({"type": "get_config"})).await;
    let got = recv_frame(&mut ws).await;
    assert_eq!(got["type"], "config");
    assert_eq!(got["content"]["configured"], true);
    assert_eq!(got["content"]["provider"], "gemini");
    assert_eq!(got["content"]["provider_info"]["api_key_prefix"], "AIza");

    send_json(&mut ws, json!({"type": "delete_config"})).await;
    let deleted = recv_frame(&mut ws).await;
    assert_eq!(deleted["type"], "config_deleted");
    assert_eq!(deleted["content"]["success"], true);

    send_json(&mut ws, json!({"type": "get_config"})).await;
    let got = recv_frame(&mut ws).await;
    assert_eq!(got["content"]["configured"], false);

    // Deleting again still succeeds.
    send_json(&mut ws, json!({"type": "delete_config"})).await;
    let deleted = recv_frame(&mut ws).await;
    assert_eq!(deleted["content"]["success"], true);
}

#[tokio::test]
async fn validate_config_probes_the_backend() {
    let ts = boot(false).await;
    let mut ws = open_session(&ts).await;

    send_json(
        &mut ws,
        json!({"type": "validate_config", "content": {"provider": "gemini", "api_key": "k"}}),
    )
    .await;
    let result = recv_frame(&mut ws).await;
    assert_eq!(result["type"], "validation_result");
    assert_eq!(result["content"]["valid"], true);
    assert_eq!(result["content"]["provider_info"]["vendor"], "Google");

    send_json(
        &mut ws,
        json!({"type": "validate_config", "content": {"provider": "broken", "api_key": "k"}}),
    )
    .await;
    let result = recv_frame(&mut ws).await;
    assert_eq!(result["content"]["valid"], false);
    assert!(result["content"]["error"]
        .as_str()
        .unwrap()
        .contains("invalid credentials"));
}

// ── Teardown ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn disconnect_cancels_every_active_stream() {
    let ts = boot(true).await;
    ts.script("slow", Script::Blocked);
    let mut ws = open_session(&ts).await;

    for id in ["s1", "s2", "s3"] {
        send_message(&mut ws, id, "slow").await;
        assert_eq!(recv_frame(&mut ws).await["type"], "ack");
    }
    wait_until(|| ts.server.streams().len() == 3).await;

    drop(ws);

    // Every runner observes the connection-wide cancel and releases its
    // registry entry.
    wait_until(|| ts.server.streams().is_empty()).await;
    wait_until(|| ts.server.connection_count() == 0).await;
}

#[tokio::test]
async fn connections_are_isolated() {
    let ts = boot(true).await;
    ts.script("slow", Script::Blocked);
    ts.script("hi", Script::Tokens(vec!["He", "llo"]));

    let mut ws1 = open_session(&ts).await;
    let mut ws2 = open_session(&ts).await;

    // A blocked stream on ws1, then ws1 drops mid-flight.
    send_message(&mut ws1, "one", "slow").await;
    assert_eq!(recv_frame(&mut ws1).await["type"], "ack");
    drop(ws1);

    // ws2 is unaffected.
    send_message(&mut ws2, "two", "hi").await;
    let mut types = Vec::new();
    loop {
        let frame = recv_frame(&mut ws2).await;
        let t = frame["type"].as_str().unwrap().to_string();
        types.push(t.clone());
        if t == "end_stream" {
            break;
        }
    }
    assert_eq!(types, vec!["ack", "chunk", "chunk", "end_stream"]);

    wait_until(|| ts.server.streams().is_empty()).await;
}
