//! WebSocket session lifecycle — one connected client from upgrade through
//! teardown.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use metrics::{counter, gauge};
use simplex_core::errors::{ErrorType, FrameError};
use simplex_core::frames::{ClientFrame, ServerFrame};
use simplex_core::ids::ConnectionId;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

use super::connection::ClientConnection;
use super::dispatcher::{dispatch_frame, reject};
use super::streams::StreamRegistry;
use super::tasks::ConnectionTasks;
use crate::config::ServerConfig;
use crate::context::SessionContext;

/// Run a WebSocket session for a connected client.
///
/// 1. Registers the connection and sends a `status` connected notice
/// 2. Pumps inbound frames through the dispatcher, one at a time, in
///    arrival order
/// 3. Forwards outbound frames via the single writer task, which also sends
///    periodic Ping frames and drops unresponsive clients
/// 4. On disconnect or transport error, signals every tracked stream task
///    and stops; runners clean their registry entries up as they finish
#[instrument(skip_all, fields(conn_id))]
pub async fn run_ws_session(
    ws: WebSocket,
    ctx: Arc<SessionContext>,
    streams: Arc<StreamRegistry>,
    config: ServerConfig,
) {
    let conn_id = ConnectionId::new();
    let _ = tracing::Span::current().record("conn_id", conn_id.as_str());

    let (mut ws_tx, mut ws_rx) = ws.split();
    let (send_tx, mut send_rx) = mpsc::channel::<ServerFrame>(config.send_queue_capacity);
    let conn = Arc::new(ClientConnection::new(conn_id.to_string(), send_tx));
    let tasks = ConnectionTasks::new();

    info!("client connected");
    counter!("ws_connections_total").increment(1);
    gauge!("ws_connections_active").increment(1.0);

    let _ = conn.send(ServerFrame::status("connected"));

    // Single writer: every frame for this connection goes out here. On
    // teardown it drains whatever is already queued, then stops.
    let ping_interval = Duration::from_secs(config.heartbeat_interval_secs);
    let pong_timeout = Duration::from_secs(config.heartbeat_timeout_secs);
    let writer_conn = conn.clone();
    let writer_cancel = tasks.cancel_token().clone();
    let mut writer = tokio::spawn(async move {
        let mut ping = tokio::time::interval(ping_interval);
        // Skip the immediate first tick.
        let _ = ping.tick().await;

        loop {
            tokio::select! {
                biased;
                () = writer_cancel.cancelled() => {
                    while let Ok(frame) = send_rx.try_recv() {
                        if !write_frame(&mut ws_tx, &frame).await {
                            break;
                        }
                    }
                    break;
                }
                frame = send_rx.recv() => {
                    let Some(frame) = frame else { break };
                    if !write_frame(&mut ws_tx, &frame).await {
                        break;
                    }
                }
                _ = ping.tick() => {
                    if !writer_conn.check_alive()
                        && writer_conn.last_pong_elapsed() > pong_timeout
                    {
                        warn!("client unresponsive for {pong_timeout:?}, dropping");
                        break;
                    }
                    if ws_tx.send(Message::Ping(vec![].into())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    // Inbound loop: frames are processed strictly in arrival order.
    let mut transport_error = false;
    loop {
        let msg = match ws_rx.next().await {
            Some(Ok(msg)) => msg,
            Some(Err(e)) => {
                warn!(error = %e, "transport error");
                transport_error = true;
                break;
            }
            None => break,
        };

        let text = match msg {
            Message::Text(ref t) => t.to_string(),
            Message::Binary(ref data) => match std::str::from_utf8(data) {
                Ok(s) => s.to_string(),
                Err(_) => {
                    debug!(len = data.len(), "ignoring non-UTF8 binary frame");
                    continue;
                }
            },
            Message::Close(_) => {
                info!("client sent close frame");
                break;
            }
            Message::Ping(_) | Message::Pong(_) => {
                conn.mark_alive();
                continue;
            }
        };

        match serde_json::from_str::<ClientFrame>(&text) {
            Ok(frame) => dispatch_frame(&ctx, &conn, &streams, &tasks, frame).await,
            Err(e) => reject(&conn, &FrameError::Parse(e)),
        }
    }

    // Teardown: queue the best-effort final error first so the writer's
    // drain pass can still flush it, then signal every stream task.
    info!(dropped = conn.drop_count(), "client disconnected");
    if transport_error {
        let _ = conn.send(ServerFrame::error(
            "connection error",
            Some(ErrorType::Connection),
            None,
        ));
    }
    tasks.cancel_all();

    if tokio::time::timeout(Duration::from_secs(1), &mut writer)
        .await
        .is_err()
    {
        writer.abort();
    }

    counter!("ws_disconnections_total").increment(1);
    gauge!("ws_connections_active").decrement(1.0);
}

/// Serialize and send one frame; returns `false` when the socket is gone.
async fn write_frame<S>(ws_tx: &mut S, frame: &ServerFrame) -> bool
where
    S: futures::Sink<Message> + Unpin,
{
    let json = match serde_json::to_string(frame) {
        Ok(json) => json,
        Err(e) => {
            warn!(error = %e, "failed to serialize outbound frame");
            return true;
        }
    };
    ws_tx.send(Message::Text(json.into())).await.is_ok()
}
