//! Inbound frame dispatch.
//!
//! Control frames (`cancel_stream`, config operations) are handled inline
//! on the receive loop, so a cancel ordered after a message on the wire is
//! always observed before any later frame is processed. `message` frames
//! spawn a tracked stream runner and return immediately, which is what lets
//! several streams run concurrently on one connection.

use std::sync::Arc;

use serde_json::{json, Value};
use simplex_core::errors::{ErrorType, FrameError};
use simplex_core::frames::{ClientFrame, ServerFrame};
use simplex_llm::validate::validate_api_key;
use simplex_settings::provider_info::provider_info;
use simplex_settings::store::AiConfig;
use tracing::{info, warn};

use super::connection::ClientConnection;
use super::runner::run_stream;
use super::streams::StreamRegistry;
use super::tasks::ConnectionTasks;
use crate::context::SessionContext;

/// Route one inbound frame.
pub async fn dispatch_frame(
    ctx: &Arc<SessionContext>,
    conn: &Arc<ClientConnection>,
    streams: &Arc<StreamRegistry>,
    tasks: &ConnectionTasks,
    frame: ClientFrame,
) {
    match frame {
        ClientFrame::Message { content, metadata } => {
            let Some(stream_id) = metadata.user_input_id else {
                reject(conn, &FrameError::MissingStreamId);
                return;
            };
            info!(stream_id, "starting stream");
            let _ = tasks.spawn(run_stream(
                ctx.clone(),
                conn.clone(),
                streams.clone(),
                tasks.cancel_token().clone(),
                stream_id,
                content,
            ));
        }

        ClientFrame::CancelStream { metadata } => {
            let Some(stream_id) = metadata.user_input_id else {
                reject(conn, &FrameError::MissingStreamId);
                return;
            };
            // Inline, before the next frame is read: the runner's next
            // cancellation check is guaranteed to observe this.
            info!(stream_id, "cancelling stream");
            streams.cancel(&stream_id);
            let _ = conn.send(ServerFrame::stream_cancelled(&stream_id));
        }

        ClientFrame::GetConfig => handle_get_config(ctx, conn),
        ClientFrame::ValidateConfig { content } => handle_validate_config(ctx, conn, content).await,
        ClientFrame::SetConfig { content } => handle_set_config(ctx, conn, content),
        ClientFrame::DeleteConfig => handle_delete_config(ctx, conn),

        ClientFrame::Unknown => {
            warn!("unknown frame type");
            let _ = conn.send(ServerFrame::error(
                "unknown message type",
                Some(ErrorType::InvalidMessage),
                None,
            ));
        }
    }
}

/// Answer a malformed frame without touching the connection state.
pub fn reject(conn: &ClientConnection, error: &FrameError) {
    warn!(error = %error, "rejecting frame");
    let _ = conn.send(ServerFrame::error(
        error.to_string(),
        Some(error.error_type()),
        None,
    ));
}

fn handle_get_config(ctx: &SessionContext, conn: &ClientConnection) {
    let content = match ctx.config.load() {
        Some(config) => json!({
            "configured": true,
            "provider": config.provider,
            "provider_info": provider_info(&config.provider, &config.api_key),
        }),
        None => json!({ "configured": false }),
    };
    let _ = conn.send(ServerFrame::config(content));
}

async fn handle_validate_config(ctx: &SessionContext, conn: &ClientConnection, content: Value) {
    let Some(submitted) = parse_config_payload(conn, content) else {
        return;
    };
    let (valid, error) =
        validate_api_key(ctx.providers.as_ref(), &submitted.provider, &submitted.api_key).await;
    let content = if valid {
        json!({
            "valid": true,
            "provider_info": provider_info(&submitted.provider, &submitted.api_key),
        })
    } else {
        info!(provider = %submitted.provider, error, "credential validation failed");
        json!({ "valid": false, "error": error })
    };
    let _ = conn.send(ServerFrame::validation_result(content));
}

fn handle_set_config(ctx: &SessionContext, conn: &ClientConnection, content: Value) {
    let Some(config) = parse_config_payload(conn, content) else {
        return;
    };
    let content = match ctx.config.save(&config) {
        Ok(()) => json!({
            "success": true,
            "provider_info": provider_info(&config.provider, &config.api_key),
        }),
        Err(e) => {
            warn!(error = %e, "config save failed");
            json!({ "success": false, "error": "Failed to save configuration" })
        }
    };
    let _ = conn.send(ServerFrame::config_set(content));
}

fn handle_delete_config(ctx: &SessionContext, conn: &ClientConnection) {
    let content = match ctx.config.delete() {
        Ok(()) => json!({ "success": true }),
        Err(e) => {
            warn!(error = %e, "config delete failed");
            json!({ "success": false, "error": e.to_string() })
        }
    };
    let _ = conn.send(ServerFrame::config_deleted(content));
}

/// Parse a `{ provider, api_key }` payload, answering with a processing
/// error when it does not fit.
fn parse_config_payload(conn: &ClientConnection, content: Value) -> Option<AiConfig> {
    match serde_json::from_value(content) {
        Ok(config) => Some(config),
        Err(e) => {
            warn!(error = %e, "malformed config payload");
            let _ = conn.send(ServerFrame::error(
                "config payload must carry provider and api_key",
                Some(ErrorType::Processing),
                None,
            ));
            None
        }
    }
}
