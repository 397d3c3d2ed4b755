//! Stream runner — drives one generation to completion or cancellation.

use std::sync::Arc;

use futures::StreamExt;
use metrics::counter;
use simplex_core::errors::ErrorType;
use simplex_core::frames::ServerFrame;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument};

use super::connection::ClientConnection;
use super::streams::StreamRegistry;
use crate::context::SessionContext;

/// Run one generation stream for `stream_id`.
///
/// Frame order per stream: `ack`, then zero or more `chunk`s in generation
/// order, then exactly one of `end_stream` or `error` — unless the stream
/// is cancelled, in which case consumption stops silently (the
/// `stream_cancelled` acknowledgment was already sent by the cancel
/// handler). A generator error racing a cancellation is suppressed.
#[instrument(skip_all, fields(stream_id = %stream_id))]
pub async fn run_stream(
    ctx: Arc<SessionContext>,
    conn: Arc<ClientConnection>,
    streams: Arc<StreamRegistry>,
    connection_cancel: CancellationToken,
    stream_id: String,
    prompt: String,
) {
    // The acknowledgment goes out before generation is requested; the
    // provider handshake may suspend for arbitrarily long.
    let _ = conn.send(ServerFrame::ack(&stream_id));

    let token = streams.start(&stream_id, &connection_cancel);
    counter!("streams_started_total").increment(1);

    let Some(config) = ctx.config.load() else {
        info!("no AI configuration, rejecting stream");
        let _ = conn.send(ServerFrame::error(
            "AI not configured",
            Some(ErrorType::Configuration),
            Some(&stream_id),
        ));
        streams.end(&stream_id);
        return;
    };

    let backend = match ctx
        .providers
        .create(&ctx.system_prompt, &config.provider, &config.api_key)
    {
        Ok(backend) => backend,
        Err(e) => {
            error!(error = %e, category = e.category(), "failed to build provider");
            let _ = conn.send(ServerFrame::error(
                format!("Error processing message: {e}"),
                None,
                Some(&stream_id),
            ));
            streams.end(&stream_id);
            return;
        }
    };

    let mut tokens = match backend.open_stream(&prompt).await {
        Ok(tokens) => tokens,
        Err(e) => {
            error!(error = %e, category = e.category(), "failed to open stream");
            let _ = conn.send(ServerFrame::error(
                format!("Error processing message: {e}"),
                None,
                Some(&stream_id),
            ));
            streams.end(&stream_id);
            return;
        }
    };

    loop {
        // Prefer cancellation when both it and a token are ready.
        let item = tokio::select! {
            biased;
            () = token.cancelled() => {
                debug!("stream cancelled, stopping");
                counter!("streams_cancelled_total").increment(1);
                streams.end(&stream_id);
                return;
            }
            item = tokens.next() => item,
        };

        match item {
            None => break,
            Some(Ok(text)) => {
                let _ = conn.send(ServerFrame::chunk(text, &stream_id));
            }
            Some(Err(e)) => {
                if token.is_cancelled() {
                    // Cancellation racing a generator error is expected and
                    // not user-visible.
                    debug!(error = %e, "generator error after cancellation, suppressed");
                } else {
                    error!(error = %e, category = e.category(), "stream failed");
                    let _ = conn.send(ServerFrame::error(
                        format!("Error processing message: {e}"),
                        None,
                        Some(&stream_id),
                    ));
                }
                streams.end(&stream_id);
                return;
            }
        }
    }

    streams.end(&stream_id);
    let _ = conn.send(ServerFrame::end_stream(&stream_id));
    debug!("stream completed");
}
