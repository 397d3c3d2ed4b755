//! Server-Sent Events line parsing for provider byte streams.
//!
//! Gemini streams responses as HTTP SSE. This module turns the raw chunked
//! byte stream into `data:` payload strings:
//! - buffers partial lines across chunk boundaries
//! - strips the `data: ` prefix, skips comments and blank lines
//! - filters `[DONE]` markers
//! - flushes a trailing payload when the stream ends without a final newline

use async_stream::stream;
use bytes::{Bytes, BytesMut};
use futures::Stream;
use tokio_stream::StreamExt;
use tracing::warn;

/// Extract `data:` payloads from an SSE byte stream.
pub fn sse_data_lines<S>(mut bytes: S) -> impl Stream<Item = String> + Send
where
    S: Stream<Item = Result<Bytes, reqwest::Error>> + Send + Unpin + 'static,
{
    stream! {
        let mut buffer = BytesMut::with_capacity(8192);
        loop {
            // Drain every complete line already buffered.
            while let Some(pos) = buffer.iter().position(|&b| b == b'\n') {
                let mut line = buffer.split_to(pos + 1);
                line.truncate(line.len() - 1);
                if line.last() == Some(&b'\r') {
                    line.truncate(line.len() - 1);
                }
                let Ok(text) = std::str::from_utf8(&line) else {
                    continue;
                };
                if let Some(data) = extract_data(text) {
                    yield data;
                }
            }

            match bytes.next().await {
                Some(Ok(chunk)) => buffer.extend_from_slice(&chunk),
                Some(Err(e)) => {
                    warn!(error = %e, "SSE byte stream read failed");
                    return;
                }
                None => {
                    // The last payload is not always newline-terminated.
                    if let Ok(text) = std::str::from_utf8(&buffer) {
                        if let Some(data) = extract_data(text) {
                            yield data;
                        }
                    }
                    return;
                }
            }
        }
    }
}

/// Extract the payload from one SSE line, if it carries one.
fn extract_data(line: &str) -> Option<String> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with(':') {
        return None;
    }
    let data = trimmed.strip_prefix("data:")?.trim_start();
    if data == "[DONE]" || data.is_empty() {
        return None;
    }
    Some(data.to_string())
}
