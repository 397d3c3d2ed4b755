//! Error categories surfaced on the wire.

use thiserror::Error;

/// Category tag carried in `metadata.error_type` on `error` frames.
///
/// Failures local to a stream (a generator refusing to open, or dying
/// mid-stream) carry no category; the stream id in the metadata is enough
/// for the client to attribute them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorType {
    /// No AI configuration is present; the stream was not started.
    Configuration,
    /// Malformed or unrecognized inbound frame.
    InvalidMessage,
    /// A frame handler failed while processing a well-formed frame.
    Processing,
    /// The connection itself failed; sent best-effort before teardown.
    Connection,
}

impl ErrorType {
    /// Wire string for this category.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Configuration => "configuration",
            Self::InvalidMessage => "invalid_message",
            Self::Processing => "processing",
            Self::Connection => "connection",
        }
    }
}

/// Errors raised while decoding a single inbound frame.
///
/// These never terminate the connection; the dispatcher answers with an
/// `error` frame and keeps pumping.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The payload was not valid JSON for any known frame shape.
    #[error("invalid frame: {0}")]
    Parse(#[from] serde_json::Error),
    /// A `message` or `cancel_stream` frame arrived without a stream id.
    #[error("frame is missing metadata.user_input_id")]
    MissingStreamId,
}

impl FrameError {
    /// Wire category for this error.
    #[must_use]
    pub fn error_type(&self) -> ErrorType {
        ErrorType::InvalidMessage
    }
}
